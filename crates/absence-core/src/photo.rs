//! Uploaded photo decoding.
//!
//! Turns the raw bytes of a JPEG/PNG upload into an upright, bounded-size
//! RGB buffer that the detector and recognizer can work on.

use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use thiserror::Error;

/// Default cap on the longest side of a decoded photo.
pub const DEFAULT_MAX_SIDE: u32 = 1280;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("empty file")]
    Empty,
    #[error("invalid image, use a standard JPG/PNG: {0}")]
    Invalid(#[from] image::ImageError),
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),
}

/// An RGB photo, 3 bytes per pixel, row-major.
#[derive(Clone)]
pub struct Photo {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Photo {
    /// Decode an uploaded image.
    ///
    /// EXIF orientation is applied, the image is converted to RGB8 and
    /// downscaled so that its longest side is at most `max_side`.
    pub fn decode(bytes: &[u8], max_side: u32) -> Result<Self, PhotoError> {
        if bytes.is_empty() {
            return Err(PhotoError::Empty);
        }

        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut img = DynamicImage::from_decoder(decoder)?;
        img.apply_orientation(orientation);

        let (w, h) = (img.width(), img.height());
        if max_side > 0 && w.max(h) > max_side {
            img = img.resize(max_side, max_side, FilterType::Triangle);
            tracing::debug!(
                from = ?(w, h),
                to = ?(img.width(), img.height()),
                "photo downscaled"
            );
        }

        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Self {
            data: rgb.into_raw(),
            width,
            height,
        })
    }

    /// Wrap an already-decoded RGB buffer.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self { data, width, height }
    }

    /// RGB value at (x, y), or black when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let off = (y as usize * self.width as usize + x as usize) * 3;
        match self.data.get(off..off + 3) {
            Some(p) => [p[0], p[1], p[2]],
            None => [0, 0, 0],
        }
    }
}
