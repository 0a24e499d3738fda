//! absence-core: photo decoding and the face pipeline behind photo attendance.
//!
//! Uses SCRFD for face detection and ArcFace for face embeddings, both
//! running via ONNX Runtime for CPU inference. Matching is plain cosine
//! similarity against a gallery of enrolled students.

pub mod alignment;
pub mod detector;
pub mod photo;
pub mod recognizer;
pub mod types;

pub use detector::{DetectorError, FaceDetector};
pub use photo::{Photo, PhotoError};
pub use recognizer::{FaceRecognizer, RecognizerError};
pub use types::{BoundingBox, CosineMatcher, Embedding, Enrollment, MatchResult, Matcher};

/// File name of the SCRFD detection model inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";

/// File name of the ArcFace recognition model inside the model directory.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";
