use std::path::Path;

use absence_core::{
    BoundingBox, DetectorError, Embedding, FaceDetector, FaceRecognizer, Photo, PhotoError,
    RecognizerError,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Photo(#[from] PhotoError),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("could not start engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// One face found in a photo, with its embedding.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub face: BoundingBox,
    pub embedding: Embedding,
}

/// Turns a decoded photo into one embedding per detected face.
///
/// Runs on the engine thread only, so implementations may block and keep
/// mutable inference state.
pub trait FaceBackend: Send + 'static {
    fn analyze(&mut self, photo: &Photo) -> Result<Vec<DetectedFace>, EngineError>;
}

/// SCRFD detection followed by ArcFace extraction for every face.
pub struct OnnxBackend {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxBackend {
    pub fn load(
        detector_path: &Path,
        recognizer_path: &Path,
        detection_threshold: f32,
    ) -> Result<Self, EngineError> {
        let detector = FaceDetector::load(detector_path, detection_threshold)?;
        tracing::info!(path = %detector_path.display(), "SCRFD detector loaded");

        let recognizer = FaceRecognizer::load(recognizer_path)?;
        tracing::info!(path = %recognizer_path.display(), "ArcFace recognizer loaded");

        Ok(Self { detector, recognizer })
    }
}

impl FaceBackend for OnnxBackend {
    fn analyze(&mut self, photo: &Photo) -> Result<Vec<DetectedFace>, EngineError> {
        let faces = self.detector.detect(photo)?;
        tracing::debug!(count = faces.len(), width = photo.width, height = photo.height, "faces detected");

        let mut detections = Vec::with_capacity(faces.len());
        for face in faces {
            if face.landmarks.is_none() {
                tracing::debug!(confidence = face.confidence, "skipping face without landmarks");
                continue;
            }
            let embedding = self.recognizer.extract(photo, &face)?;
            detections.push(DetectedFace { face, embedding });
        }
        Ok(detections)
    }
}

/// Messages sent from request handlers to the engine thread.
struct AnalyzeRequest {
    image: Vec<u8>,
    reply: oneshot::Sender<Result<Vec<DetectedFace>, EngineError>>,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<AnalyzeRequest>,
}

impl EngineHandle {
    /// Decode an uploaded image and embed every face in it.
    ///
    /// Faces come back in detector order, highest score first.
    pub async fn analyze(&self, image: Vec<u8>) -> Result<Vec<DetectedFace>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(AnalyzeRequest {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Inference is CPU-bound and the ONNX sessions need `&mut`, so all photo
/// work is serialized through one thread. The thread exits once every
/// handle has been dropped.
pub fn spawn_engine<B: FaceBackend>(mut backend: B, max_image_side: u32) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<AnalyzeRequest>(4);

    std::thread::Builder::new()
        .name("absence-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                let started = std::time::Instant::now();
                let result = Photo::decode(&req.image, max_image_side)
                    .map_err(EngineError::from)
                    .and_then(|photo| backend.analyze(&photo));
                match &result {
                    Ok(detections) => tracing::debug!(
                        faces = detections.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "photo analyzed"
                    ),
                    Err(e) => tracing::debug!(error = %e, "photo rejected"),
                }
                let _ = req.reply.send(result);
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}
