use std::path::PathBuf;

/// Secret used when `ABSENCE_SECRET_KEY` is unset. Only fit for local runs.
pub const DEFAULT_SECRET_KEY: &str = "CHANGE_ME_SUPER_SECRET";

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on (default: 0.0.0.0:8000).
    pub bind_addr: String,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// HMAC key for signing access tokens.
    pub secret_key: String,
    /// Lifetime of an access token, in minutes.
    pub token_expire_minutes: i64,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Cosine similarity threshold for a positive match.
    pub similarity_threshold: f32,
    /// Minimum detector score for a face to count.
    pub detection_threshold: f32,
    /// Uploaded photos are downscaled so their longest side is at most this.
    pub max_image_side: u32,
    /// Request body cap for uploads, in bytes.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from `ABSENCE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind_addr: var("ABSENCE_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            db_path: var("ABSENCE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| absence_store::default_db_path(&var)),
            secret_key: var("ABSENCE_SECRET_KEY")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
            token_expire_minutes: parsed(&var, "ABSENCE_TOKEN_EXPIRE_MINUTES", 60 * 24),
            model_dir: var("ABSENCE_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models")),
            similarity_threshold: parsed(&var, "ABSENCE_SIMILARITY_THRESHOLD", 0.40),
            detection_threshold: parsed(&var, "ABSENCE_DETECTION_THRESHOLD", 0.5),
            max_image_side: parsed(&var, "ABSENCE_MAX_IMAGE_SIDE", absence_core::photo::DEFAULT_MAX_SIDE),
            max_upload_bytes: parsed(&var, "ABSENCE_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(absence_core::DETECTOR_MODEL_FILE)
    }

    /// Path to the ArcFace recognition model.
    pub fn recognizer_model_path(&self) -> PathBuf {
        self.model_dir.join(absence_core::RECOGNIZER_MODEL_FILE)
    }
}

fn parsed<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        None => default,
    }
}
