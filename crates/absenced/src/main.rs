use absenced::api::{self, AppState};
use absenced::config::Config;
use absenced::engine::{spawn_engine, OnnxBackend};
use absence_store::Store;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(bind = %config.bind_addr, db = %config.db_path.display(), "absenced starting");
    if config.uses_default_secret() {
        tracing::warn!("ABSENCE_SECRET_KEY is not set; tokens are signed with the built-in default key");
    }

    let store = Store::open(&config.db_path)
        .await
        .with_context(|| format!("opening database {}", config.db_path.display()))?;

    let engine = match OnnxBackend::load(
        &config.detector_model_path(),
        &config.recognizer_model_path(),
        config.detection_threshold,
    ) {
        Ok(backend) => Some(spawn_engine(backend, config.max_image_side)?),
        Err(e) => {
            tracing::warn!(error = %e, "face models unavailable; face endpoints will answer 503");
            None
        }
    };

    let state = AppState::new(&config, store, engine);
    let app = api::app(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "absenced ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("absenced shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
