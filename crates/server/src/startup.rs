//! Server startup: shared state initialization and background task spawning.

use std::sync::Arc;
use std::time::Duration;

use docqa_core::Config;
use docqa_llm::DocumentAnswerer;
use tracing::info;

use crate::state::AppState;
use crate::uploads::{self, UploadStore};

/// Build `AppState` from config. Nothing here touches the network.
pub fn build_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    // A missing key still yields an answerer; it reports the key on each question.
    let answerer = DocumentAnswerer::from_config(&config.llm, &config.limits)?;

    let uploads = UploadStore::resolve(&config.storage.upload_dir)?;
    info!("Uploads stored in {}", uploads.dir().display());

    Ok(Arc::new(AppState {
        answerer,
        uploads,
        limits: config.limits.clone(),
    }))
}

/// Start the retention sweeper when a retention period is configured.
pub fn spawn_background(state: &AppState, config: &Config) -> Option<tokio::task::JoinHandle<()>> {
    if config.storage.retention_secs == 0 {
        info!("Upload retention disabled; uploaded files are kept until removed externally");
        return None;
    }
    let retention = Duration::from_secs(config.storage.retention_secs);
    let every = Duration::from_secs(config.storage.sweep_interval_secs.max(1));
    info!(
        "Upload sweeper: removing files older than {}s every {}s",
        retention.as_secs(),
        every.as_secs()
    );
    Some(uploads::spawn_sweeper(state.uploads.clone(), retention, every))
}
