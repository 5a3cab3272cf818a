use docqa_core::config::LimitsConfig;
use docqa_llm::DocumentAnswerer;

use crate::uploads::UploadStore;

/// Shared application state accessible from all handlers. Built once at
/// startup; nothing in it changes per request.
pub struct AppState {
    pub answerer: DocumentAnswerer,
    pub uploads: UploadStore,
    pub limits: LimitsConfig,
}
