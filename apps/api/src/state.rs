use std::sync::Arc;

use crate::config::Config;
use crate::extraction::ResumeExtractor;
use crate::llm_client::ChatModel;
use crate::memory::ConversationStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Gemini in production; swapped for a fake in handler tests.
    pub llm: Arc<dyn ChatModel>,
    pub extractor: ResumeExtractor,
    pub memory: ConversationStore,
    pub config: Config,
}
