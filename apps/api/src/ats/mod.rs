// Resume ATS analysis: experience normalization, prompt assembly, the
// analysis pipeline and its HTTP handlers. All model calls go through
// llm_client via the ChatModel held in AppState.

pub mod analyzer;
pub mod experience;
pub mod handlers;
pub mod prompts;
