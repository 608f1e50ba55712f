pub mod extractor;
pub mod llm_service;
pub mod record_store;
pub mod search_service;

pub use extractor::ResponseExtractor;
pub use llm_service::{LlmService, RetryPolicy};
pub use record_store::RecordStore;
pub use search_service::SearchProvider;
