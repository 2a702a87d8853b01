pub mod base;
pub mod google;
pub mod ollama;
pub mod openrouter;

pub use base::{TextTransform, TransformError, TransformMetadata};
pub use google::GoogleProvider;
pub use ollama::OllamaProvider;
pub use openrouter::OpenRouterProvider;
