pub mod core;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod scrape;
pub mod utils;

pub use crate::core::config::ResumakeConfig;
pub use crate::core::error::{Result, ResumakeError};
pub use crate::core::models::{JobRequirements, MasterRecord};
pub use crate::index::flatten::{Unit, UnitCategory, flatten_master_record};
pub use crate::index::scoring::{MIN_RELEVANCE_THRESHOLD, admit, relevance_score};
pub use crate::index::store::VectorIndex;
pub use crate::llm::embeddings::EmbeddingGenerator;
pub use crate::utils::{safe_truncate, safe_truncate_ellipsis};

/// Default Ollama endpoint for local embeddings and LLM calls.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default local embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Default local chat model.
pub const DEFAULT_LLM_MODEL: &str = "llama3.1:8b";

/// Logical name of the persisted resume collection.
pub const DEFAULT_COLLECTION_NAME: &str = "resume_master_data";

/// Safety limit for vector search; admission filtering happens afterwards.
pub const DEFAULT_TOP_K: usize = 20;

/// Embedding cache capacity (entries).
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Embedding cache TTL in seconds.
pub const DEFAULT_CACHE_TTL: u64 = 300;
