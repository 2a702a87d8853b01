use thiserror::Error;

/// Top-level error for the tailoring pipeline. Collaborator failures are
/// converted into these variants at their module boundary; the orchestrator
/// decides whether a stage failure aborts the run.
#[derive(Error, Debug)]
pub enum ResumakeError {
    #[error("Master record error: {0}")]
    Input(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("Embedding generation error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResumakeError>;
