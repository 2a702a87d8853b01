use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Runtime configuration for a pipeline run. Built with defaults via
/// [`ResumakeConfig::new`] and overridden from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumakeConfig {
    // Files and directories
    pub master_background_file: PathBuf,
    pub index_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub collection_name: String,

    // Retrieval
    pub top_k: usize,
    pub min_relevance: f64,

    // Scraping
    pub scrape_timeout_secs: u64,

    // LLM provider (analysis, rephrasing, ATS scoring)
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_temperature: f64,

    // Embeddings
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_timeout_secs: u64,

    pub embedding_fallback_enabled: bool,
    pub embedding_fallback_url: String,
    pub embedding_fallback_model: String,
}

impl ResumakeConfig {
    pub fn new() -> Self {
        Self {
            master_background_file: PathBuf::from("data/master_background.json"),
            index_dir: PathBuf::from("data/index"),
            outputs_dir: PathBuf::from("outputs"),
            collection_name: crate::DEFAULT_COLLECTION_NAME.to_string(),

            top_k: crate::DEFAULT_TOP_K,
            min_relevance: crate::MIN_RELEVANCE_THRESHOLD,

            scrape_timeout_secs: 15,

            llm_provider: "ollama".to_string(),
            llm_model: crate::DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_temperature: 0.2,

            embedding_provider: "ollama".to_string(),
            embedding_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_timeout_secs: 30,

            embedding_fallback_enabled: true,
            embedding_fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_fallback_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// Builds a config from defaults plus `RESUMAKE_*` environment overrides.
    /// Provider API keys also fall back to their conventional variables
    /// (`GEMINI_API_KEY`, `OPENROUTER_API_KEY`).
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(path) = std::env::var("RESUMAKE_MASTER_FILE") {
            config.master_background_file = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("RESUMAKE_INDEX_DIR") {
            config.index_dir = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("RESUMAKE_OUTPUTS_DIR") {
            config.outputs_dir = PathBuf::from(path);
        }
        if let Ok(name) = std::env::var("RESUMAKE_COLLECTION") {
            config.collection_name = name;
        }
        if let Ok(k) = std::env::var("RESUMAKE_TOP_K") {
            if let Ok(k) = k.parse() {
                config.top_k = k;
            }
        }
        if let Ok(threshold) = std::env::var("RESUMAKE_MIN_RELEVANCE") {
            if let Ok(threshold) = threshold.parse() {
                config.min_relevance = threshold;
            }
        }
        if let Ok(provider) = std::env::var("RESUMAKE_LLM_PROVIDER") {
            config.llm_provider = provider;
        }
        if let Ok(model) = std::env::var("RESUMAKE_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(provider) = std::env::var("RESUMAKE_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Ok(model) = std::env::var("RESUMAKE_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(url) = std::env::var("RESUMAKE_EMBEDDING_URL") {
            config.embedding_url = url;
        }

        config.llm_api_key = std::env::var("RESUMAKE_LLM_API_KEY")
            .or_else(|_| match config.llm_provider.as_str() {
                "google" => std::env::var("GEMINI_API_KEY"),
                "openrouter" => std::env::var("OPENROUTER_API_KEY"),
                _ => Err(std::env::VarError::NotPresent),
            })
            .ok();
        config.embedding_api_key = std::env::var("RESUMAKE_EMBEDDING_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .ok();

        config
    }

    /// On-disk path of the persisted collection for this config.
    pub fn collection_path(&self) -> PathBuf {
        self.index_dir.join(format!("{}.json", self.collection_name))
    }
}

impl Default for ResumakeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResumakeConfig::new();
        assert_eq!(config.collection_name, "resume_master_data");
        assert_eq!(config.top_k, 20);
        assert!((config.min_relevance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_collection_path() {
        let config = ResumakeConfig::new();
        assert!(
            config
                .collection_path()
                .ends_with("index/resume_master_data.json")
        );
    }
}
