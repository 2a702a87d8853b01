use super::embeddings::EmbeddingGenerator;
use super::providers::base::TextTransform;
use super::providers::google::GoogleProvider;
use super::providers::ollama::OllamaProvider;
use super::providers::openrouter::OpenRouterProvider;
use crate::core::config::ResumakeConfig;
use crate::{DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL};

/// Selects the text-transform backend from configuration. All consumers
/// (analysis, rephrasing, ATS scoring) receive the same trait object; only
/// this factory knows provider identities.
pub struct TransformFactory;

impl TransformFactory {
    #[must_use]
    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<&str>,
        temperature: f64,
    ) -> Box<dyn TextTransform> {
        match provider {
            "google" => Box::new(GoogleProvider::new(
                api_key.unwrap_or_default().to_string(),
                model.to_string(),
                temperature,
            )),
            "openrouter" => Box::new(OpenRouterProvider::new(
                api_key.unwrap_or_default().to_string(),
                model.to_string(),
                temperature,
            )),
            "ollama" => Box::new(OllamaProvider::localhost(model.to_string(), temperature)),
            _ => panic!("Unknown provider: {provider}. Supported: google, openrouter, ollama"),
        }
    }

    #[must_use]
    pub fn from_config(config: &ResumakeConfig) -> Box<dyn TextTransform> {
        Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_temperature,
        )
    }
}

pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    #[must_use]
    pub fn from_config(config: &ResumakeConfig) -> EmbeddingGenerator {
        EmbeddingGenerator::new(
            config.embedding_provider.clone(),
            config.embedding_url.clone(),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            config.embedding_timeout_secs,
            DEFAULT_CACHE_SIZE,
            DEFAULT_CACHE_TTL,
            config.embedding_fallback_enabled,
            Some(config.embedding_fallback_url.clone()),
            Some(config.embedding_fallback_model.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_provider() {
        let provider = TransformFactory::create("ollama", "llama3.1:8b", None, 0.2);
        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_create_google_provider() {
        let provider = TransformFactory::create("google", "gemini-2.5-flash", Some("key"), 0.2);
        assert_eq!(provider.provider_name(), "google");
        assert_eq!(provider.model_name(), "gemini-2.5-flash");
    }

    #[test]
    fn test_create_openrouter_provider() {
        let provider =
            TransformFactory::create("openrouter", "qwen/qwen3-235b-a22b:free", Some("key"), 0.2);
        assert_eq!(provider.provider_name(), "openrouter");
    }

    #[test]
    #[should_panic(expected = "Unknown provider")]
    fn test_unknown_provider_panics() {
        TransformFactory::create("unknown", "model", None, 0.5);
    }
}
