use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::base::{TextTransform, TransformError, TransformMetadata};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

/// Google Gemini backend via the generativelanguage REST API.
pub struct GoogleProvider {
    api_key: String,
    model: String,
    temperature: f64,
    client: Client,
}

impl GoogleProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, temperature: f64) -> Self {
        let model = model.into();
        info!("Google provider initialized (model={})", model);
        Self {
            api_key: api_key.into(),
            model,
            temperature,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl TextTransform for GoogleProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, TransformMetadata), TransformError> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: user_prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: if response_format == Some("json_object") {
                    Some("application/json".to_string())
                } else {
                    None
                },
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(TransformError::Http)?
            .json::<GenerateContentResponse>()
            .await?;

        let content = response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| TransformError::Provider("No candidates in response".to_string()))?;

        let mut metadata = TransformMetadata {
            provider: "google".to_string(),
            model: self.model.clone(),
            ..Default::default()
        };
        if let Some(usage) = response.usage_metadata {
            metadata.tokens_prompt = Some(usage.prompt_token_count);
            metadata.tokens_completion = Some(usage.candidates_token_count);
            metadata.tokens_total = Some(usage.total_token_count);
        }

        Ok((content, metadata))
    }

    fn provider_name(&self) -> &str {
        "google"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
