use tracing::{info, warn};

use super::providers::base::{TextTransform, TransformError};
use crate::core::models::JobRequirements;
use crate::utils::strip_json_fences;

const SYSTEM_PROMPT: &str = r#"You are an expert Job Analyst and ATS Optimizer. Dissect the provided job description and extract the critical, high-value keywords and requirements needed for a resume, regardless of industry.

Output a single JSON object with this structure:
{
  "target_role": "the exact professional job title for the resume",
  "must_have_skills": ["5-10 non-negotiable skills, tools or certifications as single words or short abbreviations"],
  "nice_to_have_skills": ["beneficial but not mandatory skills"],
  "keywords_and_phrases": ["10-15 short industry-specific processes, methodologies and concepts"],
  "core_responsibilities": ["4-6 brief sentences, each a specific high-level task or outcome"]
}

Do not include generic, non-actionable phrases like "collaborate with teams". Return only the JSON object, no introductory text."#;

/// Extracts structured requirements from raw job posting text.
pub struct JobAnalyzer<P: TextTransform> {
    provider: P,
}

impl<P: TextTransform> JobAnalyzer<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn analyze(&self, job_description: &str) -> Result<JobRequirements, TransformError> {
        info!(
            "Analyzing job description ({} chars) with {}",
            job_description.len(),
            self.provider.provider_name()
        );

        let user_prompt = format!("JOB DESCRIPTION:\n---\n{job_description}\n---");
        let (response, _metadata) = self
            .provider
            .generate(SYSTEM_PROMPT, &user_prompt, Some("json_object"))
            .await?;

        match serde_json::from_str::<JobRequirements>(strip_json_fences(&response)) {
            Ok(requirements) => {
                info!("Extraction successful for role: {}", requirements.target_role);
                Ok(requirements)
            }
            Err(e) => {
                warn!("Failed to parse job requirements: {}", e);
                Err(TransformError::Provider(format!(
                    "unparseable requirements payload: {e}"
                )))
            }
        }
    }
}
