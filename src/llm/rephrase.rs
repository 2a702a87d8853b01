use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::providers::base::{TextTransform, TransformError};
use crate::core::models::JobRequirements;
use crate::index::flatten::{UnitCategory, UnitMetadata};
use crate::index::scoring::ScoredUnit;
use crate::utils::strip_json_fences;

const SYSTEM_PROMPT: &str = r#"You are a professional Resume Writer specializing in optimizing content for Applicant Tracking Systems (ATS). Rewrite the provided background items to maximize their relevance to the target job.

Rules:
1. Experience/project/certification items: rewrite as one concise, high-impact phrase starting with a strong action verb, with quantifiable metrics where possible. No full sentences or elaborate descriptions.
2. Skills items: output ONLY the skill keywords/abbreviations from the original text that are relevant to the target job, as a comma-separated list. Do not add new words or prose.
3. Integrate the job's skills, tools and abbreviations naturally (e.g. 'NLP' instead of 'Natural Language Processing'). Do not overstuff keywords.
4. Vary sentence flow across items; the result must read as written by an experienced human.
5. You may only alter the "text" field. Return "metadata" exactly as given, unchanged.

Output a single JSON object: {"bullet_points": [{"text": "...", "metadata": {"source_id": "...", "category": "...", "title": "..."}}]}"#;

/// A unit whose text has been rewritten; routing metadata is contractually
/// identical to the submitted scored unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewrittenUnit {
    pub text: String,
    pub metadata: UnitMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct RewrittenContent {
    bullet_points: Vec<RewrittenUnit>,
}

/// Rewrites retrieved units for keyword alignment with the target job.
pub struct Rephraser<P: TextTransform> {
    provider: P,
}

impl<P: TextTransform> Rephraser<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Submits the admitted units for rewriting and validates the metadata
    /// pass-through contract: returned units whose `(category, source_id)`
    /// was not part of the submission are dropped with a warning.
    pub async fn rewrite(
        &self,
        requirements: &JobRequirements,
        units: &[ScoredUnit],
    ) -> Result<Vec<RewrittenUnit>, TransformError> {
        info!(
            "Rewriting {} units with {}",
            units.len(),
            self.provider.provider_name()
        );

        let user_prompt = format!(
            "TARGET JOB REQUIREMENTS:\n---\n{}\n---\nBACKGROUND ITEMS:\n---\n{}\n---",
            serde_json::to_string_pretty(requirements)?,
            serde_json::to_string_pretty(units)?,
        );

        let (response, _metadata) = self
            .provider
            .generate(SYSTEM_PROMPT, &user_prompt, Some("json_object"))
            .await?;

        let content: RewrittenContent = serde_json::from_str(strip_json_fences(&response))
            .map_err(|e| {
                warn!("Failed to parse rewritten content: {}", e);
                TransformError::Provider(format!("unparseable rewrite payload: {e}"))
            })?;

        let submitted: HashSet<(UnitCategory, &str)> = units
            .iter()
            .map(|u| (u.metadata.category, u.metadata.source_id.as_str()))
            .collect();

        let kept: Vec<RewrittenUnit> = content
            .bullet_points
            .into_iter()
            .filter(|unit| {
                let known =
                    submitted.contains(&(unit.metadata.category, unit.metadata.source_id.as_str()));
                if !known {
                    warn!(
                        "Dropping rewritten unit with unknown metadata ({}, {})",
                        unit.metadata.category, unit.metadata.source_id
                    );
                }
                known
            })
            .collect();

        info!("Rewriting complete, kept {} bullets", kept.len());
        Ok(kept)
    }
}
