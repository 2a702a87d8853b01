use tracing::{info, warn};

use super::providers::base::{TextTransform, TransformError};
use crate::core::models::{AtsReport, JobRequirements, MasterRecord};
use crate::utils::strip_json_fences;

const SYSTEM_PROMPT: &str = r#"You are a strict Applicant Tracking System simulator. Compare the candidate's final resume content against the job requirements and score the match.

Output a single JSON object:
{
  "ats_score_percentage": 0-100,
  "missing_critical_skills": ["3-5 critical skills from the requirements not adequately covered"],
  "suggestions_for_improvement": ["2-3 specific, actionable suggestions"]
}

Return only the JSON object."#;

/// Simulates an ATS ranking over the reconciled record.
pub struct AtsScorer<P: TextTransform> {
    provider: P,
}

impl<P: TextTransform> AtsScorer<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn score(
        &self,
        tailored: &MasterRecord,
        requirements: &JobRequirements,
    ) -> Result<AtsReport, TransformError> {
        let content = collect_resume_text(tailored);
        if content.trim().is_empty() {
            return Err(TransformError::Internal(
                "no optimized content to evaluate".to_string(),
            ));
        }

        info!(
            "Scoring tailored resume ({} chars) with {}",
            content.len(),
            self.provider.provider_name()
        );

        let user_prompt = format!(
            "JOB REQUIREMENTS:\n---\n{}\n---\nFINAL RESUME CONTENT:\n---\n{}\n---",
            serde_json::to_string_pretty(requirements)?,
            content,
        );

        let (response, _metadata) = self
            .provider
            .generate(SYSTEM_PROMPT, &user_prompt, Some("json_object"))
            .await?;

        match serde_json::from_str::<AtsReport>(strip_json_fences(&response)) {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!("Failed to parse ATS report: {}", e);
                Err(TransformError::Provider(format!(
                    "unparseable ATS payload: {e}"
                )))
            }
        }
    }
}

/// Concatenates the tailored record's bullets and skills into one evaluation
/// text block.
fn collect_resume_text(record: &MasterRecord) -> String {
    let mut bullets: Vec<String> = Vec::new();
    for exp in record.experiences.values() {
        bullets.extend(exp.description.iter().cloned());
    }
    for proj in record.projects.values() {
        bullets.extend(proj.description.iter().cloned());
    }

    let skills: Vec<String> = record.skills.values().map(|v| v.joined()).collect();

    if bullets.is_empty() && skills.iter().all(|s| s.is_empty()) {
        return String::new();
    }
    format!("{} | SKILLS: {}", bullets.join(" "), skills.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Experience, SkillValue};
    use crate::llm::providers::base::TransformMetadata;
    use async_trait::async_trait;

    struct CannedProvider(String);

    #[async_trait]
    impl TextTransform for CannedProvider {
        async fn generate(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _response_format: Option<&str>,
        ) -> Result<(String, TransformMetadata), TransformError> {
            Ok((self.0.clone(), TransformMetadata::default()))
        }

        fn provider_name(&self) -> &str {
            "canned"
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn tailored_record() -> MasterRecord {
        let mut record = MasterRecord::default();
        record.experiences.insert(
            "experience_1".to_string(),
            Experience {
                position: "Engineer".to_string(),
                company: "Acme".to_string(),
                location: String::new(),
                start_date: String::new(),
                end_date: String::new(),
                description: vec!["Shipped APIs".to_string()],
            },
        );
        record.skills.insert(
            "languages".to_string(),
            SkillValue::Text("Rust, Python".to_string()),
        );
        record
    }

    #[tokio::test]
    async fn test_score_parses_report() {
        let payload = r#"{"ats_score_percentage": 82, "missing_critical_skills": ["Kafka"], "suggestions_for_improvement": ["Add a streaming bullet"]}"#;
        let scorer = AtsScorer::new(CannedProvider(payload.to_string()));
        let requirements = JobRequirements {
            target_role: "Engineer".to_string(),
            must_have_skills: vec![],
            nice_to_have_skills: vec![],
            keywords_and_phrases: vec![],
            core_responsibilities: vec![],
        };
        let report = scorer.score(&tailored_record(), &requirements).await.unwrap();
        assert_eq!(report.ats_score_percentage, 82);
        assert_eq!(report.missing_critical_skills, vec!["Kafka"]);
    }

    #[tokio::test]
    async fn test_score_requires_content() {
        let scorer = AtsScorer::new(CannedProvider("{}".to_string()));
        let requirements = JobRequirements {
            target_role: "Engineer".to_string(),
            must_have_skills: vec![],
            nice_to_have_skills: vec![],
            keywords_and_phrases: vec![],
            core_responsibilities: vec![],
        };
        let result = scorer.score(&MasterRecord::default(), &requirements).await;
        assert!(matches!(result, Err(TransformError::Internal(_))));
    }

    #[test]
    fn test_collect_resume_text() {
        let text = collect_resume_text(&tailored_record());
        assert!(text.contains("Shipped APIs"));
        assert!(text.contains("SKILLS: Rust, Python"));
    }
}
