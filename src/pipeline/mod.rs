pub mod reconcile;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::config::ResumakeConfig;
use crate::core::error::{Result, ResumakeError};
use crate::core::models::{AtsReport, MasterRecord};
use crate::index::RetrievalOutcome;
use crate::index::flatten::flatten_master_record;
use crate::index::store::VectorIndex;
use crate::llm::analysis::JobAnalyzer;
use crate::llm::ats::AtsScorer;
use crate::llm::factory::{EmbeddingProviderFactory, TransformFactory};
use crate::llm::providers::base::{TextTransform, TransformError};
use crate::llm::rephrase::Rephraser;
use crate::{render, scrape};

/// Result of one end-to-end tailoring run.
#[derive(Debug)]
pub struct PipelineReport {
    pub target_role: String,
    pub tailored: MasterRecord,
    pub ats: Option<AtsReport>,
    pub pdf_path: PathBuf,
}

/// Loads and validates the master background record.
pub fn load_master_record(path: &Path) -> Result<MasterRecord> {
    let bytes = fs::read(path).map_err(|e| {
        ResumakeError::Input(format!(
            "master background file not found at {}: {}",
            path.display(),
            e
        ))
    })?;
    let record: MasterRecord = serde_json::from_slice(&bytes).map_err(|e| {
        ResumakeError::Input(format!(
            "master background file {} is not valid: {}",
            path.display(),
            e
        ))
    })?;
    Ok(record)
}

fn provider_failure(stage: &str, e: TransformError) -> ResumakeError {
    ResumakeError::Provider(format!("{stage} failed: {e}"))
}

/// Runs the full tailoring pipeline for one job posting URL.
///
/// Steps: load master record, (optionally) rebuild the semantic index, fetch
/// and analyze the posting, retrieve relevant units, rewrite them, reconcile
/// back into resume shape, score against the posting and render the PDF. The
/// ATS score is best-effort; every other step is fatal on failure.
pub async fn run_pipeline(
    config: &ResumakeConfig,
    job_url: &str,
    reindex: bool,
) -> Result<PipelineReport> {
    let master = load_master_record(&config.master_background_file)?;

    let embedder = EmbeddingProviderFactory::from_config(config);
    let index = VectorIndex::new(&config.index_dir, &config.collection_name, embedder);

    if reindex {
        let units = flatten_master_record(&master);
        let count = index.rebuild(&units).await?;
        info!("Indexed {} units from master background", count);
    }

    let posting = scrape::fetch_job_posting(job_url, config.scrape_timeout_secs).await?;

    let provider: Arc<dyn TextTransform> = Arc::from(TransformFactory::from_config(config));

    let requirements = JobAnalyzer::new(provider.clone())
        .analyze(&posting)
        .await
        .map_err(|e| provider_failure("job analysis", e))?;
    info!("Target role: {}", requirements.target_role);

    let scored = match index
        .retrieve(&requirements.retrieval_query(), config.top_k, config.min_relevance)
        .await
    {
        RetrievalOutcome::Matches(items) => items,
        RetrievalOutcome::EmptyMatch => {
            return Err(ResumakeError::Index(format!(
                "no background content cleared the {:.2} relevance threshold for this posting",
                config.min_relevance
            )));
        }
        RetrievalOutcome::Unavailable(reason) => {
            return Err(ResumakeError::Index(format!(
                "retrieval unavailable: {reason}. Run with --reindex to build the collection"
            )));
        }
    };

    let rewritten = Rephraser::new(provider.clone())
        .rewrite(&requirements, &scored)
        .await
        .map_err(|e| provider_failure("rewriting", e))?;
    if rewritten.is_empty() {
        return Err(ResumakeError::Provider(
            "rewriting returned no usable bullets".to_string(),
        ));
    }

    let tailored = reconcile::reconcile(master, &rewritten);

    let ats = match AtsScorer::new(provider.clone())
        .score(&tailored, &requirements)
        .await
    {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("ATS scoring failed, continuing without a score: {}", e);
            None
        }
    };

    let pdf_path =
        render::generate_pdf_resume(&tailored, &requirements.target_role, &config.outputs_dir)?;

    Ok(PipelineReport {
        target_role: requirements.target_role,
        tailored,
        ats,
        pdf_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_master_record_missing_file() {
        let result = load_master_record(Path::new("/nonexistent/master.json"));
        assert!(matches!(result, Err(ResumakeError::Input(_))));
    }

    #[test]
    fn test_load_master_record_corrupt_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let result = load_master_record(file.path());
        assert!(matches!(result, Err(ResumakeError::Input(_))));
    }

    #[test]
    fn test_load_master_record_roundtrip() {
        let mut record = MasterRecord::default();
        record.name = "Jane Doe".to_string();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&record).unwrap().as_bytes())
            .unwrap();

        let loaded = load_master_record(file.path()).unwrap();
        assert_eq!(loaded.name, "Jane Doe");
    }
}
