use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::RetrievalOutcome;
use super::flatten::Unit;
use super::scoring::{ScoredUnit, admit, relevance_score};
use crate::core::error::{Result, ResumakeError};

/// Embedding seam for the index. Production uses
/// [`crate::llm::embeddings::EmbeddingGenerator`]; tests substitute a
/// deterministic stub.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// One persisted unit with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRecord {
    id: String,
    text: String,
    category: super::flatten::UnitCategory,
    source_id: String,
    title: String,
    embedding: Vec<f32>,
}

impl IndexRecord {
    fn to_unit(&self) -> Unit {
        Unit {
            id: self.id.clone(),
            text: self.text.clone(),
            category: self.category,
            source_id: self.source_id.clone(),
            title: self.title.clone(),
        }
    }
}

/// A full index generation. Rebuild replaces it wholesale; there is no
/// incremental merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    name: String,
    built_at: DateTime<Utc>,
    records: Vec<IndexRecord>,
}

/// Explicit handle to one named, file-backed semantic collection.
///
/// Replaces the process-global "current collection" reference: callers hold
/// the handle and pass it where rebuild/query access is needed. The handle
/// lazily reopens a previously persisted collection on first query.
pub struct VectorIndex<E: Embedder> {
    path: PathBuf,
    name: String,
    embedder: E,
    current: RwLock<Option<Collection>>,
}

impl<E: Embedder> VectorIndex<E> {
    pub fn new(index_dir: impl AsRef<Path>, name: impl Into<String>, embedder: E) -> Self {
        let name = name.into();
        let path = index_dir.as_ref().join(format!("{name}.json"));
        Self {
            path,
            name,
            embedder,
            current: RwLock::new(None),
        }
    }

    /// Drops any prior generation and indexes the given units. Embedding
    /// failures are fatal to the rebuild attempt; a partial generation is
    /// never persisted.
    pub async fn rebuild(&self, units: &[Unit]) -> Result<usize> {
        info!(
            "Rebuilding collection '{}' with {} units",
            self.name,
            units.len()
        );
        self.ensure_absent()?;
        *self.current.write() = None;

        let embeddings = futures::future::try_join_all(
            units.iter().map(|unit| self.embedder.embed(&unit.text)),
        )
        .await?;
        let records = units
            .iter()
            .zip(embeddings)
            .map(|(unit, embedding)| IndexRecord {
                id: unit.id.clone(),
                text: unit.text.clone(),
                category: unit.category,
                source_id: unit.source_id.clone(),
                title: unit.title.clone(),
                embedding,
            })
            .collect();

        let collection = Collection {
            name: self.name.clone(),
            built_at: Utc::now(),
            records,
        };
        self.persist(&collection)?;

        let count = collection.records.len();
        *self.current.write() = Some(collection);
        info!("Indexing complete, {} documents persisted", count);
        Ok(count)
    }

    /// Embeds `query_text` and returns up to `top_k` `(unit, distance)`
    /// pairs, nearest first. Cosine distance convention: 0 = identical,
    /// larger = less similar. Ties keep flatten order (stable sort).
    pub async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<(Unit, f64)>> {
        self.load_if_needed()?;

        let query_embedding = self.embedder.embed(query_text).await?;

        let guard = self.current.read();
        let collection = guard
            .as_ref()
            .ok_or_else(|| ResumakeError::Index(format!("collection '{}' not loaded", self.name)))?;

        let mut scored: Vec<(Unit, f64)> = collection
            .records
            .iter()
            .map(|record| {
                let distance = cosine_distance(&query_embedding, &record.embedding);
                (record.to_unit(), distance)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Full retrieval pass: query, convert distances to relevance scores and
    /// apply the admission filter. All failures degrade to a tagged outcome;
    /// this method never errors.
    pub async fn retrieve(&self, query_text: &str, top_k: usize, threshold: f64) -> RetrievalOutcome {
        let hits = match self.query(query_text, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Retrieval unavailable: {}", e);
                return RetrievalOutcome::Unavailable(e.to_string());
            }
        };

        let admitted: Vec<ScoredUnit> = hits
            .into_iter()
            .filter_map(|(unit, distance)| {
                let score = relevance_score(distance);
                if admit(score, threshold) {
                    Some(ScoredUnit {
                        text: unit.text.clone(),
                        relevance_score: score,
                        metadata: unit.metadata(),
                    })
                } else {
                    debug!(
                        "Rejected '{}' (score {:.3} <= {:.2})",
                        unit.id, score, threshold
                    );
                    None
                }
            })
            .collect();

        if admitted.is_empty() {
            info!("Vector search admitted no items above {:.2}", threshold);
            RetrievalOutcome::EmptyMatch
        } else {
            info!("Vector search admitted {} items", admitted.len());
            RetrievalOutcome::Matches(admitted)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Idempotent removal of the persisted generation. A missing file is a
    /// normal outcome, not an error.
    fn ensure_absent(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Dropped prior collection at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ResumakeError::Io(e)),
        }
    }

    fn persist(&self, collection: &Collection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crashed rebuild never leaves a partial
        // generation visible.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(collection)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Reopens the persisted collection by name when the in-memory handle is
    /// empty (e.g. querying in a fresh process without a rebuild).
    fn load_if_needed(&self) -> Result<()> {
        if self.current.read().is_some() {
            return Ok(());
        }
        let bytes = fs::read(&self.path).map_err(|e| {
            ResumakeError::Index(format!(
                "collection '{}' not found at {}: {}",
                self.name,
                self.path.display(),
                e
            ))
        })?;
        let collection: Collection = serde_json::from_slice(&bytes)?;
        info!(
            "Reopened collection '{}' ({} records, built {})",
            collection.name,
            collection.records.len(),
            collection.built_at
        );
        *self.current.write() = Some(collection);
        Ok(())
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::flatten::UnitCategory;

    /// Deterministic embedder: maps known texts to fixed vectors so distances
    /// are controllable in tests.
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(match text {
                "rust systems" => vec![1.0, 0.0, 0.0],
                "close to rust" => vec![0.9, 0.1, 0.0],
                "python data" => vec![0.0, 1.0, 0.0],
                "unrelated" => vec![0.0, 0.0, 1.0],
                _ => vec![0.5, 0.5, 0.5],
            })
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(ResumakeError::Embedding("service down".to_string()))
        }
    }

    fn unit(id: &str, text: &str) -> Unit {
        Unit {
            id: id.to_string(),
            text: text.to_string(),
            category: UnitCategory::Experiences,
            source_id: "experience_1".to_string(),
            title: "Engineer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_rebuild_then_query_orders_nearest_first() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), "test", StubEmbedder);
        let units = vec![
            unit("u_0", "unrelated"),
            unit("u_1", "close to rust"),
            unit("u_2", "python data"),
        ];
        index.rebuild(&units).await.unwrap();

        let hits = index.query("rust systems", 3).await.unwrap();
        assert_eq!(hits[0].0.id, "u_1");
        assert!(hits[0].1 < hits[1].1);
        assert!(hits[1].1 <= hits[2].1);
    }

    #[tokio::test]
    async fn test_rebuild_without_prior_collection_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), "fresh", StubEmbedder);
        let count = index.rebuild(&[unit("u_0", "rust systems")]).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_query_reopens_persisted_collection() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = VectorIndex::new(dir.path(), "persisted", StubEmbedder);
            index.rebuild(&[unit("u_0", "close to rust")]).await.unwrap();
        }
        // Fresh handle, no in-memory state.
        let index = VectorIndex::new(dir.path(), "persisted", StubEmbedder);
        assert!(!index.is_loaded());
        let hits = index.query("rust systems", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(index.is_loaded());
    }

    #[tokio::test]
    async fn test_retrieve_missing_collection_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), "nonexistent", StubEmbedder);
        let outcome = index.retrieve("rust systems", 5, 0.5).await;
        assert!(matches!(outcome, RetrievalOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_retrieve_embedding_failure_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), "broken", FailingEmbedder);
        let outcome = index.retrieve("anything", 5, 0.5).await;
        assert!(matches!(outcome, RetrievalOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_retrieve_admission_starvation_is_empty_match() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), "starved", StubEmbedder);
        // Orthogonal to the query: distance 1.0, score clamps to the floor.
        index.rebuild(&[unit("u_0", "unrelated")]).await.unwrap();
        let outcome = index.retrieve("rust systems", 5, 0.5).await;
        assert!(!outcome.is_usable());
        assert!(matches!(outcome, RetrievalOutcome::EmptyMatch));
    }

    #[tokio::test]
    async fn test_retrieve_admits_close_matches_with_scores() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), "match", StubEmbedder);
        index
            .rebuild(&[unit("u_0", "close to rust"), unit("u_1", "unrelated")])
            .await
            .unwrap();
        match index.retrieve("rust systems", 5, 0.5).await {
            RetrievalOutcome::Matches(items) => {
                assert_eq!(items.len(), 1);
                assert!(items[0].relevance_score > 0.5);
                assert_eq!(items[0].metadata.source_id, "experience_1");
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn test_cosine_distance_conventions() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-9);
        // Degenerate inputs fall back to "not similar", never NaN.
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!((cosine_distance(&[], &[1.0]) - 1.0).abs() < 1e-9);
    }
}
