pub mod flatten;
pub mod scoring;
pub mod store;

use self::scoring::ScoredUnit;

/// Outcome of a retrieval pass. `EmptyMatch` (nothing cleared admission) and
/// `Unavailable` (embedding service or collection missing) both abort a
/// pipeline run, but the orchestrator logs them differently.
#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    Matches(Vec<ScoredUnit>),
    EmptyMatch,
    Unavailable(String),
}

impl RetrievalOutcome {
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Matches(_))
    }
}
