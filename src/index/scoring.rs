use serde::{Deserialize, Serialize};

use super::flatten::UnitMetadata;

/// Minimum relevance score (exclusive) a unit must exceed to survive
/// retrieval filtering. Note the tension with the score floor below: a unit
/// clamped to exactly 0.5 always fails the strict comparison.
pub const MIN_RELEVANCE_THRESHOLD: f64 = 0.50;

/// Converts a cosine distance (0 = identical, 2 = opposite) into a bounded
/// relevance score in [0.5, 1.0]. The floor keeps anything inside the
/// requested top-k from being reported below the midpoint.
pub fn relevance_score(distance: f64) -> f64 {
    (1.0 - distance).max(0.5)
}

/// Strict admission: a score exactly at the threshold is rejected.
pub fn admit(score: f64, threshold: f64) -> bool {
    score > threshold
}

/// A retrieved unit that cleared admission, ready for the rewrite step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredUnit {
    pub text: String,
    pub relevance_score: f64,
    pub metadata: UnitMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_bounded_and_non_increasing() {
        let mut previous = f64::INFINITY;
        for step in 0..=20 {
            let distance = f64::from(step) * 0.1;
            let score = relevance_score(distance);
            assert!((0.5..=1.0).contains(&score), "score {score} out of range");
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn test_perfect_match_scores_one() {
        assert!((relevance_score(0.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_floor_kicks_in_at_distance_half() {
        assert!((relevance_score(0.5) - 0.5).abs() < f64::EPSILON);
        assert!((relevance_score(1.7) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_admission_is_strict() {
        assert!(!admit(MIN_RELEVANCE_THRESHOLD, MIN_RELEVANCE_THRESHOLD));
        assert!(admit(
            MIN_RELEVANCE_THRESHOLD + 1e-9,
            MIN_RELEVANCE_THRESHOLD
        ));
    }

    #[test]
    fn test_floor_value_never_admitted_at_default_threshold() {
        // Distance >= 0.5 clamps to the floor, which the strict default
        // threshold then rejects.
        let score = relevance_score(1.2);
        assert!(!admit(score, MIN_RELEVANCE_THRESHOLD));
    }
}
