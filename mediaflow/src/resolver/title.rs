//! Resolves a free-text title to a single catalog identifier.

use tracing::{debug, trace};

use super::models::{ExternalId, ScoredCandidate, SearchCandidate};
use crate::errors::ConfigError;
use crate::matching::sequence_ratio;

/// Scores candidate titles against a query and picks the best match.
///
/// The resolver is pure: candidates are supplied by the caller, usually from
/// a paginated search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleResolver {
    threshold: f64,
}

impl Default for TitleResolver {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

impl TitleResolver {
    /// Minimum score accepted when no threshold is configured.
    pub const DEFAULT_THRESHOLD: f64 = 0.9;

    /// Creates a resolver with a custom threshold.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidThreshold` unless `0.0 <= threshold <= 1.0`.
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    /// The minimum accepted score.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores every non-empty title of every candidate.
    ///
    /// Only scores at or above the threshold are kept. The result is sorted
    /// by descending score; equal scores keep first-seen order.
    #[must_use]
    pub fn score(&self, query: &str, candidates: &[SearchCandidate]) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .flat_map(|candidate| {
                candidate.title_texts().map(move |text| ScoredCandidate {
                    external_id: candidate.external_id.clone(),
                    score: sequence_ratio(query, text),
                    matched_text: text.to_string(),
                })
            })
            .inspect(|scored| {
                trace!(id = %scored.external_id, score = scored.score, title = %scored.matched_text, "Scored title");
            })
            .filter(|scored| scored.score >= self.threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }

    /// Returns the best candidate above the threshold, with its score.
    #[must_use]
    pub fn best_match(&self, query: &str, candidates: &[SearchCandidate]) -> Option<ScoredCandidate> {
        let best = self.score(query, candidates).into_iter().next();
        match &best {
            Some(scored) => debug!(
                query = %query,
                id = %scored.external_id,
                score = scored.score,
                "Resolved title to '{}'", scored.matched_text
            ),
            None => debug!(query = %query, candidates = candidates.len(), "No title above threshold"),
        }
        best
    }

    /// Returns the identifier of the best candidate, or `None`.
    #[must_use]
    pub fn resolve(&self, query: &str, candidates: &[SearchCandidate]) -> Option<ExternalId> {
        self.best_match(query, candidates)
            .map(|scored| scored.external_id)
    }
}
