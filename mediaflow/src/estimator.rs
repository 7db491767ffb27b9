//! Release date estimation from AniList airing schedules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::entry::Entry;
use crate::errors::MediaflowError;
use crate::pagination::Completion;
use crate::resolver::TitleResolver;
use crate::sources::anilist::{AiringNode, AniListClient};

/// Protocol for release date estimators.
#[async_trait]
pub trait EstimateRelease: Send + Sync {
    /// Estimator name, for logs.
    fn name(&self) -> &str;

    /// Estimates when `entry` is or was released.
    ///
    /// Failures are logged and reported as `None`.
    async fn estimate(&self, entry: &Entry) -> Option<DateTime<Utc>>;
}

/// Estimates episode air dates by resolving the series on AniList.
#[derive(Debug, Clone)]
pub struct ReleaseEstimator {
    client: AniListClient,
    resolver: TitleResolver,
}

impl ReleaseEstimator {
    /// Creates an estimator.
    #[must_use]
    pub fn new(client: AniListClient, resolver: TitleResolver) -> Self {
        Self { client, resolver }
    }

    /// Estimates the air date, surfacing failures.
    ///
    /// `Ok(None)` means the entry has no series name, the title did not
    /// resolve, the episode is not on the schedule, or `cancel` fired.
    ///
    /// # Errors
    ///
    /// Returns the search or schedule lookup error.
    pub async fn try_estimate(
        &self,
        entry: &Entry,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<DateTime<Utc>>, MediaflowError> {
        let Some(series_name) = entry.series_name.as_deref() else {
            debug!(title = %entry.title, "No series name, cannot estimate");
            return Ok(None);
        };

        let outcome = self.client.search(series_name, cancel).await?;
        if let Completion::Cancelled { reason } = &outcome.completion {
            debug!(series = %series_name, reason = %reason, "Release estimate cancelled");
            return Ok(None);
        }
        let candidates = outcome.into_items();
        let Some(id) = self.resolver.resolve(series_name, &candidates) else {
            debug!(series = %series_name, candidates = candidates.len(), "No AniList match");
            return Ok(None);
        };
        let Some(id) = id.as_i64() else {
            debug!(series = %series_name, id = %id, "AniList id is not numeric");
            return Ok(None);
        };

        let Some(episode) = entry.series_episode else {
            return Ok(None);
        };
        let Some(schedule) = self.client.airing_schedule(id, cancel).await? else {
            return Ok(None);
        };
        let Some(airs_at) = first_airing(&schedule, episode) else {
            debug!(series = %series_name, episode, "Episode not on airing schedule");
            return Ok(None);
        };

        if airs_at > Utc::now() {
            info!(series = %series_name, episode, "{} episode {} airs on {}", series_name, episode, airs_at);
        }
        Ok(Some(airs_at))
    }

    /// Estimates many entries, at most `concurrency` at a time.
    ///
    /// Results are in the order of `entries`. Requests to AniList are still
    /// spaced by the transport's rate limiter. Once `cancel` fires, pending
    /// entries come back as `None` without further requests.
    pub async fn estimate_all(
        &self,
        entries: &[Entry],
        concurrency: usize,
        cancel: Option<&CancellationToken>,
    ) -> Vec<Option<DateTime<Utc>>> {
        stream::iter(entries)
            .map(|entry| self.estimate_or_log(entry, cancel))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn estimate_or_log(
        &self,
        entry: &Entry,
        cancel: Option<&CancellationToken>,
    ) -> Option<DateTime<Utc>> {
        match self.try_estimate(entry, cancel).await {
            Ok(estimate) => estimate,
            Err(error) => {
                warn!(
                    title = %entry.title,
                    series = ?entry.series_name,
                    error = %error,
                    "Release estimate failed"
                );
                None
            }
        }
    }
}

fn first_airing(schedule: &[AiringNode], episode: u32) -> Option<DateTime<Utc>> {
    schedule
        .iter()
        .find(|node| node.episode == episode)
        .and_then(AiringNode::airs_at)
}

#[async_trait]
impl EstimateRelease for ReleaseEstimator {
    fn name(&self) -> &str {
        "anilist"
    }

    async fn estimate(&self, entry: &Entry) -> Option<DateTime<Utc>> {
        self.estimate_or_log(entry, None).await
    }
}
