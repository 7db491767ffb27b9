//! Per-domain request spacing state.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::config::RateLimitConfig;

/// Request spacing state for one domain.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    /// The domain this state throttles.
    pub domain: String,
    /// Minimum spacing between dispatches.
    pub min_interval: Duration,
    /// Most recent reserved dispatch time; never decreases.
    pub last_request_at: Option<Instant>,
}

impl RateLimitState {
    fn new(domain: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            domain: domain.into(),
            min_interval,
            last_request_at: None,
        }
    }

    /// Reserves the next dispatch slot at or after `now`.
    fn reserve(&mut self, now: Instant) -> Instant {
        let slot = match self.last_request_at {
            Some(last) => now.max(last + self.min_interval),
            None => now,
        };
        self.last_request_at = Some(slot);
        slot
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    default_interval: Duration,
    intervals: DashMap<String, Duration>,
    states: DashMap<String, Arc<Mutex<RateLimitState>>>,
}

/// Shared handle to per-domain rate limit state.
///
/// Clones share state. Separately constructed registries never do.
#[derive(Debug, Clone, Default)]
pub struct RateLimiterRegistry {
    inner: Arc<RegistryInner>,
}

impl RateLimiterRegistry {
    /// Creates a registry where unconfigured domains use `default_interval`.
    #[must_use]
    pub fn new(default_interval: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                default_interval,
                ..Default::default()
            }),
        }
    }

    /// Creates a registry from configuration.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let registry = Self::new(config.default_interval());
        for (domain, interval) in config.intervals() {
            registry.set_interval(domain, interval);
        }
        registry
    }

    /// Sets the interval for a domain.
    #[must_use]
    pub fn with_interval(self, domain: &str, interval: Duration) -> Self {
        self.set_interval(domain, interval);
        self
    }

    /// Sets the interval for a domain, updating live state if present.
    pub fn set_interval(&self, domain: &str, interval: Duration) {
        let key = normalize(domain);
        if let Some(state) = self.inner.states.get(&key) {
            state.lock().min_interval = interval;
        }
        self.inner.intervals.insert(key, interval);
    }

    /// Interval applied to a domain.
    #[must_use]
    pub fn interval_for(&self, domain: &str) -> Duration {
        self.inner
            .intervals
            .get(&normalize(domain))
            .map_or(self.inner.default_interval, |entry| *entry.value())
    }

    /// Returns the state for a domain, creating it on first use.
    #[must_use]
    pub fn state(&self, domain: &str) -> Arc<Mutex<RateLimitState>> {
        let key = normalize(domain);
        if let Some(state) = self.inner.states.get(&key) {
            return Arc::clone(state.value());
        }
        let interval = self.interval_for(&key);
        Arc::clone(
            self.inner
                .states
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(RateLimitState::new(key, interval))))
                .value(),
        )
    }

    /// Reserves the next dispatch slot for a domain.
    ///
    /// The lock is held only to compute and store the slot.
    #[must_use]
    pub fn reserve(&self, domain: &str) -> Instant {
        let state = self.state(domain);
        let now = Instant::now();
        let slot = state.lock().reserve(now);
        trace!(domain, wait_ms = slot.saturating_duration_since(now).as_millis() as u64, "Reserved dispatch slot");
        slot
    }

    /// Most recent reserved dispatch time for a domain.
    #[must_use]
    pub fn last_request_at(&self, domain: &str) -> Option<Instant> {
        self.inner
            .states
            .get(&normalize(domain))
            .and_then(|state| {
                let last = state.lock().last_request_at;
                last
            })
    }

    /// Number of domains with live state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.states.len()
    }

    /// Whether no domain has been used yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.states.is_empty()
    }
}

fn normalize(domain: &str) -> String {
    domain.to_ascii_lowercase()
}
