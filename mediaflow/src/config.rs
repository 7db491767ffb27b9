//! Configuration types for fetching, pagination, resolution and throttling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::{ConfigError, MediaflowError};

/// Configuration for HTTP fetching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers to include on every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    concat!("mediaflow/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Configuration for paginated retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Hard cap on pages fetched per operation.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Page-size hint sent to sources that accept one.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_max_pages() -> u32 {
    100
}

fn default_per_page() -> u32 {
    50
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationConfig {
    /// Sets the page cap.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the page-size hint.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }
}

/// Configuration for title resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Minimum similarity accepted as a match.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.9
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// Per-domain minimum request spacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Interval for domains without an explicit entry, in milliseconds.
    #[serde(default)]
    pub default_interval_ms: u64,
    /// Domain to interval in milliseconds.
    #[serde(default = "default_domain_intervals")]
    pub domains: HashMap<String, u64>,
}

fn default_domain_intervals() -> HashMap<String, u64> {
    [("graphql.anilist.co".to_string(), 2000)].into_iter().collect()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 0,
            domains: default_domain_intervals(),
        }
    }
}

impl RateLimitConfig {
    /// Sets the interval for a domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>, interval: Duration) -> Self {
        self.domains
            .insert(domain.into(), u64::try_from(interval.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Interval for unconfigured domains.
    #[must_use]
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }

    /// Configured intervals as durations.
    pub fn intervals(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.domains
            .iter()
            .map(|(domain, ms)| (domain.as_str(), Duration::from_millis(*ms)))
    }
}

/// Combined configuration for mediaflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaflowConfig {
    /// Fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Pagination configuration.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Resolver configuration.
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Rate limit configuration.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
}

impl MediaflowConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `MediaflowError::Serialization` for malformed JSON and
    /// `MediaflowError::Config` when validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, MediaflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `MediaflowError::Io` if the file cannot be read, otherwise as
    /// [`MediaflowConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MediaflowError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.resolver.threshold) {
            return Err(ConfigError::InvalidThreshold(self.resolver.threshold));
        }
        if self.pagination.max_pages == 0 {
            return Err(ConfigError::InvalidMaxPages(0));
        }
        if !self.fetch.timeout_seconds.is_finite() || self.fetch.timeout_seconds <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "timeout_seconds must be positive, got {}",
                self.fetch.timeout_seconds
            )));
        }
        Ok(())
    }

    /// Sets the fetch configuration.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Sets the pagination configuration.
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Sets the match threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.resolver.threshold = threshold;
        self
    }

    /// Sets the rate limit configuration.
    #[must_use]
    pub fn with_rate_limits(mut self, rate_limits: RateLimitConfig) -> Self {
        self.rate_limits = rate_limits;
        self
    }
}
