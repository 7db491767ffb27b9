//! AniDB wishlist source.
//!
//! Builds the wishlist query from a typed [`WishlistConfig`], scrapes each
//! page of the wishlist table, and follows the "next" link until the list
//! ends.

mod config;
mod parser;

use std::sync::Arc;
use tracing::{debug, info};

pub use config::{
    build_query, validate_user_id, AdultMode, AiringMode, BuddyMode, MediaType, MylistFilter,
    MylistOptions, MylistState, MylistStatus, OneOrMore, VoteMode, WatchedState, WishlistConfig,
    WishlistMode,
};
pub use parser::{strip_trailing_year, WishlistEntry, WishlistParser};

use crate::cancellation::CancellationToken;
use crate::config::MediaflowConfig;
use crate::errors::{ConfigError, MediaflowError};
use crate::pagination::{FetchOutcome, PageRequest, PaginatedFetcher};
use crate::ratelimit::{RateLimitedTransport, RateLimiterRegistry};
use crate::transport::{HttpRequest, ReqwestTransport, Transport};

/// Base for wishlist pages and the links they contain.
pub const ANIDB_URL: &str = "http://anidb.net/perl-bin/";

/// Script serving the wishlist.
pub const ANIDB_SCRIPT: &str = "animedb.pl";

/// AniDB rejects non-browser agents on HTML pages.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebkit/537.36 \
(KHTML, like Gecko) Chrome/69.0.3497.100 Safari/537.36";

/// Reads an AniDB wishlist.
#[derive(Debug, Clone)]
pub struct AnidbWishlist {
    fetcher: PaginatedFetcher,
    base_url: String,
}

impl AnidbWishlist {
    /// Creates a reader that sends through `fetcher`.
    #[must_use]
    pub fn new(fetcher: PaginatedFetcher) -> Self {
        Self {
            fetcher,
            base_url: ANIDB_URL.to_string(),
        }
    }

    /// Creates a reader over `transport` using configured limits.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, config: &MediaflowConfig) -> Self {
        let fetcher = PaginatedFetcher::from_config(transport, &config.pagination)
            .with_request_timeout(config.fetch.timeout());
        Self::new(fetcher)
    }

    /// Creates a rate-limited HTTP reader sharing `registry`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the HTTP client cannot be built.
    pub fn connect(config: &MediaflowConfig, registry: RateLimiterRegistry) -> Result<Self, ConfigError> {
        let http = ReqwestTransport::new(config.fetch.clone())?;
        let transport: Arc<dyn Transport> = Arc::new(RateLimitedTransport::new(http, registry));
        Ok(Self::with_transport(transport, config))
    }

    /// Sets the base URL; it must end with `/`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The first-page request for a wishlist.
    #[must_use]
    pub fn request(&self, config: &WishlistConfig) -> HttpRequest {
        let mut request = HttpRequest::get(format!("{}{ANIDB_SCRIPT}", self.base_url))
            .with_header("User-Agent", BROWSER_USER_AGENT);
        request.query = build_query(config);
        request
    }

    /// Reads every page of the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `MediaflowError::Config` for a bad base URL, otherwise as
    /// [`PaginatedFetcher::fetch_all`]. A private or missing list is a
    /// `MediaflowError::Source`.
    pub async fn entries(
        &self,
        config: &WishlistConfig,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchOutcome<WishlistEntry>, MediaflowError> {
        info!(user_id = %config.user_id, "Retrieving AniDB wishlist");
        let parser = WishlistParser::new(&self.base_url, config.strip_dates)?;
        let request = self.request(config);
        debug!(url = %request.url, query = ?request.query, "Requesting wishlist");

        let outcome = self
            .fetcher
            .fetch_all(PageRequest::new(request), |response| parser.parse(response), cancel)
            .await?;
        info!(
            user_id = %config.user_id,
            entries = outcome.items.len(),
            pages = outcome.pages_fetched,
            "Retrieved AniDB wishlist"
        );
        Ok(outcome)
    }
}
