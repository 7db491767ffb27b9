//! # Mediaflow
//!
//! Title resolution and paginated source ingestion for media automation.
//!
//! Mediaflow provides the building blocks for pulling media entries from
//! external catalogs:
//!
//! - **Title resolution**: fuzzy-match a series name against catalog search
//!   results with a longest-matching-block similarity ratio
//! - **Paginated fetching**: one iterative loop for JSON and HTML sources,
//!   with a hard page cap and partial results on continuation failures
//! - **Rate-limited transport**: per-domain request spacing through an
//!   explicit, shareable registry
//! - **Cancellation**: cooperative cancellation of in-flight reads
//!
//! With the `sources` feature, AniList (search, airing schedules, release
//! estimation) and AniDB (wishlists) are built on these primitives.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mediaflow::prelude::*;
//!
//! let config = MediaflowConfig::default();
//! let registry = RateLimiterRegistry::from_config(&config.rate_limits);
//! let client = AniListClient::connect(&config, registry)?;
//!
//! let candidates = client.search("Attack on Titan", None).await?.into_items();
//! let id = TitleResolver::default().resolve("Attack on Titan", &candidates);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod entry;
pub mod errors;
pub mod matching;
pub mod observability;
pub mod pagination;
pub mod ratelimit;
pub mod resolver;
pub mod testing;
pub mod transport;

#[cfg(feature = "sources")]
pub mod estimator;
#[cfg(feature = "sources")]
pub mod sources;

/// Result type alias for mediaflow operations.
pub type Result<T> = std::result::Result<T, errors::MediaflowError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{
        FetchConfig, MediaflowConfig, PaginationConfig, RateLimitConfig, ResolverConfig,
    };
    pub use crate::entry::Entry;
    pub use crate::errors::{
        ConfigError, MediaflowError, SourceError, TransportError, TransportErrorKind,
    };
    pub use crate::matching::sequence_ratio;
    pub use crate::pagination::{
        Completion, Continuation, FetchOutcome, PageKey, PageRequest, PaginatedFetcher, ResultPage,
    };
    pub use crate::ratelimit::{RateLimitedTransport, RateLimiterRegistry};
    pub use crate::resolver::{ExternalId, SearchCandidate, TitleResolver};
    pub use crate::transport::{HttpRequest, HttpResponse, Transport};

    #[cfg(feature = "sources")]
    pub use crate::estimator::{EstimateRelease, ReleaseEstimator};
    #[cfg(feature = "sources")]
    pub use crate::sources::{AniListClient, AnidbWishlist, WishlistConfig};
    #[cfg(feature = "sources")]
    pub use crate::transport::ReqwestTransport;
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_resolve_exact_title() {
        let candidates = vec![SearchCandidate::new(1).with_title("x", "Attack on Titan")];
        let resolver = TitleResolver::default();
        assert_eq!(
            resolver.resolve("Attack on Titan", &candidates),
            Some(ExternalId::Int(1))
        );
        assert_eq!(sequence_ratio("Attack on Titan", "Attack on Titan"), 1.0);
    }
}
