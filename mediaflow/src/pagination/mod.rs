//! Paged retrieval from external sources.
//!
//! [`PaginatedFetcher::fetch_all`] drives a single iterative loop over a
//! source, accumulating the items that a caller-supplied parser extracts
//! from each page. Sources differ only in their parser and in where the
//! page index lives ([`PageKey`]), or in following a next link
//! ([`Continuation::NextUrl`]).

mod fetcher;
mod integration_tests;
mod models;
mod observer;

pub use fetcher::{PageRequest, PaginatedFetcher};
pub use models::{Completion, Continuation, FetchOutcome, PageCursor, PageKey, ResultPage};
pub use observer::{LoggingPageObserver, NoOpPageObserver, PageObserver};
