//! Title resolution against catalog search results.
//!
//! This module provides:
//! - Data models for search candidates and scores
//! - [`TitleResolver`], which maps a free-text query to an [`ExternalId`]

mod models;
mod title;

pub use models::{ExternalId, ScoredCandidate, SearchCandidate, TitleVariant};
pub use title::TitleResolver;
