//! Data models for catalog search results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an entry in an external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    /// Numeric identifier (e.g. AniList media id).
    Int(i64),
    /// Opaque string identifier.
    Text(String),
}

impl ExternalId {
    /// Returns the numeric form, if this id is numeric or a numeric string.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Text(text) => text.parse().ok(),
        }
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for ExternalId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for ExternalId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for ExternalId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// One localized title of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleVariant {
    /// Variant label (e.g. "romaji", "english").
    pub label: String,
    /// Title text; sources may leave a variant empty.
    pub text: Option<String>,
}

impl TitleVariant {
    /// Returns the text when it is present and non-empty.
    #[must_use]
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }
}

/// A catalog entry returned by an external search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Identifier, stable across result pages.
    pub external_id: ExternalId,
    /// Title variants in source order.
    #[serde(default)]
    pub titles: Vec<TitleVariant>,
}

impl SearchCandidate {
    /// Creates a candidate with no titles.
    #[must_use]
    pub fn new(external_id: impl Into<ExternalId>) -> Self {
        Self {
            external_id: external_id.into(),
            titles: Vec::new(),
        }
    }

    /// Adds a title variant.
    #[must_use]
    pub fn with_title(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.titles.push(TitleVariant {
            label: label.into(),
            text: Some(text.into()),
        });
        self
    }

    /// Adds a variant that the source left empty.
    #[must_use]
    pub fn with_missing_title(mut self, label: impl Into<String>) -> Self {
        self.titles.push(TitleVariant {
            label: label.into(),
            text: None,
        });
        self
    }

    /// Iterates over the non-empty title texts.
    pub fn title_texts(&self) -> impl Iterator<Item = &str> {
        self.titles.iter().filter_map(TitleVariant::non_empty_text)
    }
}

/// A candidate title scored against a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Identifier of the scored candidate.
    pub external_id: ExternalId,
    /// Similarity in `[0, 1]`.
    pub score: f64,
    /// The title variant that produced the score.
    pub matched_text: String,
}
