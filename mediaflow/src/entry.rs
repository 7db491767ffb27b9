//! Normalized records produced by sources and consumed by estimators.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A host record describing one item (episode, series, wishlist entry).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Display title.
    pub title: String,
    /// Link to the item, if any.
    pub url: Option<String>,
    /// Series the item belongs to.
    pub series_name: Option<String>,
    /// Episode number within the series.
    pub series_episode: Option<u32>,
    /// Source-specific fields.
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl Entry {
    /// Creates an entry with a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the series name and episode.
    #[must_use]
    pub fn with_series(mut self, name: impl Into<String>, episode: Option<u32>) -> Self {
        self.series_name = Some(name.into());
        self.series_episode = episode;
        self
    }

    /// Sets a source-specific field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Gets a source-specific field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}
