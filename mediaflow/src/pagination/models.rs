//! Page descriptors and fetch outcomes.

use serde::{Deserialize, Serialize};

use crate::transport::HttpRequest;

/// Where a source reads the page index from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum PageKey {
    /// A query parameter, e.g. `?page=2`.
    Query(String),
    /// A field of the GraphQL `variables` object.
    JsonVariable(String),
}

impl PageKey {
    /// Writes a numeric value under this key.
    pub fn apply(&self, request: &mut HttpRequest, value: u32) {
        match self {
            Self::Query(name) => request.set_query_param(name, value.to_string()),
            Self::JsonVariable(name) => request.set_json_variable(name, serde_json::json!(value)),
        }
    }
}

/// How to reach the page after the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Continuation {
    /// No further pages.
    Exhausted,
    /// Request this page number through the page key.
    NextPage(u32),
    /// Follow this absolute URL with a GET.
    NextUrl(String),
}

/// One parsed page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage<T> {
    /// Items on this page, in source order.
    pub items: Vec<T>,
    /// How to reach the next page.
    pub continuation: Continuation,
    /// Total page count, when the source reports one.
    pub total_pages: Option<u32>,
}

impl<T> ResultPage<T> {
    /// A final page.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            continuation: Continuation::Exhausted,
            total_pages: None,
        }
    }

    /// A page followed by page number `next`.
    #[must_use]
    pub fn next_page(items: Vec<T>, next: u32) -> Self {
        Self {
            items,
            continuation: Continuation::NextPage(next),
            total_pages: None,
        }
    }

    /// A page followed by the page at `url`.
    #[must_use]
    pub fn next_url(items: Vec<T>, url: impl Into<String>) -> Self {
        Self {
            items,
            continuation: Continuation::NextUrl(url.into()),
            total_pages: None,
        }
    }

    /// Sets the reported total page count.
    #[must_use]
    pub fn with_total_pages(mut self, total: u32) -> Self {
        self.total_pages = Some(total);
        self
    }
}

/// Position of an in-progress paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Page being fetched, starting at 1.
    pub current_page: u32,
    /// Whether the last parsed page pointed to another one.
    pub has_next: bool,
    /// Total page count, when known.
    pub total_pages: Option<u32>,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            current_page: 1,
            has_next: true,
            total_pages: None,
        }
    }
}

impl PageCursor {
    /// Moves to the next page. Returns `None`, leaving the cursor in place,
    /// when the page number cannot grow.
    pub fn advance(&mut self) -> Option<u32> {
        self.current_page = self.current_page.checked_add(1)?;
        Some(self.current_page)
    }

    /// Takes in what a parsed page says about the rest of the read.
    ///
    /// A page without a total keeps the last known one.
    pub fn record(&mut self, continuation: &Continuation, total_pages: Option<u32>) {
        self.has_next = *continuation != Continuation::Exhausted;
        if total_pages.is_some() {
            self.total_pages = total_pages;
        }
    }
}

/// Why a paginated read stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Completion {
    /// The source reported no further pages.
    Exhausted,
    /// The page cap stopped the read; more pages may exist.
    PageLimitReached {
        /// The cap that was hit.
        limit: u32,
    },
    /// A page after the first failed below the HTTP layer.
    ContinuationFailed {
        /// The page that failed.
        page: u32,
        /// The transport failure.
        reason: String,
    },
    /// The caller cancelled the read.
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

/// Accumulated items of a paginated read and how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    /// Items of every fetched page, in page order.
    pub items: Vec<T>,
    /// Number of pages successfully parsed.
    pub pages_fetched: u32,
    /// Why the read stopped.
    pub completion: Completion,
}

impl<T> FetchOutcome<T> {
    /// Whether every available page was read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Exhausted
    }

    /// Whether the items are known to be a prefix of the full result.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(
            self.completion,
            Completion::ContinuationFailed { .. } | Completion::Cancelled { .. }
        )
    }

    /// Discards the completion and returns the items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
