//! The paged retrieval loop.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{Completion, Continuation, FetchOutcome, PageCursor, PageKey, ResultPage};
use super::observer::{NoOpPageObserver, PageObserver};
use crate::cancellation::CancellationToken;
use crate::config::PaginationConfig;
use crate::errors::{MediaflowError, SourceError};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// The first request of a paginated read and where its page index lives.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// The request for page 1.
    pub request: HttpRequest,
    /// Where [`Continuation::NextPage`] writes the page number.
    pub page_key: Option<PageKey>,
    /// Page-size hint applied to the first request.
    pub page_size: Option<(PageKey, u32)>,
}

impl PageRequest {
    /// Wraps the first-page request.
    #[must_use]
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            page_key: None,
            page_size: None,
        }
    }

    /// Sets the page key.
    #[must_use]
    pub fn with_page_key(mut self, key: PageKey) -> Self {
        self.page_key = Some(key);
        self
    }

    /// Sets the page-size hint.
    #[must_use]
    pub fn with_page_size(mut self, key: PageKey, size: u32) -> Self {
        self.page_size = Some((key, size));
        self
    }
}

/// Fetches every page of a source through one parser.
///
/// Failure handling is asymmetric:
/// - a transport failure on the first page is an error;
/// - a transport failure on a later page ends the read with the items
///   gathered so far and [`Completion::ContinuationFailed`];
/// - an HTTP status of 400 or above, or a page the parser rejects, is a
///   [`SourceError`] on any page.
#[derive(Clone)]
pub struct PaginatedFetcher {
    transport: Arc<dyn Transport>,
    max_pages: u32,
    request_timeout: Option<Duration>,
    observer: Arc<dyn PageObserver>,
}

impl std::fmt::Debug for PaginatedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedFetcher")
            .field("max_pages", &self.max_pages)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl PaginatedFetcher {
    /// Default page cap.
    pub const DEFAULT_MAX_PAGES: u32 = 100;

    /// Creates a fetcher with the default page cap.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_pages: Self::DEFAULT_MAX_PAGES,
            request_timeout: None,
            observer: Arc::new(NoOpPageObserver),
        }
    }

    /// Creates a fetcher from configuration.
    #[must_use]
    pub fn from_config(transport: Arc<dyn Transport>, config: &PaginationConfig) -> Self {
        Self::new(transport).with_max_pages(config.max_pages)
    }

    /// Sets the page cap. Zero is treated as one.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Sets a timeout for requests that do not carry their own.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The page cap.
    #[must_use]
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Timeout given to requests that do not carry their own.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Fetches pages until the source is exhausted, the cap is hit, a later
    /// page fails in transport, or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `MediaflowError::Transport` if the first page cannot be
    /// fetched, and `MediaflowError::Source` for an error status, a rejected
    /// page, or a continuation that does not advance.
    pub async fn fetch_all<T, P>(
        &self,
        request: PageRequest,
        parser: P,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchOutcome<T>, MediaflowError>
    where
        T: Send,
        P: Fn(&HttpResponse) -> Result<ResultPage<T>, SourceError> + Send + Sync,
    {
        let PageRequest {
            request: mut current,
            page_key,
            page_size,
        } = request;

        if let Some((key, size)) = &page_size {
            key.apply(&mut current, *size);
        }
        if current.timeout.is_none() {
            current.timeout = self.request_timeout;
        }

        let mut cursor = PageCursor::default();
        let mut items: Vec<T> = Vec::new();
        let mut pages_fetched = 0u32;
        let mut followed: HashSet<String> = HashSet::from([current.url.clone()]);

        while cursor.has_next {
            let page = cursor.current_page;
            let url = current.url.clone();
            let request_id = Uuid::new_v4().to_string();

            self.observer.on_page_start(&url, page, &request_id);
            let start = Instant::now();

            let sent = match cancel {
                None => Some(self.transport.send(current.clone()).await),
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => None,
                        result = self.transport.send(current.clone()) => Some(result),
                    }
                }
            };

            let Some(result) = sent else {
                let reason = cancel.and_then(CancellationToken::reason).unwrap_or_default();
                info!(url = %url, page, items = items.len(), reason = %reason, "Paginated fetch cancelled");
                return Ok(FetchOutcome {
                    items,
                    pages_fetched,
                    completion: Completion::Cancelled { reason },
                });
            };

            let response = match result {
                Ok(response) => response,
                Err(error) => {
                    self.observer.on_page_error(&url, page, &request_id, &error.to_string());
                    if pages_fetched == 0 {
                        return Err(error.into());
                    }
                    warn!(
                        url = %url,
                        page,
                        items = items.len(),
                        error = %error,
                        "Continuation page failed, returning partial results"
                    );
                    return Ok(FetchOutcome {
                        items,
                        pages_fetched,
                        completion: Completion::ContinuationFailed {
                            page,
                            reason: error.to_string(),
                        },
                    });
                }
            };

            if response.is_error_status() {
                let reason = if response.status == 429 {
                    "rate limited by source".to_string()
                } else {
                    format!("unexpected status {}", response.status)
                };
                let error = SourceError::status(&url, response.status, reason)
                    .with_partial_count(items.len());
                self.observer.on_page_error(&url, page, &request_id, &error.to_string());
                return Err(error.into());
            }

            let parsed = match parser(&response) {
                Ok(parsed) => parsed,
                Err(mut error) => {
                    if error.url.is_empty() {
                        error.url.clone_from(&url);
                    }
                    let error = error.with_partial_count(items.len());
                    self.observer.on_page_error(&url, page, &request_id, &error.to_string());
                    return Err(error.into());
                }
            };

            pages_fetched += 1;
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
            self.observer
                .on_page_complete(&url, page, &request_id, duration_ms, parsed.items.len());

            items.extend(parsed.items);
            cursor.record(&parsed.continuation, parsed.total_pages);

            let next_request = match parsed.continuation {
                Continuation::Exhausted => continue,
                Continuation::NextPage(next) => {
                    if next <= page {
                        return Err(SourceError::malformed(
                            &url,
                            format!("next page {next} does not advance past page {page}"),
                        )
                        .with_partial_count(items.len())
                        .into());
                    }
                    let Some(key) = &page_key else {
                        return Err(SourceError::malformed(
                            &url,
                            "source returned a page number but the request has no page key",
                        )
                        .with_partial_count(items.len())
                        .into());
                    };
                    let mut next_request = current.clone();
                    key.apply(&mut next_request, next);
                    cursor.current_page = next;
                    next_request
                }
                Continuation::NextUrl(next_url) => {
                    if !followed.insert(next_url.clone()) {
                        return Err(SourceError::malformed(
                            &url,
                            format!("next link {next_url} was already fetched"),
                        )
                        .with_partial_count(items.len())
                        .into());
                    }
                    if cursor.advance().is_none() {
                        return Err(SourceError::malformed(&url, "page number overflow")
                            .with_partial_count(items.len())
                            .into());
                    }
                    current.follow(next_url)
                }
            };

            if pages_fetched >= self.max_pages {
                warn!(
                    url = %url,
                    limit = self.max_pages,
                    total_pages = ?cursor.total_pages,
                    items = items.len(),
                    "Page limit reached, more results may exist"
                );
                return Ok(FetchOutcome {
                    items,
                    pages_fetched,
                    completion: Completion::PageLimitReached {
                        limit: self.max_pages,
                    },
                });
            }

            current = next_request;
        }

        debug!(
            url = %current.url,
            pages = pages_fetched,
            total_pages = ?cursor.total_pages,
            items = items.len(),
            "Source exhausted"
        );
        Ok(FetchOutcome {
            items,
            pages_fetched,
            completion: Completion::Exhausted,
        })
    }
}
