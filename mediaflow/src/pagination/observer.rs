//! Observability callbacks for paginated reads.

use tracing::{debug, error, info, trace, warn, Level};

/// Observability callbacks for page fetches.
pub trait PageObserver: Send + Sync {
    /// Called before a page is requested.
    fn on_page_start(&self, url: &str, page: u32, request_id: &str);

    /// Called after a page is parsed.
    fn on_page_complete(&self, url: &str, page: u32, request_id: &str, duration_ms: f64, items: usize);

    /// Called when a page fails.
    fn on_page_error(&self, url: &str, page: u32, request_id: &str, error: &str);
}

/// No-op implementation of PageObserver.
#[derive(Debug, Clone, Default)]
pub struct NoOpPageObserver;

impl PageObserver for NoOpPageObserver {
    fn on_page_start(&self, _url: &str, _page: u32, _request_id: &str) {}
    fn on_page_complete(&self, _url: &str, _page: u32, _request_id: &str, _duration_ms: f64, _items: usize) {}
    fn on_page_error(&self, _url: &str, _page: u32, _request_id: &str, _error: &str) {}
}

/// Emits a tracing event at a runtime-selected level.
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::ERROR => error!($($arg)+),
            Level::WARN => warn!($($arg)+),
            Level::INFO => info!($($arg)+),
            Level::DEBUG => debug!($($arg)+),
            _ => trace!($($arg)+),
        }
    };
}

/// An observer that writes page events to tracing.
///
/// Page starts and completions go out at the configured level; page
/// failures are always warnings.
#[derive(Debug, Clone)]
pub struct LoggingPageObserver {
    level: Level,
}

impl Default for LoggingPageObserver {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingPageObserver {
    /// Creates a logging observer with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates an info-level logging observer.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    /// The level of start and completion events.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }
}

impl PageObserver for LoggingPageObserver {
    fn on_page_start(&self, url: &str, page: u32, request_id: &str) {
        event_at!(self.level, url = %url, page, request_id = %request_id, "Fetching page {}", page);
    }

    fn on_page_complete(&self, url: &str, page: u32, request_id: &str, duration_ms: f64, items: usize) {
        event_at!(
            self.level,
            url = %url,
            page,
            request_id = %request_id,
            duration_ms,
            items,
            "Page {} parsed",
            page
        );
    }

    fn on_page_error(&self, url: &str, page: u32, request_id: &str, error: &str) {
        warn!(url = %url, page, request_id = %request_id, error = %error, "Page {} failed", page);
    }
}
