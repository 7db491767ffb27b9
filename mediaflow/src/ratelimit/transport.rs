//! Transport wrapper that enforces per-domain spacing.

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use super::registry::RateLimiterRegistry;
use crate::cancellation::CancellationToken;
use crate::errors::{TransportError, TransportErrorKind};
use crate::transport::{extract_domain, HttpRequest, HttpResponse, Transport};

/// Result of a cancellable dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// The request was sent and a response received.
    Completed(HttpResponse),
    /// Cancellation fired before a response arrived.
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

/// Wraps a transport so that requests to one domain are spaced by at least
/// that domain's minimum interval.
///
/// Spacing is reserved before waiting, so concurrent callers queue up in
/// reservation order. A reservation is kept even if the request later fails
/// or is cancelled.
#[derive(Debug, Clone)]
pub struct RateLimitedTransport<T> {
    inner: T,
    registry: RateLimiterRegistry,
}

impl<T: Transport> RateLimitedTransport<T> {
    /// Wraps `inner` using the given registry.
    #[must_use]
    pub fn new(inner: T, registry: RateLimiterRegistry) -> Self {
        Self { inner, registry }
    }

    /// The shared registry.
    #[must_use]
    pub fn registry(&self) -> &RateLimiterRegistry {
        &self.registry
    }

    /// The wrapped transport.
    #[must_use]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Sends `request` once `domain` allows it.
    ///
    /// With a token, both the wait and the request race against
    /// cancellation; a cancelled dispatch is not an error.
    ///
    /// # Errors
    ///
    /// Returns the wrapped transport's error unchanged.
    pub async fn send_to(
        &self,
        domain: &str,
        request: HttpRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<Dispatched, TransportError> {
        let dispatch = self.dispatch(domain, request);
        match cancel {
            None => dispatch.await.map(Dispatched::Completed),
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!(domain, "Dispatch cancelled");
                        Ok(Dispatched::Cancelled {
                            reason: token.reason().unwrap_or_default(),
                        })
                    }
                    result = dispatch => result.map(Dispatched::Completed),
                }
            }
        }
    }

    /// Sends `request`, throttled by the host of its URL.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the URL has no host, otherwise as
    /// [`RateLimitedTransport::send_to`].
    pub async fn send_for_url(
        &self,
        request: HttpRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<Dispatched, TransportError> {
        let domain = extract_domain(&request.url).ok_or_else(|| {
            TransportError::new(&request.url, TransportErrorKind::Other, "URL has no host")
        })?;
        self.send_to(&domain, request, cancel).await
    }

    async fn dispatch(&self, domain: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let slot = self.registry.reserve(domain);
        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!(domain, wait_ms = wait.as_millis() as u64, "Rate limiting request");
            tokio::time::sleep_until(slot).await;
        }
        self.inner.send(request).await
    }
}

#[async_trait]
impl<T: Transport> Transport for RateLimitedTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let domain = extract_domain(&request.url).ok_or_else(|| {
            TransportError::new(&request.url, TransportErrorKind::Other, "URL has no host")
        })?;
        self.dispatch(&domain, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    /// Records the (paused) clock reading of every dispatch.
    #[derive(Default)]
    struct ClockTransport {
        sent: Mutex<Vec<(String, Instant)>>,
    }

    #[async_trait]
    impl Transport for ClockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.lock().push((request.url.clone(), Instant::now()));
            Ok(HttpResponse::new(200, "").with_url(request.url))
        }
    }

    fn limited(interval: Duration) -> RateLimitedTransport<Arc<ClockTransport>> {
        let registry = RateLimiterRegistry::new(Duration::ZERO)
            .with_interval("graphql.anilist.co", interval);
        RateLimitedTransport::new(Arc::new(ClockTransport::default()), registry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_domain_requests_are_spaced() {
        let transport = limited(Duration::from_secs(2));
        let start = Instant::now();

        let (a, b) = tokio::join!(
            transport.send(HttpRequest::get("https://graphql.anilist.co/a")),
            transport.send(HttpRequest::get("https://graphql.anilist.co/b")),
        );
        a.unwrap();
        b.unwrap();

        let sent = transport.inner().sent.lock().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, start);
        assert!(sent[1].1 - sent[0].1 >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_domain_is_not_delayed() {
        let transport = limited(Duration::from_secs(2));
        let start = Instant::now();

        let (a, b) = tokio::join!(
            transport.send(HttpRequest::get("https://graphql.anilist.co/a")),
            transport.send(HttpRequest::get("http://anidb.net/perl-bin/animedb.pl")),
        );
        a.unwrap();
        b.unwrap();

        let sent = transport.inner().sent.lock().clone();
        assert!(sent.iter().all(|(_, at)| *at == start));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait() {
        let transport = limited(Duration::from_secs(2));
        let token = CancellationToken::new();

        let first = transport
            .send_to("graphql.anilist.co", HttpRequest::get("https://graphql.anilist.co/1"), Some(&token))
            .await
            .unwrap();
        assert!(matches!(first, Dispatched::Completed(_)));

        let (second, ()) = tokio::join!(
            transport.send_to(
                "graphql.anilist.co",
                HttpRequest::get("https://graphql.anilist.co/2"),
                Some(&token),
            ),
            async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                token.cancel("shutdown");
            },
        );

        assert_eq!(
            second.unwrap(),
            Dispatched::Cancelled {
                reason: "shutdown".to_string()
            }
        );
        assert_eq!(transport.inner().sent.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_for_url_uses_host() {
        let transport = limited(Duration::from_secs(2));
        let _ = transport
            .send_for_url(HttpRequest::get("https://graphql.anilist.co/x"), None)
            .await
            .unwrap();
        assert!(transport
            .registry()
            .last_request_at("graphql.anilist.co")
            .is_some());

        let err = transport
            .send_for_url(HttpRequest::get("no-host"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Other);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_request_keeps_reservation() {
        let mut mock = crate::transport::MockTransport::new();
        mock.expect_send()
            .times(2)
            .returning(|request| Err(TransportError::timeout(request.url, "slow")));
        let registry = RateLimiterRegistry::new(Duration::from_secs(3));
        let transport = RateLimitedTransport::new(mock, registry);

        let start = Instant::now();
        assert!(transport.send(HttpRequest::get("https://x.example/1")).await.is_err());
        assert!(transport.send(HttpRequest::get("https://x.example/2")).await.is_err());
        assert!(Instant::now() - start >= Duration::from_secs(3));
    }
}
