//! HTTP transport abstraction.
//!
//! A [`Transport`] turns an [`HttpRequest`] into an [`HttpResponse`]. Only
//! failures below the HTTP layer are errors; a 4xx or 5xx response is returned
//! as-is and classified by the caller.

mod request;

#[cfg(feature = "sources")]
mod http;

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::TransportError;

pub use request::{HttpMethod, HttpRequest, HttpResponse};

#[cfg(feature = "sources")]
pub use http::ReqwestTransport;

/// Protocol for sending HTTP requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response, whatever its status.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// Extracts the lowercase host of a URL, without port or credentials.
#[must_use]
pub fn extract_domain(url: &str) -> Option<String> {
    let start = url.find("://").map(|i| i + 3)?;
    let rest = &url[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = match host.rfind(':') {
        Some(colon) if !host.ends_with(']') => &host[..colon],
        _ => host,
    };
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://graphql.anilist.co"),
            Some("graphql.anilist.co".to_string())
        );
        assert_eq!(
            extract_domain("http://anidb.net/perl-bin/animedb.pl?show=mywishlist"),
            Some("anidb.net".to_string())
        );
        assert_eq!(
            extract_domain("http://user:pw@Example.COM:8080/x"),
            Some("example.com".to_string())
        );
        assert_eq!(extract_domain("https://[::1]/x"), Some("[::1]".to_string()));
        assert_eq!(extract_domain("not a url"), None);
        assert_eq!(extract_domain("https:///path"), None);
    }

    #[tokio::test]
    async fn test_mock_transport_through_arc() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .withf(|request| request.url == "https://example.com/ok")
            .times(1)
            .returning(|request| Ok(HttpResponse::new(200, "fine").with_url(request.url)));
        mock.expect_send()
            .withf(|request| request.url == "https://example.com/down")
            .returning(|request| Err(TransportError::connect(request.url, "refused")));

        let transport: Arc<dyn Transport> = Arc::new(mock);

        let response = assert_ok!(transport.send(HttpRequest::get("https://example.com/ok")).await);
        assert_eq!(response.text, "fine");

        let error = assert_err!(transport.send(HttpRequest::get("https://example.com/down")).await);
        assert_eq!(error.kind, crate::errors::TransportErrorKind::Connect);
    }
}
