//! End-to-end tests for the paged retrieval loop.

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    use crate::cancellation::CancellationToken;
    use crate::errors::{MediaflowError, SourceError, TransportError};
    use crate::pagination::{
        Completion, FetchOutcome, PageKey, PageObserver, PageRequest, PaginatedFetcher, ResultPage,
    };
    use crate::ratelimit::{RateLimitedTransport, RateLimiterRegistry};
    use crate::testing::ScriptedTransport;
    use crate::transport::{HttpRequest, HttpResponse};

    /// `{"items": [..], "page": n, "has_next": bool}`
    fn numbered(response: &HttpResponse) -> Result<ResultPage<String>, SourceError> {
        let value: serde_json::Value = response
            .json()
            .map_err(|e| SourceError::malformed(&response.final_url, e.to_string()))?;
        let items = value["items"]
            .as_array()
            .ok_or_else(|| SourceError::malformed(&response.final_url, "missing items"))?
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        let page = value["page"].as_u64().unwrap_or(1) as u32;
        if value["has_next"].as_bool().unwrap_or(false) {
            Ok(ResultPage::next_page(items, page + 1))
        } else {
            Ok(ResultPage::last(items))
        }
    }

    fn page(n: u32, items: &[&str], has_next: bool) -> serde_json::Value {
        json!({ "items": items, "page": n, "has_next": has_next })
    }

    fn listing() -> PageRequest {
        PageRequest::new(HttpRequest::get("https://catalog.example/search").with_query("q", "monster"))
            .with_page_key(PageKey::Query("page".to_string()))
    }

    async fn run(transport: &Arc<ScriptedTransport>) -> Result<FetchOutcome<String>, MediaflowError> {
        PaginatedFetcher::new(transport.clone())
            .fetch_all(listing(), numbered, None)
            .await
    }

    #[tokio::test]
    async fn test_pages_concatenate_in_order() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(page(1, &["a", "b"], true));
        transport.push_json(page(2, &["c"], true));
        transport.push_json(page(3, &["d", "e"], false));

        let outcome = assert_ok!(run(&transport).await);
        assert_eq!(outcome.items, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.completion, Completion::Exhausted);

        let pages: Vec<Option<String>> = transport
            .requests()
            .iter()
            .map(|r| r.query_param("page").map(String::from))
            .collect();
        assert_eq!(pages, vec![None, Some("2".to_string()), Some("3".to_string())]);
        assert!(transport.requests().iter().all(|r| r.query_param("q") == Some("monster")));
    }

    #[tokio::test]
    async fn test_first_page_transport_error_is_fatal() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_error(TransportError::connect("https://catalog.example/search", "refused"));

        let err = assert_err!(run(&transport).await);
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_continuation_transport_error_keeps_earlier_pages() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(page(1, &["a", "b"], true));
        transport.push_error(TransportError::timeout("https://catalog.example/search", "timed out"));
        transport.push_json(page(3, &["never"], false));

        let outcome = assert_ok!(run(&transport).await);
        assert_eq!(outcome.items, vec!["a", "b"]);
        assert_eq!(outcome.pages_fetched, 1);
        assert!(outcome.is_partial());
        assert!(matches!(
            outcome.completion,
            Completion::ContinuationFailed { page: 2, .. }
        ));
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_source_error_on_any_page() {
        for status in [500u16, 429, 404] {
            let transport = Arc::new(ScriptedTransport::new());
            transport.push_json(page(1, &["a"], true));
            transport.push_text(status, "nope");

            let err = assert_err!(run(&transport).await);
            match err {
                MediaflowError::Source(source) => {
                    assert_eq!(source.status, Some(status));
                    assert_eq!(source.partial_count, 1);
                    assert_eq!(source.is_rate_limited(), status == 429);
                }
                other => panic!("expected source error, got {other:?}"),
            }
        }

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_text(503, "down");
        let err = assert_err!(run(&transport).await);
        assert!(err.is_source());
    }

    #[tokio::test]
    async fn test_malformed_page_is_source_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(page(1, &["a"], true));
        transport.push_json(json!({ "unexpected": true }));

        let err = assert_err!(run(&transport).await);
        match err {
            MediaflowError::Source(source) => {
                assert_eq!(source.reason, "missing items");
                assert_eq!(source.partial_count, 1);
            }
            other => panic!("expected source error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_page_limit_stops_early() {
        let transport = Arc::new(ScriptedTransport::new());
        for n in 1..=5 {
            transport.push_json(page(n, &["x"], true));
        }

        let outcome = assert_ok!(
            PaginatedFetcher::new(transport.clone())
                .with_max_pages(3)
                .fetch_all(listing(), numbered, None)
                .await
        );
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.completion, Completion::PageLimitReached { limit: 3 });
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_default_cap_is_one_hundred_pages() {
        let transport = Arc::new(ScriptedTransport::new());
        for n in 1..=105 {
            transport.push_json(page(n, &["x"], true));
        }

        let outcome = assert_ok!(run(&transport).await);
        assert_eq!(outcome.pages_fetched, 100);
        assert_eq!(outcome.completion, Completion::PageLimitReached { limit: 100 });
    }

    #[tokio::test]
    async fn test_non_advancing_page_is_source_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(page(1, &["a"], true));
        // Claims to be page 1 again, so the next page would be 2 once more.
        transport.push_json(page(1, &["b"], true));

        let err = assert_err!(run(&transport).await);
        assert!(err.is_source());
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_next_url_is_followed_and_loops_rejected() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_text(200, "https://catalog.example/list?page=2");
        transport.push_text(200, "https://catalog.example/list?page=3");
        transport.push_text(200, "https://catalog.example/list?page=2");

        let by_link = |response: &HttpResponse| -> Result<ResultPage<String>, SourceError> {
            Ok(ResultPage::next_url(vec![response.final_url.clone()], response.text.clone()))
        };

        let err = assert_err!(
            PaginatedFetcher::new(transport.clone())
                .fetch_all(
                    PageRequest::new(HttpRequest::get("https://catalog.example/list")),
                    by_link,
                    None
                )
                .await
        );
        assert!(err.is_source());

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://catalog.example/list",
                "https://catalog.example/list?page=2",
                "https://catalog.example/list?page=3",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_page_in_flight() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(page(1, &["a"], true));
        transport.push_delayed(
            Duration::from_secs(30),
            HttpResponse::new(200, page(2, &["b"], false).to_string()),
        );

        let token = CancellationToken::new();
        let fetcher = PaginatedFetcher::new(transport.clone());

        let (outcome, ()) = tokio::join!(fetcher.fetch_all(listing(), numbered, Some(&token)), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel("user abort");
        });

        let outcome = assert_ok!(outcome);
        assert_eq!(outcome.items, vec!["a"]);
        assert_eq!(
            outcome.completion,
            Completion::Cancelled {
                reason: "user abort".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_rate_limited() {
        let scripted = Arc::new(ScriptedTransport::new());
        scripted.push_json(page(1, &["a"], true));
        scripted.push_json(page(2, &["b"], false));

        let registry = RateLimiterRegistry::new(Duration::ZERO).with_interval("catalog.example", Duration::from_secs(60));
        let limited = Arc::new(RateLimitedTransport::new(scripted.clone(), registry));
        let fetcher = PaginatedFetcher::new(limited);
        let token = CancellationToken::new();

        let (outcome, ()) = tokio::join!(fetcher.fetch_all(listing(), numbered, Some(&token)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            token.cancel("shutdown");
        });

        let outcome = assert_ok!(outcome);
        assert_eq!(outcome.pages_fetched, 1);
        assert!(matches!(outcome.completion, Completion::Cancelled { .. }));
        assert_eq!(scripted.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_pages_are_spaced() {
        let scripted = Arc::new(ScriptedTransport::new());
        scripted.push_json(page(1, &["a"], true));
        scripted.push_json(page(2, &["b"], false));

        let registry = RateLimiterRegistry::new(Duration::ZERO).with_interval("catalog.example", Duration::from_secs(2));
        let fetcher = PaginatedFetcher::new(Arc::new(RateLimitedTransport::new(scripted.clone(), registry)));

        let start = tokio::time::Instant::now();
        let outcome = assert_ok!(fetcher.fetch_all(listing(), numbered, None).await);
        assert_eq!(outcome.items, vec!["a", "b"]);
        assert!(tokio::time::Instant::now() - start >= Duration::from_secs(2));
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl PageObserver for RecordingObserver {
        fn on_page_start(&self, _url: &str, page: u32, request_id: &str) {
            assert!(uuid::Uuid::parse_str(request_id).is_ok());
            self.events.lock().push(format!("start:{page}"));
        }

        fn on_page_complete(&self, _url: &str, page: u32, _request_id: &str, _duration_ms: f64, items: usize) {
            self.events.lock().push(format!("complete:{page}:{items}"));
        }

        fn on_page_error(&self, _url: &str, page: u32, _request_id: &str, _error: &str) {
            self.events.lock().push(format!("error:{page}"));
        }
    }

    #[tokio::test]
    async fn test_observer_sees_every_page() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(page(1, &["a", "b"], true));
        transport.push_error(TransportError::timeout("https://catalog.example/search", "slow"));

        let observer = Arc::new(RecordingObserver::default());
        let outcome = assert_ok!(
            PaginatedFetcher::new(transport)
                .with_observer(observer.clone())
                .fetch_all(listing(), numbered, None)
                .await
        );
        assert!(outcome.is_partial());
        assert_eq!(
            observer.events.lock().clone(),
            vec!["start:1", "complete:1:2", "start:2", "error:2"]
        );
    }

    fn jumping(response: &HttpResponse) -> Result<ResultPage<String>, SourceError> {
        let value: serde_json::Value = response
            .json()
            .map_err(|e| SourceError::malformed(&response.final_url, e.to_string()))?;
        let items = vec![value["id"].as_str().unwrap_or_default().to_string()];
        if let Some(next) = value["next_page"].as_u64() {
            Ok(ResultPage::next_page(items, next as u32))
        } else if let Some(url) = value["next_url"].as_str() {
            Ok(ResultPage::next_url(items, url))
        } else {
            Ok(ResultPage::last(items))
        }
    }

    #[tokio::test]
    async fn test_page_numbers_follow_the_source() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(json!({ "id": "a", "next_page": 5 }));
        transport.push_json(json!({ "id": "b", "next_url": "https://catalog.example/more" }));
        transport.push_json(json!({ "id": "c" }));

        let observer = Arc::new(RecordingObserver::default());
        let outcome = assert_ok!(
            PaginatedFetcher::new(transport.clone())
                .with_observer(observer.clone())
                .fetch_all(listing(), jumping, None)
                .await
        );
        assert_eq!(outcome.items, vec!["a", "b", "c"]);
        assert_eq!(outcome.completion, Completion::Exhausted);
        assert_eq!(
            observer.events.lock().clone(),
            vec!["start:1", "complete:1:1", "start:5", "complete:5:1", "start:6", "complete:6:1"]
        );
        assert_eq!(transport.requests()[1].query_param("page"), Some("5"));
        assert_eq!(transport.requests()[2].url, "https://catalog.example/more");
    }
}
