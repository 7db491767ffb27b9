//! AniList GraphQL source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cancellation::CancellationToken;
use crate::config::MediaflowConfig;
use crate::errors::{ConfigError, MediaflowError, SourceError};
use crate::pagination::{FetchOutcome, PageKey, PageRequest, PaginatedFetcher, ResultPage};
use crate::ratelimit::{RateLimitedTransport, RateLimiterRegistry};
use crate::resolver::SearchCandidate;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// AniList GraphQL endpoint.
pub const ANILIST_API: &str = "https://graphql.anilist.co";

/// Paged media search.
pub const SEARCH_QUERY: &str = "\
query ($query: String, $page: Int, $perPage: Int) {
    Page(page: $page, perPage: $perPage) {
        pageInfo {
            total
            currentPage
            lastPage
            hasNextPage
            perPage
        }
        media(search: $query, type: ANIME) {
            id
            title {
                romaji
                english
                native
            }
        }
    }
}";

/// Airing schedule of one media entry.
pub const AIRING_QUERY: &str = "\
query ($query: Int) {
    Media(id: $query, type: ANIME) {
        airingSchedule {
            nodes {
                airingAt
                episode
            }
        }
    }
}";

/// One scheduled episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiringNode {
    /// Air time in unix seconds.
    #[serde(rename = "airingAt")]
    pub airing_at: i64,
    /// Episode number.
    pub episode: u32,
}

impl AiringNode {
    /// Air time as a UTC datetime.
    #[must_use]
    pub fn airs_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.airing_at, 0)
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl<D> GraphQlResponse<D> {
    fn into_data(self, url: &str) -> Result<D, SourceError> {
        if !self.errors.is_empty() {
            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(SourceError::malformed(url, format!("GraphQL errors: {}", messages.join("; "))));
        }
        self.data
            .ok_or_else(|| SourceError::malformed(url, "response has no data"))
    }
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(rename = "Page")]
    page: Option<SearchPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    page_info: PageInfo,
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    current_page: u32,
    last_page: Option<u32>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: i64,
    title: MediaTitle,
}

#[derive(Debug, Default, Deserialize)]
struct MediaTitle {
    romaji: Option<String>,
    english: Option<String>,
    native: Option<String>,
}

impl From<Media> for SearchCandidate {
    fn from(media: Media) -> Self {
        let mut candidate = SearchCandidate::new(media.id);
        for (label, text) in [
            ("romaji", media.title.romaji),
            ("english", media.title.english),
            ("native", media.title.native),
        ] {
            candidate = match text {
                Some(text) => candidate.with_title(label, text),
                None => candidate.with_missing_title(label),
            };
        }
        candidate
    }
}

#[derive(Debug, Deserialize)]
struct AiringData {
    #[serde(rename = "Media")]
    media: Option<AiringMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiringMedia {
    airing_schedule: Option<AiringSchedule>,
}

#[derive(Debug, Deserialize)]
struct AiringSchedule {
    #[serde(default)]
    nodes: Vec<AiringNode>,
}

fn decode<D: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<D, SourceError> {
    let body: GraphQlResponse<D> = response
        .json()
        .map_err(|e| SourceError::malformed(&response.final_url, format!("invalid JSON: {e}")))?;
    body.into_data(&response.final_url)
}

/// Parses one page of search results.
///
/// # Errors
///
/// Returns `SourceError` for invalid JSON, GraphQL errors, a missing
/// `data.Page`, or a next page past `u32::MAX`.
pub fn parse_search_page(response: &HttpResponse) -> Result<ResultPage<SearchCandidate>, SourceError> {
    let data: SearchData = decode(response)?;
    let page = data
        .page
        .ok_or_else(|| SourceError::malformed(&response.final_url, "response has no Page"))?;

    let items: Vec<SearchCandidate> = page.media.into_iter().map(SearchCandidate::from).collect();
    let result = if page.page_info.has_next_page {
        let next = page
            .page_info
            .current_page
            .checked_add(1)
            .ok_or_else(|| SourceError::malformed(&response.final_url, "page number overflow"))?;
        ResultPage::next_page(items, next)
    } else {
        ResultPage::last(items)
    };
    Ok(match page.page_info.last_page {
        Some(last) => result.with_total_pages(last),
        None => result,
    })
}

/// Parses an airing schedule response.
///
/// # Errors
///
/// Returns `SourceError` for invalid JSON, GraphQL errors, or an unknown
/// media id.
pub fn parse_airing_schedule(response: &HttpResponse) -> Result<Vec<AiringNode>, SourceError> {
    let data: AiringData = decode(response)?;
    let media = data
        .media
        .ok_or_else(|| SourceError::malformed(&response.final_url, "media not found"))?;
    Ok(media
        .airing_schedule
        .map(|schedule| schedule.nodes)
        .unwrap_or_default())
}

/// Client for AniList search and airing lookups.
#[derive(Debug, Clone)]
pub struct AniListClient {
    fetcher: PaginatedFetcher,
    endpoint: String,
    user_agent: String,
    per_page: u32,
}

impl AniListClient {
    /// Creates a client that sends through `fetcher`.
    #[must_use]
    pub fn new(fetcher: PaginatedFetcher) -> Self {
        Self {
            fetcher,
            endpoint: ANILIST_API.to_string(),
            user_agent: concat!("mediaflow/", env!("CARGO_PKG_VERSION")).to_string(),
            per_page: 50,
        }
    }

    /// Creates a client over `transport` using configured limits.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, config: &MediaflowConfig) -> Self {
        let fetcher = PaginatedFetcher::from_config(transport, &config.pagination)
            .with_request_timeout(config.fetch.timeout());
        Self::new(fetcher)
            .with_user_agent(config.fetch.user_agent.clone())
            .with_per_page(config.pagination.per_page)
    }

    /// Creates a rate-limited HTTP client sharing `registry`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the HTTP client cannot be built.
    pub fn connect(config: &MediaflowConfig, registry: RateLimiterRegistry) -> Result<Self, ConfigError> {
        let http = ReqwestTransport::new(config.fetch.clone())?;
        let transport: Arc<dyn Transport> = Arc::new(RateLimitedTransport::new(http, registry));
        Ok(Self::with_transport(transport, config))
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the page-size hint.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    fn graphql(&self, query: &str, variables: serde_json::Value) -> HttpRequest {
        HttpRequest::post_json(&self.endpoint, json!({ "query": query, "variables": variables }))
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_header("User-Agent", self.user_agent.clone())
    }

    /// The first-page request for a title search.
    #[must_use]
    pub fn search_request(&self, query: &str) -> PageRequest {
        PageRequest::new(self.graphql(SEARCH_QUERY, json!({ "query": query })))
            .with_page_key(PageKey::JsonVariable("page".to_string()))
            .with_page_size(PageKey::JsonVariable("perPage".to_string()), self.per_page)
    }

    /// Searches for anime matching `query` across every result page.
    ///
    /// # Errors
    ///
    /// As [`PaginatedFetcher::fetch_all`].
    pub async fn search(
        &self,
        query: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchOutcome<SearchCandidate>, MediaflowError> {
        debug!(query = %query, "Searching AniList");
        self.fetcher
            .fetch_all(self.search_request(query), parse_search_page, cancel)
            .await
    }

    /// Fetches the airing schedule of a media id.
    ///
    /// Returns `Ok(None)` if `cancel` fires before the response arrives.
    ///
    /// # Errors
    ///
    /// Returns `MediaflowError::Transport` if the request fails and
    /// `MediaflowError::Source` for an error status or unusable body.
    pub async fn airing_schedule(
        &self,
        id: i64,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<Vec<AiringNode>>, MediaflowError> {
        let mut request = self.graphql(AIRING_QUERY, json!({ "query": id }));
        if request.timeout.is_none() {
            request.timeout = self.fetcher.request_timeout();
        }
        let url = request.url.clone();

        let transport = self.fetcher.transport();
        let sent = match cancel {
            None => Some(transport.send(request).await),
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => None,
                    result = transport.send(request) => Some(result),
                }
            }
        };
        let Some(result) = sent else {
            let reason = cancel.and_then(CancellationToken::reason).unwrap_or_default();
            info!(id, reason = %reason, "Airing schedule lookup cancelled");
            return Ok(None);
        };

        let response = result?;
        if response.is_error_status() {
            return Err(SourceError::status(url, response.status, "airing schedule request rejected").into());
        }
        let nodes = parse_airing_schedule(&response).map_err(|mut e| {
            if e.url.is_empty() {
                e.url = url;
            }
            e
        })?;
        debug!(id, nodes = nodes.len(), "Fetched airing schedule");
        Ok(Some(nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{Completion, Continuation};
    use crate::resolver::ExternalId;
    use crate::testing::{fixtures, ScriptedTransport};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn client(transport: &Arc<ScriptedTransport>) -> AniListClient {
        AniListClient::with_transport(transport.clone(), &MediaflowConfig::default())
    }

    #[test]
    fn test_parse_search_page() {
        let body = fixtures::anilist_search_page(
            1,
            true,
            &[(99, "Shingeki no Kyojin", Some("Attack on Titan")), (5, "Mushishi", None)],
        );
        let page = parse_search_page(&fixtures::json_response(&body)).unwrap();

        assert_eq!(page.continuation, Continuation::NextPage(2));
        assert_eq!(page.total_pages, Some(2));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].external_id, ExternalId::Int(99));
        let labels: Vec<&str> = page.items[0].titles.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["romaji", "english", "native"]);
        let texts: Vec<&str> = page.items[1].title_texts().collect();
        assert_eq!(texts, vec!["Mushishi"]);
    }

    #[test]
    fn test_parse_search_page_at_last_page_number() {
        let body = json!({
            "data": { "Page": {
                "pageInfo": { "currentPage": u32::MAX, "hasNextPage": true },
                "media": []
            } }
        });
        let err = parse_search_page(&fixtures::json_response(&body)).unwrap_err();
        assert!(err.reason.contains("page number overflow"));

        let body = json!({
            "data": { "Page": {
                "pageInfo": { "currentPage": u32::MAX, "hasNextPage": false },
                "media": []
            } }
        });
        let page = parse_search_page(&fixtures::json_response(&body)).unwrap();
        assert_eq!(page.continuation, Continuation::Exhausted);
    }

    #[test]
    fn test_parse_search_page_errors() {
        let missing_page = fixtures::json_response(&json!({ "data": { "Page": null } }));
        assert!(parse_search_page(&missing_page).is_err());

        let graphql_error = fixtures::json_response(&json!({
            "data": null,
            "errors": [{ "message": "Too Many Requests." }]
        }));
        let err = parse_search_page(&graphql_error).unwrap_err();
        assert!(err.reason.contains("Too Many Requests."));

        let not_json = HttpResponse::new(200, "<html>");
        assert!(parse_search_page(&not_json).is_err());
    }

    #[test]
    fn test_parse_airing_schedule() {
        let body = fixtures::anilist_airing(&[(1_700_000_000, 1), (1_700_604_800, 2)]);
        let nodes = parse_airing_schedule(&fixtures::json_response(&body)).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].episode, 2);
        assert_eq!(
            nodes[0].airs_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );

        let no_schedule = fixtures::json_response(&json!({ "data": { "Media": { "airingSchedule": null } } }));
        assert!(parse_airing_schedule(&no_schedule).unwrap().is_empty());

        let unknown = fixtures::json_response(&json!({ "data": { "Media": null } }));
        assert!(parse_airing_schedule(&unknown).is_err());
    }

    #[tokio::test]
    async fn test_search_pages_through_variables() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(fixtures::anilist_search_page(1, true, &[(1, "Monster", None)]));
        transport.push_json(fixtures::anilist_search_page(2, false, &[(2, "Monster Strike", None)]));

        let outcome = assert_ok!(client(&transport).search("Monster", None).await);
        assert_eq!(outcome.completion, Completion::Exhausted);
        assert_eq!(outcome.items.len(), 2);

        let requests = transport.requests();
        assert_eq!(requests[0].url, ANILIST_API);
        assert_eq!(requests[0].headers.get("Accept"), Some(&"application/json".to_string()));
        assert_eq!(requests[0].json_variable("query"), Some(&json!("Monster")));
        assert_eq!(requests[0].json_variable("perPage"), Some(&json!(50)));
        assert_eq!(requests[0].json_variable("page"), None);
        assert_eq!(requests[1].json_variable("page"), Some(&json!(2)));
        assert_eq!(requests[1].json_variable("perPage"), Some(&json!(50)));
    }

    #[tokio::test]
    async fn test_airing_schedule_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(fixtures::anilist_airing(&[(1_700_000_000, 3)]));

        let nodes = assert_ok!(client(&transport).airing_schedule(99, None).await);
        assert_eq!(nodes, Some(vec![AiringNode { airing_at: 1_700_000_000, episode: 3 }]));

        let request = &transport.requests()[0];
        assert_eq!(request.json_variable("query"), Some(&json!(99)));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
        let body = request.json.as_ref().unwrap();
        assert!(body["query"].as_str().unwrap().contains("airingSchedule"));
    }

    #[tokio::test]
    async fn test_airing_schedule_error_status() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_text(404, "{}");

        let err = client(&transport).airing_schedule(1, None).await.unwrap_err();
        match err {
            MediaflowError::Source(source) => assert_eq!(source.status, Some(404)),
            other => panic!("expected source error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_requests_carry_configured_timeout() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(fixtures::anilist_search_page(1, false, &[(1, "Monster", None)]));

        assert_ok!(client(&transport).search("Monster", None).await);
        assert_eq!(transport.requests()[0].timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_airing_schedule_cancelled_mid_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_delayed(
            Duration::from_secs(60),
            fixtures::json_response(&fixtures::anilist_airing(&[(1_700_000_000, 1)])),
        );
        let client = client(&transport);
        let token = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let (result, ()) = tokio::join!(client.airing_schedule(99, Some(&token)), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel("shutdown");
        });

        assert_eq!(assert_ok!(result), None);
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(transport.request_count(), 1);
    }
}
