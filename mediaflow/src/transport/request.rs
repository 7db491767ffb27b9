//! Request and response descriptors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request.
    #[default]
    Get,
    /// POST request.
    Post,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A request descriptor, independent of any HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Target URL, without the query parameters in `query`.
    pub url: String,
    /// Extra request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Query parameters in insertion order.
    #[serde(default)]
    pub query: Vec<(String, String)>,
    /// JSON body, sent with `Content-Type: application/json`.
    pub json: Option<serde_json::Value>,
    /// Per-request timeout overriding the transport default.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            json: Some(body),
            ..Default::default()
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a query parameter, replacing every existing value for `key`.
    pub fn set_query_param(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.query.iter().position(|(k, _)| k == key) {
            Some(index) => {
                self.query[index].1 = value;
                let mut seen = false;
                self.query.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.query.push((key.to_string(), value)),
        }
    }

    /// Returns the first value of a query parameter.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `variables.<name>` on a GraphQL-style JSON body.
    ///
    /// A missing body or `variables` object is created.
    pub fn set_json_variable(&mut self, name: &str, value: serde_json::Value) {
        let body = self
            .json
            .get_or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if !body.is_object() {
            *body = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(object) = body.as_object_mut() {
            let variables = object
                .entry("variables")
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if !variables.is_object() {
                *variables = serde_json::Value::Object(serde_json::Map::new());
            }
            if let Some(variables) = variables.as_object_mut() {
                variables.insert(name.to_string(), value);
            }
        }
    }

    /// Returns `variables.<name>` from the JSON body.
    #[must_use]
    pub fn json_variable(&self, name: &str) -> Option<&serde_json::Value> {
        self.json.as_ref()?.get("variables")?.get(name)
    }

    /// Builds a GET to `url` that keeps this request's headers and timeout.
    ///
    /// Query parameters and body are dropped; `url` is expected to be a
    /// complete link taken from a previous response.
    #[must_use]
    pub fn follow(&self, url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: self.headers.clone(),
            query: Vec::new(),
            json: None,
            timeout: self.timeout,
        }
    }
}

/// A response as seen by source parsers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (lowercase names).
    pub headers: HashMap<String, String>,
    /// Response body as text.
    pub text: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// Time taken in milliseconds.
    pub duration_ms: f64,
}

impl HttpResponse {
    /// Creates a response with a status and body.
    #[must_use]
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
            ..Default::default()
        }
    }

    /// Sets the final URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.final_url = url.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the response has a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is 400 or above.
    #[must_use]
    pub fn is_error_status(&self) -> bool {
        self.status >= 400
    }

    /// Parses the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.text)
    }

    /// Gets a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_set_query_param_replaces_all_values() {
        let mut request = HttpRequest::get("https://example.com/list")
            .with_query("page", "1")
            .with_query("sort", "name")
            .with_query("page", "9");

        request.set_query_param("page", "2");
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("sort".to_string(), "name".to_string()),
            ]
        );

        request.set_query_param("limit", "50");
        assert_eq!(request.query_param("limit"), Some("50"));
    }

    #[test]
    fn test_set_json_variable() {
        let mut request = HttpRequest::post_json(
            "https://graphql.example.com",
            json!({ "query": "{ x }", "variables": { "query": "Monster" } }),
        );
        request.set_json_variable("page", json!(3));

        assert_eq!(request.json_variable("page"), Some(&json!(3)));
        assert_eq!(request.json_variable("query"), Some(&json!("Monster")));

        let mut bare = HttpRequest::get("https://example.com");
        bare.set_json_variable("page", json!(1));
        assert_eq!(bare.json, Some(json!({ "variables": { "page": 1 } })));
    }

    #[test]
    fn test_follow_drops_query_and_body() {
        let request = HttpRequest::post_json("https://example.com/search", json!({}))
            .with_header("User-Agent", "test")
            .with_query("show", "list")
            .with_timeout(Duration::from_secs(3));

        let next = request.follow("https://example.com/search?page=2");
        assert_eq!(next.method, HttpMethod::Get);
        assert_eq!(next.url, "https://example.com/search?page=2");
        assert!(next.query.is_empty());
        assert!(next.json.is_none());
        assert_eq!(next.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(next.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_response_status_helpers() {
        let ok = HttpResponse::new(200, "{\"a\": 1}").with_header("Content-Type", "application/json");
        assert!(ok.is_success());
        assert!(!ok.is_error_status());
        assert_eq!(ok.header("content-type"), Some("application/json"));
        let value: serde_json::Value = ok.json().unwrap();
        assert_eq!(value, json!({ "a": 1 }));

        let redirect = HttpResponse::new(301, "");
        assert!(!redirect.is_success());
        assert!(!redirect.is_error_status());

        let throttled = HttpResponse::new(429, "");
        assert!(throttled.is_error_status());
    }
}
