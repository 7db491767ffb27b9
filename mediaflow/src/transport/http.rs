//! `reqwest`-backed transport.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, trace};

use super::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::config::FetchConfig;
use crate::errors::{ConfigError, TransportError, TransportErrorKind};

/// Transport that sends requests with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ReqwestTransport {
    /// Creates a transport from a fetch configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for header names or values that are
    /// not valid HTTP, or if the client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ConfigError::Invalid(format!("header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::Invalid(format!("header '{key}' value: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn classify(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        let message = format!("{error:?}").to_ascii_lowercase();
        if message.contains("dns") || message.contains("resolve") {
            TransportErrorKind::Dns
        } else {
            TransportErrorKind::Connect
        }
    } else {
        TransportErrorKind::Other
    }
}

fn transport_error(url: &str, error: &reqwest::Error) -> TransportError {
    TransportError::new(url, classify(error), error.to_string())
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        trace!(method = request.method.as_str(), url = %request.url, "Sending request");
        let start = Instant::now();

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&request.url, &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&request.url, &e))?;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        debug!(url = %final_url, status, duration_ms, "Received response");

        Ok(HttpResponse {
            status,
            headers,
            text,
            final_url,
            duration_ms,
        })
    }
}
