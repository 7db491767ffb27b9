//! A transport that replays scripted responses.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::errors::{TransportError, TransportErrorKind};
use crate::transport::{HttpRequest, HttpResponse, Transport};

#[derive(Debug)]
struct Step {
    delay: Option<Duration>,
    result: Result<HttpResponse, TransportError>,
}

/// Replays queued responses in order and records every request.
///
/// Responses without a `final_url` get the request URL. Once the script is
/// exhausted every request fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: HttpResponse) {
        self.push(None, Ok(response));
    }

    /// Queues a 200 response with a JSON body.
    pub fn push_json(&self, body: serde_json::Value) {
        self.push_response(
            HttpResponse::new(200, body.to_string()).with_header("content-type", "application/json"),
        );
    }

    /// Queues a response with a status and text body.
    pub fn push_text(&self, status: u16, text: impl Into<String>) {
        self.push_response(HttpResponse::new(status, text));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.push(None, Err(error));
    }

    /// Queues a response that arrives after `delay`.
    pub fn push_delayed(&self, delay: Duration, response: HttpResponse) {
        self.push(Some(delay), Ok(response));
    }

    fn push(&self, delay: Option<Duration>, result: Result<HttpResponse, TransportError>) {
        self.script.lock().push_back(Step { delay, result });
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of scripted steps not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let step = self.script.lock().pop_front();

        let Some(step) = step else {
            return Err(TransportError::new(
                request.url,
                TransportErrorKind::Other,
                "no scripted response left",
            ));
        };

        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }

        step.result.map(|mut response| {
            if response.final_url.is_empty() {
                response.final_url = request.url;
            }
            response
        })
    }
}
