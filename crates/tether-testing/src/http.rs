//! HTTP mocking utilities for broker client testing.

use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path_regex},
    Mock, MockServer, ResponseTemplate,
};

const PUBLISH_PATH: &str = r"^/event-types/[^/]+/events$";

/// Mock event broker answering publish requests.
pub struct MockBroker {
    server: MockServer,
}

impl MockBroker {
    /// Starts a new mock broker on a random port.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Returns the base URL of the mock broker.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Answers every publish request with `response`.
    pub async fn respond_always(&self, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path_regex(PUBLISH_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Answers publish requests with `responses` in order, one each.
    ///
    /// Requests beyond the sequence get wiremock's default 404.
    pub async fn respond_in_sequence(&self, responses: impl IntoIterator<Item = ResponseTemplate>) {
        for response in responses {
            Mock::given(method("POST"))
                .and(path_regex(PUBLISH_PATH))
                .respond_with(response)
                .up_to_n_times(1)
                .mount(&self.server)
                .await;
        }
    }

    /// Answers every publish request with `status` after `delay`.
    pub async fn respond_slowly(&self, status: u16, delay: Duration) {
        self.respond_always(ResponseTemplate::new(status).set_delay(delay)).await;
    }

    /// Returns all requests received by the broker.
    pub async fn received_requests(&self) -> Vec<RecordedRequest> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|request| RecordedRequest {
                method: request.method.to_string(),
                path: request.url.path().to_string(),
                headers: request.headers,
                body: Bytes::from(request.body),
            })
            .collect()
    }

    /// Asserts that exactly `expected` requests were received.
    pub async fn assert_request_count(&self, expected: usize) {
        let requests = self.received_requests().await;
        assert_eq!(
            requests.len(),
            expected,
            "Expected {} requests, received {}",
            expected,
            requests.len()
        );
    }
}

/// A recorded HTTP request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Percent-encoded request path
    pub path: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Raw request body
    pub body: Bytes,
}

impl RecordedRequest {
    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }
}

/// Response the broker sends when some events of a batch were rejected.
///
/// Each entry of `failed` is `(eid, detail)`; `submitted` lists event ids
/// that were accepted in the same batch.
pub fn publishing_problems(
    status: u16,
    flow_id: &str,
    failed: &[(&str, &str)],
    submitted: &[&str],
) -> ResponseTemplate {
    let problems: Vec<Value> = failed
        .iter()
        .map(|(eid, detail)| {
            json!({
                "eid": eid,
                "publishing_status": "failed",
                "step": "validating",
                "detail": detail,
            })
        })
        .chain(submitted.iter().map(|eid| {
            json!({
                "eid": eid,
                "publishing_status": "submitted",
                "step": "publishing",
                "detail": "",
            })
        }))
        .collect();

    ResponseTemplate::new(status).insert_header("X-Flow-Id", flow_id).set_body_json(problems)
}

/// Problem document returned for a rejected request.
pub fn problem(status: u16, title: &str, detail: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "type": "about:blank",
        "title": title,
        "status": status,
        "detail": detail,
    }))
}
