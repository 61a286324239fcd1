//! HTTP client publishing events to the broker.
//!
//! Every publish attempt is a single-use [`PublishCommand`] built from the
//! serialized batch, so the batch is encoded once per call no matter how
//! many attempts are made. Responses and transport errors are mapped to the
//! [`CommandError`] wrappers that drive retry decisions.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Response, StatusCode, Url,
};
use serde::{Deserialize, Serialize};
use tether_core::{Command, CommandError, CommandIdentity, RuntimeFailure};
use tether_exec::{Guarded, RetryPolicy};
use tracing::{debug, info_span, warn, Instrument};

use crate::{
    error::{BrokerError, Result},
    model::{EventType, FlowId, PublishingProblem},
    DEFAULT_TIMEOUT_SECONDS, FLOW_ID_HEADER,
};

/// Configuration for the broker client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the broker API.
    pub base_url: String,
    /// Timeout for a single HTTP request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            user_agent: concat!("tether/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Bearer token sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Client for the broker's publishing API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    client: reqwest::Client,
    base_url: Url,
    token: AccessToken,
}

impl BrokerClient {
    /// Creates a new broker client.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Configuration` if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &ClientConfig, token: AccessToken) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            BrokerError::configuration(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BrokerError::configuration(format!(
                "base URL '{}' cannot have a path",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| BrokerError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url, token })
    }

    /// URL events of `event_type` are posted to.
    ///
    /// The event type is percent-encoded as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Configuration` if the base URL cannot carry a
    /// path.
    pub fn publish_url(&self, event_type: &EventType) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BrokerError::configuration("base URL cannot have a path"))?
            .pop_if_empty()
            .extend(["event-types", event_type.as_str(), "events"]);
        Ok(url)
    }

    /// Builds a single publish attempt with a fresh flow id.
    ///
    /// # Errors
    ///
    /// Fails with the bare `BrokerError` if the events cannot be serialized
    /// or the URL cannot be built.
    pub fn publish_command<E: Serialize>(
        &self,
        event_type: &EventType,
        events: &[E],
    ) -> tether_core::Result<PublishCommand> {
        let request = self.prepare(event_type, events, FlowId::random())?;
        Ok(request.command())
    }

    /// Publishes `events`, retrying transient failures up to `max_attempts`
    /// attempts in total.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `max_attempts` is zero, otherwise the
    /// root cause of the last failed attempt. Rejected events surface as
    /// [`BrokerError::Publishing`] inside `CommandError::Failed`.
    pub async fn publish<E: Serialize>(
        &self,
        event_type: &EventType,
        events: &[E],
        max_attempts: u32,
    ) -> tether_core::Result<()> {
        let policy = RetryPolicy::new(max_attempts)?;
        self.publish_with_policy(event_type, events, policy, FlowId::random()).await
    }

    /// Publishes `events` under an explicit policy and flow id.
    ///
    /// All attempts of the call share the flow id.
    ///
    /// # Errors
    ///
    /// Returns the root cause of the last failed attempt.
    pub async fn publish_with_policy<E: Serialize>(
        &self,
        event_type: &EventType,
        events: &[E],
        policy: RetryPolicy,
        flow_id: FlowId,
    ) -> tether_core::Result<()> {
        let request = self.prepare(event_type, events, flow_id)?;

        debug!(
            event_type = %event_type,
            flow_id = %request.flow_id,
            events = events.len(),
            max_attempts = policy.max_attempts(),
            "Publishing events"
        );

        let guarded = Guarded::with_policy(|| Ok(request.command()), policy);
        guarded.execute().await
    }

    fn prepare<E: Serialize>(
        &self,
        event_type: &EventType,
        events: &[E],
        flow_id: FlowId,
    ) -> tether_core::Result<PreparedPublish> {
        let url = self.publish_url(event_type).map_err(CommandError::failed)?;
        let body = serde_json::to_vec(events)
            .map_err(|e| CommandError::failed(BrokerError::json(&e)))?;

        Ok(PreparedPublish {
            client: self.client.clone(),
            token: self.token.clone(),
            url,
            body: Bytes::from(body),
            event_type: event_type.clone(),
            flow_id,
        })
    }
}

/// Serialized request shared by all attempts of one publish call.
struct PreparedPublish {
    client: reqwest::Client,
    token: AccessToken,
    url: Url,
    body: Bytes,
    event_type: EventType,
    flow_id: FlowId,
}

impl PreparedPublish {
    fn command(&self) -> PublishCommand {
        PublishCommand {
            client: self.client.clone(),
            token: self.token.clone(),
            url: self.url.clone(),
            body: self.body.clone(),
            event_type: self.event_type.clone(),
            flow_id: self.flow_id.clone(),
        }
    }
}

/// One attempt at publishing a batch of events.
#[derive(Debug)]
pub struct PublishCommand {
    client: reqwest::Client,
    token: AccessToken,
    url: Url,
    body: Bytes,
    event_type: EventType,
    flow_id: FlowId,
}

impl PublishCommand {
    /// Flow id sent with this attempt.
    pub fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    async fn send(self) -> tether_core::Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(self.token.expose())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(FLOW_ID_HEADER, self.flow_id.as_str())
            .body(self.body.clone())
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        debug!(status = status.as_u16(), "Received response");

        if status == StatusCode::MULTI_STATUS || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(self.publishing_failure(response).await);
        }
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.map_err(|e| body_read_failure(status, e))?;
        let error = BrokerError::status(status.as_u16(), body);
        warn!(status = status.as_u16(), retryable = error.is_retryable(), "Publish request failed");
        Err(error.into_command_error())
    }

    async fn publishing_failure(&self, response: Response) -> CommandError {
        let status = response.status();
        let flow_id = response
            .headers()
            .get(FLOW_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| self.flow_id.clone(), FlowId::from);

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return body_read_failure(status, e),
        };
        let status = status.as_u16();

        match serde_json::from_slice::<Vec<PublishingProblem>>(&body) {
            Ok(problems) => {
                let error = BrokerError::publishing(self.event_type.clone(), flow_id, problems);
                warn!(status, "{error}");
                error.into_command_error()
            },
            Err(_) => {
                BrokerError::status(status, String::from_utf8_lossy(&body)).into_command_error()
            },
        }
    }
}

#[async_trait]
impl Command for PublishCommand {
    type Output = ();

    fn identity(&self) -> CommandIdentity {
        CommandIdentity::new("broker", "publish")
    }

    async fn execute(self) -> tether_core::Result<()> {
        let span = info_span!(
            "broker_publish",
            event_type = %self.event_type,
            flow_id = %self.flow_id,
            url = %self.url
        );

        self.send().instrument(span).await
    }
}

/// Failure to read the body of a response that already carried `status`.
///
/// Only server errors stay retryable; a client error keeps its verdict.
fn body_read_failure(status: StatusCode, error: reqwest::Error) -> CommandError {
    if status.is_server_error() {
        return transport_failure(error);
    }

    warn!(error = %error, status = status.as_u16(), "Failed to read rejection body");
    CommandError::bad_request_caused_by(
        format!("broker responded with HTTP {} and an unreadable body", status.as_u16()),
        error,
    )
}

fn transport_failure(error: reqwest::Error) -> CommandError {
    warn!(error = %error, timeout = error.is_timeout(), "Publish request did not complete");

    if error.is_timeout() {
        CommandError::runtime_caused_by(RuntimeFailure::Timeout, "publish request timed out", error)
    } else {
        CommandError::runtime_caused_by(
            RuntimeFailure::CommandException,
            "publish request failed",
            error,
        )
    }
}
