//! Error types for event broker operations.
//!
//! Broker errors are the root causes carried inside
//! [`CommandError`](tether_core::CommandError) wrappers. The wrapper chosen
//! for each error decides whether a publish attempt is retried.

use thiserror::Error;
use tether_core::{CommandError, RuntimeFailure};

use crate::model::{EventType, FlowId, PublishingProblem, PublishingStatus};

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors raised while talking to the event broker.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// Some events of a batch were rejected by the broker.
    #[error(transparent)]
    Publishing(PublishingError),

    /// The broker answered with an unexpected HTTP status.
    #[error("broker responded with HTTP {status_code}: {body}")]
    Status {
        /// HTTP status code
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// JSON could not be encoded or decoded.
    #[error("malformed JSON: {message}")]
    Json {
        /// Parser error message
        message: String,
    },

    /// Invalid client configuration.
    #[error("invalid broker configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl BrokerError {
    /// Creates a publishing error from the problems reported by the broker.
    pub fn publishing(
        event_type: EventType,
        flow_id: FlowId,
        problems: Vec<PublishingProblem>,
    ) -> Self {
        Self::Publishing(PublishingError::new(event_type, flow_id, problems))
    }

    /// Creates an error from an HTTP response.
    pub fn status(status_code: u16, body: impl Into<String>) -> Self {
        Self::Status { status_code, body: body.into() }
    }

    /// Creates a JSON error.
    pub fn json(error: &serde_json::Error) -> Self {
        Self::Json { message: error.to_string() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Determines if this error represents a temporary broker failure.
    ///
    /// Only server errors (5xx) qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Status { status_code, .. } if *status_code >= 500)
    }

    /// Wraps this error the way the execution framework expects.
    ///
    /// Retryable errors become command exceptions, rejected requests become
    /// bad requests, and everything else is passed as a bare root cause.
    pub fn into_command_error(self) -> CommandError {
        match &self {
            Self::Status { status_code, .. } if self.is_retryable() => {
                let message = format!("broker unavailable: HTTP {status_code}");
                CommandError::runtime_caused_by(RuntimeFailure::CommandException, message, self)
            },
            Self::Status { status_code, .. } => {
                let message = format!("request rejected: HTTP {status_code}");
                CommandError::bad_request_caused_by(message, self)
            },
            Self::Publishing(_) => CommandError::bad_request_caused_by("events rejected", self),
            Self::Json { .. } | Self::Configuration { .. } => CommandError::failed(self),
        }
    }
}

/// Events of a batch that the broker refused to publish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{failed} events of type '{event_type}' could not be published to the event broker. \
     (Flow-ID: {flow_id})"
)]
pub struct PublishingError {
    event_type: EventType,
    flow_id: FlowId,
    problems: Vec<PublishingProblem>,
    failed: usize,
}

impl PublishingError {
    /// Creates the error; events reported as submitted do not count as failed.
    pub fn new(event_type: EventType, flow_id: FlowId, problems: Vec<PublishingProblem>) -> Self {
        let failed = problems
            .iter()
            .filter(|problem| problem.publishing_status != PublishingStatus::Submitted)
            .count();
        Self { event_type, flow_id, problems, failed }
    }

    /// Event type the batch was published to.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Flow id of the rejected request.
    pub fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    /// Per-event problems, including submitted events.
    pub fn problems(&self) -> &[PublishingProblem] {
        &self.problems
    }

    /// Number of events that were not published.
    pub fn failed_count(&self) -> usize {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use tether_core::FailureKind;

    use super::*;
    use crate::model::PublishingStep;

    fn problem(eid: &str, status: PublishingStatus) -> PublishingProblem {
        PublishingProblem {
            eid: eid.to_string(),
            publishing_status: status,
            step: PublishingStep::Validating,
            detail: "bad payload".to_string(),
        }
    }

    #[test]
    fn publishing_error_counts_only_unsubmitted_events() {
        let error = PublishingError::new(
            EventType::new("publish fails"),
            FlowId::from("outa-flow"),
            vec![
                problem("1", PublishingStatus::Failed),
                problem("2", PublishingStatus::Aborted),
                problem("3", PublishingStatus::Submitted),
            ],
        );

        assert_eq!(error.failed_count(), 2);
        assert_eq!(error.problems().len(), 3);
        assert_eq!(
            error.to_string(),
            "2 events of type 'publish fails' could not be published to the event broker. \
             (Flow-ID: outa-flow)"
        );
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(BrokerError::status(503, "").is_retryable());
        assert!(!BrokerError::status(404, "").is_retryable());
        assert!(!BrokerError::configuration("bad url").is_retryable());
    }

    #[test]
    fn command_error_wrapping_follows_retryability() {
        assert_eq!(
            BrokerError::status(500, "oops").into_command_error().kind(),
            FailureKind::CommandException
        );
        assert_eq!(
            BrokerError::status(400, "nope").into_command_error().kind(),
            FailureKind::BadRequest
        );

        let publishing =
            BrokerError::publishing(EventType::new("order"), FlowId::from("f"), Vec::new());
        assert_eq!(publishing.into_command_error().kind(), FailureKind::BadRequest);

        let configuration = BrokerError::configuration("x").into_command_error();
        assert!(matches!(configuration, CommandError::Failed(_)));
    }
}
