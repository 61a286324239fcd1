//! Integration tests for the broker client.
//!
//! Runs publish calls against a wiremock broker and checks the wire format,
//! the mapping of responses to failures, and which failures are retried.

#![allow(clippy::expect_used)]

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tether_broker::{
    AccessToken, BrokerClient, BrokerError, ClientConfig, EventType, FlowId, PublishingStatus,
};
use tether_core::CommandError;
use tether_exec::RetryPolicy;
use tether_testing::{http, MockBroker};
use wiremock::ResponseTemplate;

fn client_for(broker: &MockBroker) -> BrokerClient {
    client_with_timeout(&broker.url(), Duration::from_secs(5))
}

fn client_with_timeout(base_url: &str, timeout: Duration) -> BrokerClient {
    let config = ClientConfig { base_url: base_url.to_string(), timeout, ..Default::default() };
    BrokerClient::new(&config, AccessToken::new("secret-token")).expect("valid client config")
}

fn broker_error(error: &CommandError) -> &BrokerError {
    error.downcast_cause_ref::<BrokerError>().expect("broker error as root cause")
}

/// Successful publish of a small batch.
///
/// Verifies the request line, headers and body the broker receives.
#[tokio::test]
async fn publish_sends_events_with_expected_headers() -> Result<()> {
    let broker = MockBroker::start().await;
    broker.respond_always(ResponseTemplate::new(200)).await;

    let events = vec![json!({"order_number": "A-1"}), json!({"order_number": "A-2"})];
    client_for(&broker).publish(&EventType::new("order.created"), &events, 3).await?;

    let requests = broker.received_requests().await;
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/event-types/order.created/events");
    assert_eq!(request.header("authorization"), Some("Bearer secret-token"));
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_eq!(request.header("content-type"), Some("application/json; charset=utf-8"));
    assert!(request.header("x-flow-id").is_some());
    assert_eq!(request.json()?, json!(events));
    Ok(())
}

/// Broker rejects events of the batch with 422.
///
/// Verifies the publishing error message, that the flow id comes from the
/// response, and that the rejection is not retried.
#[tokio::test]
async fn unprocessable_batch_reports_publishing_problems() {
    let broker = MockBroker::start().await;
    broker
        .respond_always(http::publishing_problems(
            422,
            "outa-flow",
            &[("1", "error reading event"), ("2", "error reading event")],
            &[],
        ))
        .await;

    let error = client_for(&broker)
        .publish(&EventType::new("publish fails"), &[json!({}), json!({})], 3)
        .await
        .expect_err("publish should fail");

    assert!(matches!(error, CommandError::Failed(_)));
    assert_eq!(
        error.to_string(),
        "2 events of type 'publish fails' could not be published to the event broker. \
         (Flow-ID: outa-flow)"
    );

    match broker_error(&error) {
        BrokerError::Publishing(publishing) => {
            assert_eq!(publishing.event_type().as_str(), "publish fails");
            assert_eq!(publishing.flow_id().as_str(), "outa-flow");
            assert_eq!(publishing.problems().len(), 2);
        },
        other => panic!("expected publishing error, got {other:?}"),
    }

    let requests = broker.received_requests().await;
    assert_eq!(requests.len(), 1, "rejected batch must not be retried");
    assert_eq!(requests[0].path, "/event-types/publish%20fails/events");
}

/// Broker rejects a batch with problems that carry only status and detail.
#[tokio::test]
async fn minimal_problems_still_report_publishing_error() {
    let broker = MockBroker::start().await;
    broker
        .respond_always(
            ResponseTemplate::new(422)
                .set_body_json(json!([{"publishing_status": "failed", "detail": "schema"}])),
        )
        .await;

    let error = client_for(&broker)
        .publish_with_policy(
            &EventType::new("order.created"),
            &[json!({})],
            RetryPolicy::new(3).expect("valid policy"),
            FlowId::from("minimal-flow"),
        )
        .await
        .expect_err("publish should fail");

    let BrokerError::Publishing(publishing) = broker_error(&error) else {
        panic!("expected publishing error, got {error:?}");
    };
    assert_eq!(publishing.flow_id().as_str(), "minimal-flow");
    assert_eq!(publishing.failed_count(), 1);
    assert!(publishing.problems()[0].eid.is_empty());
    assert_eq!(publishing.problems()[0].detail, "schema");
    broker.assert_request_count(1).await;
}

/// Partially published batch answered with 207.
#[tokio::test]
async fn partial_success_counts_only_failed_events() {
    let broker = MockBroker::start().await;
    broker
        .respond_always(http::publishing_problems(
            207,
            "partial-flow",
            &[("2", "schema mismatch")],
            &["1"],
        ))
        .await;

    let error = client_for(&broker)
        .publish(&EventType::new("order.created"), &[json!({}), json!({})], 3)
        .await
        .expect_err("partial success is a failure");

    let BrokerError::Publishing(publishing) = broker_error(&error) else {
        panic!("expected publishing error, got {error:?}");
    };
    assert_eq!(publishing.failed_count(), 1);
    assert_eq!(publishing.problems()[1].publishing_status, PublishingStatus::Submitted);
    broker.assert_request_count(1).await;
}

/// Server error followed by success.
///
/// Verifies that the retry reuses the body and the flow id of the call.
#[tokio::test]
async fn server_error_retried_with_same_flow_id() -> Result<()> {
    let broker = MockBroker::start().await;
    broker
        .respond_in_sequence([ResponseTemplate::new(503), ResponseTemplate::new(200)])
        .await;

    client_for(&broker)
        .publish_with_policy(
            &EventType::new("order.created"),
            &[json!({"order_number": "A-1"})],
            RetryPolicy::new(3)?,
            FlowId::from("retry-flow"),
        )
        .await?;

    let requests = broker.received_requests().await;
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.header("x-flow-id"), Some("retry-flow"));
        assert_eq!(request.json()?, json!([{"order_number": "A-1"}]));
    }
    Ok(())
}

/// Persistent server errors exhaust the budget.
#[tokio::test]
async fn persistent_server_error_exhausts_attempts() {
    let broker = MockBroker::start().await;
    broker.respond_always(http::problem(500, "Internal Server Error", "boom")).await;

    let error = client_for(&broker)
        .publish(&EventType::new("order.created"), &[json!({})], 3)
        .await
        .expect_err("publish should fail");

    assert!(matches!(broker_error(&error), BrokerError::Status { status_code: 500, .. }));
    broker.assert_request_count(3).await;
}

/// Client errors other than 422 are terminal.
#[tokio::test]
async fn client_error_not_retried() {
    let broker = MockBroker::start().await;
    broker.respond_always(http::problem(403, "Forbidden", "not allowed")).await;

    let error = client_for(&broker)
        .publish(&EventType::new("order.created"), &[json!({})], 5)
        .await
        .expect_err("publish should fail");

    match broker_error(&error) {
        BrokerError::Status { status_code, body } => {
            assert_eq!(*status_code, 403);
            assert!(body.contains("not allowed"));
        },
        other => panic!("expected status error, got {other:?}"),
    }
    broker.assert_request_count(1).await;
}

/// Slow broker answers after the client timeout on every attempt.
#[tokio::test]
async fn request_timeout_surfaces_transport_error() {
    let broker = MockBroker::start().await;
    broker.respond_slowly(200, Duration::from_secs(2)).await;

    let client = client_with_timeout(&broker.url(), Duration::from_millis(100));
    let error = client
        .publish(&EventType::new("order.created"), &[json!({})], 2)
        .await
        .expect_err("publish should time out");

    let transport = error.downcast_cause_ref::<reqwest::Error>().expect("reqwest root cause");
    assert!(transport.is_timeout());
    broker.assert_request_count(2).await;
}

/// Unreachable broker is retried as a command exception.
#[tokio::test]
async fn connection_failure_retried_until_budget_exhausted() {
    let client = client_with_timeout("http://127.0.0.1:1", Duration::from_secs(1));

    let error = client
        .publish(&EventType::new("order.created"), &[json!({})], 2)
        .await
        .expect_err("publish should fail");

    assert!(error.downcast_cause_ref::<reqwest::Error>().is_some());
}

/// A zero budget is rejected before any request is sent.
#[tokio::test]
async fn zero_attempts_sends_nothing() {
    let broker = MockBroker::start().await;
    broker.respond_always(ResponseTemplate::new(200)).await;

    let error = client_for(&broker)
        .publish(&EventType::new("order.created"), &[json!({})], 0)
        .await
        .expect_err("zero attempts rejected");

    assert!(matches!(error, CommandError::InvalidArgument(_)));
    broker.assert_request_count(0).await;
}
