//! Tether event publisher.
//!
//! Reads a JSON array of events from stdin and publishes it to the
//! configured event type, retrying transient broker failures. Exits with a
//! non-zero status when the events could not be published.

use anyhow::{Context, Result};
use serde_json::Value;
use tether_broker::{BrokerClient, BrokerError};
use tether_core::CommandError;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config.rust_log)?;

    let event_type = config.event_type();
    let policy = config.to_retry_policy()?;
    info!(
        broker_url = %config.broker_url,
        event_type = %event_type,
        max_attempts = policy.max_attempts(),
        timeout_ms = config.request_timeout_ms,
        "Configuration loaded"
    );

    let events = read_events().await?;
    if events.is_empty() {
        info!("No events to publish");
        return Ok(());
    }

    let client = BrokerClient::new(&config.to_client_config(), config.access_token())
        .context("Failed to create broker client")?;
    let flow_id = config.flow_id();

    let publish = client.publish_with_policy(&event_type, &events, policy, flow_id.clone());

    tokio::select! {
        result = publish => match result {
            Ok(()) => {
                info!(events = events.len(), flow_id = %flow_id, "Events published");
                Ok(())
            },
            Err(e) => {
                report_failure(&e);
                Err(e).context("Failed to publish events")
            },
        },
        _ = tokio::signal::ctrl_c() => {
            warn!(flow_id = %flow_id, "Interrupted, abandoning publish");
            anyhow::bail!("Publishing interrupted")
        }
    }
}

/// Initializes tracing with the configured filter directives.
fn init_tracing(directives: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(directives).context("Invalid RUST_LOG filter")?;

    let fmt_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

/// Reads the events to publish from stdin.
async fn read_events() -> Result<Vec<Value>> {
    let mut input = Vec::new();
    tokio::io::stdin().read_to_end(&mut input).await.context("Failed to read stdin")?;

    serde_json::from_slice(&input).context("stdin must contain a JSON array of events")
}

/// Logs every event the broker refused to publish.
fn report_failure(error: &CommandError) {
    let Some(BrokerError::Publishing(publishing)) = error.downcast_cause_ref::<BrokerError>() else {
        error!(error = %error, "Publishing failed");
        return;
    };

    for problem in publishing.problems() {
        error!(
            eid = %problem.eid,
            status = ?problem.publishing_status,
            step = ?problem.step,
            detail = %problem.detail,
            "Event not published"
        );
    }
    error!(
        failed = publishing.failed_count(),
        flow_id = %publishing.flow_id(),
        "{publishing}"
    );
}
