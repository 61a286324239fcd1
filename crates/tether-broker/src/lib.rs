//! Event broker client built on guarded execution.
//!
//! Publishes batches of events over HTTP, with every attempt running as a
//! single-use command under `tether-exec`'s retry orchestration, and models
//! the consuming side of the broker (event batches and subscriptions).
//!
//! # Failure Mapping
//!
//! - **5xx, connection errors** - command exception, retried
//! - **Request timeouts** - timeout, retried
//! - **207, 422** - bad request carrying [`PublishingError`], not retried
//! - **Other 4xx** - bad request, not retried
//!
//! # Example
//!
//! ```no_run
//! use tether_broker::{AccessToken, BrokerClient, ClientConfig, EventType};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig { base_url: "https://broker.example.com".into(), ..Default::default() };
//! let client = BrokerClient::new(&config, AccessToken::new("token"))?;
//!
//! let events = [serde_json::json!({"order_number": "A-1"})];
//! client.publish(&EventType::new("order.created"), &events, 3).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod client;
pub mod error;
pub mod model;
pub mod subscription;

pub use batch::{parse_batch, parse_batches, EventBatch};
pub use client::{AccessToken, BrokerClient, ClientConfig, PublishCommand};
pub use error::{BrokerError, PublishingError, Result};
pub use model::{EventType, FlowId, PublishingProblem, PublishingStatus, PublishingStep};
pub use subscription::{Subscription, POSITION_BEGIN, POSITION_END};

/// Header carrying the request correlation id.
pub const FLOW_ID_HEADER: &str = "X-Flow-Id";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
