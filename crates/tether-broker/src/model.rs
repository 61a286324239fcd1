//! Wire types shared by publishing and consuming.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of an event type registered with the broker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    /// Creates an event type from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the event type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Correlation id sent with every request in the `X-Flow-Id` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(String);

impl FlowId {
    /// Generates a random flow id.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the flow id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FlowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Publishing state of a single event in a rejected batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishingStatus {
    /// The event was published.
    Submitted,
    /// The event failed in the reported step.
    Failed,
    /// The event was not attempted because another event failed.
    Aborted,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Step of the publishing pipeline an event reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishingStep {
    /// Processing had not started.
    #[default]
    None,
    /// Schema validation.
    Validating,
    /// Partition assignment.
    Partitioning,
    /// Metadata enrichment.
    Enriching,
    /// Storage in the partition.
    Publishing,
    /// A step this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Broker report for one event of a batch that was not fully published.
///
/// Only `publishing_status` is always present; the broker may omit the
/// other fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishingProblem {
    /// Event id as given in the event metadata, empty when not reported
    #[serde(default)]
    pub eid: String,
    /// Outcome for this event
    pub publishing_status: PublishingStatus,
    /// Step the event reached
    #[serde(default)]
    pub step: PublishingStep,
    /// Human readable explanation, empty for submitted events
    #[serde(default)]
    pub detail: String,
}
