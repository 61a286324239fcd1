//! Subscription model for consuming events.
//!
//! A subscription binds an owning application and consumer group to a set of
//! event types. The broker treats subscriptions that differ only in the order
//! of their event types as the same subscription, so event types are kept in
//! a sorted set.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::EventType;

/// Start reading from the oldest available event.
pub const POSITION_BEGIN: &str = "begin";

/// Start reading from events published after the subscription was created.
pub const POSITION_END: &str = "end";

fn default_read_from() -> String {
    POSITION_END.to_string()
}

/// Subscription to one or more event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Id assigned by the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Application owning the subscription
    pub owning_application: String,
    /// Event types subscribed to, sorted and de-duplicated
    pub event_types: BTreeSet<EventType>,
    /// Distinguishes subscriptions of the same application and event types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_group: Option<String>,
    /// Creation time assigned by the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Position reading starts from
    #[serde(default = "default_read_from")]
    pub read_from: String,
}

impl Subscription {
    /// Creates a subscription reading from the end of the streams.
    pub fn new(
        owning_application: impl Into<String>,
        event_types: impl IntoIterator<Item = EventType>,
    ) -> Self {
        Self {
            id: None,
            owning_application: owning_application.into(),
            event_types: event_types.into_iter().collect(),
            consumer_group: None,
            created_at: None,
            read_from: default_read_from(),
        }
    }

    /// Sets the consumer group.
    #[must_use]
    pub fn with_consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = Some(consumer_group.into());
        self
    }

    /// Reads from the oldest available event instead of the end.
    #[must_use]
    pub fn reading_from_begin(mut self) -> Self {
        self.read_from = POSITION_BEGIN.to_string();
        self
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let event_types: Vec<&str> = self.event_types.iter().map(EventType::as_str).collect();

        let mut fields = Vec::with_capacity(6);
        if let Some(id) = &self.id {
            fields.push(format!("id={id}"));
        }
        fields.push(format!("owning_application={}", self.owning_application));
        fields.push(format!("event_types=[{}]", event_types.join(", ")));
        if let Some(consumer_group) = &self.consumer_group {
            fields.push(format!("consumer_group={consumer_group}"));
        }
        if let Some(created_at) = &self.created_at {
            fields.push(format!("created_at={}", created_at.to_rfc3339()));
        }
        fields.push(format!("read_from={}", self.read_from));

        write!(f, "Subscription{{{}}}", fields.join(", "))
    }
}
