//! Parsing of streamed event batches.
//!
//! The broker streams one JSON document per line, each carrying the cursor
//! to commit and the events read since the previous batch. Keep-alive
//! batches have a cursor but no `events` field.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{BrokerError, Result};

/// One batch of a consumed event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: Deserialize<'de>"))]
pub struct EventBatch<E> {
    /// Cursor to commit once the events are processed; opaque to the client
    #[serde(default)]
    pub cursor: Value,
    /// Events of the batch, empty for keep-alive batches
    #[serde(default, deserialize_with = "null_as_empty")]
    pub events: Vec<E>,
}

impl<E> EventBatch<E> {
    /// Returns whether this batch only keeps the stream alive.
    pub fn is_keep_alive(&self) -> bool {
        self.events.is_empty()
    }
}

fn null_as_empty<'de, D, E>(deserializer: D) -> std::result::Result<Vec<E>, D::Error>
where
    D: Deserializer<'de>,
    E: Deserialize<'de>,
{
    Ok(Option::<Vec<E>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses a single batch.
///
/// # Errors
///
/// Returns `BrokerError::Json` if the input is not a valid batch document.
pub fn parse_batch<E: DeserializeOwned>(line: &str) -> Result<EventBatch<E>> {
    serde_json::from_str(line).map_err(|e| BrokerError::json(&e))
}

/// Parses a newline-delimited stream of batches, skipping blank lines.
///
/// # Errors
///
/// Returns `BrokerError::Json` for the first line that fails to parse.
pub fn parse_batches<E: DeserializeOwned>(input: &str) -> Result<Vec<EventBatch<E>>> {
    input.lines().filter(|line| !line.trim().is_empty()).map(parse_batch).collect()
}
