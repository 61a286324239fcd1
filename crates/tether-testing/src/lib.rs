//! Test infrastructure for guarded execution.
//!
//! Provides scripted commands whose attempts can be counted and cancelled,
//! and a wiremock-backed event broker for client tests.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod http;
pub mod scripted;

pub use http::{MockBroker, RecordedRequest};
pub use scripted::{Outcome, ScriptedCommand, ScriptedFactory, ValidationError};
