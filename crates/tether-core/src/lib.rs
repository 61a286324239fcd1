//! Command abstraction and failure taxonomy for guarded execution.
//!
//! Defines the single-use [`Command`] a guarded dependency is called through,
//! the tagged [`CommandError`] it fails with, and the pure functions that
//! strip wrapper layers down to the root cause. The retry orchestration in
//! `tether-exec` and the broker client in `tether-broker` both build on these
//! types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod unwrap;

pub use command::{Command, CommandIdentity, FutureCommand};
pub use error::{Cause, CommandError, FailureKind, Result, RuntimeFailure};
pub use unwrap::{root_cause, unwrap_diagnostic, unwrap_transport};
