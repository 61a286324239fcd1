//! Guarded execution with bounded, immediate retries.
//!
//! Runs [`Command`](tether_core::Command)s built by a caller-supplied factory
//! either once or under a [`RetryPolicy`]. Each attempt gets a freshly built
//! command, and failures reach the caller with every wrapper layer stripped.
//!
//! # Retry Rules
//!
//! - **Budget** - at most `max_attempts` attempts per call, counting the first
//! - **Transient only** - only timeouts and command exceptions are retried
//! - **No delay** - the next attempt starts as soon as the previous one failed
//! - **Diagnostics** - every decision is logged with command identity, attempt
//!   number and root cause
//!
//! # Example
//!
//! ```no_run
//! use tether_core::{CommandError, CommandIdentity, FutureCommand};
//!
//! # async fn example() -> Result<(), CommandError> {
//! let value = tether_exec::execute_with_retries(
//!     || {
//!         let lookup = async { Ok::<_, CommandError>(7) };
//!         Ok(FutureCommand::new(CommandIdentity::new("inventory", "lookup"), lookup))
//!     },
//!     tether_exec::DEFAULT_MAX_ATTEMPTS,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod guarded;
pub mod retry;

pub use guarded::{execute, execute_with_retries, Guarded};
pub use retry::{
    classify, Classification, Diagnostics, GiveUpReason, RetryContext, RetryDecision, RetryPolicy,
};

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
