//! Retry policy and the pure retry classifier.
//!
//! Retries are immediate and sequential: there is no backoff and no jitter.
//! A failed attempt is retried only while budget remains and only when it
//! failed with a timeout or a command exception. Everything else, including
//! short-circuited and rejected calls, ends the loop at once.
//!
//! The classifier never logs. It returns the decision together with the
//! fields the orchestrator writes to the log.

use std::fmt;

use serde::{Deserialize, Serialize};
use tether_core::{CommandError, CommandIdentity, FailureKind, Result};

use crate::DEFAULT_MAX_ATTEMPTS;

/// Retry policy for guarded execution.
///
/// Holds the total number of attempts, including the initial one. The value
/// is validated on construction and on deserialization, so a policy always
/// allows at least one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRetryPolicy")]
pub struct RetryPolicy {
    max_attempts: u32,
}

#[derive(Deserialize)]
struct UncheckedRetryPolicy {
    max_attempts: u32,
}

impl TryFrom<UncheckedRetryPolicy> for RetryPolicy {
    type Error = CommandError;

    fn try_from(unchecked: UncheckedRetryPolicy) -> Result<Self> {
        Self::new(unchecked.max_attempts)
    }
}

impl RetryPolicy {
    /// Creates a policy allowing up to `max_attempts` attempts.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidArgument` if `max_attempts` is zero.
    pub fn new(max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(CommandError::invalid_argument(format!(
                "max_attempts must be positive: {max_attempts}"
            )));
        }
        Ok(Self { max_attempts })
    }

    /// Policy that never retries.
    pub const fn single() -> Self {
        Self { max_attempts: 1 }
    }

    /// Total number of attempts allowed.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns whether this policy allows more than one attempt.
    pub const fn retries(&self) -> bool {
        self.max_attempts > 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS }
    }
}

/// Failure of one attempt, as seen by the retry decision.
///
/// Built right after an attempt fails and dropped once the decision has been
/// logged.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    /// Attempt that just failed (1-based).
    pub attempt_number: u32,
    /// Attempt budget of the current call.
    pub max_attempts: u32,
    /// The failure, normally wrapped in the diagnostic layer.
    pub error: &'a CommandError,
}

/// Whether another attempt should be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Build a fresh command and run the next attempt.
    Retry,
    /// Stop and surface the failure.
    GiveUp {
        /// Why no further attempt is made
        reason: GiveUpReason,
    },
}

/// Reason a failed attempt is not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// All attempts of the budget have been used.
    AttemptsExhausted {
        /// Budget that was used up
        max_attempts: u32,
    },
    /// The failure kind is terminal for this layer.
    NotRetryable {
        /// Kind of the failure
        kind: FailureKind,
    },
    /// No command was built, so there is nothing to retry.
    CommandNotCreated,
}

impl fmt::Display for GiveUpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttemptsExhausted { max_attempts } => {
                write!(f, "maximum attempts ({max_attempts}) exhausted")
            },
            Self::NotRetryable { kind } => write!(f, "non-retryable failure: {kind}"),
            Self::CommandNotCreated => write!(f, "command could not be created"),
        }
    }
}

/// Fields describing a retry decision in the diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// Command that failed; absent when the factory itself failed.
    pub command: Option<CommandIdentity>,
    /// Attempt that failed (1-based).
    pub attempt: u32,
    /// Description of the innermost cause.
    pub root_cause: String,
}

/// Outcome of classifying a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// What to do next.
    pub decision: RetryDecision,
    /// What to log about it.
    pub diagnostics: Diagnostics,
}

impl RetryContext<'_> {
    /// Decides whether the failed attempt is retried.
    ///
    /// Retries iff the attempt is below the budget and the failure kind is
    /// retryable. When both conditions fail, exhaustion is reported.
    pub fn classify(&self) -> Classification {
        let diagnostics = Diagnostics {
            command: match self.error {
                CommandError::Attempt { identity, .. } => Some(identity.clone()),
                _ => None,
            },
            attempt: self.attempt_number,
            root_cause: self.error.root_cause_ref().to_string(),
        };

        Classification { decision: self.decide_retry(), diagnostics }
    }

    /// Computes only the retry decision.
    pub fn decide_retry(&self) -> RetryDecision {
        // Failures that did not come out of an executed command are terminal.
        if !matches!(self.error, CommandError::Attempt { .. }) {
            return RetryDecision::GiveUp { reason: GiveUpReason::CommandNotCreated };
        }

        if self.attempt_number >= self.max_attempts {
            return RetryDecision::GiveUp {
                reason: GiveUpReason::AttemptsExhausted { max_attempts: self.max_attempts },
            };
        }

        let kind = self.error.kind();
        if !kind.is_retryable() {
            return RetryDecision::GiveUp { reason: GiveUpReason::NotRetryable { kind } };
        }

        RetryDecision::Retry
    }
}

/// Classifies a failed attempt.
pub fn classify(error: &CommandError, attempt_number: u32, max_attempts: u32) -> Classification {
    RetryContext { attempt_number, max_attempts, error }.classify()
}
