//! Failure types produced by guarded commands.
//!
//! A command fails with a [`CommandError`]. Two variants are wrappers added
//! by the execution framework around the real cause (`BadRequest` and
//! `Runtime`), one is the orchestrator's own diagnostic wrapper (`Attempt`),
//! and the rest carry the root cause directly. Every failure maps to a
//! [`FailureKind`] which drives retry decisions.

use std::{error::Error as StdError, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::CommandIdentity;

/// Result type alias for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Shared, type-erased root cause of a failure.
///
/// Reference counted so failures stay cheap to clone while the concrete error
/// can still be recovered with [`CommandError::downcast_cause_ref`].
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Reason the execution framework terminated a command at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeFailure {
    /// The command did not finish within its time budget.
    Timeout,
    /// The command's own execution raised an error.
    CommandException,
    /// The circuit guarding the dependency was open.
    ShortCircuited,
    /// The command was refused because the dependency was saturated.
    Rejected,
}

impl fmt::Display for RuntimeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::CommandException => write!(f, "command_exception"),
            Self::ShortCircuited => write!(f, "short_circuited"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Classification of a failure for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Command timed out.
    Timeout,
    /// Command raised an error while executing.
    CommandException,
    /// Circuit breaker refused the call.
    ShortCircuited,
    /// Dependency refused the call due to saturation.
    Rejected,
    /// The request itself was invalid.
    BadRequest,
    /// Anything else, including business and validation errors.
    Other,
}

impl FailureKind {
    /// Returns whether this layer retries failures of this kind.
    ///
    /// Only timeouts and command exceptions are retried. Short-circuited and
    /// rejected calls are terminal so an unhealthy or saturated dependency is
    /// not hit again immediately.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::CommandException)
    }
}

impl From<RuntimeFailure> for FailureKind {
    fn from(failure: RuntimeFailure) -> Self {
        match failure {
            RuntimeFailure::Timeout => Self::Timeout,
            RuntimeFailure::CommandException => Self::CommandException,
            RuntimeFailure::ShortCircuited => Self::ShortCircuited,
            RuntimeFailure::Rejected => Self::Rejected,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::CommandException => write!(f, "command_exception"),
            Self::ShortCircuited => write!(f, "short_circuited"),
            Self::Rejected => write!(f, "rejected"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Failure of a guarded command or of its orchestration.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// A precondition of the call was violated before anything executed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport wrapper: the dependency rejected the request as invalid.
    #[error("bad request: {message}")]
    BadRequest {
        /// Description supplied by the framework
        message: String,
        /// Underlying error, if one was recorded
        #[source]
        cause: Option<Cause>,
    },

    /// Transport wrapper: the framework terminated the command.
    #[error("{kind}: {message}")]
    Runtime {
        /// Why the command was terminated
        kind: RuntimeFailure,
        /// Description supplied by the framework
        message: String,
        /// Underlying error, if one was recorded
        #[source]
        cause: Option<Cause>,
    },

    /// Diagnostic wrapper recording which command failed on which attempt.
    ///
    /// Produced by retry orchestration and always stripped before a failure
    /// is handed back to the caller.
    #[error("{identity} failed on attempt {attempt}")]
    Attempt {
        /// Identity of the failed command
        identity: CommandIdentity,
        /// Attempt number (1-based)
        attempt: u32,
        /// Failure reported by the command
        #[source]
        source: Box<CommandError>,
    },

    /// A root cause that is not wrapped by the framework.
    #[error(transparent)]
    Failed(Cause),
}

impl CommandError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a bad request wrapper without a recorded cause.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), cause: None }
    }

    /// Creates a bad request wrapper around `cause`.
    pub fn bad_request_caused_by<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::BadRequest { message: message.into(), cause: Some(Arc::new(cause)) }
    }

    /// Creates a runtime wrapper without a recorded cause.
    pub fn runtime(kind: RuntimeFailure, message: impl Into<String>) -> Self {
        Self::Runtime { kind, message: message.into(), cause: None }
    }

    /// Creates a runtime wrapper around `cause`.
    pub fn runtime_caused_by<E>(kind: RuntimeFailure, message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Runtime { kind, message: message.into(), cause: Some(Arc::new(cause)) }
    }

    /// Creates a runtime timeout wrapper.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::runtime(RuntimeFailure::Timeout, message)
    }

    /// Creates a bare root-cause failure.
    pub fn failed<E>(cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Failed(Arc::new(cause))
    }

    /// Wraps `source` in the diagnostic layer for the given attempt.
    pub fn attempt(identity: CommandIdentity, attempt: u32, source: Self) -> Self {
        Self::Attempt { identity, attempt, source: Box::new(source) }
    }

    /// Returns the retry classification of this failure.
    ///
    /// The diagnostic wrapper is transparent: it reports the kind of the
    /// failure it wraps.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Runtime { kind, .. } => FailureKind::from(*kind),
            Self::BadRequest { .. } => FailureKind::BadRequest,
            Self::Attempt { source, .. } => source.kind(),
            Self::InvalidArgument(_) | Self::Failed(_) => FailureKind::Other,
        }
    }

    /// Returns whether this failure may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Borrows the innermost error without consuming the wrapper layers.
    ///
    /// Mirrors [`crate::root_cause`]: a wrapper without a recorded cause is
    /// its own root cause.
    pub fn root_cause_ref(&self) -> &(dyn StdError + 'static) {
        match self {
            Self::Attempt { source, .. } => source.root_cause_ref(),
            Self::BadRequest { cause: Some(cause), .. }
            | Self::Runtime { cause: Some(cause), .. }
            | Self::Failed(cause) => &**cause,
            _ => self,
        }
    }

    /// Downcasts the carried root cause to a concrete error type.
    ///
    /// Looks through every wrapper layer; returns `None` when there is no
    /// recorded cause or it is of a different type.
    pub fn downcast_cause_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Attempt { source, .. } => source.downcast_cause_ref(),
            Self::BadRequest { cause: Some(cause), .. }
            | Self::Runtime { cause: Some(cause), .. }
            | Self::Failed(cause) => cause.downcast_ref::<E>(),
            _ => None,
        }
    }
}
