//! Single-use guarded commands.
//!
//! A [`Command`] represents exactly one execution attempt against a guarded
//! dependency. `execute` consumes the command, so running the same instance
//! twice does not compile; callers that need another attempt build a fresh
//! command from their factory.

use std::{fmt, future::Future};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Diagnostic identity of a command: the group it belongs to and its key.
///
/// Used for log output only; it plays no part in execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandIdentity {
    group: String,
    key: String,
}

impl CommandIdentity {
    /// Creates an identity from a command group and key.
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self { group: group.into(), key: key.into() }
    }

    /// Command group name.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Command key within the group.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CommandIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.key)
    }
}

/// One execution attempt against a guarded dependency.
///
/// Implementations yield exactly one value or one failure. Failures raised by
/// the execution framework should use the wrapper variants of
/// [`CommandError`](crate::CommandError) so retry decisions can tell
/// transient from terminal failures.
#[async_trait]
pub trait Command: Send {
    /// Value produced on success.
    type Output: Send;

    /// Returns the identity used in diagnostics.
    fn identity(&self) -> CommandIdentity;

    /// Executes the command, consuming it.
    async fn execute(self) -> Result<Self::Output>;
}

/// Command backed by a not-yet-started future.
///
/// Adapts plain async code to the [`Command`] contract. The future is cold
/// until [`Command::execute`] polls it, so building a `FutureCommand` per
/// attempt keeps every attempt independent.
pub struct FutureCommand<Fut> {
    identity: CommandIdentity,
    future: Fut,
}

impl<Fut> FutureCommand<Fut> {
    /// Creates a command that resolves `future` under the given identity.
    pub fn new(identity: CommandIdentity, future: Fut) -> Self {
        Self { identity, future }
    }
}

impl<Fut> fmt::Debug for FutureCommand<Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureCommand").field("identity", &self.identity).finish_non_exhaustive()
    }
}

#[async_trait]
impl<Fut, T> Command for FutureCommand<Fut>
where
    Fut: Future<Output = Result<T>> + Send,
    T: Send,
{
    type Output = T;

    fn identity(&self) -> CommandIdentity {
        self.identity.clone()
    }

    async fn execute(self) -> Result<T> {
        self.future.await
    }
}
