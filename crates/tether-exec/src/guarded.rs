//! Guarded execution of single-use commands.
//!
//! [`Guarded`] pairs a command factory with a [`RetryPolicy`]. Every call to
//! [`Guarded::execute`] starts from scratch: the factory is invoked for each
//! attempt, so a command is never executed twice and the same `Guarded` can
//! be executed any number of times, concurrently if needed.
//!
//! # Attempt loop
//!
//! ```text
//!   Idle ──▶ Attempting(1) ──success──▶ Succeeded
//!                 │
//!                 │ failure
//!                 ▼
//!        n < max && retryable ──yes──▶ Attempting(n + 1)
//!                 │
//!                 no
//!                 ▼
//!          FailedTerminal (root cause surfaced)
//! ```
//!
//! Dropping the returned future cancels the command in flight and no further
//! attempt is started.

use tether_core::{root_cause, unwrap_transport, Command, CommandError, Result};
use tracing::warn;

use crate::retry::{RetryContext, RetryDecision, RetryPolicy};

/// Command factory paired with a retry policy.
///
/// # Example
///
/// ```
/// use tether_core::{CommandError, CommandIdentity, FutureCommand};
/// use tether_exec::Guarded;
///
/// # async fn example() -> Result<(), CommandError> {
/// let guarded = Guarded::with_retries(
///     || {
///         let ping = async { Ok::<_, CommandError>("pong") };
///         Ok(FutureCommand::new(CommandIdentity::new("broker", "ping"), ping))
///     },
///     3,
/// )?;
///
/// assert_eq!(guarded.execute().await?, "pong");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Guarded<F> {
    factory: F,
    policy: RetryPolicy,
}

impl<F, C> Guarded<F>
where
    F: Fn() -> Result<C>,
    C: Command,
{
    /// Executes each start as exactly one attempt.
    pub fn single(factory: F) -> Self {
        Self { factory, policy: RetryPolicy::single() }
    }

    /// Retries transient failures up to `max_attempts` attempts in total.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidArgument` if `max_attempts` is zero. The
    /// factory is not invoked in that case.
    pub fn with_retries(factory: F, max_attempts: u32) -> Result<Self> {
        Ok(Self::with_policy(factory, RetryPolicy::new(max_attempts)?))
    }

    /// Uses an already validated policy.
    pub fn with_policy(factory: F, policy: RetryPolicy) -> Self {
        Self { factory, policy }
    }

    /// Runs the command, retrying according to the policy.
    ///
    /// Yields the first successful value, or the root cause of the failure
    /// that ended the attempt loop. Wrapper layers never reach the caller.
    ///
    /// # Errors
    ///
    /// Returns the unwrapped failure of the last attempt made, or of the
    /// factory if it could not build a command.
    pub async fn execute(&self) -> Result<C::Output> {
        if self.policy.retries() {
            self.execute_with_retries().await
        } else {
            self.execute_once().await
        }
    }

    async fn execute_once(&self) -> Result<C::Output> {
        let command = (self.factory)().map_err(unwrap_transport)?;
        command.execute().await.map_err(unwrap_transport)
    }

    async fn execute_with_retries(&self) -> Result<C::Output> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt_number = 0;

        loop {
            attempt_number += 1;

            let error = match (self.factory)() {
                Ok(command) => {
                    let identity = command.identity();
                    match command.execute().await {
                        Ok(value) => return Ok(value),
                        Err(error) => CommandError::attempt(identity, attempt_number, error),
                    }
                },
                Err(error) => error,
            };

            let classification = RetryContext { attempt_number, max_attempts, error: &error }.classify();
            let diagnostics = &classification.diagnostics;

            match (classification.decision, &diagnostics.command) {
                (RetryDecision::Retry, Some(command)) => {
                    warn!(
                        command = %command,
                        attempt = diagnostics.attempt,
                        root_cause = %diagnostics.root_cause,
                        "Retrying command after failed attempt"
                    );
                },
                (RetryDecision::GiveUp { reason }, Some(command)) => {
                    warn!(
                        command = %command,
                        attempt = diagnostics.attempt,
                        root_cause = %diagnostics.root_cause,
                        %reason,
                        "Not retrying command after failed attempt"
                    );
                    return Err(root_cause(error));
                },
                (_, None) => {
                    warn!(
                        attempt = diagnostics.attempt,
                        root_cause = %diagnostics.root_cause,
                        "Not retrying after command construction failed"
                    );
                    return Err(root_cause(error));
                },
            }
        }
    }
}

/// Runs a command built by `factory` once.
///
/// Transport wrappers around the failure are replaced by their cause.
///
/// # Errors
///
/// Returns the unwrapped failure of the command or of the factory.
pub async fn execute<F, C>(factory: F) -> Result<C::Output>
where
    F: Fn() -> Result<C>,
    C: Command,
{
    Guarded::single(factory).execute().await
}

/// Runs commands built by `factory` until one succeeds, a terminal failure
/// occurs, or `max_attempts` attempts have been made.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` without invoking the factory if
/// `max_attempts` is zero, otherwise the root cause of the last failure.
pub async fn execute_with_retries<F, C>(factory: F, max_attempts: u32) -> Result<C::Output>
where
    F: Fn() -> Result<C>,
    C: Command,
{
    Guarded::with_retries(factory, max_attempts)?.execute().await
}
