//! Scripted commands with observable attempt counters.
//!
//! A [`ScriptedFactory`] hands out one command per call, each resolving to
//! the next [`Outcome`] of its script. Once the script is used up the last
//! outcome repeats. Counters record how many commands were created, how many
//! were executed and how many were dropped while still running.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use tether_core::{Command, CommandError, CommandIdentity, Result, RuntimeFailure};

/// What a scripted attempt does.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// The command yields this value.
    Succeed(T),
    /// The command fails with this error.
    Fail(CommandError),
    /// The command never completes.
    Hang,
    /// The factory fails with this error instead of building a command.
    Unbuildable(CommandError),
}

/// Business validation failure used as a non-retryable root cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {field}")]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
}

impl ValidationError {
    /// Creates a validation failure for `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

/// Runtime timeout, retryable.
pub fn timeout() -> CommandError {
    CommandError::timeout("scripted timeout")
}

/// Command exception caused by an I/O error, retryable.
pub fn command_exception(detail: &str) -> CommandError {
    CommandError::runtime_caused_by(
        RuntimeFailure::CommandException,
        "scripted command exception",
        std::io::Error::new(std::io::ErrorKind::ConnectionReset, detail.to_string()),
    )
}

/// Runtime failure of the given kind without a recorded cause.
pub fn runtime(kind: RuntimeFailure) -> CommandError {
    CommandError::runtime(kind, format!("scripted {kind}"))
}

/// Bad request wrapping a [`ValidationError`], not retryable.
pub fn validation(field: &str) -> CommandError {
    CommandError::bad_request_caused_by("scripted bad request", ValidationError::new(field))
}

#[derive(Debug)]
struct Script<T> {
    identity: CommandIdentity,
    outcomes: Vec<Outcome<T>>,
    created: AtomicU32,
    executed: AtomicU32,
    abandoned: AtomicU32,
}

/// Factory producing commands that follow a fixed script.
///
/// Cloning shares the script and its counters.
#[derive(Debug)]
pub struct ScriptedFactory<T> {
    script: Arc<Script<T>>,
}

impl<T> Clone for ScriptedFactory<T> {
    fn clone(&self) -> Self {
        Self { script: self.script.clone() }
    }
}

impl<T> ScriptedFactory<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a factory for commands identified as `test.scripted`.
    pub fn new(outcomes: impl IntoIterator<Item = Outcome<T>>) -> Self {
        Self::with_identity(CommandIdentity::new("test", "scripted"), outcomes)
    }

    /// Creates a factory whose commands carry `identity`.
    pub fn with_identity(
        identity: CommandIdentity,
        outcomes: impl IntoIterator<Item = Outcome<T>>,
    ) -> Self {
        Self {
            script: Arc::new(Script {
                identity,
                outcomes: outcomes.into_iter().collect(),
                created: AtomicU32::new(0),
                executed: AtomicU32::new(0),
                abandoned: AtomicU32::new(0),
            }),
        }
    }

    /// Factory that always yields `outcome`.
    pub fn always(outcome: Outcome<T>) -> Self {
        Self::new([outcome])
    }

    /// Builds the next command of the script.
    ///
    /// # Errors
    ///
    /// Fails with the scripted error for [`Outcome::Unbuildable`], or with
    /// `InvalidArgument` if the script is empty.
    pub fn create(&self) -> Result<ScriptedCommand<T>> {
        let index = self.script.created.fetch_add(1, Ordering::SeqCst) as usize;
        let outcome = self
            .script
            .outcomes
            .get(index)
            .or_else(|| self.script.outcomes.last())
            .cloned()
            .ok_or_else(|| CommandError::invalid_argument("scripted factory has no outcomes"))?;

        match outcome {
            Outcome::Unbuildable(error) => Err(error),
            outcome => Ok(ScriptedCommand { outcome, script: self.script.clone() }),
        }
    }

    /// Closure form of [`ScriptedFactory::create`], for the executors.
    pub fn factory(&self) -> impl Fn() -> Result<ScriptedCommand<T>> + Clone + Send + Sync {
        let factory = self.clone();
        move || factory.create()
    }

    /// Number of factory invocations, including failed ones.
    pub fn created(&self) -> u32 {
        self.script.created.load(Ordering::SeqCst)
    }

    /// Number of commands whose execution started.
    pub fn executed(&self) -> u32 {
        self.script.executed.load(Ordering::SeqCst)
    }

    /// Number of hanging commands dropped before completion.
    pub fn abandoned(&self) -> u32 {
        self.script.abandoned.load(Ordering::SeqCst)
    }
}

/// One command built by a [`ScriptedFactory`].
#[derive(Debug)]
pub struct ScriptedCommand<T> {
    outcome: Outcome<T>,
    script: Arc<Script<T>>,
}

struct AbandonProbe<T> {
    script: Arc<Script<T>>,
}

impl<T> Drop for AbandonProbe<T> {
    fn drop(&mut self) {
        self.script.abandoned.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<T> Command for ScriptedCommand<T>
where
    T: Send + Sync + 'static,
{
    type Output = T;

    fn identity(&self) -> CommandIdentity {
        self.script.identity.clone()
    }

    async fn execute(self) -> Result<T> {
        self.script.executed.fetch_add(1, Ordering::SeqCst);

        match self.outcome {
            Outcome::Succeed(value) => Ok(value),
            Outcome::Fail(error) | Outcome::Unbuildable(error) => Err(error),
            Outcome::Hang => {
                let _probe = AbandonProbe { script: self.script };
                std::future::pending::<Result<T>>().await
            },
        }
    }
}
