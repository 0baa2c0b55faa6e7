//! Step abstraction for the sequential runner.
//!
//! A step is a deferred unit of test work. It is created when it is enqueued,
//! invoked at most once, and dropped after it returns its [`StepOutcome`].
//! Returning the outcome is the step's completion signal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::clock::SharedClock;
use crate::config::millis;
use crate::controller::SharedController;
use crate::report::SharedReporter;
use crate::retry::{poll_until, BackoffPolicy, PollOutcome};

/// Position of a step in its runner's queue.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct StepId(pub usize);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome a step hands back to the runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Work finished with no verdict to report
    Done,
    /// Verification held
    Passed { message: String },
    /// Verification did not hold
    Failed { message: String },
    /// The awaited condition never held within the backoff budget
    TimedOut { message: String, attempts: u32 },
    /// The step itself did not return within the runner's step timeout
    Stalled {
        message: String,
        #[serde(rename = "limit_ms", with = "millis")]
        limit: Duration,
    },
    /// Assertion helpers already reported each verdict; `failures` counts the
    /// failing ones
    Checked { failures: usize },
}

impl StepOutcome {
    pub fn passed(message: impl Into<String>) -> Self {
        Self::Passed {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Maps a poll result onto a verdict.
    pub fn from_poll(
        poll: PollOutcome,
        on_pass: impl Into<String>,
        on_timeout: impl Into<String>,
    ) -> Self {
        match poll {
            PollOutcome::Satisfied { .. } => Self::passed(on_pass),
            PollOutcome::Exhausted { attempts, .. } => Self::TimedOut {
                message: on_timeout.into(),
                attempts,
            },
        }
    }

    /// Wraps the number of failed assertion checks.
    pub fn checked(failures: usize) -> Self {
        Self::Checked { failures }
    }

    /// True for `Failed`, `TimedOut`, `Stalled` and `Checked` with failures.
    pub fn is_failure(&self) -> bool {
        match self {
            Self::Done | Self::Passed { .. } => false,
            Self::Failed { .. } | Self::TimedOut { .. } | Self::Stalled { .. } => true,
            Self::Checked { failures } => *failures > 0,
        }
    }

    /// Message carried by the outcome, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Done | Self::Checked { .. } => None,
            Self::Passed { message }
            | Self::Failed { message }
            | Self::TimedOut { message, .. }
            | Self::Stalled { message, .. } => Some(message.as_str()),
        }
    }
}

/// Handles available to a running step.
///
/// Everything a step needs from the runner is passed in here or captured in
/// the step's own configuration when it is built; steps share no globals.
#[derive(Clone)]
pub struct StepContext {
    /// Queue position of the running step
    pub step_id: StepId,
    /// Clock used for sleeps and timestamps
    pub clock: SharedClock,
    /// Pass/fail sink
    pub reporter: SharedReporter,
    /// Privileged host hooks
    pub controller: SharedController,
    /// Backoff policy configured on the runner
    pub backoff: BackoffPolicy,
}

impl StepContext {
    /// Polls `condition` with the runner's backoff policy.
    pub async fn poll_until<F, Fut>(&self, condition: F) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        poll_until(self.clock.as_ref(), &self.backoff, condition).await
    }
}

/// A unit of work executed by the [`SequentialRunner`](crate::runner::SequentialRunner).
#[async_trait]
pub trait Step: Send + Sync {
    /// Human-readable name for logs and summaries.
    fn name(&self) -> &str;

    /// Performs the step's work and returns its outcome.
    async fn run(&self, context: &StepContext) -> StepOutcome;
}

type StepFn =
    Box<dyn Fn(StepContext) -> Pin<Box<dyn Future<Output = StepOutcome> + Send>> + Send + Sync>;

/// Step backed by an async closure.
///
/// # Example
///
/// ```ignore
/// use litmus_core::{FnStep, StepOutcome};
///
/// let step = FnStep::new("paint", |ctx| async move {
///     ctx.controller.display();
///     StepOutcome::Done
/// });
/// ```
pub struct FnStep {
    name: String,
    f: StepFn,
}

impl FnStep {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepOutcome> + Send + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(move |ctx| {
                Box::pin(f(ctx)) as Pin<Box<dyn Future<Output = StepOutcome> + Send>>
            }),
        }
    }
}

#[async_trait]
impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, context: &StepContext) -> StepOutcome {
        (self.f)(context.clone()).await
    }
}

/// What happened to one step during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: StepId,
    pub name: String,
    pub outcome: StepOutcome,
    pub started_at: DateTime<Utc>,
    /// Clock time from invocation to outcome
    #[serde(rename = "elapsed_ms", with = "millis")]
    pub elapsed: Duration,
}
