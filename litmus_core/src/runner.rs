//! Sequential async step runner.
//!
//! Executes queued steps one at a time in enqueue order. Each call to
//! [`SequentialRunner::advance`] first yields to the event loop, so a step body
//! never runs inside the turn that requested it, then runs the head step to
//! completion and reports its outcome. When the queue is empty the runner shuts
//! down exactly once: the teardown hook runs and the controller is told the run
//! is complete.
//!
//! # Example
//!
//! ```ignore
//! use litmus_core::{FnStep, RecordingController, RecordingReporter, SequentialRunner, StepOutcome};
//! use std::sync::Arc;
//!
//! let controller = Arc::new(RecordingController::new());
//! let mut runner = SequentialRunner::new(controller, Arc::new(RecordingReporter::new()));
//! runner.enqueue(FnStep::new("first", |_ctx| async { StepOutcome::passed("first ran") }));
//! let summary = runner.run().await;
//! assert_eq!(summary.passed(), 1);
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::{Clock, SharedClock, TokioClock};
use crate::config::{ContinuationPolicy, RunnerConfig};
use crate::controller::{CompletionLatch, SharedController};
use crate::queue::StepQueue;
use crate::report::SharedReporter;
use crate::step::{Step, StepContext, StepId, StepOutcome, StepRecord};
use crate::summary::RunSummary;

type Teardown = Box<dyn FnOnce() + Send + Sync>;

/// Result of one [`advance`](SequentialRunner::advance) call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    /// The head step ran and produced this record
    Ran(StepRecord),
    /// The queue is drained and completion has been signalled
    Finished,
}

/// Runner that drains a queue of steps strictly in order.
pub struct SequentialRunner {
    queue: StepQueue,
    config: RunnerConfig,
    clock: SharedClock,
    reporter: SharedReporter,
    latch: CompletionLatch,
    controller: SharedController,
    teardown: Option<Teardown>,
    records: Vec<StepRecord>,
    skipped: usize,
    halted: bool,
    finished: bool,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl SequentialRunner {
    /// Creates a runner with the default configuration and a tokio clock.
    ///
    /// The controller is told to wait for an explicit completion signal.
    pub fn new(controller: SharedController, reporter: SharedReporter) -> Self {
        controller.wait_until_done();
        Self {
            queue: StepQueue::new(),
            config: RunnerConfig::default(),
            clock: Arc::new(TokioClock::new()),
            reporter,
            latch: CompletionLatch::new(controller.clone()),
            controller,
            teardown: None,
            records: Vec::new(),
            skipped: 0,
            halted: false,
            finished: false,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Sets the runner configuration.
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the clock handed to steps.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a hook that runs once, right before completion is signalled.
    pub fn with_teardown(mut self, teardown: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Appends a step to the tail of the queue.
    pub fn enqueue(&mut self, step: impl Step + 'static) -> StepId {
        self.enqueue_boxed(Box::new(step))
    }

    /// Appends an already boxed step.
    pub fn enqueue_boxed(&mut self, step: Box<dyn Step>) -> StepId {
        self.queue.push(step)
    }

    /// Number of steps not yet started.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// True once completion has been signalled.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Records of every step invoked so far.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Runs the next step, or shuts down if none remain.
    ///
    /// Calling this after the run finished returns [`Advance::Finished`]
    /// without signalling completion again.
    pub async fn advance(&mut self) -> Advance {
        if self.finished {
            return Advance::Finished;
        }

        tokio::task::yield_now().await;

        let Some((id, step)) = self.queue.pop() else {
            self.shutdown();
            return Advance::Finished;
        };

        let record = self.run_step(id, step.as_ref()).await;
        drop(step);

        self.report(&record);
        if record.outcome.is_failure() && self.config.continuation == ContinuationPolicy::HaltOnFailure {
            let skipped = self.queue.names();
            self.skipped = self.queue.clear();
            self.halted = true;
            tracing::warn!(
                "Step {} failed, halting run and skipping {:?}",
                record.id,
                skipped
            );
        }

        self.records.push(record.clone());
        Advance::Ran(record)
    }

    /// Drains the queue and returns the summary.
    pub async fn run(mut self) -> RunSummary {
        tracing::debug!("Run {} starting with steps {:?}", self.run_id, self.queue.names());
        while let Advance::Ran(_) = self.advance().await {}
        self.summary()
    }

    /// Snapshot of the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            records: self.records.clone(),
            skipped: self.skipped,
            halted: self.halted,
        }
    }

    async fn run_step(&self, id: StepId, step: &dyn Step) -> StepRecord {
        let name = step.name().to_string();
        let context = StepContext {
            step_id: id,
            clock: self.clock.clone(),
            reporter: self.reporter.clone(),
            controller: self.controller.clone(),
            backoff: self.config.backoff.clone(),
        };

        tracing::debug!("Step {} '{}' started", id, name);
        let started_at = Utc::now();
        let start = self.clock.now();

        // the bound runs on the runner's clock so it agrees with `elapsed`
        let outcome = match self.config.step_timeout {
            Some(limit) => tokio::select! {
                biased;
                outcome = step.run(&context) => outcome,
                _ = self.clock.sleep(limit) => StepOutcome::Stalled {
                    message: format!("{} did not complete within {:?}", name, limit),
                    limit,
                },
            },
            None => step.run(&context).await,
        };

        StepRecord {
            id,
            name,
            outcome,
            started_at,
            elapsed: self.clock.now().saturating_sub(start),
        }
    }

    fn report(&self, record: &StepRecord) {
        match &record.outcome {
            StepOutcome::Done => {
                tracing::debug!("Step {} '{}' done", record.id, record.name);
            }
            StepOutcome::Passed { message } => {
                tracing::info!("Step {} '{}' passed", record.id, record.name);
                self.reporter.passed(message);
            }
            StepOutcome::Failed { message } => {
                tracing::warn!("Step {} '{}' failed: {}", record.id, record.name, message);
                self.reporter.failed(message);
            }
            StepOutcome::TimedOut { message, attempts } => {
                tracing::warn!(
                    "Step {} '{}' timed out after {} attempts",
                    record.id,
                    record.name,
                    attempts
                );
                self.reporter.failed(message);
            }
            StepOutcome::Stalled { message, limit } => {
                tracing::warn!(
                    "Step {} '{}' stalled past {:?}",
                    record.id,
                    record.name,
                    limit
                );
                self.reporter.failed(message);
            }
            StepOutcome::Checked { failures: 0 } => {
                tracing::info!("Step {} '{}' passed its checks", record.id, record.name);
            }
            StepOutcome::Checked { failures } => {
                tracing::warn!(
                    "Step {} '{}' failed {} checks",
                    record.id,
                    record.name,
                    failures
                );
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
        if let Err(e) = self.latch.fire() {
            tracing::warn!("Completion signal rejected: {}", e);
        }
        self.finished = true;
        self.finished_at = Some(Utc::now());

        let summary = self.summary();
        tracing::info!(
            "Run {} finished: {} passed, {} failed, {} timed out, {} stalled",
            self.run_id,
            summary.passed(),
            summary.failed(),
            summary.timed_out(),
            summary.stalled()
        );
    }
}
