//! Litmus core - sequential async test steps with bounded polling.
//!
//! This crate provides the control pattern behind layout-style test fixtures:
//!
//! - Queue: steps run one at a time, strictly in enqueue order
//! - Advance: each step starts on a fresh event-loop turn and signals
//!   completion by returning a typed [`StepOutcome`]
//! - Backoff: verification steps poll for asynchronous side effects with a
//!   doubling delay and a fixed attempt budget
//! - Completion: the controller's "run complete" signal is sent exactly once,
//!   after the queue is empty, however many steps failed
//!
//! # Example
//!
//! ```ignore
//! use litmus_core::*;
//! use std::sync::Arc;
//!
//! let controller = Arc::new(RecordingController::new());
//! let reporter = RecordingReporter::new();
//! let mut runner = SequentialRunner::new(controller.clone(), Arc::new(reporter.clone()));
//!
//! runner.enqueue(FnStep::new("marker", |ctx| async move {
//!     let poll = ctx.poll_until(|| async { true }).await;
//!     StepOutcome::from_poll(poll, "marker found", "marker missing")
//! }));
//!
//! let summary = runner.run().await;
//! assert!(summary.is_success());
//! ```

pub mod assert;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod queue;
pub mod report;
pub mod retry;
pub mod runner;
pub mod step;
pub mod summary;

// Re-export core types for public API
pub use clock::{Clock, ManualClock, SharedClock, TokioClock};
pub use config::{ContinuationPolicy, RunnerConfig};
pub use controller::{CompletionLatch, RecordingController, SharedController, TestController};
pub use error::{LitmusError, Result};
pub use queue::StepQueue;
pub use report::{FanoutReporter, RecordingReporter, ReportEntry, Reporter, SharedReporter, TracingReporter};
pub use retry::{poll_until, BackoffPolicy, PollOutcome};
pub use runner::{Advance, SequentialRunner};
pub use step::{FnStep, Step, StepContext, StepId, StepOutcome, StepRecord};
pub use summary::RunSummary;

/// Version of the litmus core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
