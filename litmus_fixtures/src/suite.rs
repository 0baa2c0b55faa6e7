//! Suite registry.
//!
//! A [`Suite`] bundles a host, the clock it runs on and its queued steps. Running
//! it wires a [`SimulatedController`] and a [`SequentialRunner`] around them and
//! hides the host as the run's teardown.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use litmus_core::{
    LitmusError, ManualClock, RunSummary, RunnerConfig, SequentialRunner, SharedClock,
    SharedReporter, Step,
};

use crate::controller::SimulatedController;
use crate::frame_timestamps::{self, frame_timestamp_steps};
use crate::host::{HostOptions, SimulatedHost};
use crate::spellcheck_paste::{self, spellcheck_paste_steps};

/// Built-in suites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SuiteKind {
    SpellcheckPaste,
    FrameTimestamps,
}

impl SuiteKind {
    pub const ALL: [SuiteKind; 2] = [SuiteKind::SpellcheckPaste, SuiteKind::FrameTimestamps];

    pub fn name(&self) -> &'static str {
        match self {
            SuiteKind::SpellcheckPaste => "spellcheck-paste",
            SuiteKind::FrameTimestamps => "frame-timestamps",
        }
    }

    /// Header line written before the first step.
    pub fn description(&self) -> &'static str {
        match self {
            SuiteKind::SpellcheckPaste => spellcheck_paste::DESCRIPTION,
            SuiteKind::FrameTimestamps => frame_timestamps::DESCRIPTION,
        }
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SuiteKind {
    type Err = LitmusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SuiteKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| LitmusError::UnknownSuite(s.to_string()))
    }
}

/// A built suite ready to run.
pub struct Suite {
    kind: SuiteKind,
    host: SimulatedHost,
    clock: SharedClock,
    steps: Vec<Box<dyn Step>>,
}

/// What a finished suite leaves behind.
pub struct SuiteRun {
    pub summary: RunSummary,
    pub controller: Arc<SimulatedController>,
}

impl Suite {
    /// Builds `kind` on a fresh host.
    ///
    /// The frame-timestamp suite runs on a [`ManualClock`]; the spellcheck
    /// suite runs on the tokio clock so the background spellchecker and the
    /// backoff share one timeline.
    pub fn build(kind: SuiteKind, options: HostOptions) -> Self {
        match kind {
            SuiteKind::SpellcheckPaste => {
                let host = SimulatedHost::new(options);
                let steps = spellcheck_paste_steps(&host);
                Self {
                    kind,
                    clock: host.clock(),
                    host,
                    steps,
                }
            }
            SuiteKind::FrameTimestamps => {
                let clock = ManualClock::new();
                let host = SimulatedHost::with_clock(options, Arc::new(clock.clone()));
                let steps = frame_timestamp_steps(&host, clock);
                Self {
                    kind,
                    clock: host.clock(),
                    host,
                    steps,
                }
            }
        }
    }

    pub fn kind(&self) -> SuiteKind {
        self.kind
    }

    pub fn host(&self) -> &SimulatedHost {
        &self.host
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }

    /// Runs every step and signals completion once the queue drains.
    pub async fn run(self, reporter: SharedReporter, config: RunnerConfig) -> SuiteRun {
        reporter.description(self.kind.description());

        let controller = Arc::new(SimulatedController::new(self.host.clone()));
        let host = self.host.clone();
        let mut runner = SequentialRunner::new(controller.clone(), reporter)
            .with_config(config)
            .with_clock(self.clock)
            .with_teardown(move || host.hide());

        for step in self.steps {
            runner.enqueue_boxed(step);
        }

        tracing::info!("Running suite {}", self.kind);
        let summary = runner.run().await;
        SuiteRun {
            summary,
            controller,
        }
    }
}
