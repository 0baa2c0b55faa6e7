//! Pass/fail reporting surface.
//!
//! Steps and the runner write human-readable messages to a [`Reporter`]. The
//! rendered form follows the classic layout-test text output:
//!
//! ```text
//! For Bug 40092: Spell checking for pasted text.
//! PASS INPUT has a marker on 'foo bar'
//! FAIL TEXTAREA should have a marker on for 'foo bar'
//! TEST COMPLETE
//! ```

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Sink for test messages.
pub trait Reporter: Send + Sync {
    /// Records the test description header.
    fn description(&self, message: &str);

    /// Records a passing check.
    fn passed(&self, message: &str);

    /// Records a failing check.
    fn failed(&self, message: &str);

    /// Records free-form diagnostic output.
    fn debug(&self, message: &str);
}

/// One recorded message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ReportEntry {
    Description(String),
    Pass(String),
    Fail(String),
    Debug(String),
}

impl ReportEntry {
    /// Formats the entry as one line of test output.
    pub fn render(&self) -> String {
        match self {
            Self::Description(msg) | Self::Debug(msg) => msg.clone(),
            Self::Pass(msg) => format!("PASS {}", msg),
            Self::Fail(msg) => format!("FAIL {}", msg),
        }
    }
}

/// Reporter that keeps every entry in memory.
///
/// Clones share the same buffer, so a clone can be handed to the runner and
/// the original inspected afterwards.
#[derive(Clone, Debug, Default)]
pub struct RecordingReporter {
    entries: Arc<Mutex<Vec<ReportEntry>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: ReportEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    /// Snapshot of all entries in arrival order.
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages of passing checks.
    pub fn passes(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                ReportEntry::Pass(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Messages of failing checks.
    pub fn failures(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                ReportEntry::Fail(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Renders all entries, one per line, optionally followed by `TEST COMPLETE`.
    pub fn render(&self, complete: bool) -> String {
        let mut out = String::new();
        for entry in self.entries() {
            out.push_str(&entry.render());
            out.push('\n');
        }
        if complete {
            out.push_str("TEST COMPLETE\n");
        }
        out
    }
}

impl Reporter for RecordingReporter {
    fn description(&self, message: &str) {
        self.push(ReportEntry::Description(message.to_string()));
    }

    fn passed(&self, message: &str) {
        self.push(ReportEntry::Pass(message.to_string()));
    }

    fn failed(&self, message: &str) {
        self.push(ReportEntry::Fail(message.to_string()));
    }

    fn debug(&self, message: &str) {
        self.push(ReportEntry::Debug(message.to_string()));
    }
}

/// Reporter that forwards messages to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn description(&self, message: &str) {
        tracing::info!(target: "litmus::report", "{}", message);
    }

    fn passed(&self, message: &str) {
        tracing::info!(target: "litmus::report", "PASS {}", message);
    }

    fn failed(&self, message: &str) {
        tracing::warn!(target: "litmus::report", "FAIL {}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "litmus::report", "{}", message);
    }
}

/// Reporter that copies every message to several reporters.
#[derive(Clone, Default)]
pub struct FanoutReporter {
    sinks: Vec<Arc<dyn Reporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn with(mut self, sink: Arc<dyn Reporter>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Reporter for FanoutReporter {
    fn description(&self, message: &str) {
        self.sinks.iter().for_each(|s| s.description(message));
    }

    fn passed(&self, message: &str) {
        self.sinks.iter().for_each(|s| s.passed(message));
    }

    fn failed(&self, message: &str) {
        self.sinks.iter().for_each(|s| s.failed(message));
    }

    fn debug(&self, message: &str) {
        self.sinks.iter().for_each(|s| s.debug(message));
    }
}

/// Shared reporter handle.
pub type SharedReporter = Arc<dyn Reporter>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_reporter_keeps_order() {
        let reporter = RecordingReporter::new();
        reporter.description("Spell checking for pasted text.");
        reporter.passed("INPUT has a marker on 'foo bar'");
        reporter.failed("DIV should have a marker on for 'foo bar'");

        assert_eq!(reporter.entries().len(), 3);
        assert_eq!(reporter.passes(), vec!["INPUT has a marker on 'foo bar'"]);
        assert_eq!(reporter.failures().len(), 1);
    }

    #[test]
    fn test_render() {
        let reporter = RecordingReporter::new();
        reporter.description("desc");
        reporter.passed("a");
        reporter.failed("b");
        reporter.debug("note");

        assert_eq!(reporter.render(true), "desc\nPASS a\nFAIL b\nnote\nTEST COMPLETE\n");
        assert_eq!(reporter.render(false), "desc\nPASS a\nFAIL b\nnote\n");
    }

    #[test]
    fn test_fanout_copies_to_all_sinks() {
        let first = RecordingReporter::new();
        let second = RecordingReporter::new();
        let fanout = FanoutReporter::new()
            .with(Arc::new(first.clone()))
            .with(Arc::new(second.clone()))
            .with(Arc::new(TracingReporter));

        fanout.passed("ok");
        fanout.failed("bad");

        assert_eq!(first.entries(), second.entries());
        assert_eq!(first.passes(), vec!["ok"]);
    }

    #[test]
    fn test_entry_serializes_tagged() {
        let json = serde_json::to_string(&ReportEntry::Pass("ok".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"pass","message":"ok"}"#);
    }
}
