//! Spell checking for pasted text.
//!
//! Each case copies a source fragment, pastes it into a cleared destination
//! field, then polls the controller until the background spellchecker has
//! marked the expected range or the backoff budget runs out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use litmus_core::{FnStep, Step, StepContext, StepOutcome};

use crate::host::{Field, MarkerRange, SimulatedHost, SourceId};

pub const DESCRIPTION: &str = "For Bug 40092: Spell checking for pasted text.";

/// Configuration of one paste-and-verify step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteCase {
    pub source: SourceId,
    pub dest: Field,
    pub expected: MarkerRange,
}

/// Copies `case.source` into `case.dest` and waits for the expected marker.
pub struct PasteAndVerify {
    name: String,
    host: SimulatedHost,
    case: PasteCase,
}

impl PasteAndVerify {
    pub fn new(host: SimulatedHost, case: PasteCase) -> Self {
        let markup = host.source_markup(case.source).unwrap_or_default();
        Self {
            name: format!("paste '{}' into {}", markup, case.dest),
            host,
            case,
        }
    }
}

#[async_trait]
impl Step for PasteAndVerify {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, context: &StepContext) -> StepOutcome {
        let PasteCase {
            source,
            dest,
            expected,
        } = self.case;

        let Some(markup) = self.host.source_markup(source) else {
            return StepOutcome::failed(format!("unknown source {:?}", source));
        };

        self.host.copy(source);
        self.host.clear(dest);
        self.host.focus(dest);
        if !self.host.paste() {
            return StepOutcome::failed(format!("{} rejected the paste of '{}'", dest.tag(), markup));
        }

        let host = &self.host;
        let controller = &context.controller;
        let poll = context
            .poll_until(|| {
                host.focus(dest);
                let marked = controller.has_spelling_marker(expected.from, expected.length);
                async move { marked }
            })
            .await;

        StepOutcome::from_poll(
            poll,
            format!("{} has a marker on '{}'", dest.tag(), markup),
            format!("{} should have a marker on for '{}'", dest.tag(), markup),
        )
    }
}

/// Builds the spellcheck-paste steps against `host`.
///
/// The first step switches the host to asynchronous spellchecking; the rest
/// paste a plain and a decorated source into each kind of field.
pub fn spellcheck_paste_steps(host: &SimulatedHost) -> Vec<Box<dyn Step>> {
    let plain = host.add_source("foo bar");
    let decorated = host.add_source("fo<b>o ba</b>r");

    let cases = [
        (plain, Field::Input, MarkerRange::new(0, 3)),
        (decorated, Field::Input, MarkerRange::new(0, 3)),
        (plain, Field::TextArea, MarkerRange::new(0, 3)),
        (decorated, Field::TextArea, MarkerRange::new(0, 3)),
        (plain, Field::ContentEditable, MarkerRange::new(0, 3)),
        // only the "fo" part of "foo" sits outside the bold run
        (decorated, Field::ContentEditable, MarkerRange::new(0, 2)),
    ];

    let mut steps: Vec<Box<dyn Step>> = vec![Box::new(FnStep::new(
        "enable asynchronous spellchecking",
        |ctx| async move {
            ctx.controller.set_asynchronous_spellchecking(true);
            StepOutcome::Done
        },
    ))];

    steps.extend(cases.into_iter().map(|(source, dest, expected)| {
        Box::new(PasteAndVerify::new(
            host.clone(),
            PasteCase {
                source,
                dest,
                expected,
            },
        )) as Box<dyn Step>
    }));
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SimulatedController;
    use crate::host::HostOptions;
    use litmus_core::{BackoffPolicy, Clock, ManualClock, RecordingReporter, StepId};
    use std::sync::Arc;
    use std::time::Duration;

    fn context(host: &SimulatedHost, backoff: BackoffPolicy) -> (StepContext, RecordingReporter) {
        let reporter = RecordingReporter::new();
        let context = StepContext {
            step_id: StepId(0),
            clock: host.clock(),
            reporter: Arc::new(reporter.clone()),
            controller: Arc::new(SimulatedController::new(host.clone())),
            backoff,
        };
        (context, reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_paste_into_input_is_marked() {
        let host = SimulatedHost::new(HostOptions::default());
        host.set_async_spellchecking(true);
        let source = host.add_source("foo bar");
        let step = PasteAndVerify::new(
            host.clone(),
            PasteCase {
                source,
                dest: Field::Input,
                expected: MarkerRange::new(0, 3),
            },
        );
        let (ctx, _) = context(&host, BackoffPolicy::default());

        let outcome = step.run(&ctx).await;
        assert_eq!(outcome, StepOutcome::passed("INPUT has a marker on 'foo bar'"));
        assert_eq!(host.text(Field::Input), "foo bar");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_range_times_out() {
        let host = SimulatedHost::new(HostOptions::default());
        let source = host.add_source("fo<b>o ba</b>r");
        let step = PasteAndVerify::new(
            host.clone(),
            PasteCase {
                source,
                dest: Field::ContentEditable,
                expected: MarkerRange::new(0, 3),
            },
        );
        let (ctx, _) = context(&host, BackoffPolicy::new(4, Duration::from_millis(1)));

        match step.run(&ctx).await {
            StepOutcome::TimedOut { message, attempts } => {
                assert_eq!(message, "DIV should have a marker on for 'fo<b>o ba</b>r'");
                assert_eq!(attempts, 4);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_spellchecker_exhausts_budget() {
        let options = HostOptions {
            spellcheck_latency: Duration::from_secs(5),
            ..HostOptions::default()
        };
        let host = SimulatedHost::new(options);
        host.set_async_spellchecking(true);
        let source = host.add_source("foo bar");
        let step = PasteAndVerify::new(
            host.clone(),
            PasteCase {
                source,
                dest: Field::TextArea,
                expected: MarkerRange::new(0, 3),
            },
        );
        let (ctx, _) = context(&host, BackoffPolicy::default());

        let outcome = step.run(&ctx).await;
        assert!(matches!(outcome, StepOutcome::TimedOut { attempts: 10, .. }));
    }

    #[tokio::test]
    async fn test_spellchecker_and_poller_share_virtual_time() {
        let clock = ManualClock::new();
        let host = SimulatedHost::with_clock(HostOptions::default(), Arc::new(clock.clone()));
        host.set_async_spellchecking(true);
        let source = host.add_source("foo bar");
        let step = PasteAndVerify::new(
            host.clone(),
            PasteCase {
                source,
                dest: Field::Input,
                expected: MarkerRange::new(0, 3),
            },
        );
        let (ctx, _) = context(&host, BackoffPolicy::default());

        let outcome = step.run(&ctx).await;
        assert_eq!(outcome, StepOutcome::passed("INPUT has a marker on 'foo bar'"));
        // checks at 0, 1, 3 and 7 ms; the 5 ms spellcheck overlaps the backoff
        assert_eq!(clock.now(), Duration::from_millis(7));
        let mut sleeps = clock.sleeps();
        sleeps.sort();
        assert_eq!(
            sleeps,
            [1, 2, 4, 5].map(Duration::from_millis).to_vec()
        );
    }

    #[test]
    fn test_suite_layout() {
        let host = SimulatedHost::new(HostOptions::default());
        let steps = spellcheck_paste_steps(&host);

        assert_eq!(steps.len(), 7);
        assert_eq!(steps[0].name(), "enable asynchronous spellchecking");
        assert_eq!(steps[1].name(), "paste 'foo bar' into INPUT");
        assert_eq!(steps[6].name(), "paste 'fo<b>o ba</b>r' into DIV");
    }
}
