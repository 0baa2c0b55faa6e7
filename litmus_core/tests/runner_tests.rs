//! Integration tests for the sequential runner and backoff polling.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use litmus_core::*;

fn setup() -> (SequentialRunner, Arc<RecordingController>, RecordingReporter) {
    let controller = Arc::new(RecordingController::new());
    let reporter = RecordingReporter::new();
    let runner = SequentialRunner::new(controller.clone(), Arc::new(reporter.clone()));
    (runner, controller, reporter)
}

fn log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(log: &Arc<Mutex<Vec<String>>>, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

/// N queued steps run exactly once each, in order, never overlapping
#[tokio::test(start_paused = true)]
async fn test_steps_run_in_order_without_overlap() {
    let (mut runner, controller, _) = setup();
    let order = log();
    let in_flight = Arc::new(AtomicBool::new(false));

    for i in 0..5u64 {
        let order = order.clone();
        let in_flight = in_flight.clone();
        runner.enqueue(FnStep::new(format!("step {}", i), move |ctx| {
            let order = order.clone();
            let in_flight = in_flight.clone();
            async move {
                assert!(!in_flight.swap(true, Ordering::SeqCst), "steps overlapped");
                push(&order, format!("{}", i));
                // later steps sleep less, so overlap would reorder the log
                ctx.clock.sleep(Duration::from_millis(10 - i)).await;
                in_flight.store(false, Ordering::SeqCst);
                StepOutcome::Done
            }
        }));
    }

    let summary = runner.run().await;
    assert_eq!(summary.records.len(), 5);
    assert_eq!(*order.lock().unwrap(), vec!["0", "1", "2", "3", "4"]);
    assert_eq!(controller.done_calls(), 1);
}

/// Scenario A: the next step starts on a later event-loop turn
#[tokio::test]
async fn test_next_step_starts_on_later_turn() {
    let (mut runner, _, _) = setup();
    let events = log();

    let a_events = events.clone();
    runner.enqueue(FnStep::new("a", move |_ctx| {
        let events = a_events.clone();
        async move {
            push(&events, "a");
            let spawned = events.clone();
            tokio::spawn(async move { push(&spawned, "other task") });
            StepOutcome::Done
        }
    }));

    let b_events = events.clone();
    runner.enqueue(FnStep::new("b", move |_ctx| {
        let events = b_events.clone();
        async move {
            push(&events, "b");
            StepOutcome::Done
        }
    }));

    runner.run().await;
    assert_eq!(*events.lock().unwrap(), vec!["a", "other task", "b"]);
}

/// advance() never runs the step body synchronously on first poll
#[tokio::test]
async fn test_advance_is_not_reentrant() {
    let (mut runner, _, _) = setup();
    let started = Arc::new(AtomicBool::new(false));
    let flag = started.clone();
    runner.enqueue(FnStep::new("a", move |_ctx| {
        let flag = flag.clone();
        async move {
            flag.store(true, Ordering::SeqCst);
            StepOutcome::Done
        }
    }));

    let mut advance = tokio_test::task::spawn(runner.advance());
    assert!(advance.poll().is_pending());
    assert!(!started.load(Ordering::SeqCst));

    while advance.poll().is_pending() {}
    assert!(started.load(Ordering::SeqCst));
}

/// First-check success produces one pass and never sleeps
#[tokio::test]
async fn test_immediate_success_skips_backoff() {
    let (runner, _, reporter) = setup();
    let clock = ManualClock::new();
    let mut runner = runner.with_clock(Arc::new(clock.clone()));

    runner.enqueue(FnStep::new("verify", |ctx| async move {
        let poll = ctx.poll_until(|| async { true }).await;
        StepOutcome::from_poll(poll, "marker present", "marker missing")
    }));

    runner.run().await;
    assert_eq!(reporter.passes(), vec!["marker present"]);
    assert!(reporter.failures().is_empty());
    assert!(clock.sleeps().is_empty());
}

/// Scenario B: condition holds on the 3rd check after 1ms and 2ms delays
#[tokio::test(start_paused = true)]
async fn test_success_on_third_check() {
    let (mut runner, controller, reporter) = setup();
    let checks = Arc::new(AtomicU32::new(0));
    let polled = Arc::new(Mutex::new(None));

    let step_checks = checks.clone();
    let step_polled = polled.clone();
    runner.enqueue(FnStep::new("verify", move |ctx| {
        let checks = step_checks.clone();
        let polled = step_polled.clone();
        async move {
            let poll = ctx
                .poll_until(|| {
                    let n = checks.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { n >= 3 }
                })
                .await;
            *polled.lock().unwrap() = Some(poll);
            StepOutcome::from_poll(poll, "tagged", "never tagged")
        }
    }));
    runner.enqueue(FnStep::new("after", |_ctx| async { StepOutcome::passed("next step ran") }));

    let summary = runner.run().await;
    let poll = (*polled.lock().unwrap()).expect("poll recorded");

    assert_eq!(poll.attempts(), 3);
    assert!(poll.elapsed() >= Duration::from_millis(3));
    assert_eq!(checks.load(Ordering::SeqCst), 3);
    assert_eq!(reporter.passes(), vec!["tagged", "next step ran"]);
    assert_eq!(summary.passed(), 2);
    assert_eq!(controller.done_calls(), 1);
}

/// Scenario C: a never-true condition fails once and the run still completes
#[tokio::test]
async fn test_exhausted_budget_reports_one_failure() {
    let (runner, controller, reporter) = setup();
    let clock = ManualClock::new();
    let mut runner = runner.with_clock(Arc::new(clock.clone()));
    let checks = Arc::new(AtomicU32::new(0));

    let step_checks = checks.clone();
    runner.enqueue(FnStep::new("verify", move |ctx| {
        let checks = step_checks.clone();
        async move {
            let poll = ctx
                .poll_until(|| {
                    checks.fetch_add(1, Ordering::SeqCst);
                    async { false }
                })
                .await;
            StepOutcome::from_poll(poll, "tagged", "TEXTAREA should have a marker")
        }
    }));
    runner.enqueue(FnStep::new("after", |_ctx| async { StepOutcome::passed("still ran") }));

    let summary = runner.run().await;

    assert_eq!(checks.load(Ordering::SeqCst), 10);
    let expected: Vec<Duration> = (0..9).map(|k| Duration::from_millis(1 << k)).collect();
    assert_eq!(clock.sleeps(), expected);
    assert_eq!(reporter.failures(), vec!["TEXTAREA should have a marker"]);
    assert_eq!(reporter.passes(), vec!["still ran"]);
    assert_eq!(summary.timed_out(), 1);
    assert!(!summary.halted);
    assert_eq!(controller.done_calls(), 1);
}

/// Completion is observed once, and only after the last step
#[tokio::test]
async fn test_completion_signalled_after_queue_drains() {
    let (mut runner, controller, _) = setup();

    for i in 0..3 {
        let controller = controller.clone();
        runner.enqueue(FnStep::new(format!("check {}", i), move |_ctx| {
            let controller = controller.clone();
            async move {
                assert_eq!(controller.done_calls(), 0);
                StepOutcome::Done
            }
        }));
    }

    while let Advance::Ran(_) = runner.advance().await {
        assert_eq!(controller.done_calls(), 0);
    }
    assert_eq!(controller.done_calls(), 1);
    assert!(runner.is_finished());

    assert_eq!(runner.advance().await, Advance::Finished);
    assert_eq!(controller.done_calls(), 1);
}

/// Configured backoff reaches steps through the context
#[tokio::test]
async fn test_config_backoff_reaches_steps() {
    let (runner, _, reporter) = setup();
    let clock = ManualClock::new();
    let config = RunnerConfig::from_yaml_str("backoff:\n  max_attempts: 3\n  initial_delay_ms: 4\n").unwrap();
    let mut runner = runner.with_clock(Arc::new(clock.clone())).with_config(config);

    runner.enqueue(FnStep::new("verify", |ctx| async move {
        let poll = ctx.poll_until(|| async { false }).await;
        StepOutcome::from_poll(poll, "ok", format!("gave up after {}", poll.attempts()))
    }));

    runner.run().await;
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(4), Duration::from_millis(8)]);
    assert_eq!(reporter.failures(), vec!["gave up after 3"]);
}

/// Summaries persist to JSON
#[tokio::test]
async fn test_summary_persists() {
    let (mut runner, _, _) = setup();
    runner.enqueue(FnStep::new("a", |_ctx| async { StepOutcome::passed("a") }));
    runner.enqueue(FnStep::new("b", |_ctx| async { StepOutcome::failed("b") }));

    let summary = runner.run().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.json");
    summary.write_json(&path).await.unwrap();

    let loaded = RunSummary::read_json(&path).await.unwrap();
    assert_eq!(loaded.run_id, summary.run_id);
    assert_eq!(loaded.passed(), 1);
    assert_eq!(loaded.failed(), 1);
    assert!(loaded.finished_at.is_some());
}
