//! Timestamps provided to animation frame callbacks.
//!
//! Two callbacks are requested for the same frame. The first one moves the
//! clock forward before returning; both must still observe the same frame
//! timestamp.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use litmus_core::assert::{should_be_defined, should_be_same};
use litmus_core::{FnStep, ManualClock, Step, StepOutcome};

use crate::host::SimulatedHost;

pub const DESCRIPTION: &str = "Tests the timestamps provided to requestAnimationFrame callbacks";

/// Time the first callback spends before returning.
pub const FIRST_CALLBACK_COST: Duration = Duration::from_millis(10);

type Slot = Arc<Mutex<Option<f64>>>;

fn read(slot: &Slot) -> Option<f64> {
    *slot.lock().unwrap_or_else(|e| e.into_inner())
}

fn write(slot: &Slot, value: f64) {
    *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
}

/// Builds the frame-timestamp steps. `clock` must be the host's clock.
pub fn frame_timestamp_steps(host: &SimulatedHost, clock: ManualClock) -> Vec<Box<dyn Step>> {
    let host = host.clone();
    let step = FnStep::new("request animation frames", move |ctx| {
        let frames = host.frames();
        let clock = clock.clone();
        async move {
            let first: Slot = Arc::new(Mutex::new(None));
            let second: Slot = Arc::new(Mutex::new(None));
            let failures = Arc::new(AtomicUsize::new(0));

            {
                let first = first.clone();
                let reporter = ctx.reporter.clone();
                let failures = failures.clone();
                frames.request_animation_frame(move |ts| {
                    write(&first, ts);
                    if !should_be_defined(reporter.as_ref(), "firstTimestamp", &read(&first)) {
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                    clock.advance(FIRST_CALLBACK_COST);
                });
            }

            {
                let first = first.clone();
                let second = second.clone();
                let reporter = ctx.reporter.clone();
                let failures = failures.clone();
                frames.request_animation_frame(move |ts| {
                    write(&second, ts);
                    if !should_be_defined(reporter.as_ref(), "secondTimestamp", &read(&second)) {
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                    // compared only once both are set
                    if let (Some(a), Some(b)) = (read(&first), read(&second)) {
                        if !should_be_same(reporter.as_ref(), "firstTimestamp", &a, "secondTimestamp", &b) {
                            failures.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }

            ctx.controller.display();

            if !should_be_defined(ctx.reporter.as_ref(), "firstTimestamp", &read(&first)) {
                failures.fetch_add(1, Ordering::SeqCst);
            }

            StepOutcome::checked(failures.load(Ordering::SeqCst))
        }
    });

    vec![Box::new(step)]
}
