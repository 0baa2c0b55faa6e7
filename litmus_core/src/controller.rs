//! Privileged test-controller surface.
//!
//! The controller exposes host hooks that ordinary content cannot reach:
//! asynchronous spellchecking toggles, spelling-marker queries, forced paint
//! and the "run complete" signal consumed by the outer harness.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{LitmusError, Result};

/// Host hooks available to test steps.
pub trait TestController: Send + Sync {
    /// Tells the harness not to finish until [`notify_done`](Self::notify_done).
    fn wait_until_done(&self);

    /// Marks the run complete.
    fn notify_done(&self);

    /// Enables or disables background spellchecking.
    fn set_asynchronous_spellchecking(&self, enabled: bool);

    /// True if a spelling marker covers exactly `length` characters from `from`
    /// in the focused editable region.
    fn has_spelling_marker(&self, from: usize, length: usize) -> bool;

    /// Forces a synchronous paint.
    fn display(&self);
}

/// Shared controller handle.
pub type SharedController = Arc<dyn TestController>;

/// Guards the completion signal so it reaches the controller once.
pub struct CompletionLatch {
    controller: SharedController,
    fired: AtomicBool,
}

impl CompletionLatch {
    pub fn new(controller: SharedController) -> Self {
        Self {
            controller,
            fired: AtomicBool::new(false),
        }
    }

    /// Sends `notify_done` on the first call; later calls are rejected.
    pub fn fire(&self) -> Result<()> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return Err(LitmusError::AlreadyCompleted);
        }
        self.controller.notify_done();
        Ok(())
    }

    /// True once the signal has been sent.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Controller that records calls and answers marker queries from a fixed list.
#[derive(Debug, Default)]
pub struct RecordingController {
    wait_calls: AtomicUsize,
    done_calls: AtomicUsize,
    display_calls: AtomicUsize,
    async_spellchecking: AtomicBool,
    markers: Mutex<Vec<(usize, usize)>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a marker that [`has_spelling_marker`](TestController::has_spelling_marker) will report.
    pub fn add_marker(&self, from: usize, length: usize) {
        self.markers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((from, length));
    }

    pub fn wait_calls(&self) -> usize {
        self.wait_calls.load(Ordering::SeqCst)
    }

    pub fn done_calls(&self) -> usize {
        self.done_calls.load(Ordering::SeqCst)
    }

    pub fn display_calls(&self) -> usize {
        self.display_calls.load(Ordering::SeqCst)
    }

    pub fn async_spellchecking(&self) -> bool {
        self.async_spellchecking.load(Ordering::SeqCst)
    }
}

impl TestController for RecordingController {
    fn wait_until_done(&self) {
        self.wait_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn notify_done(&self) {
        self.done_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn set_asynchronous_spellchecking(&self, enabled: bool) {
        self.async_spellchecking.store(enabled, Ordering::SeqCst);
    }

    fn has_spelling_marker(&self, from: usize, length: usize) -> bool {
        self.markers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(from, length))
    }

    fn display(&self) {
        self.display_calls.fetch_add(1, Ordering::SeqCst);
    }
}
