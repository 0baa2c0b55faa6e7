//! Test controller backed by the simulated host.

use std::sync::atomic::{AtomicUsize, Ordering};

use litmus_core::TestController;

use crate::host::{MarkerRange, SimulatedHost};

/// [`TestController`] that drives a [`SimulatedHost`].
pub struct SimulatedController {
    host: SimulatedHost,
    waits: AtomicUsize,
    done: AtomicUsize,
}

impl SimulatedController {
    pub fn new(host: SimulatedHost) -> Self {
        Self {
            host,
            waits: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
        }
    }

    pub fn host(&self) -> &SimulatedHost {
        &self.host
    }

    /// How many times `notify_done` was received.
    pub fn done_calls(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    pub fn wait_calls(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

impl TestController for SimulatedController {
    fn wait_until_done(&self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }

    fn notify_done(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Harness notified: run complete");
    }

    fn set_asynchronous_spellchecking(&self, enabled: bool) {
        self.host.set_async_spellchecking(enabled);
    }

    fn has_spelling_marker(&self, from: usize, length: usize) -> bool {
        self.host.has_marker_in_focus(MarkerRange::new(from, length))
    }

    fn display(&self) {
        let served = self.host.frames().display();
        tracing::trace!("Displayed frame, served {} callbacks", served);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Field, HostOptions};

    #[tokio::test]
    async fn test_marker_query_uses_focus() {
        let host = SimulatedHost::new(HostOptions::default());
        let controller = SimulatedController::new(host.clone());
        let source = host.add_source("foo bar");

        host.copy(source);
        host.focus(Field::TextArea);
        host.paste();
        assert!(controller.has_spelling_marker(0, 3));

        host.focus(Field::Input);
        assert!(!controller.has_spelling_marker(0, 3));
    }

    #[tokio::test]
    async fn test_display_serves_frames() {
        let host = SimulatedHost::new(HostOptions::default());
        let controller = SimulatedController::new(host.clone());
        host.frames().request_animation_frame(|_| {});

        controller.display();
        assert_eq!(host.frames().frames(), 1);
        assert_eq!(host.frames().pending(), 0);
    }
}
