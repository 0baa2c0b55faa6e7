//! Animation frame scheduling.
//!
//! Callbacks registered with [`AnimationFrames::request_animation_frame`] run on
//! the next [`AnimationFrames::display`]. Every callback served by one display
//! receives the same timestamp, sampled once before the first callback runs,
//! even if a callback moves the clock forward.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use litmus_core::{Clock, SharedClock};

/// Frame callback; receives the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64) + Send>;

pub struct AnimationFrames {
    clock: SharedClock,
    pending: Mutex<Vec<(u64, FrameCallback)>>,
    next_handle: AtomicU64,
    frames: AtomicU64,
}

impl AnimationFrames {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            pending: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            frames: AtomicU64::new(0),
        }
    }

    /// Schedules `callback` for the next frame and returns its handle.
    pub fn request_animation_frame(&self, callback: impl FnOnce(f64) + Send + 'static) -> u64 {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        let callback: FrameCallback = Box::new(callback);
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((handle, callback));
        handle
    }

    /// Drops a pending callback. Returns false if it already ran or never existed.
    pub fn cancel_animation_frame(&self, handle: u64) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let before = pending.len();
        pending.retain(|(h, _)| *h != handle);
        pending.len() != before
    }

    /// Number of callbacks waiting for a frame.
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of frames displayed so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    /// Paints one frame, serving every pending callback in registration order.
    ///
    /// Callbacks registered while the frame runs wait for the next one.
    pub fn display(&self) -> usize {
        let timestamp = to_millis(self.clock.now());
        let callbacks = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        self.frames.fetch_add(1, Ordering::SeqCst);

        let served = callbacks.len();
        for (_, callback) in callbacks {
            callback(timestamp);
        }
        served
    }
}

fn to_millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}
