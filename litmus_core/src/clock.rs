//! Time source abstraction for the runner and backoff poller.
//!
//! Two clocks are provided:
//! - [`TokioClock`]: real time through `tokio::time`, which honours paused
//!   time in tests (`#[tokio::test(start_paused = true)]`)
//! - [`ManualClock`]: virtual time that jumps straight to the next pending
//!   deadline, so frame and timestamp ordering can be asserted without any
//!   wall-clock delay

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

/// A source of monotonic time and deferred wake-ups.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Suspends the caller for at least `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Clone, Debug)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// Creates a clock whose origin is the current tokio instant.
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    sleeps: Vec<Duration>,
    next_sleeper: u64,
    /// Pending sleepers keyed by wake deadline, then registration order
    sleepers: BTreeMap<(Duration, u64), Arc<Notify>>,
}

impl ManualState {
    fn wake_earliest(&self) {
        if let Some(notify) = self.sleepers.values().next() {
            notify.notify_one();
        }
    }
}

/// Virtual clock for deterministic tests.
///
/// Each `sleep` registers a wake deadline of `now + duration`. Once every
/// other runnable task has had a turn, the sleeper with the earliest deadline
/// moves virtual time to that deadline and wakes; later sleepers wait their
/// turn. Concurrent sleeps therefore overlap instead of adding up. `advance`
/// moves time forward explicitly and releases every sleeper it passes.
/// Clones share the same timeline.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Moves virtual time forward.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state();
        state.now += duration;
        let now = state.now;
        for notify in state
            .sleepers
            .iter()
            .take_while(|((deadline, _), _)| *deadline <= now)
            .map(|(_, notify)| notify)
        {
            notify.notify_one();
        }
    }

    /// Every sleep requested so far, in request order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }

    /// Number of sleeps still waiting for their deadline.
    pub fn pending_sleeps(&self) -> usize {
        self.state().sleepers.len()
    }
}

/// Removes a sleeper from the timeline when its sleep ends or is dropped.
struct Sleeper<'a> {
    clock: &'a ManualClock,
    key: (Duration, u64),
}

impl Drop for Sleeper<'_> {
    fn drop(&mut self) {
        let mut state = self.clock.state();
        if state.sleepers.remove(&self.key).is_some() {
            state.wake_earliest();
        }
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state().now
    }

    async fn sleep(&self, duration: Duration) {
        let notify = Arc::new(Notify::new());
        let key = {
            let mut state = self.state();
            state.sleeps.push(duration);
            let key = (state.now + duration, state.next_sleeper);
            state.next_sleeper += 1;
            state.sleepers.insert(key, notify.clone());
            key
        };
        let _sleeper = Sleeper { clock: self, key };

        loop {
            tokio::task::yield_now().await;
            {
                let mut state = self.state();
                if state.now >= key.0 {
                    break;
                }
                if state.sleepers.keys().next() == Some(&key) {
                    state.now = key.0;
                    break;
                }
            }
            notify.notified().await;
        }
    }
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;
