//! Debounce lane: one pending timer and one live generation.
//!
//! Arming a lane bumps its generation and replaces the pending timer. When a
//! timer survives its window it spawns the fetch as a separate task, so a
//! later re-arm never aborts in-flight I/O; the fetch instead compares its
//! generation with [`DebounceLane::is_current`] before committing.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

pub(crate) struct DebounceLane {
    name: &'static str,
    window: Duration,
    generation: AtomicU64,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceLane {
    pub fn new(name: &'static str, window: Duration) -> Self {
        Self {
            name,
            window,
            generation: AtomicU64::new(0),
            pending: Mutex::new(None),
        }
    }

    /// Whether `generation` is still the lane's latest.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Supersede everything in flight and restart the window.
    ///
    /// `on_fire` runs with the new generation once the window elapses
    /// without another arm. Must be called inside a tokio runtime.
    pub fn arm<F, Fut>(&self, on_fire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // Bump under the lock so timers are replaced in generation order.
        let mut pending = self.pending.lock();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1);

        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let window = self.window;
        let lane = self.name;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            trace!(lane, generation, "debounce window elapsed");
            tokio::spawn(on_fire(generation));
        }));

        generation
    }

    /// Drop the pending timer and supersede in-flight work.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

impl Drop for DebounceLane {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.abort();
        }
    }
}
