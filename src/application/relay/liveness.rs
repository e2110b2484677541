//! Poll liveness tracking

use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Records the timestamp of the most recent poll and answers whether the
/// game server is currently polling.
///
/// This is a heuristic, not a handshake: it assumes a healthy server polls
/// at a sub-second cadence, so a slower legitimate poller is reported down.
pub struct LivenessTracker {
    last_poll: Mutex<Option<Instant>>,
    window: Duration,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            last_poll: Mutex::new(None),
            window,
        }
    }

    pub fn record_poll(&self) {
        *self.last_poll.lock().unwrap() = Some(Instant::now());
    }

    pub fn is_alive(&self) -> bool {
        self.last_poll
            .lock()
            .unwrap()
            .map(|at| at.elapsed() <= self.window)
            .unwrap_or(false)
    }
}

impl Default for LivenessTracker {
    fn default() -> Self {
        Self::new()
    }
}
