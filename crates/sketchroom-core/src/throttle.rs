//! Client-side request throttling.

use std::time::{Duration, Instant};

/// Minimum spacing between undo (or redo) requests.
pub const UNDO_REDO_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Accepts a request only if enough time passed since the last accepted one.
///
/// Advisory only: the authority must cope with rapid or duplicate requests.
#[derive(Debug, Clone)]
pub struct RequestThrottle {
    min_interval: Duration,
    last_accepted: Option<Instant>,
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(UNDO_REDO_MIN_INTERVAL)
    }
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    /// Try to accept a request at `now`. Rejected requests do not reset the window.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }

    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }
}
