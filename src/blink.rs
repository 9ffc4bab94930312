//! One-shot LED blink timing.
//!
//! The LED shows "recent activity", not a per-update counter: a new trigger
//! replaces any pending deadline instead of stacking a second one. Callers
//! pass the current `Instant` explicitly so the timing is testable with a
//! fabricated clock.

use std::time::{Duration, Instant};

/// How long the LED stays active after an update.
pub const BLINK_DURATION: Duration = Duration::from_millis(800);

/// Restartable one-shot blink.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blinker {
    deadline: Option<Instant>,
}

impl Blinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start the blink; any pending deadline is replaced.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + BLINK_DURATION);
    }

    /// Drop any pending blink, e.g. on detach.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether the blink is active at `now`, clearing it once expired.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now < deadline => true,
            Some(_) => {
                self.deadline = None;
                false
            }
            None => false,
        }
    }

    /// Whether a deadline is currently stored.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}
