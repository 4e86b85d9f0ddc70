//! Clock-driven rate limiting for table input.
//!
//! Both helpers take the current `Instant` as an argument instead of reading
//! the clock themselves, so callers (and tests) control time explicitly.

use std::time::{Duration, Instant};

/// Default debounce window for quick-filter text input.
pub const DEFAULT_FILTER_DEBOUNCE: Duration = Duration::from_millis(250);

/// Default interval between visual updates during a column resize (~60 Hz).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Fires once after input has been quiet for a fixed window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_input: Option<Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_input: None,
        }
    }

    /// Record an input event, restarting the window.
    pub fn touch(&mut self, now: Instant) {
        self.last_input = Some(now);
    }

    /// Whether an input is waiting for its window to elapse.
    pub fn is_pending(&self) -> bool {
        self.last_input.is_some()
    }

    /// Returns `true` exactly once per burst, when the window has elapsed.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last_input {
            Some(last) if now.saturating_duration_since(last) >= self.window => {
                self.last_input = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending input without firing.
    pub fn cancel(&mut self) {
        self.last_input = None;
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_DEBOUNCE)
    }
}

/// Allows at most one event per interval; extra events are dropped.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_allowed: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with the given minimum interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_allowed: None,
        }
    }

    /// Returns `true` if an event at `now` may proceed.
    pub fn allow(&mut self, now: Instant) -> bool {
        let allowed = match self.last_allowed {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if allowed {
            self.last_allowed = Some(now);
        }
        allowed
    }

    /// Forget the last event so the next one is always allowed.
    pub fn reset(&mut self) {
        self.last_allowed = None;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}
