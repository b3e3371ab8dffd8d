use std::time::{Duration, Instant};

/// Millisecond-resolution countdown timer.
///
/// A timer is either armed with a deadline or infinite; an infinite timer
/// never expires. Expiry is a query, not an event: callers ask for the
/// remaining time and react when it reaches zero.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    reset_at: Instant,
    deadline: Option<Instant>,
}

impl Timer {
    /// Arms a timer that expires after `timeout`.
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        Timer {
            reset_at: now,
            deadline: Some(now + timeout),
        }
    }

    /// A timer that never expires.
    pub fn infinite() -> Self {
        Timer {
            reset_at: Instant::now(),
            deadline: None,
        }
    }

    /// Re-arms the timer to expire after `timeout` from now.
    pub fn reset(&mut self, timeout: Duration) {
        let now = Instant::now();
        self.reset_at = now;
        self.deadline = Some(now + timeout);
    }

    /// Time until expiry; `None` for an infinite timer, zero once expired.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Time since the timer was last armed.
    pub fn elapsed(&self) -> Duration {
        self.reset_at.elapsed()
    }

    pub fn expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }
}
