//! Debounced write-out deadline

use std::time::{Duration, Instant};

/// At most one pending write. Every new request pushes the deadline out by
/// the full delay.
#[derive(Debug, Clone)]
pub struct WriteSchedule {
    delay: Duration,
    deadline: Option<Instant>,
}

impl WriteSchedule {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Clear and report the deadline if it has passed
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}
