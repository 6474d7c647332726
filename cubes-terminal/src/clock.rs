//! Fixed-rate frame scheduler for the terminal host

use cubes_core::{FrameHandle, FrameScheduler};
use std::time::{Duration, Instant};

/// Plays the part of `requestAnimationFrame`: at most one frame is pending,
/// and it becomes due once per interval. Timestamps are milliseconds since
/// the clock was created.
pub struct FrameClock {
    origin: Instant,
    interval: Duration,
    next_due: Instant,
    pending: Option<FrameHandle>,
    next_id: i32,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        let now = Instant::now();
        Self {
            origin: now,
            interval: Duration::from_secs(1) / fps.max(1),
            next_due: now,
            pending: None,
            next_id: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left until the pending frame is due
    pub fn until_due(&self) -> Duration {
        self.next_due.saturating_duration_since(Instant::now())
    }

    /// Consume the pending frame if it is due, returning its timestamp
    pub fn fire(&mut self) -> Option<f64> {
        let now = Instant::now();
        if self.pending.is_none() || now < self.next_due {
            return None;
        }
        self.pending = None;

        // Don't try to catch up on frames missed while busy
        self.next_due = (self.next_due + self.interval).max(now);
        Some(now.duration_since(self.origin).as_secs_f64() * 1000.0)
    }
}

impl FrameScheduler for FrameClock {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending = Some(handle);
        Some(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}
