//! Adjustable wall clock
//!
//! Every "now" decision in the scheduler goes through [`Clock`] so that a
//! single offset correction moves the whole system's notion of time.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Wall clock with a replaceable offset.
///
/// The offset is a signed correction added to the OS wall clock reading.
/// It is replaced wholesale, never adjusted incrementally, so a reader
/// always observes either the old or the new correction.
#[derive(Debug, Default)]
pub struct Clock {
    offset_micros: AtomicI64,
}

impl Clock {
    /// Create a clock with a zero offset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time: OS wall clock plus the installed offset.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::microseconds(self.offset_micros.load(Ordering::SeqCst))
    }

    /// The currently installed offset.
    pub fn offset(&self) -> Duration {
        Duration::microseconds(self.offset_micros.load(Ordering::SeqCst))
    }

    /// Atomically replace the offset, returning the previous one.
    ///
    /// Changing the offset does not reschedule anything by itself; the
    /// scheduler recomputes entry deadlines when it installs a new offset.
    pub fn set_offset(&self, offset: Duration) -> Duration {
        let micros = offset.num_microseconds().unwrap_or_else(|| {
            if offset > Duration::zero() {
                i64::MAX
            } else {
                i64::MIN
            }
        });
        Duration::microseconds(self.offset_micros.swap(micros, Ordering::SeqCst))
    }
}
