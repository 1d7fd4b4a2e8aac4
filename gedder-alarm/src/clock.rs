//! Wall-clock source.
//!
//! Decisions compare absolute instants against "now", so the clock is
//! injected rather than read directly. Tests swap in a fixed clock.

use time::UtcOffset;

use crate::types::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Offset used to turn calendar triples into instants.
    fn local_offset(&self) -> UtcOffset;
}

/// The host's wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// Capture the host's current UTC offset, falling back to UTC when it
    /// can't be determined (e.g. in a multi-threaded process on some
    /// platforms).
    pub fn new() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now_utc()
    }

    fn local_offset(&self) -> UtcOffset {
        self.offset
    }
}
