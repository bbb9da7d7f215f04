//! Identity types for host-side registrations

use std::fmt;

/// Timer identity - handle returned by `Scheduler::schedule_once`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl TimerId {
    pub const ZERO: TimerId = TimerId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        TimerId(id)
    }

    /// Next id in sequence
    #[inline]
    pub fn next(self) -> Self {
        TimerId(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timer({})", self.0)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
