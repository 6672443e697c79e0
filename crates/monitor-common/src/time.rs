//! Monotonic timestamps, in nanoseconds.
//!
//! Event ordering must not be affected by wall-clock adjustments, so every
//! timestamp in the monitor is taken from `CLOCK_MONOTONIC`.

use std::{
    fmt,
    ops::{Add, Sub},
};

use nix::time::{clock_gettime, ClockId};
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        // CLOCK_MONOTONIC is always a valid clock id.
        let ts = clock_gettime(ClockId::CLOCK_MONOTONIC).expect("CLOCK_MONOTONIC is available");
        Timestamp(ts.tv_sec() as u64 * 1_000_000_000 + ts.tv_nsec() as u64)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for Timestamp {
    fn from(ns: u64) -> Self {
        Timestamp(ns)
    }
}

impl Add<u64> for Timestamp {
    type Output = Timestamp;
    fn add(self, ns: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(ns))
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Timestamp;
    fn sub(self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic() {
        let a = Timestamp::now();
        let b = Timestamp::now();
        assert!(a.raw() > 0);
        assert!(b >= a);
    }

    #[test]
    fn arithmetic_saturates() {
        let ts = Timestamp::from(10);
        assert_eq!((ts + 5).raw(), 15);
        assert_eq!((ts - Timestamp::from(3)).raw(), 7);
        assert_eq!((ts - Timestamp::from(20)).raw(), 0);
    }
}
