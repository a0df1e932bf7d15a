//! Logical simulated time.
//!
//! The kernel never touches the wall clock; every `SimInstant` is a
//! count of microseconds since the start of the run, advanced only by
//! the kernel's `elapsedTime` sweep.

use std::fmt::Display;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A point in simulated time, in whole microseconds since t=0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant {
    micros: u64,
}

impl SimInstant {
    pub const ZERO: SimInstant = SimInstant { micros: 0 };

    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    pub const fn as_micros(&self) -> u64 {
        self.micros
    }

    #[must_use]
    pub fn duration_since(&self, other: Self) -> SimDuration {
        SimDuration::from_micros(self.micros as i64 - other.micros as i64)
    }

    #[must_use]
    pub const fn checked_add(self, duration: SimDuration) -> Option<Self> {
        match self.micros.checked_add_signed(duration.micros) {
            Some(micros) => Some(Self { micros }),
            None => None,
        }
    }

    #[must_use]
    pub fn saturating_add(self, duration: SimDuration) -> Self {
        self.checked_add(duration).unwrap_or(SimInstant {
            micros: if duration.micros.is_negative() { 0 } else { u64::MAX },
        })
    }
}

impl Display for SimInstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}us", self.micros)
    }
}

impl Add<SimDuration> for SimInstant {
    type Output = SimInstant;

    fn add(self, rhs: SimDuration) -> Self::Output {
        self.checked_add(rhs).expect("SimInstant overflow")
    }
}

impl AddAssign<SimDuration> for SimInstant {
    fn add_assign(&mut self, rhs: SimDuration) {
        *self = *self + rhs;
    }
}

impl Sub<SimInstant> for SimInstant {
    type Output = SimDuration;

    fn sub(self, rhs: SimInstant) -> Self::Output {
        self.duration_since(rhs)
    }
}

/// A span of simulated time, in microseconds. May be negative as an
/// intermediate computation result, though the kernel only ever
/// schedules non-negative durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimDuration {
    micros: i64,
}

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration { micros: 0 };

    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Construct from a fractional microsecond value, rounding to the
    /// nearest microsecond. Duration arithmetic in §4.2 works with
    /// fractional symbol durations (e.g. 13.6 us HE symbols).
    pub fn from_micros_f64(micros: f64) -> Self {
        Self {
            micros: micros.round() as i64,
        }
    }

    pub const fn as_micros(&self) -> i64 {
        self.micros
    }

    pub fn as_micros_f64(&self) -> f64 {
        self.micros as f64
    }

    pub const fn is_positive(&self) -> bool {
        self.micros > 0
    }

    #[must_use]
    pub const fn checked_add(self, rhs: SimDuration) -> Option<Self> {
        match self.micros.checked_add(rhs.micros) {
            Some(micros) => Some(Self { micros }),
            None => None,
        }
    }
}

impl Display for SimDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}us", self.micros)
    }
}

impl Add for SimDuration {
    type Output = SimDuration;

    fn add(self, rhs: SimDuration) -> Self::Output {
        self.checked_add(rhs).expect("SimDuration overflow")
    }
}

impl AddAssign for SimDuration {
    fn add_assign(&mut self, rhs: SimDuration) {
        *self = *self + rhs;
    }
}

impl Sub for SimDuration {
    type Output = SimDuration;

    fn sub(self, rhs: SimDuration) -> Self::Output {
        Self {
            micros: self.micros - rhs.micros,
        }
    }
}

impl SubAssign for SimDuration {
    fn sub_assign(&mut self, rhs: SimDuration) {
        *self = *self - rhs;
    }
}

/// `min` over the positive members of an iterator of "next invoke"
/// durations, per the kernel's §4.1 advance rule. Values `<= 0` are
/// treated as "no pending event" and ignored. Returns `None` when no
/// positive value was found.
pub fn min_positive(durations: impl IntoIterator<Item = SimDuration>) -> Option<SimDuration> {
    durations.into_iter().filter(|d| d.is_positive()).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_since() {
        assert_eq!(
            SimInstant::from_micros(10).duration_since(SimInstant::from_micros(4)),
            SimDuration::from_micros(6)
        );
        assert_eq!(
            SimInstant::from_micros(4).duration_since(SimInstant::from_micros(10)),
            SimDuration::from_micros(-6)
        );
    }

    #[test]
    fn add_sub() {
        assert_eq!(
            SimInstant::from_micros(5) + SimDuration::from_micros(3),
            SimInstant::from_micros(8)
        );
        assert_eq!(
            SimInstant::from_micros(8) - SimInstant::from_micros(5),
            SimDuration::from_micros(3)
        );
    }

    #[test]
    fn min_positive_ignores_non_positive() {
        let values = [
            SimDuration::from_micros(-5),
            SimDuration::ZERO,
            SimDuration::from_micros(12),
            SimDuration::from_micros(3),
        ];
        assert_eq!(min_positive(values), Some(SimDuration::from_micros(3)));
        assert_eq!(min_positive([SimDuration::from_micros(-1)]), None);
    }
}
