//! Monotonic timestamps.
//!
//! Everything the medium schedules is expressed in absolute monotonic
//! time; the wall clock is never consulted.

use std::{fmt, io, ops::Add};

/// An absolute point on the monotonic clock with nanosecond
/// resolution. Ordered lexicographically by `(sec, nsec)`; `nsec` is
/// kept normalized below one second.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timespec {
    sec: i64,
    nsec: i64,
}

const NSEC_PER_SEC: i64 = 1_000_000_000;

impl Timespec {
    /// The zero timestamp, used as the disarmed timer sentinel.
    pub const ZERO: Timespec = Timespec { sec: 0, nsec: 0 };

    /// Construct from seconds and (normalized) nanoseconds.
    pub fn new(sec: i64, nsec: i64) -> Self {
        Timespec { sec, nsec }
    }

    /// Read the current monotonic time.
    pub fn now() -> Result<Self, io::Error> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        match unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) } {
            0 => Ok(Timespec {
                sec: ts.tv_sec as i64,
                nsec: ts.tv_nsec as i64,
            }),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// The timestamp `us` microseconds after this one.
    pub fn add_micros(self, us: u64) -> Self {
        let mut sec = self.sec + (us / 1_000_000) as i64;
        let mut nsec = self.nsec + (us % 1_000_000) as i64 * 1_000;
        if nsec >= NSEC_PER_SEC {
            sec += 1;
            nsec -= NSEC_PER_SEC;
        }
        Timespec { sec, nsec }
    }

    /// Whole seconds.
    pub fn sec(&self) -> i64 {
        self.sec
    }

    /// Nanoseconds past the whole second.
    pub fn nsec(&self) -> i64 {
        self.nsec
    }

    pub(crate) fn to_libc(self) -> libc::timespec {
        libc::timespec {
            tv_sec: self.sec as libc::time_t,
            tv_nsec: self.nsec as libc::c_long,
        }
    }
}

impl Add<u64> for Timespec {
    type Output = Timespec;

    /// Adds microseconds, mirroring the unit the air-time arithmetic
    /// works in.
    fn add(self, us: u64) -> Timespec {
        self.add_micros(us)
    }
}

impl fmt::Display for Timespec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:06}", self.sec, self.nsec / 1_000)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_add_micros_carry() {
        let t = Timespec::new(5, 999_999_000);
        assert_eq!(t.add_micros(2), Timespec::new(6, 1_000));
        assert_eq!(t.add_micros(0), t);
        assert_eq!(Timespec::ZERO.add_micros(2_500_000), Timespec::new(2, 500_000_000));
    }

    #[test]
    fn test_ordering() {
        assert!(Timespec::new(1, 0) < Timespec::new(1, 1));
        assert!(Timespec::new(1, 999_999_999) < Timespec::new(2, 0));
    }

    #[test]
    fn test_display_microsecond_precision() {
        assert_eq!(Timespec::new(3, 42_000).to_string(), "3.000042");
    }
}
