//! The absolute-deadline timer driving deferred delivery.
//!
//! One `timerfd` armed with `TFD_TIMER_ABSTIME` covers every queue in
//! the medium: after any queue mutation the owner re-arms it to the
//! earliest head-of-queue expiry, or disarms it when nothing is
//! queued. The timer may fire late but never early; loss of the timer
//! primitive is fatal to the process.

use std::{
    io,
    mem::size_of,
    os::unix::io::{AsRawFd, RawFd},
};

use crate::time::Timespec;

/// A one-shot absolute-deadline timer on the monotonic clock.
pub struct TimerFd {
    fd: RawFd,
}

impl TimerFd {
    /// Create a disarmed timer.
    pub fn new() -> Result<Self, io::Error> {
        match unsafe {
            libc::timerfd_create(
                libc::CLOCK_MONOTONIC,
                libc::TFD_NONBLOCK | libc::TFD_CLOEXEC,
            )
        } {
            fd if fd >= 0 => Ok(TimerFd { fd }),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Arm the timer for an absolute deadline, replacing any prior
    /// deadline. A deadline already in the past fires immediately.
    pub fn arm(&self, deadline: Timespec) -> Result<(), io::Error> {
        // An all-zero it_value disarms a timerfd, so the epoch itself
        // is nudged forward one nanosecond.
        let deadline = if deadline == Timespec::ZERO {
            Timespec::new(0, 1)
        } else {
            deadline
        };
        let spec = libc::itimerspec {
            it_interval: Timespec::ZERO.to_libc(),
            it_value: deadline.to_libc(),
        };
        self.settime(&spec, libc::TFD_TIMER_ABSTIME)
    }

    /// Disarm the timer.
    pub fn disarm(&self) -> Result<(), io::Error> {
        let spec = libc::itimerspec {
            it_interval: Timespec::ZERO.to_libc(),
            it_value: Timespec::ZERO.to_libc(),
        };
        self.settime(&spec, 0)
    }

    fn settime(&self, spec: &libc::itimerspec, flags: libc::c_int) -> Result<(), io::Error> {
        match unsafe { libc::timerfd_settime(self.fd, flags, spec, std::ptr::null_mut()) } {
            0 => Ok(()),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Consume the expiration count after the descriptor polled
    /// readable. Returns 0 when nothing was pending.
    pub fn drain(&self) -> Result<u64, io::Error> {
        let mut expirations = 0u64;
        match unsafe {
            libc::read(
                self.fd,
                &mut expirations as *mut u64 as *mut libc::c_void,
                size_of::<u64>(),
            )
        } {
            i if i >= 0 => Ok(expirations),
            _ => {
                let e = io::Error::last_os_error();
                if e.kind() == io::ErrorKind::WouldBlock {
                    Ok(0)
                } else {
                    Err(e)
                }
            }
        }
    }
}

impl AsRawFd for TimerFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for TimerFd {
    /// Closes the underlying file descriptor to avoid file descriptor
    /// leaks.
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
