//! The single-threaded readiness loop.
//!
//! Three descriptors drive the medium: the hwsim netlink socket
//! (ingress transmissions), the delivery timer, and a signalfd for
//! shutdown. One `poll(2)` cycle dispatches whichever are readable;
//! handlers run to completion in program order, so all medium state is
//! mutated from this thread only and never under a lock. After every
//! batch of queue mutations the timer is re-armed to the earliest
//! head-of-queue expiry.

use std::{
    io,
    mem::{size_of, zeroed},
    os::unix::io::{AsRawFd, RawFd},
};

use log::{debug, info};
use rand::Rng;

use crate::{
    err::NlError,
    hwsim::{HwsimSocket, IncomingFrame},
    medium::Medium,
    model::ErrorModel,
    time::Timespec,
    timer::TimerFd,
};

/// A descriptor that becomes readable when a termination signal
/// arrives. SIGINT and SIGTERM are blocked for normal delivery and
/// routed here so the loop observes shutdown as just another
/// readiness source.
pub struct SignalFd {
    fd: RawFd,
}

impl SignalFd {
    /// Block the termination signals and open the descriptor.
    pub fn new() -> Result<Self, io::Error> {
        let mut mask = unsafe { zeroed::<libc::sigset_t>() };
        unsafe {
            libc::sigemptyset(&mut mask);
            libc::sigaddset(&mut mask, libc::SIGINT);
            libc::sigaddset(&mut mask, libc::SIGTERM);
        }
        if unsafe { libc::sigprocmask(libc::SIG_BLOCK, &mask, std::ptr::null_mut()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        match unsafe { libc::signalfd(-1, &mask, libc::SFD_NONBLOCK | libc::SFD_CLOEXEC) } {
            fd if fd >= 0 => Ok(SignalFd { fd }),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Consume pending siginfo records after the descriptor polled
    /// readable.
    pub fn drain(&self) -> Result<(), io::Error> {
        let mut info = unsafe { zeroed::<libc::signalfd_siginfo>() };
        loop {
            match unsafe {
                libc::read(
                    self.fd,
                    &mut info as *mut _ as *mut libc::c_void,
                    size_of::<libc::signalfd_siginfo>(),
                )
            } {
                i if i >= 0 => continue,
                _ => {
                    let e = io::Error::last_os_error();
                    return if e.kind() == io::ErrorKind::WouldBlock {
                        Ok(())
                    } else {
                        Err(e)
                    };
                }
            }
        }
    }
}

impl AsRawFd for SignalFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for SignalFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

/// The daemon: owns the hwsim socket, the delivery timer, the
/// shutdown descriptor and the medium itself.
pub struct EventLoop<M, R> {
    sock: HwsimSocket,
    timer: TimerFd,
    signals: SignalFd,
    medium: Medium<M, R>,
}

impl<M, R> EventLoop<M, R>
where
    M: ErrorModel,
    R: Rng,
{
    /// Set up the timer and shutdown descriptors around a connected
    /// socket and a populated medium.
    pub fn new(sock: HwsimSocket, medium: Medium<M, R>) -> Result<Self, NlError> {
        Ok(EventLoop {
            sock,
            timer: TimerFd::new()?,
            signals: SignalFd::new()?,
            medium,
        })
    }

    /// Register with the kernel and dispatch until a termination
    /// signal arrives.
    ///
    /// Shutdown drops all queued frames without delivery or status
    /// reports; the kernel observes the transport closing and times
    /// out its own side.
    pub fn run(&mut self) -> Result<(), NlError> {
        self.sock.register()?;
        info!("registered as medium arbiter");

        let mut pending: Vec<IncomingFrame> = Vec::new();
        loop {
            let mut fds = [
                pollfd(self.sock.as_raw_fd()),
                pollfd(self.timer.as_raw_fd()),
                pollfd(self.signals.as_raw_fd()),
            ];
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
            if rc < 0 {
                let e = io::Error::last_os_error();
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }
            for fd in &fds {
                if fd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
                    return Err(NlError::new("poll descriptor failed"));
                }
            }

            if fds[2].revents & libc::POLLIN != 0 {
                self.signals.drain()?;
                info!("termination signal received, shutting down");
                break;
            }

            if fds[0].revents & libc::POLLIN != 0 {
                self.sock.recv_frames(&mut pending)?;
                if !pending.is_empty() {
                    let now = Timespec::now()?;
                    for frame in pending.drain(..) {
                        self.medium.enqueue_frame(frame, now);
                    }
                    self.rearm()?;
                }
            }

            if fds[1].revents & libc::POLLIN != 0 {
                self.timer.drain()?;
                let now = Timespec::now()?;
                debug!("delivery timer fired at [{}]", now);
                self.medium.deliver_expired(now, &mut self.sock);
                self.rearm()?;
            }
        }

        let stats = self.medium.stats();
        info!(
            "medium stats: received {} sent {} dropped {} acked {}",
            stats.received, stats.sent, stats.dropped, stats.acked
        );
        Ok(())
    }

    /// Re-arm the delivery timer to the earliest head-of-queue expiry,
    /// or disarm it when all queues are empty. Failure to arm means
    /// deferred delivery can never happen again, which is fatal.
    fn rearm(&mut self) -> Result<(), NlError> {
        match self.medium.next_deadline() {
            Some(deadline) => self.timer.arm(deadline)?,
            None => self.timer.disarm()?,
        }
        Ok(())
    }
}

fn pollfd(fd: RawFd) -> libc::pollfd {
    libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }
}
