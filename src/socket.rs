//! # Socket code around `libc`
//!
//! ## Notes
//!
//! This module provides a low level one-to-one mapping between `libc`
//! system call wrappers with defaults specific to netlink sockets, as
//! well as a higher level API for generic netlink family resolution
//! and typed send/receive of [`Nlmsghdr`] structures.

use std::{
    io,
    io::Cursor,
    mem::{size_of, zeroed},
    os::unix::io::{AsRawFd, RawFd},
};

use byteorder::{ByteOrder, NativeEndian};

use crate::{
    alignto,
    consts::{
        genl::{CtrlAttr, CtrlCmd, CTRL_VERSION},
        nl::{AddrFamily, GenlId, NlFamily, NlType, Nlmsg, NlmF},
    },
    err::NlError,
    genl::Genlmsghdr,
    nl::{Nlmsghdr, NLMSG_HDRLEN},
    nlattr::Nlattr,
    Nl, MAX_NL_LENGTH,
};

/// Handle for the netlink socket file descriptor
pub struct NlSocket {
    fd: libc::c_int,
    seq: u32,
}

impl NlSocket {
    /// Wrapper around the `socket()` syscall filling in the
    /// netlink-specific information.
    pub fn new(proto: NlFamily) -> Result<Self, io::Error> {
        let fd = match unsafe {
            libc::socket(
                AddrFamily::Netlink.into(),
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                proto.into(),
            )
        } {
            i if i >= 0 => i,
            _ => return Err(io::Error::last_os_error()),
        };
        Ok(NlSocket { fd, seq: 0 })
    }

    /// Bind the socket to a netlink ID. See the netlink(7) man page
    /// for more information on netlink IDs.
    pub fn bind(&mut self, pid: Option<u32>) -> Result<(), io::Error> {
        let mut nladdr = unsafe { zeroed::<libc::sockaddr_nl>() };
        nladdr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
        nladdr.nl_pid = pid.unwrap_or(0);
        nladdr.nl_groups = 0;
        match unsafe {
            libc::bind(
                self.fd,
                &nladdr as *const _ as *const libc::sockaddr,
                size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        } {
            i if i >= 0 => Ok(()),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Equivalent of `socket` and `bind` calls.
    pub fn connect(proto: NlFamily, pid: Option<u32>) -> Result<Self, io::Error> {
        let mut s = NlSocket::new(proto)?;
        s.bind(pid)?;
        Ok(s)
    }

    /// Set the underlying socket file descriptor to be non blocking.
    pub fn nonblock(&mut self) -> Result<&mut Self, io::Error> {
        match unsafe {
            libc::fcntl(
                self.fd,
                libc::F_SETFL,
                libc::fcntl(self.fd, libc::F_GETFL, 0) | libc::O_NONBLOCK,
            )
        } {
            i if i < 0 => Err(io::Error::last_os_error()),
            _ => Ok(self),
        }
    }

    /// Send a message encoded as a byte slice over the socket.
    pub fn send<B>(&mut self, buf: B, flags: i32) -> Result<libc::ssize_t, io::Error>
    where
        B: AsRef<[u8]>,
    {
        match unsafe {
            libc::send(
                self.fd,
                buf.as_ref() as *const _ as *const libc::c_void,
                buf.as_ref().len(),
                flags,
            )
        } {
            i if i >= 0 => Ok(i),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Receive a datagram from the socket into the provided buffer.
    pub fn recv<B>(&mut self, mut buf: B, flags: i32) -> Result<libc::ssize_t, io::Error>
    where
        B: AsMut<[u8]>,
    {
        match unsafe {
            libc::recv(
                self.fd,
                buf.as_mut() as *mut _ as *mut libc::c_void,
                buf.as_mut().len(),
                flags,
            )
        } {
            i if i >= 0 => Ok(i),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Convenience function to serialize and send an [`Nlmsghdr`]
    /// struct, stamping it with the next sequence number.
    pub fn send_nl<T, P>(&mut self, mut msg: Nlmsghdr<T, P>) -> Result<(), NlError>
    where
        T: NlType,
        P: Nl,
    {
        self.seq = self.seq.wrapping_add(1);
        msg.nl_seq = self.seq;
        let mut mem = Vec::with_capacity(msg.asize());
        msg.serialize(&mut mem)?;
        self.send(mem, 0)?;
        Ok(())
    }

    /// Receive the next content-carrying message from the socket,
    /// skipping netlink control messages.
    ///
    /// ACK packets are consumed silently; an error packet with a
    /// non-zero code is returned as [`NlError::Nlmsgerr`].
    pub fn recv_nl<T, P>(&mut self) -> Result<Nlmsghdr<T, P>, NlError>
    where
        T: NlType,
        P: Nl,
    {
        let mut buf = vec![0u8; MAX_NL_LENGTH];
        loop {
            let n = self.recv(&mut buf, 0)? as usize;
            if n == 0 {
                return Err(NlError::new("netlink socket closed"));
            }
            let mut offset = 0;
            while offset + NLMSG_HDRLEN <= n {
                let msg_len = NativeEndian::read_u32(&buf[offset..offset + 4]) as usize;
                if msg_len < NLMSG_HDRLEN || offset + msg_len > n {
                    return Err(NlError::new("truncated netlink message"));
                }
                let raw_type = NativeEndian::read_u16(&buf[offset + 4..offset + 6]);
                match Nlmsg::from(raw_type) {
                    Nlmsg::Noop | Nlmsg::Done | Nlmsg::Overrun => (),
                    Nlmsg::Error => {
                        if msg_len < NLMSG_HDRLEN + 4 {
                            return Err(NlError::new("truncated netlink error packet"));
                        }
                        let code =
                            NativeEndian::read_i32(&buf[offset + NLMSG_HDRLEN..offset + 20]);
                        if code != 0 {
                            return Err(NlError::Nlmsgerr(code));
                        }
                        // A zero code is an ACK; skip it.
                    }
                    Nlmsg::UnrecognizedVariant(_) => {
                        let mut cur = Cursor::new(&buf[offset..offset + msg_len]);
                        return Ok(Nlmsghdr::deserialize(&mut cur)?);
                    }
                }
                offset += alignto(msg_len);
            }
        }
    }

    /// Resolve a generic netlink family name to its dynamically
    /// assigned numeric family ID.
    pub fn resolve_genl_family(&mut self, family_name: &str) -> Result<u16, NlError> {
        let attrs = vec![Nlattr::new(
            None,
            CtrlAttr::FamilyName,
            family_name.to_string(),
        )?];
        let genlhdr = Genlmsghdr::new(CtrlCmd::Getfamily, CTRL_VERSION, attrs);
        let nlhdr = Nlmsghdr::new(
            None,
            GenlId::Ctrl,
            NlmF::REQUEST | NlmF::ACK,
            None,
            None,
            genlhdr,
        );
        self.send_nl(nlhdr)?;

        let resp: Nlmsghdr<u16, Genlmsghdr<CtrlCmd, CtrlAttr>> = self.recv_nl()?;
        let handle = resp.nl_payload.get_attr_handle();
        Ok(handle.get_payload::<u16>(CtrlAttr::FamilyId)?)
    }
}

impl AsRawFd for NlSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for NlSocket {
    /// Closes the underlying file descriptor to avoid file descriptor
    /// leaks.
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
