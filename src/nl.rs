//! This module contains the top level netlink header code. Every
//! netlink message is encapsulated in a top level `Nlmsghdr`.
//!
//! [`Nlmsghdr`] is the structure representing a header that all
//! netlink protocols require to be passed to the correct destination.
//!
//! # Design decisions
//!
//! Payloads for [`Nlmsghdr`] can be any type that implements the
//! [`Nl`] trait. Deserialization of the payload is bounded by the
//! `nl_len` field of the header so that multiple messages packed into
//! one datagram cannot bleed into each other.

use std::io::Cursor;

use crate::{
    consts::nl::{NlType, NlmF},
    err::{DeError, SerError},
    Nl,
};

/// Length of the fixed portion of a netlink message header.
pub const NLMSG_HDRLEN: usize = 16;

/// Top level netlink header and payload
#[derive(Debug, PartialEq)]
pub struct Nlmsghdr<T, P> {
    /// Length of the netlink message
    pub nl_len: u32,
    /// Type of the netlink message
    pub nl_type: T,
    /// Flags indicating properties of the request or response
    pub nl_flags: NlmF,
    /// Sequence number for netlink protocol
    pub nl_seq: u32,
    /// ID of the netlink destination for requests and source for
    /// responses
    pub nl_pid: u32,
    /// Payload of the netlink message
    pub nl_payload: P,
}

impl<T, P> Nlmsghdr<T, P>
where
    T: NlType,
    P: Nl,
{
    /// Create a new top level netlink packet with a payload.
    /// `nl_len` is computed from the payload when [`None`] is given.
    pub fn new(
        nl_len: Option<u32>,
        nl_type: T,
        nl_flags: NlmF,
        nl_seq: Option<u32>,
        nl_pid: Option<u32>,
        nl_payload: P,
    ) -> Self {
        let mut nl = Nlmsghdr {
            nl_len: 0,
            nl_type,
            nl_flags,
            nl_seq: nl_seq.unwrap_or(0),
            nl_pid: nl_pid.unwrap_or(0),
            nl_payload,
        };
        nl.nl_len = nl_len.unwrap_or(nl.size() as u32);
        nl
    }
}

impl<T, P> Nl for Nlmsghdr<T, P>
where
    T: NlType,
    P: Nl,
{
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        self.nl_len.serialize(mem)?;
        self.nl_type.serialize(mem)?;
        self.nl_flags.serialize(mem)?;
        self.nl_seq.serialize(mem)?;
        self.nl_pid.serialize(mem)?;
        self.nl_payload.serialize(mem)?;
        self.pad(mem)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        let nl_len = u32::deserialize(mem)?;
        let nl_type = T::from(u16::deserialize(mem)?);
        let nl_flags = NlmF::deserialize(mem)?;
        let nl_seq = u32::deserialize(mem)?;
        let nl_pid = u32::deserialize(mem)?;

        let payload_len = (nl_len as usize)
            .checked_sub(NLMSG_HDRLEN)
            .ok_or(DeError::UnexpectedEob)?;
        let pos = mem.position() as usize;
        let buf: &[u8] = mem.get_ref();
        if pos + payload_len > buf.len() {
            return Err(DeError::UnexpectedEob);
        }
        let mut sub = Cursor::new(&buf[pos..pos + payload_len]);
        let nl_payload = P::deserialize(&mut sub)?;
        mem.set_position((pos + payload_len) as u64);

        Ok(Nlmsghdr {
            nl_len,
            nl_type,
            nl_flags,
            nl_seq,
            nl_pid,
            nl_payload,
        })
    }

    fn size(&self) -> usize {
        NLMSG_HDRLEN + self.nl_payload.size()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consts::nl::Nlmsg;

    #[test]
    fn test_nlmsghdr_round_trip() {
        let hdr = Nlmsghdr::new(
            None,
            Nlmsg::Noop,
            NlmF::REQUEST,
            Some(7),
            None,
            vec![1u8, 2, 3, 4],
        );
        assert_eq!(hdr.nl_len, 20);

        let mut mem = Vec::new();
        hdr.serialize(&mut mem).unwrap();
        assert_eq!(mem.len(), 20);

        let mut cur = Cursor::new(mem.as_slice());
        let parsed: Nlmsghdr<Nlmsg, Vec<u8>> = Nlmsghdr::deserialize(&mut cur).unwrap();
        assert_eq!(parsed, hdr);
    }

    #[test]
    fn test_truncated_message_rejected() {
        let hdr = Nlmsghdr::new(None, Nlmsg::Noop, NlmF::REQUEST, None, None, vec![0u8; 8]);
        let mut mem = Vec::new();
        hdr.serialize(&mut mem).unwrap();
        mem.truncate(mem.len() - 4);

        let mut cur = Cursor::new(mem.as_slice());
        assert!(Nlmsghdr::<Nlmsg, Vec<u8>>::deserialize(&mut cur).is_err());
    }
}
