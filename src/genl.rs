//! This module contains generic netlink parsing data structures,
//! handled by the [`Genlmsghdr`] header struct which contains all of
//! the information needed for the generic netlink layer.
//!
//! # Design decisions
//!
//! The attribute list is parsed eagerly into a [`Vec`] of
//! [`Nlattr`]s; traversal and typed payload access go through
//! [`AttrHandle`] so that lookups by attribute type read naturally at
//! the call site.

use std::io::Cursor;

use crate::{
    consts::genl::{Cmd, NlAttrType},
    err::{DeError, SerError},
    nlattr::{AttrHandle, Nlattr, NLA_HDRLEN},
    Nl,
};

/// Length of the fixed portion of a generic netlink header.
pub const GENL_HDRLEN: usize = 4;

/// Struct representing a generic netlink header and payload
#[derive(Debug, PartialEq)]
pub struct Genlmsghdr<C, T> {
    /// Generic netlink message command
    pub cmd: C,
    /// Version of the generic netlink family protocol
    pub version: u8,
    reserved: u16,
    attrs: Vec<Nlattr<T>>,
}

impl<C, T> Genlmsghdr<C, T>
where
    C: Cmd,
    T: NlAttrType,
{
    /// Create a new generic netlink packet.
    pub fn new(cmd: C, version: u8, attrs: Vec<Nlattr<T>>) -> Self {
        Genlmsghdr {
            cmd,
            version,
            reserved: 0,
            attrs,
        }
    }

    /// Get a handle for attribute parsing and traversal.
    pub fn get_attr_handle(&self) -> AttrHandle<T> {
        AttrHandle::new(&self.attrs)
    }
}

impl<C, T> Nl for Genlmsghdr<C, T>
where
    C: Cmd,
    T: NlAttrType,
{
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        self.cmd.serialize(mem)?;
        self.version.serialize(mem)?;
        self.reserved.serialize(mem)?;
        for attr in &self.attrs {
            attr.serialize(mem)?;
        }
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        let cmd = C::from(u8::deserialize(mem)?);
        let version = u8::deserialize(mem)?;
        let reserved = u16::deserialize(mem)?;

        let mut attrs = Vec::new();
        let len = mem.get_ref().len();
        while len.saturating_sub(mem.position() as usize) >= NLA_HDRLEN {
            attrs.push(Nlattr::deserialize(mem)?);
        }

        Ok(Genlmsghdr {
            cmd,
            version,
            reserved,
            attrs,
        })
    }

    fn size(&self) -> usize {
        GENL_HDRLEN + self.attrs.iter().fold(0, |acc, attr| acc + attr.asize())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consts::hwsim::{HwsimAttr, HwsimCmd, VERSION_NR};
    use crate::ieee80211::MacAddr;

    #[test]
    fn test_genlmsghdr_round_trip() {
        let attrs = vec![
            Nlattr::new(
                None,
                HwsimAttr::AddrReceiver,
                MacAddr::new([2, 0, 0, 0, 0, 1]),
            )
            .unwrap(),
            Nlattr::new(None, HwsimAttr::RxRate, 1u32).unwrap(),
            Nlattr::new(None, HwsimAttr::Signal, -50i32).unwrap(),
        ];
        let genl = Genlmsghdr::new(HwsimCmd::Frame, VERSION_NR, attrs);

        let mut mem = Vec::new();
        genl.serialize(&mut mem).unwrap();
        assert_eq!(mem.len(), genl.size());

        let mut cur = Cursor::new(mem.as_slice());
        let parsed: Genlmsghdr<HwsimCmd, HwsimAttr> = Genlmsghdr::deserialize(&mut cur).unwrap();
        assert_eq!(parsed, genl);

        let handle = parsed.get_attr_handle();
        assert_eq!(handle.get_payload::<u32>(HwsimAttr::RxRate).unwrap(), 1);
        assert_eq!(handle.get_payload::<i32>(HwsimAttr::Signal).unwrap(), -50);
    }

    #[test]
    fn test_attribute_order_preserved() {
        let attrs = vec![
            Nlattr::new(None, HwsimAttr::Flags, 4u32).unwrap(),
            Nlattr::new(None, HwsimAttr::Cookie, 99u64).unwrap(),
        ];
        let genl = Genlmsghdr::new(HwsimCmd::TxInfoFrame, VERSION_NR, attrs);

        let mut mem = Vec::new();
        genl.serialize(&mut mem).unwrap();
        let mut cur = Cursor::new(mem.as_slice());
        let parsed: Genlmsghdr<HwsimCmd, HwsimAttr> = Genlmsghdr::deserialize(&mut cur).unwrap();

        let types: Vec<u16> = parsed
            .get_attr_handle()
            .iter()
            .map(|a| u16::from(&a.nla_type))
            .collect();
        assert_eq!(types, vec![4, 8]);
    }
}
