//! # A wireless medium for virtual radios
//!
//! `wmediumd` arbitrates the shared radio medium for the Linux
//! `mac80211_hwsim` kernel module. Every frame transmitted by a virtual
//! radio is handed to this process over generic netlink; the medium
//! decides when and whether the frame reaches its receivers, charges the
//! sender for contention, retries and backoff, and reports the
//! transmission outcome back to the kernel.
//!
//! ## The project is broken down into the following modules:
//! * `consts` - netlink and `mac80211_hwsim` constants wrapped in type
//!   safe enums and flag sets.
//! * `err` - protocol and library-level errors encountered in the code.
//! * `nl` - the top level netlink header that all messages are
//!   encapsulated in.
//! * `genl` - generic netlink header and attribute parsing.
//! * `nlattr` - netlink attribute (TLV) handling.
//! * `socket` - a netlink socket structure over `libc` with convenience
//!   functions for family resolution and typed send/receive.
//! * `hwsim` - the typed `mac80211_hwsim` boundary messages and the
//!   socket wrapper the medium talks through.
//! * `ieee80211` - MAC addresses, frame classification and air-time
//!   arithmetic.
//! * `time` / `timer` - monotonic timestamps and the absolute-deadline
//!   timerfd that drives deferred delivery.
//! * `station` - per-radio transmit queues.
//! * `model` - the per-rate error probability model.
//! * `medium` - the engine: send-time computation, time-ordered
//!   delivery, status reporting.
//! * `config` - station list and link SNR configuration files.
//! * `event` - the single-threaded readiness loop tying it all together.
//!
//! ## [`Nl`] trait
//!
//! `lib.rs` at the top level contains the [`Nl`] trait which provides
//! buffer size calculation functions, a serialization method, and a
//! deserialization method. It also contains implementations of [`Nl`]
//! for the primitive wire types. Netlink is a native-endian protocol;
//! all integer codecs go through [`byteorder::NativeEndian`].

#![deny(missing_docs)]

pub mod config;
pub mod consts;
pub mod err;
pub mod event;
pub mod genl;
pub mod hwsim;
pub mod ieee80211;
pub mod medium;
pub mod model;
pub mod nl;
pub mod nlattr;
pub mod socket;
pub mod station;
pub mod time;
pub mod timer;

use std::{
    io::{Cursor, Read, Write},
    mem,
};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::err::{DeError, SerError};

/// Max supported message length for netlink messages supported by
/// the kernel.
pub const MAX_NL_LENGTH: usize = 32768;

/// Reimplementation of the `NLA_ALIGN` macro in C.
pub fn alignto(len: usize) -> usize {
    (len + libc::NLA_ALIGNTO as usize - 1) & !(libc::NLA_ALIGNTO as usize - 1)
}

/// Trait defining basic actions required for netlink communication.
///
/// Implementations for the primitive types used on the wire are
/// provided below; the header and attribute structures in [`nl`],
/// [`genl`], [`nlattr`] and [`hwsim`] build on them.
pub trait Nl: Sized {
    /// Serialization method. Appends the binary representation of
    /// `self` to `mem`.
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError>;

    /// Deserialization method.
    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError>;

    /// The size of the binary representation of an existing value
    /// not aligned to the 4-byte netlink boundary.
    fn size(&self) -> usize;

    /// The size of the binary representation of an existing value
    /// aligned to the 4-byte netlink boundary.
    fn asize(&self) -> usize {
        alignto(self.size())
    }

    /// Pad the serialized data structure to alignment.
    fn pad(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        let padding_len = self.asize() - self.size();
        mem.write_all(&[0u8; libc::NLA_ALIGNTO as usize][..padding_len])?;
        Ok(())
    }
}

impl Nl for u8 {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        mem.write_u8(*self)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        Ok(mem.read_u8()?)
    }

    fn size(&self) -> usize {
        mem::size_of::<u8>()
    }
}

impl Nl for i8 {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        mem.write_i8(*self)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        Ok(mem.read_i8()?)
    }

    fn size(&self) -> usize {
        mem::size_of::<i8>()
    }
}

impl Nl for u16 {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        mem.write_u16::<NativeEndian>(*self)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        Ok(mem.read_u16::<NativeEndian>()?)
    }

    fn size(&self) -> usize {
        mem::size_of::<u16>()
    }
}

impl Nl for u32 {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        mem.write_u32::<NativeEndian>(*self)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        Ok(mem.read_u32::<NativeEndian>()?)
    }

    fn size(&self) -> usize {
        mem::size_of::<u32>()
    }
}

impl Nl for i32 {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        mem.write_i32::<NativeEndian>(*self)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        Ok(mem.read_i32::<NativeEndian>()?)
    }

    fn size(&self) -> usize {
        mem::size_of::<i32>()
    }
}

impl Nl for u64 {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        mem.write_u64::<NativeEndian>(*self)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        Ok(mem.read_u64::<NativeEndian>()?)
    }

    fn size(&self) -> usize {
        mem::size_of::<u64>()
    }
}

impl Nl for () {
    fn serialize(&self, _mem: &mut Vec<u8>) -> Result<(), SerError> {
        Ok(())
    }

    fn deserialize(_mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        Ok(())
    }

    fn size(&self) -> usize {
        0
    }
}

impl Nl for Vec<u8> {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        mem.write_all(self)?;
        Ok(())
    }

    /// Consumes the remainder of the buffer.
    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        let mut buf = Vec::new();
        mem.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl Nl for String {
    /// Serialized with a trailing null byte as netlink string
    /// attributes require.
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        mem.write_all(self.as_bytes())?;
        mem.write_u8(0)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        let mut buf = Vec::new();
        mem.read_to_end(&mut buf)?;
        while buf.last() == Some(&0) {
            buf.pop();
        }
        Ok(String::from_utf8(buf)?)
    }

    fn size(&self) -> usize {
        self.len() + 1
    }
}
