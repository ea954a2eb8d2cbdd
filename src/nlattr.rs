//! Netlink attribute (TLV) handling.
//!
//! Attributes are held as a type plus an opaque byte payload; payloads
//! are interpreted on demand through [`AttrHandle::get_payload`]. Due
//! to Rust's requirement that all elements of a [`Vec`] are of the
//! same type, payloads stay byte buffers so that one attribute list
//! can carry mixed payload types and still be type checked at the
//! point of use.
//!
//! The codec preserves attribute order and the exact on-wire sizes;
//! every attribute is padded to the 4-byte netlink alignment.

use std::io::Cursor;

use crate::{
    alignto,
    consts::genl::NlAttrType,
    err::{DeError, SerError},
    Nl,
};

/// Length of the fixed portion of a netlink attribute header.
pub const NLA_HDRLEN: usize = 4;

/// Struct representing a netlink attribute and payload
#[derive(Debug, PartialEq)]
pub struct Nlattr<T> {
    /// Length of the attribute header and payload together
    pub nla_len: u16,
    /// Enum representing the type of the attribute payload
    pub nla_type: T,
    /// Payload of the attribute as a binary buffer
    pub payload: Vec<u8>,
}

impl<T> Nlattr<T>
where
    T: NlAttrType,
{
    /// Create a new netlink attribute with a payload from an object
    /// implementing [`Nl`]. `nla_len` is computed from the payload
    /// when [`None`] is given.
    pub fn new<P>(nla_len: Option<u16>, nla_type: T, payload: P) -> Result<Self, SerError>
    where
        P: Nl,
    {
        let mut mem = Vec::with_capacity(payload.size());
        payload.serialize(&mut mem)?;
        let mut nla = Nlattr {
            nla_len: 0,
            nla_type,
            payload: mem,
        };
        nla.nla_len = nla_len.unwrap_or(nla.size() as u16);
        Ok(nla)
    }

    /// Create a new netlink attribute from a raw byte payload.
    pub fn new_binary(nla_type: T, payload: Vec<u8>) -> Self {
        let mut nla = Nlattr {
            nla_len: 0,
            nla_type,
            payload,
        };
        nla.nla_len = nla.size() as u16;
        nla
    }
}

impl<T> Nl for Nlattr<T>
where
    T: NlAttrType,
{
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), SerError> {
        self.nla_len.serialize(mem)?;
        self.nla_type.serialize(mem)?;
        self.payload.serialize(mem)?;
        self.pad(mem)?;
        Ok(())
    }

    fn deserialize(mem: &mut Cursor<&[u8]>) -> Result<Self, DeError> {
        let nla_len = u16::deserialize(mem)?;
        let nla_type = T::from(u16::deserialize(mem)?);
        let payload_len = (nla_len as usize)
            .checked_sub(NLA_HDRLEN)
            .ok_or(DeError::UnexpectedEob)?;

        let pos = mem.position() as usize;
        let buf: &[u8] = mem.get_ref();
        if pos + payload_len > buf.len() {
            return Err(DeError::UnexpectedEob);
        }
        let payload = buf[pos..pos + payload_len].to_vec();

        // Skip the attribute's padding unless the buffer ends first.
        let next = (pos + alignto(payload_len)).min(buf.len());
        mem.set_position(next as u64);

        Ok(Nlattr {
            nla_len,
            nla_type,
            payload,
        })
    }

    fn size(&self) -> usize {
        NLA_HDRLEN + self.payload.len()
    }
}

/// Handle for attribute parsing and traversal over a parsed attribute
/// list.
pub struct AttrHandle<'a, T> {
    attrs: &'a [Nlattr<T>],
}

impl<'a, T> AttrHandle<'a, T>
where
    T: NlAttrType,
{
    /// Create a new handle over a slice of parsed attributes.
    pub fn new(attrs: &'a [Nlattr<T>]) -> Self {
        AttrHandle { attrs }
    }

    /// Pass back an iterator over the attributes.
    pub fn iter(&self) -> std::slice::Iter<'a, Nlattr<T>> {
        self.attrs.iter()
    }

    /// Get the first attribute of the given type, if present.
    pub fn get_attribute(&self, t: T) -> Option<&'a Nlattr<T>> {
        self.attrs.iter().find(|a| a.nla_type == t)
    }

    /// Parse the payload of the attribute with the given type as `P`.
    ///
    /// The payload has to match the size of `P` exactly; a short or
    /// oversized payload is a malformed message.
    pub fn get_payload<P>(&self, t: T) -> Result<P, DeError>
    where
        P: Nl,
    {
        let attr = self
            .get_attribute(t.clone())
            .ok_or_else(|| DeError::MissingAttribute(format!("{:?}", t)))?;
        let mut cur = Cursor::new(attr.payload.as_slice());
        let parsed = P::deserialize(&mut cur)?;
        if (cur.position() as usize) < attr.payload.len() {
            return Err(DeError::DataLeftInBuffer);
        }
        Ok(parsed)
    }
}
