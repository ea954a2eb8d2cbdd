//! # High level notes
//!
//! The contents of this module are generated mostly by macros, which
//! implement the traits necessary to both be serialized/deserialized
//! and provide an additional level of type safety when constructing
//! netlink packets. Some of the traits generated in this module allow
//! netlink structures to express trait bounds assuring that only
//! compatible constant-based enums are allowed to be passed in as
//! parameters.
//!
//! Most of the netlink constants come from the Linux kernel headers
//! and are taken from `libc`; the `mac80211_hwsim` constants live in
//! an in-driver header file with no userspace export, so they are
//! spelled out in [`hwsim`] the way other WiFi tooling does.
//!
//! # Design decisions
//!
//! * Enums are used so that values can be checked against a finite set
//!   of inputs as opposed to the range of whatever integer type C
//!   defines as the struct member type, which makes it easier to catch
//!   garbage responses and corruption in messages from the kernel.
//! * `UnrecognizedVariant` is included in each enum because
//!   completeness cannot be guaranteed for every constant for every
//!   protocol version. A kernel newer than this crate can always send
//!   a command we do not know about; those messages are skipped, not
//!   errors.

#[macro_use]
mod macros;

/// Constants related to generic netlink control messages
pub mod genl;
/// Constants related to the `mac80211_hwsim` virtual WiFi driver
pub mod hwsim;
/// Constants related to top level netlink headers and socket
/// operations
pub mod nl;

#[cfg(test)]
mod test {
    use super::genl::*;

    #[test]
    fn test_generated_enum_into_from() {
        let getfamily: u8 = CtrlCmd::Getfamily.into();
        assert_eq!(getfamily, libc::CTRL_CMD_GETFAMILY as u8);

        let variant = CtrlCmd::from(libc::CTRL_CMD_GETFAMILY as u8);
        assert_eq!(variant, CtrlCmd::Getfamily);

        let unknown = CtrlCmd::from(0xfe);
        assert_eq!(unknown, CtrlCmd::UnrecognizedVariant(0xfe));
    }
}
