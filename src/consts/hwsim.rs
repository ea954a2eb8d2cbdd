//! Constants for the Linux `mac80211_hwsim` generic netlink family.
//!
//! These constants are only available in an in-driver header file;
//! there is presently no way to include them from userspace without
//! copying the values explicitly. Other WiFi tooling (`iwd`,
//! `hostapd`) defines them in the same way, given this limitation.

use super::genl::{Cmd, NlAttrType};

/// Name under which the driver registers its generic netlink family.
pub const FAMILY_NAME: &str = "MAC80211_HWSIM";

/// Protocol version sent in the generic netlink header of every
/// request.
pub const VERSION_NR: u8 = 1;

impl_var_trait!(
    /// Commands of the `mac80211_hwsim` generic netlink family that
    /// the medium participates in
    HwsimCmd,
    u8,
    Cmd,
    Unspec => 0,
    /// Register this socket as the medium arbiter; the kernel stops
    /// looping frames back internally and forwards every transmission
    /// here instead.
    Register => 1,
    /// A frame crossing the medium. Sent by the kernel when a radio
    /// transmits, and sent by the medium to deliver a received copy.
    Frame => 2,
    /// Transmission status report from the medium back to the
    /// transmitting radio.
    TxInfoFrame => 3
);

impl_var_trait!(
    /// Attributes of the `mac80211_hwsim` generic netlink family
    HwsimAttr,
    u16,
    NlAttrType,
    Unspec => 0,
    /// MAC address of the radio a frame copy is delivered to (6 bytes)
    AddrReceiver => 1,
    /// MAC address of the radio that transmitted a frame (6 bytes)
    AddrTransmitter => 2,
    /// The 802.11 frame contents
    Frame => 3,
    /// `mac80211` transmission flags (`u32`)
    Flags => 4,
    /// Receive rate index for a delivered frame copy (`u32`)
    RxRate => 5,
    /// Signal strength in dBm (`i32`)
    Signal => 6,
    /// `ieee80211_tx_rate` array, the multi-rate-retry ladder
    TxInfo => 7,
    /// `sk_buff` cookie identifying the frame in the status report
    /// (`u64`)
    Cookie => 8
);

impl_flags!(
    /// Transmission control flags carried in the
    /// [`HwsimAttr::Flags`] attribute.
    ///
    /// Must match the `flags` member of `ieee80211_tx_info` as the
    /// driver interprets it.
    TxControlFlags,
    u32,
    /// The sender requires a TX status callback for this frame.
    REQ_TX_STATUS => 1,
    /// The medium must not wait for an ack for this frame.
    NO_ACK => 1 << 1,
    /// Set by the medium when the frame was acknowledged.
    STAT_ACK => 1 << 2,
);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cmd_values() {
        assert_eq!(u8::from(HwsimCmd::Register), 1);
        assert_eq!(u8::from(HwsimCmd::Frame), 2);
        assert_eq!(u8::from(HwsimCmd::TxInfoFrame), 3);
    }

    #[test]
    fn test_attr_values() {
        assert_eq!(u16::from(HwsimAttr::AddrReceiver), 1);
        assert_eq!(u16::from(HwsimAttr::AddrTransmitter), 2);
        assert_eq!(u16::from(HwsimAttr::Frame), 3);
        assert_eq!(u16::from(HwsimAttr::Flags), 4);
        assert_eq!(u16::from(HwsimAttr::RxRate), 5);
        assert_eq!(u16::from(HwsimAttr::Signal), 6);
        assert_eq!(u16::from(HwsimAttr::TxInfo), 7);
        assert_eq!(u16::from(HwsimAttr::Cookie), 8);
    }
}
