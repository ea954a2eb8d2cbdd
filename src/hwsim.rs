//! The typed `mac80211_hwsim` boundary messages and the socket
//! wrapper the medium talks through.
//!
//! Three message kinds cross this boundary:
//! * a one-shot *register* request that makes this process the medium
//!   arbiter,
//! * *frame* messages in both directions (kernel to medium when a
//!   radio transmits, medium to kernel to deliver a received copy),
//! * *tx info* status reports from the medium back to the transmitting
//!   radio.
//!
//! The kernel rejects malformed messages silently, so the builders
//! here emit attributes in the exact order and with the exact sizes
//! the driver expects.

use std::os::unix::io::{AsRawFd, RawFd};

use byteorder::{ByteOrder, NativeEndian};
use log::{debug, warn};

use crate::{
    alignto,
    consts::{
        hwsim::{HwsimAttr, HwsimCmd, TxControlFlags, FAMILY_NAME, VERSION_NR},
        nl::{NlFamily, Nlmsg, NlmF},
    },
    err::{DeError, NlError},
    genl::Genlmsghdr,
    ieee80211::{MacAddr, HDR_MIN_LEN},
    medium::FrameSink,
    nl::{Nlmsghdr, NLMSG_HDRLEN},
    nlattr::Nlattr,
    socket::NlSocket,
    Nl, MAX_NL_LENGTH,
};

/// Number of rungs in a multi-rate-retry ladder.
pub const IEEE80211_TX_MAX_RATES: usize = 4;

/// One rung of the multi-rate-retry ladder: a rate index and the
/// number of attempts the sender wants at that rate. A negative index
/// marks the end of the ladder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HwsimTxRate {
    /// Rate table index, or negative for "no further rate".
    pub idx: i8,
    /// Attempt count at this rate.
    pub count: u8,
}

impl HwsimTxRate {
    /// The "no further rate" sentinel rung.
    pub const ABSENT: HwsimTxRate = HwsimTxRate { idx: -1, count: 0 };

    /// Whether this rung marks the end of the ladder.
    pub fn is_absent(&self) -> bool {
        self.idx < 0
    }
}

impl Nl for HwsimTxRate {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), crate::err::SerError> {
        self.idx.serialize(mem)?;
        self.count.serialize(mem)?;
        Ok(())
    }

    fn deserialize(mem: &mut std::io::Cursor<&[u8]>) -> Result<Self, DeError> {
        Ok(HwsimTxRate {
            idx: i8::deserialize(mem)?,
            count: u8::deserialize(mem)?,
        })
    }

    fn size(&self) -> usize {
        2
    }
}

impl Nl for [HwsimTxRate; IEEE80211_TX_MAX_RATES] {
    fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), crate::err::SerError> {
        for rate in self {
            rate.serialize(mem)?;
        }
        Ok(())
    }

    fn deserialize(mem: &mut std::io::Cursor<&[u8]>) -> Result<Self, DeError> {
        let mut rates = [HwsimTxRate::ABSENT; IEEE80211_TX_MAX_RATES];
        for rate in rates.iter_mut() {
            *rate = HwsimTxRate::deserialize(mem)?;
        }
        Ok(rates)
    }

    fn size(&self) -> usize {
        2 * IEEE80211_TX_MAX_RATES
    }
}

/// A transmission picked up from the kernel: one radio just put this
/// frame on the air.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingFrame {
    /// Address of the transmitting radio.
    pub transmitter: MacAddr,
    /// The 802.11 frame contents.
    pub payload: Vec<u8>,
    /// Transmission flags as submitted by the sender.
    pub flags: TxControlFlags,
    /// The multi-rate-retry ladder to try.
    pub tx_rates: [HwsimTxRate; IEEE80211_TX_MAX_RATES],
    /// Kernel cookie to echo back in the status report.
    pub cookie: u64,
}

impl IncomingFrame {
    /// Parse an incoming frame from the attributes of a
    /// [`HwsimCmd::Frame`] message.
    pub fn from_genl(genl: &Genlmsghdr<HwsimCmd, HwsimAttr>) -> Result<Self, DeError> {
        let handle = genl.get_attr_handle();
        let transmitter = handle.get_payload::<MacAddr>(HwsimAttr::AddrTransmitter)?;
        let payload = handle.get_payload::<Vec<u8>>(HwsimAttr::Frame)?;
        if payload.len() < HDR_MIN_LEN {
            return Err(DeError::new(format!(
                "frame of {} bytes is shorter than an 802.11 header",
                payload.len()
            )));
        }
        let flags = handle.get_payload::<TxControlFlags>(HwsimAttr::Flags)?;
        let tx_rates =
            handle.get_payload::<[HwsimTxRate; IEEE80211_TX_MAX_RATES]>(HwsimAttr::TxInfo)?;
        let cookie = handle.get_payload::<u64>(HwsimAttr::Cookie)?;
        Ok(IncomingFrame {
            transmitter,
            payload,
            flags,
            tx_rates,
            cookie,
        })
    }
}

/// The netlink socket bound to the `MAC80211_HWSIM` family.
///
/// Owns the raw socket, the resolved family ID and the receive
/// scratch buffer. Outbound send failures are the kernel's problem to
/// time out, so the [`FrameSink`] impl logs them and carries on.
pub struct HwsimSocket {
    sock: NlSocket,
    family_id: u16,
    buf: Vec<u8>,
}

impl HwsimSocket {
    /// Connect a generic netlink socket and resolve the
    /// `MAC80211_HWSIM` family. Fails when the kernel module is not
    /// loaded.
    pub fn connect() -> Result<Self, NlError> {
        let mut sock = NlSocket::connect(NlFamily::Generic, None)?;
        let family_id = sock.resolve_genl_family(FAMILY_NAME)?;
        sock.nonblock()?;
        debug!("resolved family {} to id {}", FAMILY_NAME, family_id);
        Ok(HwsimSocket {
            sock,
            family_id,
            buf: vec![0u8; MAX_NL_LENGTH],
        })
    }

    /// The resolved numeric family ID.
    pub fn family_id(&self) -> u16 {
        self.family_id
    }

    fn send_msg(
        &mut self,
        cmd: HwsimCmd,
        attrs: Vec<Nlattr<HwsimAttr>>,
    ) -> Result<(), NlError> {
        let genl = Genlmsghdr::new(cmd, VERSION_NR, attrs);
        let msg = Nlmsghdr::new(None, self.family_id, NlmF::REQUEST, None, None, genl);
        self.sock.send_nl(msg)
    }

    /// Declare this socket as the medium arbiter. From this point on
    /// the kernel forwards every transmission instead of looping it
    /// back internally.
    pub fn register(&mut self) -> Result<(), NlError> {
        self.send_msg(HwsimCmd::Register, Vec::new())
    }

    /// Deliver a received copy of a frame to one radio.
    pub fn send_cloned_frame(
        &mut self,
        receiver: MacAddr,
        payload: &[u8],
        rx_rate: u32,
        signal_dbm: i32,
    ) -> Result<(), NlError> {
        let attrs = vec![
            Nlattr::new(None, HwsimAttr::AddrReceiver, receiver)?,
            Nlattr::new_binary(HwsimAttr::Frame, payload.to_vec()),
            Nlattr::new(None, HwsimAttr::RxRate, rx_rate)?,
            Nlattr::new(None, HwsimAttr::Signal, signal_dbm)?,
        ];
        self.send_msg(HwsimCmd::Frame, attrs)
    }

    /// Report the transmission outcome back to the sending radio.
    pub fn send_tx_info(
        &mut self,
        transmitter: MacAddr,
        flags: TxControlFlags,
        signal_dbm: i32,
        tx_rates: &[HwsimTxRate; IEEE80211_TX_MAX_RATES],
        cookie: u64,
    ) -> Result<(), NlError> {
        let attrs = vec![
            Nlattr::new(None, HwsimAttr::AddrTransmitter, transmitter)?,
            Nlattr::new(None, HwsimAttr::Flags, flags)?,
            Nlattr::new(None, HwsimAttr::Signal, signal_dbm)?,
            Nlattr::new(None, HwsimAttr::TxInfo, *tx_rates)?,
            Nlattr::new(None, HwsimAttr::Cookie, cookie)?,
        ];
        self.send_msg(HwsimCmd::TxInfoFrame, attrs)
    }

    /// Drain every readable control message, appending parsed
    /// transmissions to `out`.
    ///
    /// Malformed messages and unknown commands are logged and
    /// skipped; only socket-level failures are returned as errors.
    pub fn recv_frames(&mut self, out: &mut Vec<IncomingFrame>) -> Result<(), NlError> {
        loop {
            let n = match self.sock.recv(&mut self.buf, 0) {
                Ok(0) => return Err(NlError::new("netlink socket closed")),
                Ok(n) => n as usize,
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            let mut offset = 0;
            while offset + NLMSG_HDRLEN <= n {
                let msg_len =
                    NativeEndian::read_u32(&self.buf[offset..offset + 4]) as usize;
                if msg_len < NLMSG_HDRLEN || offset + msg_len > n {
                    warn!("truncated netlink message from kernel, dropping datagram");
                    break;
                }
                let raw_type = NativeEndian::read_u16(&self.buf[offset + 4..offset + 6]);
                self.handle_msg(raw_type, &self.buf[offset..offset + msg_len], out);
                offset += alignto(msg_len);
            }
        }
    }

    fn handle_msg(&self, raw_type: u16, msg: &[u8], out: &mut Vec<IncomingFrame>) {
        if raw_type == self.family_id {
            let mut cur = std::io::Cursor::new(msg);
            let parsed: Result<Nlmsghdr<u16, Genlmsghdr<HwsimCmd, HwsimAttr>>, DeError> =
                Nlmsghdr::deserialize(&mut cur);
            let hdr = match parsed {
                Ok(hdr) => hdr,
                Err(e) => {
                    warn!("malformed {} message: {}", FAMILY_NAME, e);
                    return;
                }
            };
            match hdr.nl_payload.cmd {
                HwsimCmd::Frame => match IncomingFrame::from_genl(&hdr.nl_payload) {
                    Ok(frame) => out.push(frame),
                    Err(e) => warn!("dropping malformed frame message: {}", e),
                },
                ref cmd => debug!("ignoring {} command {:?}", FAMILY_NAME, cmd),
            }
        } else if Nlmsg::from(raw_type) == Nlmsg::Error {
            if msg.len() >= NLMSG_HDRLEN + 4 {
                let code = NativeEndian::read_i32(&msg[NLMSG_HDRLEN..NLMSG_HDRLEN + 4]);
                if code != 0 {
                    warn!("netlink error packet: {}", NlError::Nlmsgerr(code));
                }
            }
        }
    }
}

impl AsRawFd for HwsimSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.sock.as_raw_fd()
    }
}

impl FrameSink for HwsimSocket {
    fn cloned_frame(&mut self, receiver: MacAddr, payload: &[u8], rx_rate: u32, signal_dbm: i32) {
        debug!("cloned frame to {} len {}", receiver, payload.len());
        if let Err(e) = self.send_cloned_frame(receiver, payload, rx_rate, signal_dbm) {
            warn!("failed to deliver cloned frame to {}: {}", receiver, e);
        }
    }

    fn tx_info(
        &mut self,
        transmitter: MacAddr,
        flags: TxControlFlags,
        signal_dbm: i32,
        tx_rates: &[HwsimTxRate; IEEE80211_TX_MAX_RATES],
        cookie: u64,
    ) {
        if let Err(e) = self.send_tx_info(transmitter, flags, signal_dbm, tx_rates, cookie) {
            warn!("failed to report tx status to {}: {}", transmitter, e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tx_rate_blob_layout() {
        let rates = [
            HwsimTxRate { idx: 0, count: 3 },
            HwsimTxRate { idx: 2, count: 1 },
            HwsimTxRate::ABSENT,
            HwsimTxRate::ABSENT,
        ];
        let mut mem = Vec::new();
        rates.serialize(&mut mem).unwrap();
        assert_eq!(mem, vec![0, 3, 2, 1, 0xff, 0, 0xff, 0]);

        let mut cur = std::io::Cursor::new(mem.as_slice());
        let parsed = <[HwsimTxRate; IEEE80211_TX_MAX_RATES]>::deserialize(&mut cur).unwrap();
        assert_eq!(parsed, rates);
    }

    #[test]
    fn test_incoming_frame_requires_all_attrs() {
        let attrs = vec![Nlattr::new(
            None,
            HwsimAttr::AddrTransmitter,
            MacAddr::new([2, 0, 0, 0, 0, 1]),
        )
        .unwrap()];
        let genl = Genlmsghdr::new(HwsimCmd::Frame, VERSION_NR, attrs);
        assert!(IncomingFrame::from_genl(&genl).is_err());
    }

    #[test]
    fn test_incoming_frame_rejects_short_payload() {
        let rates = [HwsimTxRate::ABSENT; IEEE80211_TX_MAX_RATES];
        let attrs = vec![
            Nlattr::new(None, HwsimAttr::AddrTransmitter, MacAddr::new([2, 0, 0, 0, 0, 1]))
                .unwrap(),
            Nlattr::new_binary(HwsimAttr::Frame, vec![0u8; 10]),
            Nlattr::new(None, HwsimAttr::Flags, TxControlFlags::REQ_TX_STATUS).unwrap(),
            Nlattr::new(None, HwsimAttr::TxInfo, rates).unwrap(),
            Nlattr::new(None, HwsimAttr::Cookie, 1u64).unwrap(),
        ];
        let genl = Genlmsghdr::new(HwsimCmd::Frame, VERSION_NR, attrs);
        assert!(IncomingFrame::from_genl(&genl).is_err());
    }

    #[test]
    fn test_frame_message_round_trip() {
        let rates = [
            HwsimTxRate { idx: 0, count: 2 },
            HwsimTxRate::ABSENT,
            HwsimTxRate::ABSENT,
            HwsimTxRate::ABSENT,
        ];
        let mut payload = vec![0u8; 100];
        payload[0] = 0x08;
        payload[4..10].copy_from_slice(&[2, 0, 0, 0, 0, 2]);
        let attrs = vec![
            Nlattr::new(None, HwsimAttr::AddrTransmitter, MacAddr::new([2, 0, 0, 0, 0, 1]))
                .unwrap(),
            Nlattr::new_binary(HwsimAttr::Frame, payload.clone()),
            Nlattr::new(None, HwsimAttr::Flags, TxControlFlags::REQ_TX_STATUS).unwrap(),
            Nlattr::new(None, HwsimAttr::TxInfo, rates).unwrap(),
            Nlattr::new(None, HwsimAttr::Cookie, 0xabcdu64).unwrap(),
        ];
        let genl = Genlmsghdr::new(HwsimCmd::Frame, VERSION_NR, attrs);

        let mut mem = Vec::new();
        genl.serialize(&mut mem).unwrap();
        let mut cur = std::io::Cursor::new(mem.as_slice());
        let parsed: Genlmsghdr<HwsimCmd, HwsimAttr> = Genlmsghdr::deserialize(&mut cur).unwrap();

        let frame = IncomingFrame::from_genl(&parsed).unwrap();
        assert_eq!(frame.transmitter, MacAddr::new([2, 0, 0, 0, 0, 1]));
        assert_eq!(frame.payload, payload);
        assert_eq!(frame.flags, TxControlFlags::REQ_TX_STATUS);
        assert_eq!(frame.tx_rates, rates);
        assert_eq!(frame.cookie, 0xabcd);
    }
}
