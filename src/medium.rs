//! The medium engine.
//!
//! On every incoming transmission the engine decides, before the frame
//! ever sits in a queue, how the whole retry ladder would have played
//! out: how many attempts each rung gets, how much air time,
//! contention and backoff they cost, and whether one of them is
//! acknowledged. The frame is then parked in its access-category
//! queue until the accumulated send time elapses, at which point it is
//! delivered: acknowledged frames fan out to their receivers as cloned
//! frames, and every frame produces exactly one status report back to
//! its sender.

use std::{cmp, collections::HashMap};

use log::{debug, info, warn};
use rand::Rng;

use crate::{
    consts::hwsim::TxControlFlags,
    hwsim::{HwsimTxRate, IncomingFrame, IEEE80211_TX_MAX_RATES},
    ieee80211::{
        ack_duration_us, dest_addr, is_mgmt, pkt_duration_us, MacAddr, DIFS_US, HDR_MIN_LEN,
        INDEX_TO_RATE, NUM_RATES, SLOT_TIME_US,
    },
    model::ErrorModel,
    station::{Frame, Station},
    time::Timespec,
};

/// Rate index advertised on delivered frame copies.
pub const RX_RATE_IDX: u32 = 1;

/// Signal strength in dBm advertised on delivered frame copies.
pub const RX_SIGNAL_DBM: i32 = -50;

/// Signal strength in dBm reported in transmission status.
pub const TX_SIGNAL_DBM: i32 = 35;

/// SNR in dB assumed for links without a configured value.
pub const DEFAULT_SNR_DB: f64 = 15.0;

/// The narrow interface the engine emits through. Implemented by the
/// hwsim socket in production and by recording sinks in tests.
pub trait FrameSink {
    /// Deliver a received copy of `payload` to `receiver`.
    fn cloned_frame(&mut self, receiver: MacAddr, payload: &[u8], rx_rate: u32, signal_dbm: i32);

    /// Report the transmission outcome of a frame back to
    /// `transmitter`.
    fn tx_info(
        &mut self,
        transmitter: MacAddr,
        flags: TxControlFlags,
        signal_dbm: i32,
        tx_rates: &[HwsimTxRate; IEEE80211_TX_MAX_RATES],
        cookie: u64,
    );
}

/// Running totals over the lifetime of the medium.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MediumStats {
    /// Transmissions picked up from the kernel.
    pub received: u64,
    /// Cloned frame copies delivered to receivers.
    pub sent: u64,
    /// Transmissions dropped before queueing.
    pub dropped: u64,
    /// Transmissions that ended acknowledged.
    pub acked: u64,
}

/// The shared half-duplex medium: the station registry, the error
/// model, per-link SNR overrides and the uniform source feeding the
/// per-attempt loss draws.
pub struct Medium<M, R> {
    stations: Vec<Station>,
    model: M,
    rng: R,
    default_snr: f64,
    link_snr: HashMap<(MacAddr, MacAddr), f64>,
    stats: MediumStats,
}

impl<M, R> Medium<M, R>
where
    M: ErrorModel,
    R: Rng,
{
    /// Create an empty medium.
    ///
    /// The uniform source is explicit so that scenario tests can seed
    /// it and replay a run bit for bit.
    pub fn new(model: M, rng: R, default_snr: f64) -> Self {
        Medium {
            stations: Vec::new(),
            model,
            rng,
            default_snr,
            link_snr: HashMap::new(),
            stats: MediumStats::default(),
        }
    }

    /// Register a station. Returns `false` (and changes nothing) when
    /// the address is already present.
    pub fn add_station(&mut self, addr: MacAddr) -> bool {
        if self.station(addr).is_some() {
            warn!("station {} registered twice", addr);
            return false;
        }
        info!("station {} on the medium", addr);
        self.stations.push(Station::new(addr));
        true
    }

    /// Override the SNR of the directed link `from` -> `to`.
    pub fn set_link_snr(&mut self, from: MacAddr, to: MacAddr, snr_db: f64) {
        self.link_snr.insert((from, to), snr_db);
    }

    /// Look up a station by address.
    pub fn station(&self, addr: MacAddr) -> Option<&Station> {
        self.stations.iter().find(|s| s.addr() == addr)
    }

    /// All registered stations in registration order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Lifetime counters.
    pub fn stats(&self) -> MediumStats {
        self.stats
    }

    fn snr(&self, from: MacAddr, to: MacAddr) -> f64 {
        self.link_snr
            .get(&(from, to))
            .copied()
            .unwrap_or(self.default_snr)
    }

    /// Take a transmission off the air: play out its retry ladder,
    /// charge the send time and park it in the sender's queue.
    ///
    /// A transmission from an address that was never registered is
    /// dropped; stations are only created at initialization.
    pub fn enqueue_frame(&mut self, frame: IncomingFrame, now: Timespec) {
        self.stats.received += 1;
        let IncomingFrame {
            transmitter,
            payload,
            mut flags,
            mut tx_rates,
            cookie,
        } = frame;

        if payload.len() < HDR_MIN_LEN {
            warn!(
                "dropping {}-byte runt frame from {}",
                payload.len(),
                transmitter
            );
            self.stats.dropped += 1;
            return;
        }
        let station_idx = match self.stations.iter().position(|s| s.addr() == transmitter) {
            Some(idx) => idx,
            None => {
                warn!("dropping frame from unknown station {}", transmitter);
                self.stats.dropped += 1;
                return;
            }
        };

        let dest = dest_addr(&payload);
        let mgmt = is_mgmt(&payload);
        let noack = mgmt || dest.is_multicast();
        let snr = self.snr(transmitter, dest);
        let len = payload.len();
        let queue = self.stations[station_idx].queue_mut(mgmt);
        let (cw_min, cw_max) = (queue.cw_min() as u64, queue.cw_max() as u64);

        // Play the whole ladder now: every attempt the sender would
        // have made is charged to the frame's send time, and the
        // ladder is rewritten afterwards to the attempts that actually
        // happened so the sender's rate control sees a faithful
        // history.
        let mut send_time: u64 = 0;
        let mut cw = cw_min;
        let mut retries: u32 = 0;
        let mut ack_rung: Option<(usize, u8)> = None;
        let ack_time = ack_duration_us();

        'ladder: for i in 0..IEEE80211_TX_MAX_RATES {
            if tx_rates[i].is_absent() {
                break;
            }
            let rate_idx = tx_rates[i].idx as usize;
            if rate_idx >= NUM_RATES {
                warn!(
                    "frame from {} names rate index {} outside the rate table",
                    transmitter, rate_idx
                );
                break;
            }
            let error_prob = self.model.error_prob(snr, rate_idx, len);
            let rate = INDEX_TO_RATE[rate_idx];
            for j in 0..tx_rates[i].count {
                send_time += DIFS_US + pkt_duration_us(len, rate);
                retries += 1;

                // No ack wait, backoff or retries for noack frames.
                if noack {
                    ack_rung = Some((i, j));
                    break 'ladder;
                }

                if j > 0 {
                    send_time += cw * SLOT_TIME_US / 2;
                    cw = cmp::min((cw << 1) + 1, cw_max);
                }

                if self.rng.gen::<f64>() > error_prob {
                    ack_rung = Some((i, j));
                    break 'ladder;
                }
                send_time += ack_time;
            }
        }

        if let Some((i, j)) = ack_rung {
            tx_rates[i].count = j + 1;
            for rate in tx_rates.iter_mut().skip(i + 1) {
                *rate = HwsimTxRate::ABSENT;
            }
            flags |= TxControlFlags::STAT_ACK;
            self.stats.acked += 1;
        }

        // A frame may not overtake its queue predecessor: the medium
        // is half duplex per station, so transmission begins once the
        // previous frame is off the air.
        let queue = self.stations[station_idx].queue_mut(mgmt);
        let base = match queue.back() {
            Some(tail) => cmp::max(tail.expires, now),
            None => now,
        };
        let expires = base.add_micros(send_time);

        debug!(
            "[{}] queued for [{}] len {} retries {} ack {} send_time {}us",
            now,
            expires,
            len,
            retries,
            ack_rung.is_some(),
            send_time
        );

        queue.push_back(Frame {
            sender: transmitter,
            payload,
            expires,
            flags,
            cookie,
            tx_rates,
        });
    }

    /// Drain every frame that expired before `now`, across all
    /// stations and queues, and deliver each one.
    ///
    /// The timer fires for the earliest head, but other heads may be
    /// due by then as well; draining them all in one pass avoids a
    /// wake-up per frame.
    pub fn deliver_expired<S>(&mut self, now: Timespec, sink: &mut S)
    where
        S: FrameSink,
    {
        let mut expired = Vec::new();
        for station in &mut self.stations {
            for queue in station.queues_mut() {
                while let Some(frame) = queue.pop_expired(now) {
                    expired.push(frame);
                }
            }
        }
        for frame in expired {
            self.deliver_frame(frame, sink);
        }
    }

    /// Deliver one frame: fan acknowledged frames out to their
    /// receivers, then report status to the sender. Each frame passes
    /// through here exactly once.
    fn deliver_frame<S>(&mut self, frame: Frame, sink: &mut S)
    where
        S: FrameSink,
    {
        if frame.flags.contains(TxControlFlags::STAT_ACK) {
            let dest = dest_addr(&frame.payload);
            for station in &self.stations {
                if station.addr() == frame.sender {
                    continue;
                }
                if dest.is_multicast() || station.addr() == dest {
                    sink.cloned_frame(station.addr(), &frame.payload, RX_RATE_IDX, RX_SIGNAL_DBM);
                    self.stats.sent += 1;
                }
            }
        }
        sink.tx_info(
            frame.sender,
            frame.flags,
            TX_SIGNAL_DBM,
            &frame.tx_rates,
            frame.cookie,
        );
    }

    /// The earliest head-of-queue expiry across the medium, or [`None`]
    /// when every queue is empty. This is the deadline the delivery
    /// timer must be armed to after any queue mutation.
    pub fn next_deadline(&self) -> Option<Timespec> {
        self.stations
            .iter()
            .flat_map(|s| s.queues())
            .filter_map(|q| q.front())
            .map(|f| f.expires)
            .min()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    const A: MacAddr = MacAddr::new([0x02, 0, 0, 0, 0, 0x01]);
    const B: MacAddr = MacAddr::new([0x02, 0, 0, 0, 0, 0x02]);

    /// A model that loses every frame with the same probability.
    struct Always(f64);

    impl ErrorModel for Always {
        fn error_prob(&self, _snr_db: f64, _rate_idx: usize, _frame_len: usize) -> f64 {
            self.0
        }
    }

    fn medium(p: f64) -> Medium<Always, SmallRng> {
        let mut m = Medium::new(Always(p), SmallRng::seed_from_u64(7), DEFAULT_SNR_DB);
        m.add_station(A);
        m.add_station(B);
        m
    }

    fn data_frame(from: MacAddr, to: MacAddr, len: usize) -> IncomingFrame {
        let mut payload = vec![0u8; len];
        payload[0] = 0x08;
        payload[4..10].copy_from_slice(&to.octets());
        IncomingFrame {
            transmitter: from,
            payload,
            flags: TxControlFlags::REQ_TX_STATUS,
            tx_rates: [
                HwsimTxRate { idx: 0, count: 2 },
                HwsimTxRate::ABSENT,
                HwsimTxRate::ABSENT,
                HwsimTxRate::ABSENT,
            ],
            cookie: 1,
        }
    }

    #[test]
    fn test_exhausted_ladder_send_time() {
        let mut m = medium(1.0);
        let now = Timespec::new(100, 0);
        m.enqueue_frame(data_frame(A, B, 100), now);

        // Two attempts at rate 0 for a 100 byte frame, each charged
        // difs + air time and a failed ack wait, plus one backoff of
        // cw_min slots halved before the second attempt:
        // (34 + 160 + 60) + 67 + (34 + 160 + 60) = 575.
        let queue = m.station(A).unwrap().data_queue();
        assert_eq!(queue.len(), 1);
        let frame = queue.front().unwrap();
        assert_eq!(frame.expires, now.add_micros(575));

        // The ladder is reported exactly as submitted when no attempt
        // was acknowledged.
        assert!(!frame.flags.contains(TxControlFlags::STAT_ACK));
        assert_eq!(frame.tx_rates[0], HwsimTxRate { idx: 0, count: 2 });
    }

    #[test]
    fn test_noack_short_circuit_charges_one_attempt() {
        let mut m = medium(1.0);
        let now = Timespec::new(0, 0);
        let mut frame = data_frame(A, MacAddr::BROADCAST, 100);
        frame.tx_rates[0].count = 4;
        m.enqueue_frame(frame, now);

        // One attempt, no ack wait, no backoff: difs + air time.
        let queued = m.station(A).unwrap().data_queue().front().unwrap().clone();
        assert_eq!(queued.expires, now.add_micros(34 + 160));
        assert!(queued.flags.contains(TxControlFlags::STAT_ACK));
        assert_eq!(queued.tx_rates[0], HwsimTxRate { idx: 0, count: 1 });
        assert_eq!(queued.tx_rates[1], HwsimTxRate::ABSENT);
    }

    #[test]
    fn test_unknown_sender_dropped() {
        let mut m = medium(0.0);
        let unknown = MacAddr::new([0x02, 0, 0, 0, 0, 0x77]);
        m.enqueue_frame(data_frame(unknown, B, 100), Timespec::ZERO);

        assert_eq!(m.stats().dropped, 1);
        assert_eq!(m.next_deadline(), None);
        assert!(m.stations().iter().all(|s| s.data_queue().is_empty()));
    }

    #[test]
    fn test_runt_frame_dropped() {
        let mut m = medium(0.0);
        let mut frame = data_frame(A, B, 100);
        frame.payload.truncate(16);
        m.enqueue_frame(frame, Timespec::ZERO);

        assert_eq!(m.stats().dropped, 1);
        assert_eq!(m.next_deadline(), None);
    }

    #[test]
    fn test_queue_stays_time_ordered() {
        let mut m = medium(1.0);
        let now = Timespec::new(1, 0);
        // A long frame followed by a short one from the same station:
        // the short frame may not overtake it.
        m.enqueue_frame(data_frame(A, B, 1500), now);
        m.enqueue_frame(data_frame(A, B, 50), now.add_micros(5));

        let queue = m.station(A).unwrap().data_queue();
        let expiries: Vec<Timespec> = queue.iter().map(|f| f.expires).collect();
        assert_eq!(expiries.len(), 2);
        assert!(expiries[0] <= expiries[1]);
    }

    #[test]
    fn test_next_deadline_is_min_across_heads() {
        let mut m = medium(1.0);
        let now = Timespec::new(1, 0);
        m.enqueue_frame(data_frame(A, B, 1500), now);
        m.enqueue_frame(data_frame(B, A, 50), now);

        let a_head = m.station(A).unwrap().data_queue().front().unwrap().expires;
        let b_head = m.station(B).unwrap().data_queue().front().unwrap().expires;
        assert_eq!(m.next_deadline(), Some(cmp::min(a_head, b_head)));
        assert!(b_head < a_head);
    }

    #[test]
    fn test_mgmt_frames_take_the_mgmt_queue() {
        let mut m = medium(1.0);
        let now = Timespec::ZERO;
        let mut frame = data_frame(A, B, 100);
        frame.payload[0] = 0x00;
        frame.tx_rates[0].count = 4;
        m.enqueue_frame(frame, now);

        // Management frames are noack even to a unicast destination,
        // so the ladder stops after one attempt and the frame sits on
        // the management queue.
        let st = m.station(A).unwrap();
        assert_eq!(st.mgmt_queue().len(), 1);
        assert!(st.data_queue().is_empty());
        let queued = st.mgmt_queue().front().unwrap();
        assert_eq!(queued.tx_rates[0].count, 1);
        assert!(queued.flags.contains(TxControlFlags::STAT_ACK));
    }
}
