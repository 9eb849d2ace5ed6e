//! Network emulator (netem) qdisc options.
//!
//! Unlike the other kinds, the netem payload starts with a bare `tc_netem_qopt` and only
//! then continues with nested attributes:
//!
//! ```text
//! +--------------------+-----------------------------+
//! | tc_netem_qopt (24) | TCA_NETEM_* attributes ...  |
//! +--------------------+-----------------------------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder, FixedRecord};
use tracing::trace;

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};

// Netem-specific sub-attributes (from linux/pkt_sched.h)
const TCA_NETEM_CORR: u16 = 1;
const TCA_NETEM_DELAY_DIST: u16 = 2;
const TCA_NETEM_REORDER: u16 = 3;
const TCA_NETEM_CORRUPT: u16 = 4;
const TCA_NETEM_LOSS: u16 = 5;
const TCA_NETEM_RATE: u16 = 6;
const TCA_NETEM_ECN: u16 = 7;
const TCA_NETEM_RATE64: u16 = 8;
const TCA_NETEM_PAD: u16 = 9;
const TCA_NETEM_LATENCY64: u16 = 10;
const TCA_NETEM_JITTER64: u16 = 11;
const TCA_NETEM_SLOT: u16 = 12;
const TCA_NETEM_SLOT_DIST: u16 = 13;
const TCA_NETEM_PRNG_SEED: u16 = 14;

/// Options of a netem qdisc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Netem {
    /// The fixed header every netem payload starts with.
    pub qopt: NetemQopt,
    /// Correlations of delay, loss and duplication.
    pub corr: Option<NetemCorr>,
    /// Delay distribution table, kept as raw `s16` samples.
    pub delay_dist: Option<Bytes>,
    /// Reordering probability.
    pub reorder: Option<NetemProbability>,
    /// Corruption probability.
    pub corrupt: Option<NetemProbability>,
    /// State-based loss model, kept as its raw nested attributes.
    pub loss: Option<Bytes>,
    /// Rate limiting.
    pub rate: Option<NetemRate>,
    /// ECN marking instead of dropping, as sent by the kernel.
    pub ecn: Option<u32>,
    /// Rate in bytes per second, when it does not fit [`NetemRate::rate`].
    pub rate64: Option<u64>,
    /// Latency in nanoseconds.
    pub latency64: Option<i64>,
    /// Jitter in nanoseconds.
    pub jitter64: Option<i64>,
    /// Slot-based transmission.
    pub slot: Option<NetemSlot>,
    /// Slot delay distribution table.
    pub slot_dist: Option<Bytes>,
    /// Seed of the random generator.
    pub prng_seed: Option<u64>,
}

impl Netem {
    /// Decodes a netem payload, collecting all field errors.
    ///
    /// # Errors
    ///
    /// A payload shorter than [`NetemQopt`] fails as a whole.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut netem = Self { qopt: unmarshal(data)?, ..Default::default() };
        let mut errors = Collector::new(policy);

        let rest = data.get(NetemQopt::SIZE..).unwrap_or_default();
        for nla in AttributeDecoder::new(rest) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_NETEM_CORR => netem.corr = errors.check(tag, unmarshal(nla.value()))?,
                TCA_NETEM_DELAY_DIST => netem.delay_dist = Some(nla.to_bytes()),
                TCA_NETEM_REORDER => netem.reorder = errors.check(tag, unmarshal(nla.value()))?,
                TCA_NETEM_CORRUPT => netem.corrupt = errors.check(tag, unmarshal(nla.value()))?,
                TCA_NETEM_LOSS => netem.loss = Some(nla.to_bytes()),
                TCA_NETEM_RATE => netem.rate = errors.check(tag, unmarshal(nla.value()))?,
                TCA_NETEM_ECN => netem.ecn = errors.check(tag, nla.u32())?,
                TCA_NETEM_RATE64 => netem.rate64 = errors.check(tag, nla.u64())?,
                TCA_NETEM_PAD => trace!("skipping netem pad attribute"),
                TCA_NETEM_LATENCY64 => netem.latency64 = errors.check(tag, nla.i64())?,
                TCA_NETEM_JITTER64 => netem.jitter64 = errors.check(tag, nla.i64())?,
                TCA_NETEM_SLOT => netem.slot = errors.check(tag, unmarshal(nla.value()))?,
                TCA_NETEM_SLOT_DIST => netem.slot_dist = Some(nla.to_bytes()),
                TCA_NETEM_PRNG_SEED => netem.prng_seed = errors.check(tag, nla.u64())?,
                _ => return Err(Error::unknown_attribute("netem", &nla)),
            }
        }

        errors.finish()?;
        Ok(netem)
    }

    /// Encodes the qopt header followed by the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(corr) = &self.corr {
            enc.append(TCA_NETEM_CORR, &marshal(corr))?;
        }
        if let Some(delay_dist) = &self.delay_dist {
            enc.append(TCA_NETEM_DELAY_DIST, delay_dist)?;
        }
        if let Some(reorder) = &self.reorder {
            enc.append(TCA_NETEM_REORDER, &marshal(reorder))?;
        }
        if let Some(corrupt) = &self.corrupt {
            enc.append(TCA_NETEM_CORRUPT, &marshal(corrupt))?;
        }
        if let Some(loss) = &self.loss {
            enc.append(TCA_NETEM_LOSS, loss)?;
        }
        if let Some(rate) = &self.rate {
            enc.append(TCA_NETEM_RATE, &marshal(rate))?;
        }
        if let Some(ecn) = self.ecn {
            enc.append_u32(TCA_NETEM_ECN, ecn)?;
        }
        if let Some(rate64) = self.rate64 {
            enc.append_u64(TCA_NETEM_RATE64, rate64)?;
        }
        if let Some(latency64) = self.latency64 {
            enc.append_i64(TCA_NETEM_LATENCY64, latency64)?;
        }
        if let Some(jitter64) = self.jitter64 {
            enc.append_i64(TCA_NETEM_JITTER64, jitter64)?;
        }
        if let Some(slot) = &self.slot {
            enc.append(TCA_NETEM_SLOT, &marshal(slot))?;
        }
        if let Some(slot_dist) = &self.slot_dist {
            enc.append(TCA_NETEM_SLOT_DIST, slot_dist)?;
        }
        if let Some(prng_seed) = self.prng_seed {
            enc.append_u64(TCA_NETEM_PRNG_SEED, prng_seed)?;
        }

        let attrs = enc.finish();
        let mut buf = BytesMut::with_capacity(NetemQopt::SIZE + attrs.len());
        self.qopt.write(&mut buf);
        buf.extend_from_slice(&attrs);
        Ok(buf.freeze())
    }
}

/// The kernel's `tc_netem_qopt` structure.
///
/// # Kernel Definition
///
/// ```c
/// struct tc_netem_qopt {
///     __u32 latency;   /* added delay (us) */
///     __u32 limit;     /* fifo limit (packets) */
///     __u32 loss;      /* random packet loss (0=none ~0=100%) */
///     __u32 gap;       /* re-ordering gap (0 for none) */
///     __u32 duplicate; /* random packet dup (0=none ~0=100%) */
///     __u32 jitter;    /* random jitter in latency (us) */
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetemQopt {
    /// Added delay in microseconds.
    pub latency: u32,
    /// Maximum number of packets in the queue.
    pub limit: u32,
    /// Random packet loss probability (0 = none, u32::MAX = 100%).
    pub loss: u32,
    /// Re-ordering gap (0 for none).
    pub gap: u32,
    /// Random packet duplication probability (0 = none, u32::MAX = 100%).
    pub duplicate: u32,
    /// Random jitter in latency, in microseconds.
    pub jitter: u32,
}

impl FixedRecord for NetemQopt {
    const SIZE: usize = 24;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            latency: buf.get_u32_ne(),
            limit: buf.get_u32_ne(),
            loss: buf.get_u32_ne(),
            gap: buf.get_u32_ne(),
            duplicate: buf.get_u32_ne(),
            jitter: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.latency);
        buf.put_u32_ne(self.limit);
        buf.put_u32_ne(self.loss);
        buf.put_u32_ne(self.gap);
        buf.put_u32_ne(self.duplicate);
        buf.put_u32_ne(self.jitter);
    }
}

/// The kernel's `tc_netem_corr`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetemCorr {
    /// Delay correlation.
    pub delay_corr: u32,
    /// Loss correlation.
    pub loss_corr: u32,
    /// Duplication correlation.
    pub dup_corr: u32,
}

impl FixedRecord for NetemCorr {
    const SIZE: usize = 12;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self { delay_corr: buf.get_u32_ne(), loss_corr: buf.get_u32_ne(), dup_corr: buf.get_u32_ne() }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.delay_corr);
        buf.put_u32_ne(self.loss_corr);
        buf.put_u32_ne(self.dup_corr);
    }
}

/// A probability with its correlation, the layout of both `tc_netem_reorder` and
/// `tc_netem_corrupt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetemProbability {
    /// Probability (0 = never, u32::MAX = always).
    pub probability: u32,
    /// Correlation with the previous decision.
    pub correlation: u32,
}

impl FixedRecord for NetemProbability {
    const SIZE: usize = 8;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self { probability: buf.get_u32_ne(), correlation: buf.get_u32_ne() }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.probability);
        buf.put_u32_ne(self.correlation);
    }
}

/// The kernel's `tc_netem_rate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetemRate {
    /// Rate in bytes per second.
    pub rate: u32,
    /// Per-packet overhead in bytes.
    pub packet_overhead: i32,
    /// Cell size in bytes.
    pub cell_size: u32,
    /// Per-cell overhead in bytes.
    pub cell_overhead: i32,
}

impl FixedRecord for NetemRate {
    const SIZE: usize = 16;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            rate: buf.get_u32_ne(),
            packet_overhead: buf.get_i32_ne(),
            cell_size: buf.get_u32_ne(),
            cell_overhead: buf.get_i32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.rate);
        buf.put_i32_ne(self.packet_overhead);
        buf.put_u32_ne(self.cell_size);
        buf.put_i32_ne(self.cell_overhead);
    }
}

/// The kernel's `tc_netem_slot`. Delays are in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetemSlot {
    /// Minimum delay between slots.
    pub min_delay: i64,
    /// Maximum delay between slots.
    pub max_delay: i64,
    /// Packets per slot, 0 for no limit.
    pub max_packets: i32,
    /// Bytes per slot, 0 for no limit.
    pub max_bytes: i32,
    /// Mean delay of the slot distribution.
    pub dist_delay: i64,
    /// Jitter of the slot distribution.
    pub dist_jitter: i64,
}

impl FixedRecord for NetemSlot {
    const SIZE: usize = 40;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            min_delay: buf.get_i64_ne(),
            max_delay: buf.get_i64_ne(),
            max_packets: buf.get_i32_ne(),
            max_bytes: buf.get_i32_ne(),
            dist_delay: buf.get_i64_ne(),
            dist_jitter: buf.get_i64_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64_ne(self.min_delay);
        buf.put_i64_ne(self.max_delay);
        buf.put_i32_ne(self.max_packets);
        buf.put_i32_ne(self.max_bytes);
        buf.put_i64_ne(self.dist_delay);
        buf.put_i64_ne(self.dist_jitter);
    }
}

#[cfg(test)]
mod tests {
    use tc_nla::NlaError;

    use super::*;

    fn qopt() -> NetemQopt {
        NetemQopt { latency: 100_000, limit: 1000, loss: u32::MAX / 100, ..Default::default() }
    }

    #[test]
    fn bare_qopt() {
        let netem = Netem { qopt: qopt(), ..Default::default() };
        let encoded = netem.encode().unwrap();
        assert_eq!(encoded.len(), NetemQopt::SIZE);
        assert_eq!(Netem::decode(&encoded).unwrap(), netem);
    }

    #[test]
    fn qopt_followed_by_attributes() {
        let netem = Netem {
            qopt: qopt(),
            corr: Some(NetemCorr { delay_corr: 25, loss_corr: 0, dup_corr: 0 }),
            reorder: Some(NetemProbability { probability: 10, correlation: 50 }),
            rate: Some(NetemRate { rate: 125_000, packet_overhead: -4, ..Default::default() }),
            latency64: Some(100_000_000),
            jitter64: Some(-1),
            slot: Some(NetemSlot { min_delay: 1, max_delay: 2, max_packets: 3, ..Default::default() }),
            prng_seed: Some(42),
            ..Default::default()
        };
        assert_eq!(Netem::decode(&netem.encode().unwrap()).unwrap(), netem);
    }

    #[test]
    fn short_payload_fails_as_a_whole() {
        let err = Netem::decode(&[0; 20]).unwrap_err();
        assert!(matches!(err, Error::Nla(NlaError::ShortRecord { .. })));
    }

    #[test]
    fn broken_attributes_are_collected() {
        let mut enc = AttributeEncoder::new();
        enc.append(TCA_NETEM_CORR, &[0; 8]).unwrap();
        enc.append_u32(TCA_NETEM_LATENCY64, 1).unwrap();
        enc.append_u32(TCA_NETEM_ECN, 1).unwrap();

        let mut data = marshal(&qopt()).to_vec();
        data.extend_from_slice(&enc.finish());

        let Err(Error::Fields(fields)) = Netem::decode(&data) else {
            panic!("expected field errors")
        };
        assert_eq!(fields.tags(), vec![TCA_NETEM_CORR, TCA_NETEM_LATENCY64]);
    }
}
