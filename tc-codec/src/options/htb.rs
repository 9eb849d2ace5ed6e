//! HTB (Hierarchical Token Bucket) qdisc and class options.
//!
//! HTB is classful, and its two levels use disjoint parts of the `TCA_HTB_*` space: the
//! qdisc carries `TCA_HTB_INIT` (a `tc_htb_glob`) plus the direct queue length, each
//! class carries `TCA_HTB_PARMS` (a `tc_htb_opt`) plus its rate tables and 64-bit rates.

use bytes::{Buf, BufMut, Bytes};
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder, FixedRecord};
use tracing::trace;

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};
use crate::ratespec::RateSpec;

// HTB-specific TCA_OPTIONS sub-attributes (from linux/pkt_sched.h)
/// HTB class parameters attribute type.
const TCA_HTB_PARMS: u16 = 1;
/// HTB qdisc initialization attribute type.
const TCA_HTB_INIT: u16 = 2;
/// HTB ceil rate table attribute type.
const TCA_HTB_CTAB: u16 = 3;
/// HTB rate table attribute type.
const TCA_HTB_RTAB: u16 = 4;
const TCA_HTB_DIRECT_QLEN: u16 = 5;
const TCA_HTB_RATE64: u16 = 6;
const TCA_HTB_CEIL64: u16 = 7;
const TCA_HTB_PAD: u16 = 8;
/// Flag attribute: the qdisc is offloaded to hardware.
const TCA_HTB_OFFLOAD: u16 = 9;

/// Options of an HTB qdisc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtbQdisc {
    /// Global qdisc parameters.
    pub init: Option<HtbGlob>,
    /// Length of the direct queue.
    pub direct_qlen: Option<u32>,
    /// Whether the qdisc is offloaded to hardware.
    pub offload: bool,
}

impl HtbQdisc {
    /// Decodes HTB qdisc options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut htb = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_HTB_INIT => htb.init = errors.check(tag, unmarshal(nla.value()))?,
                TCA_HTB_DIRECT_QLEN => htb.direct_qlen = errors.check(tag, nla.u32())?,
                TCA_HTB_OFFLOAD => htb.offload = errors.check(tag, nla.flag())?.is_some(),
                _ => return Err(Error::unknown_attribute("htb qdisc", &nla)),
            }
        }

        errors.finish()?;
        Ok(htb)
    }

    /// Encodes the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(init) = &self.init {
            enc.append(TCA_HTB_INIT, &marshal(init))?;
        }
        if let Some(direct_qlen) = self.direct_qlen {
            enc.append_u32(TCA_HTB_DIRECT_QLEN, direct_qlen)?;
        }
        if self.offload {
            enc.append_flag(TCA_HTB_OFFLOAD)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("htb qdisc"));
        }
        Ok(enc.finish())
    }
}

/// Options of an HTB class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Htb {
    /// Class parameters.
    pub parms: Option<HtbOpt>,
    /// Ceil rate table.
    pub ctab: Option<Bytes>,
    /// Rate table.
    pub rtab: Option<Bytes>,
    /// Rate in bytes per second when it does not fit in `parms.rate`.
    pub rate64: Option<u64>,
    /// Ceil in bytes per second when it does not fit in `parms.ceil`.
    pub ceil64: Option<u64>,
}

impl Htb {
    /// Decodes HTB class options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut htb = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_HTB_PARMS => htb.parms = errors.check(tag, unmarshal(nla.value()))?,
                TCA_HTB_CTAB => htb.ctab = Some(nla.to_bytes()),
                TCA_HTB_RTAB => htb.rtab = Some(nla.to_bytes()),
                TCA_HTB_RATE64 => htb.rate64 = errors.check(tag, nla.u64())?,
                TCA_HTB_CEIL64 => htb.ceil64 = errors.check(tag, nla.u64())?,
                TCA_HTB_PAD => trace!("skipping htb pad attribute"),
                _ => return Err(Error::unknown_attribute("htb class", &nla)),
            }
        }

        errors.finish()?;
        Ok(htb)
    }

    /// Encodes the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(parms) = &self.parms {
            enc.append(TCA_HTB_PARMS, &marshal(parms))?;
        }
        if let Some(ctab) = &self.ctab {
            enc.append(TCA_HTB_CTAB, ctab)?;
        }
        if let Some(rtab) = &self.rtab {
            enc.append(TCA_HTB_RTAB, rtab)?;
        }
        if let Some(rate64) = self.rate64 {
            enc.append_u64(TCA_HTB_RATE64, rate64)?;
        }
        if let Some(ceil64) = self.ceil64 {
            enc.append_u64(TCA_HTB_CEIL64, ceil64)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("htb class"));
        }
        Ok(enc.finish())
    }
}

/// The kernel's `tc_htb_glob` structure for HTB qdisc initialization.
///
/// # Kernel Definition
///
/// From `<linux/pkt_sched.h>`:
///
/// ```c
/// struct tc_htb_glob {
///     __u32 version;        /* HTB version */
///     __u32 rate2quantum;   /* Rate-to-quantum conversion */
///     __u32 defcls;         /* Default class minor number */
///     __u32 debug;          /* Debug flags */
///     __u32 direct_pkts;    /* Stats: packets sent directly (read-only) */
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtbGlob {
    /// Protocol version, 3 on current kernels.
    pub version: u32,
    /// Divisor turning rate into quantum.
    pub rate2quantum: u32,
    /// Default class for unclassified packets.
    pub defcls: u32,
    /// Debug level.
    pub debug: u32,
    /// Packets sent through the direct queue.
    pub direct_pkts: u32,
}

impl FixedRecord for HtbGlob {
    const SIZE: usize = 20;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            version: buf.get_u32_ne(),
            rate2quantum: buf.get_u32_ne(),
            defcls: buf.get_u32_ne(),
            debug: buf.get_u32_ne(),
            direct_pkts: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.version);
        buf.put_u32_ne(self.rate2quantum);
        buf.put_u32_ne(self.defcls);
        buf.put_u32_ne(self.debug);
        buf.put_u32_ne(self.direct_pkts);
    }
}

/// The kernel's `tc_htb_opt` structure for HTB class configuration.
///
/// # Kernel Definition
///
/// From `<linux/pkt_sched.h>`:
///
/// ```c
/// struct tc_htb_opt {
///     struct tc_ratespec rate;   /* Guaranteed rate */
///     struct tc_ratespec ceil;   /* Ceiling rate */
///     __u32 buffer;              /* Burst size in ticks */
///     __u32 cbuffer;             /* Ceil burst size in ticks */
///     __u32 quantum;             /* Quantum for deficit round-robin (0 = auto) */
///     __u32 level;               /* Class level (0 = leaf) */
///     __u32 prio;                /* Priority (0 = highest) */
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtbOpt {
    /// Guaranteed rate.
    pub rate: RateSpec,
    /// Ceiling rate.
    pub ceil: RateSpec,
    /// Burst at `rate`, in ticks.
    pub buffer: u32,
    /// Burst at `ceil`, in ticks.
    pub cbuffer: u32,
    /// Bytes served per round.
    pub quantum: u32,
    /// Level in the class tree.
    pub level: u32,
    /// Priority, lower is served first.
    pub prio: u32,
}

impl FixedRecord for HtbOpt {
    const SIZE: usize = 2 * RateSpec::SIZE + 20;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            rate: RateSpec::read(buf),
            ceil: RateSpec::read(buf),
            buffer: buf.get_u32_ne(),
            cbuffer: buf.get_u32_ne(),
            quantum: buf.get_u32_ne(),
            level: buf.get_u32_ne(),
            prio: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        self.rate.write(buf);
        self.ceil.write(buf);
        buf.put_u32_ne(self.buffer);
        buf.put_u32_ne(self.cbuffer);
        buf.put_u32_ne(self.quantum);
        buf.put_u32_ne(self.level);
        buf.put_u32_ne(self.prio);
    }
}
