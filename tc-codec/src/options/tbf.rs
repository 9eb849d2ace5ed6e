//! Token Bucket Filter (TBF) qdisc options.

use bytes::{Buf, BufMut, Bytes};
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder, FixedRecord};
use tracing::trace;

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};
use crate::ratespec::RateSpec;

// TBF-specific TCA_OPTIONS sub-attributes (from linux/pkt_sched.h)
/// TBF parameters attribute type.
const TCA_TBF_PARMS: u16 = 1;
/// TBF rate table attribute type.
const TCA_TBF_RTAB: u16 = 2;
/// TBF peak rate table attribute type.
const TCA_TBF_PTAB: u16 = 3;
const TCA_TBF_RATE64: u16 = 4;
const TCA_TBF_PRATE64: u16 = 5;
/// TBF burst size in bytes.
const TCA_TBF_BURST: u16 = 6;
const TCA_TBF_PBURST: u16 = 7;
const TCA_TBF_PAD: u16 = 8;

/// Options of a TBF qdisc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tbf {
    /// Qdisc parameters.
    pub parms: Option<TbfQopt>,
    /// Rate table.
    pub rtab: Option<Bytes>,
    /// Peak rate table.
    pub ptab: Option<Bytes>,
    /// Rate in bytes per second, when it does not fit the ratespec.
    pub rate64: Option<u64>,
    /// Peak rate in bytes per second, when it does not fit the ratespec.
    pub prate64: Option<u64>,
    /// Burst size in bytes.
    pub burst: Option<u32>,
    /// Peak burst size in bytes.
    pub pburst: Option<u32>,
}

impl Tbf {
    /// Decodes TBF options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut tbf = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_TBF_PARMS => tbf.parms = errors.check(tag, unmarshal(nla.value()))?,
                TCA_TBF_RTAB => tbf.rtab = Some(nla.to_bytes()),
                TCA_TBF_PTAB => tbf.ptab = Some(nla.to_bytes()),
                TCA_TBF_RATE64 => tbf.rate64 = errors.check(tag, nla.u64())?,
                TCA_TBF_PRATE64 => tbf.prate64 = errors.check(tag, nla.u64())?,
                TCA_TBF_BURST => tbf.burst = errors.check(tag, nla.u32())?,
                TCA_TBF_PBURST => tbf.pburst = errors.check(tag, nla.u32())?,
                TCA_TBF_PAD => trace!("skipping tbf pad attribute"),
                _ => return Err(Error::unknown_attribute("tbf", &nla)),
            }
        }

        errors.finish()?;
        Ok(tbf)
    }

    /// Encodes the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(parms) = &self.parms {
            enc.append(TCA_TBF_PARMS, &marshal(parms))?;
        }
        if let Some(rtab) = &self.rtab {
            enc.append(TCA_TBF_RTAB, rtab)?;
        }
        if let Some(ptab) = &self.ptab {
            enc.append(TCA_TBF_PTAB, ptab)?;
        }
        if let Some(rate64) = self.rate64 {
            enc.append_u64(TCA_TBF_RATE64, rate64)?;
        }
        if let Some(prate64) = self.prate64 {
            enc.append_u64(TCA_TBF_PRATE64, prate64)?;
        }
        if let Some(burst) = self.burst {
            enc.append_u32(TCA_TBF_BURST, burst)?;
        }
        if let Some(pburst) = self.pburst {
            enc.append_u32(TCA_TBF_PBURST, pburst)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("tbf"));
        }
        Ok(enc.finish())
    }
}

/// The kernel's `tc_tbf_qopt` structure.
///
/// # Kernel Definition
///
/// From `<linux/pkt_sched.h>`:
///
/// ```c
/// struct tc_tbf_qopt {
///     struct tc_ratespec rate;     /* Rate limit */
///     struct tc_ratespec peakrate; /* Peak rate (optional) */
///     __u32 limit;                 /* Max bytes in queue */
///     __u32 buffer;                /* Burst size in ticks */
///     __u32 mtu;                   /* Max transmission unit */
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TbfQopt {
    /// The rate specification (bandwidth limit).
    pub rate: RateSpec,
    /// Peak rate specification, zeroed when unused.
    pub peakrate: RateSpec,
    /// Maximum bytes that can queue waiting for tokens.
    pub limit: u32,
    /// Burst size, expressed in scheduler ticks.
    pub buffer: u32,
    /// Maximum packet size.
    pub mtu: u32,
}

impl FixedRecord for TbfQopt {
    const SIZE: usize = 2 * RateSpec::SIZE + 12;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            rate: RateSpec::read(buf),
            peakrate: RateSpec::read(buf),
            limit: buf.get_u32_ne(),
            buffer: buf.get_u32_ne(),
            mtu: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        self.rate.write(buf);
        self.peakrate.write(buf);
        buf.put_u32_ne(self.limit);
        buf.put_u32_ne(self.buffer);
        buf.put_u32_ne(self.mtu);
    }
}
