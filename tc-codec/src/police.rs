//! Policing descriptor (`TCA_POLICE_*`), embedded by several classifiers.

use bytes::{Buf, BufMut, Bytes};
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder, FixedRecord};
use tracing::trace;

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};
use crate::ratespec::RateSpec;

// Police attributes (from linux/pkt_cls.h)
const TCA_POLICE_TBF: u16 = 1;
const TCA_POLICE_RATE: u16 = 2;
const TCA_POLICE_PEAKRATE: u16 = 3;
const TCA_POLICE_AVRATE: u16 = 4;
const TCA_POLICE_RESULT: u16 = 5;
const TCA_POLICE_TM: u16 = 6;
const TCA_POLICE_PAD: u16 = 7;
const TCA_POLICE_RATE64: u16 = 8;
const TCA_POLICE_PEAKRATE64: u16 = 9;
const TCA_POLICE_PKTRATE64: u16 = 10;
const TCA_POLICE_PKTBURST64: u16 = 11;

/// Action verdicts a policer can return (from linux/pkt_cls.h).
pub const TC_ACT_UNSPEC: i32 = -1;
/// Pass the packet.
pub const TC_ACT_OK: i32 = 0;
/// Classify the packet again.
pub const TC_ACT_RECLASSIFY: i32 = 1;
/// Drop the packet.
pub const TC_ACT_SHOT: i32 = 2;
/// Continue with the next action.
pub const TC_ACT_PIPE: i32 = 3;

/// Rate-limit parameters attached to a classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Police {
    /// The policer itself.
    pub tbf: Option<Policy>,
    /// Rate table for `tbf.rate`.
    pub rate: Option<Bytes>,
    /// Rate table for `tbf.peakrate`.
    pub peak_rate: Option<Bytes>,
    /// Average rate, in bytes per second.
    pub avrate: Option<u32>,
    /// Verdict returned when the average rate is not exceeded.
    pub result: Option<u32>,
    /// Install / use timestamps, only present in kernel dumps.
    pub tm: Option<Tcft>,
    /// Rate in bytes per second, when it does not fit the ratespec.
    pub rate64: Option<u64>,
    /// Peak rate in bytes per second, when it does not fit the ratespec.
    pub peak_rate64: Option<u64>,
    /// Rate in packets per second.
    pub pkt_rate64: Option<u64>,
    /// Burst in packets.
    pub pkt_burst64: Option<u64>,
}

impl Police {
    /// Decodes a policing descriptor, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut police = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_POLICE_TBF => police.tbf = errors.check(tag, unmarshal(nla.value()))?,
                TCA_POLICE_RATE => police.rate = Some(nla.to_bytes()),
                TCA_POLICE_PEAKRATE => police.peak_rate = Some(nla.to_bytes()),
                TCA_POLICE_AVRATE => police.avrate = errors.check(tag, nla.u32())?,
                TCA_POLICE_RESULT => police.result = errors.check(tag, nla.u32())?,
                TCA_POLICE_TM => police.tm = errors.check(tag, unmarshal(nla.value()))?,
                TCA_POLICE_PAD => trace!("skipping police pad attribute"),
                TCA_POLICE_RATE64 => police.rate64 = errors.check(tag, nla.u64())?,
                TCA_POLICE_PEAKRATE64 => police.peak_rate64 = errors.check(tag, nla.u64())?,
                TCA_POLICE_PKTRATE64 => police.pkt_rate64 = errors.check(tag, nla.u64())?,
                TCA_POLICE_PKTBURST64 => police.pkt_burst64 = errors.check(tag, nla.u64())?,
                _ => return Err(Error::unknown_attribute("police", &nla)),
            }
        }

        errors.finish()?;
        Ok(police)
    }

    /// Encodes the populated fields in attribute order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(tbf) = &self.tbf {
            enc.append(TCA_POLICE_TBF, &marshal(tbf))?;
        }
        if let Some(rate) = &self.rate {
            enc.append(TCA_POLICE_RATE, rate)?;
        }
        if let Some(peak_rate) = &self.peak_rate {
            enc.append(TCA_POLICE_PEAKRATE, peak_rate)?;
        }
        if let Some(avrate) = self.avrate {
            enc.append_u32(TCA_POLICE_AVRATE, avrate)?;
        }
        if let Some(result) = self.result {
            enc.append_u32(TCA_POLICE_RESULT, result)?;
        }
        if let Some(tm) = &self.tm {
            enc.append(TCA_POLICE_TM, &marshal(tm))?;
        }
        if let Some(rate64) = self.rate64 {
            enc.append_u64(TCA_POLICE_RATE64, rate64)?;
        }
        if let Some(peak_rate64) = self.peak_rate64 {
            enc.append_u64(TCA_POLICE_PEAKRATE64, peak_rate64)?;
        }
        if let Some(pkt_rate64) = self.pkt_rate64 {
            enc.append_u64(TCA_POLICE_PKTRATE64, pkt_rate64)?;
        }
        if let Some(pkt_burst64) = self.pkt_burst64 {
            enc.append_u64(TCA_POLICE_PKTBURST64, pkt_burst64)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("police"));
        }
        Ok(enc.finish())
    }
}

/// The kernel's `tc_police` structure.
///
/// ```c
/// struct tc_police {
///     __u32 index;
///     int action;
///     __u32 limit;
///     __u32 burst;
///     __u32 mtu;
///     struct tc_ratespec rate;
///     struct tc_ratespec peakrate;
///     int refcnt;
///     int bindcnt;
///     __u32 capab;
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Action index.
    pub index: u32,
    /// Verdict when the rate is exceeded, one of the `TC_ACT_*` values.
    pub action: i32,
    /// Queue limit.
    pub limit: u32,
    /// Bucket size, in scheduler ticks.
    pub burst: u32,
    /// Maximum packet size.
    pub mtu: u32,
    /// Policing rate.
    pub rate: RateSpec,
    /// Peak rate.
    pub peakrate: RateSpec,
    /// Reference count.
    pub refcnt: i32,
    /// Bind count.
    pub bindcnt: i32,
    /// Capabilities.
    pub capab: u32,
}

impl FixedRecord for Policy {
    const SIZE: usize = 20 + 2 * RateSpec::SIZE + 12;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            index: buf.get_u32_ne(),
            action: buf.get_i32_ne(),
            limit: buf.get_u32_ne(),
            burst: buf.get_u32_ne(),
            mtu: buf.get_u32_ne(),
            rate: RateSpec::read(buf),
            peakrate: RateSpec::read(buf),
            refcnt: buf.get_i32_ne(),
            bindcnt: buf.get_i32_ne(),
            capab: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.index);
        buf.put_i32_ne(self.action);
        buf.put_u32_ne(self.limit);
        buf.put_u32_ne(self.burst);
        buf.put_u32_ne(self.mtu);
        self.rate.write(buf);
        self.peakrate.write(buf);
        buf.put_i32_ne(self.refcnt);
        buf.put_i32_ne(self.bindcnt);
        buf.put_u32_ne(self.capab);
    }
}

/// The kernel's `tcf_t` structure: jiffies-based timestamps of an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tcft {
    /// When the action was installed.
    pub install: u64,
    /// When the action was last used.
    pub last_use: u64,
    /// When the action expires.
    pub expires: u64,
    /// When the action was first used.
    pub first_use: u64,
}

impl FixedRecord for Tcft {
    const SIZE: usize = 32;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            install: buf.get_u64_ne(),
            last_use: buf.get_u64_ne(),
            expires: buf.get_u64_ne(),
            first_use: buf.get_u64_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_ne(self.install);
        buf.put_u64_ne(self.last_use);
        buf.put_u64_ne(self.expires);
        buf.put_u64_ne(self.first_use);
    }
}
