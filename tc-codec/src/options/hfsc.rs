//! HFSC (Hierarchical Fair Service Curve) qdisc and class options.

use bytes::{Buf, BufMut, Bytes};
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder, FixedRecord};

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};

// HFSC class TCA_OPTIONS sub-attributes (from linux/pkt_sched.h)
/// Real-time service curve.
const TCA_HFSC_RSC: u16 = 1;
/// Link-sharing service curve.
const TCA_HFSC_FSC: u16 = 2;
/// Upper-limit service curve.
const TCA_HFSC_USC: u16 = 3;

/// Options of an HFSC qdisc: the kernel's `tc_hfsc_qopt`, sent as a bare struct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HfscQdisc {
    /// Minor number of the default class.
    pub defcls: u16,
}

impl FixedRecord for HfscQdisc {
    const SIZE: usize = 2;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self { defcls: buf.get_u16_ne() }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16_ne(self.defcls);
    }
}

/// Options of an HFSC class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hfsc {
    /// Real-time service curve.
    pub rsc: Option<ServiceCurve>,
    /// Link-sharing service curve.
    pub fsc: Option<ServiceCurve>,
    /// Upper-limit service curve.
    pub usc: Option<ServiceCurve>,
}

/// The kernel's `tc_service_curve`: slope `m1` for the first `d` microseconds, `m2` after.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceCurve {
    /// Slope of the first segment, in bytes per second.
    pub m1: u32,
    /// Length of the first segment, in microseconds.
    pub d: u32,
    /// Slope of the second segment, in bytes per second.
    pub m2: u32,
}

impl FixedRecord for ServiceCurve {
    const SIZE: usize = 12;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self { m1: buf.get_u32_ne(), d: buf.get_u32_ne(), m2: buf.get_u32_ne() }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.m1);
        buf.put_u32_ne(self.d);
        buf.put_u32_ne(self.m2);
    }
}

impl Hfsc {
    /// Decodes HFSC class options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut hfsc = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_HFSC_RSC => hfsc.rsc = errors.check(tag, unmarshal(nla.value()))?,
                TCA_HFSC_FSC => hfsc.fsc = errors.check(tag, unmarshal(nla.value()))?,
                TCA_HFSC_USC => hfsc.usc = errors.check(tag, unmarshal(nla.value()))?,
                _ => return Err(Error::unknown_attribute("hfsc", &nla)),
            }
        }

        errors.finish()?;
        Ok(hfsc)
    }

    /// Encodes the populated curves, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        let curves = [(TCA_HFSC_RSC, &self.rsc), (TCA_HFSC_FSC, &self.fsc), (TCA_HFSC_USC, &self.usc)];
        for (tag, curve) in curves {
            if let Some(curve) = curve {
                enc.append(tag, &marshal(curve))?;
            }
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("hfsc"));
        }
        Ok(enc.finish())
    }
}
