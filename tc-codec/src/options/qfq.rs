//! QFQ (Quick Fair Queueing) options.
//!
//! The qdisc and its classes share one schema.

use bytes::Bytes;
use tc_nla::{AttributeDecoder, AttributeEncoder};

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};

// QFQ TCA_OPTIONS sub-attributes (from linux/pkt_sched.h)
const TCA_QFQ_WEIGHT: u16 = 1;
const TCA_QFQ_LMAX: u16 = 2;

/// Options of a QFQ class or qdisc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Qfq {
    /// Weight of the class.
    pub weight: Option<u32>,
    /// Maximum packet size for the class.
    pub lmax: Option<u32>,
}

impl Qfq {
    /// Decodes QFQ options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut qfq = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_QFQ_WEIGHT => qfq.weight = errors.check(tag, nla.u32())?,
                TCA_QFQ_LMAX => qfq.lmax = errors.check(tag, nla.u32())?,
                _ => return Err(Error::unknown_attribute("qfq", &nla)),
            }
        }

        errors.finish()?;
        Ok(qfq)
    }

    /// Encodes the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(weight) = self.weight {
            enc.append_u32(TCA_QFQ_WEIGHT, weight)?;
        }
        if let Some(lmax) = self.lmax {
            enc.append_u32(TCA_QFQ_LMAX, lmax)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("qfq"));
        }
        Ok(enc.finish())
    }
}
