//! DRR (Deficit Round Robin) class options.

use bytes::Bytes;
use tc_nla::{AttributeDecoder, AttributeEncoder};

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};

// DRR-specific TCA_OPTIONS sub-attributes (from linux/pkt_sched.h)
/// DRR class quantum attribute type.
const TCA_DRR_QUANTUM: u16 = 1;

/// Options of a DRR class.
///
/// The quantum is the number of bytes a class may dequeue per round, and must be at least
/// the MTU for packets to always make progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drr {
    /// Bytes the class may dequeue per round.
    pub quantum: Option<u32>,
}

impl Drr {
    /// Decodes DRR class options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut drr = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_DRR_QUANTUM => drr.quantum = errors.check(tag, nla.u32())?,
                _ => return Err(Error::unknown_attribute("drr", &nla)),
            }
        }

        errors.finish()?;
        Ok(drr)
    }

    /// Encodes the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let Some(quantum) = self.quantum else {
            return Err(Error::NoArgument("drr"));
        };

        let mut enc = AttributeEncoder::new();
        enc.append_u32(TCA_DRR_QUANTUM, quantum)?;
        Ok(enc.finish())
    }
}
