//! The `matchall` classifier.

use bytes::{Buf, BufMut, Bytes};
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder, FixedRecord};
use tracing::trace;

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};

// Matchall TCA_OPTIONS sub-attributes (from linux/pkt_cls.h)
const TCA_MATCHALL_CLASSID: u16 = 1;
const TCA_MATCHALL_FLAGS: u16 = 3;
const TCA_MATCHALL_PCNT: u16 = 4;
const TCA_MATCHALL_PAD: u16 = 5;

/// Options of the `matchall` classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matchall {
    /// Class the matched packets go to.
    pub class_id: Option<u32>,
    /// `TCA_CLS_FLAGS_*`, e.g. skip_hw / skip_sw.
    pub flags: Option<u32>,
    /// Hit counter, only present in kernel dumps.
    pub pcnt: Option<MatchallPcnt>,
}

/// The kernel's `tc_matchall_pcnt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchallPcnt {
    /// Number of hits.
    pub rhit: u64,
}

impl FixedRecord for MatchallPcnt {
    const SIZE: usize = 8;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self { rhit: buf.get_u64_ne() }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_ne(self.rhit);
    }
}

impl Matchall {
    /// Decodes matchall options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut matchall = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_MATCHALL_CLASSID => matchall.class_id = errors.check(tag, nla.u32())?,
                TCA_MATCHALL_FLAGS => matchall.flags = errors.check(tag, nla.u32())?,
                TCA_MATCHALL_PCNT => matchall.pcnt = errors.check(tag, unmarshal(nla.value()))?,
                TCA_MATCHALL_PAD => trace!("skipping matchall pad attribute"),
                _ => return Err(Error::unknown_attribute("matchall", &nla)),
            }
        }

        errors.finish()?;
        Ok(matchall)
    }

    /// Encodes the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(class_id) = self.class_id {
            enc.append_u32(TCA_MATCHALL_CLASSID, class_id)?;
        }
        if let Some(flags) = self.flags {
            enc.append_u32(TCA_MATCHALL_FLAGS, flags)?;
        }
        if let Some(pcnt) = &self.pcnt {
            enc.append(TCA_MATCHALL_PCNT, &marshal(pcnt))?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("matchall"));
        }
        Ok(enc.finish())
    }
}
