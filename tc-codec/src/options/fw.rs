//! The `fw` classifier: classifies on the firewall mark.

use bytes::Bytes;
use tc_nla::{AttributeDecoder, AttributeEncoder};

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};
use crate::police::Police;

// Fw TCA_OPTIONS sub-attributes (from linux/pkt_cls.h)
const TCA_FW_CLASSID: u16 = 1;
const TCA_FW_POLICE: u16 = 2;
const TCA_FW_INDEV: u16 = 3;
const TCA_FW_MASK: u16 = 5;

/// Options of the `fw` classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fw {
    /// Class the matched packets go to.
    pub class_id: Option<u32>,
    /// Policing applied to matched packets.
    pub police: Option<Police>,
    /// Only match packets received on this interface.
    pub indev: Option<String>,
    /// Mask applied to the mark before comparing it with the filter handle.
    pub mask: Option<u32>,
}

impl Fw {
    /// Decodes fw options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut fw = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_FW_CLASSID => fw.class_id = errors.check(tag, nla.u32())?,
                TCA_FW_POLICE => {
                    fw.police = errors.check(tag, Police::decode_with(nla.value(), policy))?;
                }
                TCA_FW_INDEV => fw.indev = errors.check(tag, nla.string())?,
                TCA_FW_MASK => fw.mask = errors.check(tag, nla.u32())?,
                _ => return Err(Error::unknown_attribute("fw", &nla)),
            }
        }

        errors.finish()?;
        Ok(fw)
    }

    /// Encodes the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(class_id) = self.class_id {
            enc.append_u32(TCA_FW_CLASSID, class_id)?;
        }
        if let Some(police) = &self.police {
            enc.append(TCA_FW_POLICE, &police.encode()?)?;
        }
        if let Some(indev) = &self.indev {
            enc.append_string(TCA_FW_INDEV, indev)?;
        }
        if let Some(mask) = self.mask {
            enc.append_u32(TCA_FW_MASK, mask)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("fw"));
        }
        Ok(enc.finish())
    }
}
