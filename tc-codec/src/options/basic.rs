//! The `basic` classifier.
//!
//! `basic` matches packets with an extended match tree and optionally polices them before
//! handing them to a class. It is the simplest classifier that embeds both shared
//! sub-structures, which makes it the template the other classifiers follow:
//!
//! - decoding walks the nested attributes and dispatches on the tag, either to a scalar or
//!   to a recursive sub-decoder; an unrecognized tag fails the whole decode.
//! - encoding appends only the populated fields, in tag order, and refuses to produce an
//!   empty options attribute.

use bytes::Bytes;
use tc_nla::{AttributeDecoder, AttributeEncoder};

use crate::config::ErrorPolicy;
use crate::ematch::Ematch;
use crate::error::{Collector, Error, Result};
use crate::police::Police;

// Basic TCA_OPTIONS sub-attributes (from linux/pkt_cls.h)
/// Class the matching packets are sent to.
const TCA_BASIC_CLASSID: u16 = 1;
/// Extended match tree.
const TCA_BASIC_EMATCHES: u16 = 2;
/// Policing descriptor.
const TCA_BASIC_POLICE: u16 = 4;

/// Options of the `basic` classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Basic {
    /// Target class handle, major:minor in the upper / lower 16 bits.
    pub class_id: Option<u32>,
    /// Policing applied to matched packets.
    pub police: Option<Police>,
    /// Extended match tree selecting packets.
    pub ematch: Option<Ematch>,
}

impl Basic {
    /// Decodes `basic` options, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut basic = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_BASIC_CLASSID => basic.class_id = errors.check(tag, nla.u32())?,
                TCA_BASIC_EMATCHES => {
                    basic.ematch = errors.check(tag, Ematch::decode_with(nla.value(), policy))?;
                }
                TCA_BASIC_POLICE => {
                    basic.police = errors.check(tag, Police::decode_with(nla.value(), policy))?;
                }
                _ => return Err(Error::unknown_attribute("basic", &nla)),
            }
        }

        errors.finish()?;
        Ok(basic)
    }

    /// Encodes the populated fields.
    ///
    /// # Errors
    ///
    /// [`Error::NoArgument`] if no field is set, since the kernel does not accept an empty
    /// options attribute for `basic`.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(class_id) = self.class_id {
            enc.append_u32(TCA_BASIC_CLASSID, class_id)?;
        }
        if let Some(ematch) = &self.ematch {
            enc.append(TCA_BASIC_EMATCHES, &ematch.encode()?)?;
        }
        if let Some(police) = &self.police {
            enc.append(TCA_BASIC_POLICE, &police.encode()?)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("basic"));
        }
        Ok(enc.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ematch::{EmatchData, EmatchMatch, EmatchTreeHdr, U32Match, TCF_EM_REL_END};
    use crate::police::{Policy, TC_ACT_SHOT};
    use crate::ratespec::RateSpec;

    fn full() -> Basic {
        Basic {
            class_id: Some(0x0001_000c),
            police: Some(Police {
                tbf: Some(Policy {
                    action: TC_ACT_SHOT,
                    burst: 4096,
                    rate: RateSpec { rate: 1_000_000, ..Default::default() },
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ematch: Some(Ematch {
                hdr: Some(EmatchTreeHdr { nmatches: 1, progid: 0 }),
                matches: Some(vec![EmatchMatch {
                    match_id: 0,
                    flags: TCF_EM_REL_END,
                    data: EmatchData::U32(U32Match { mask: 0xff, val: 17, off: 8, offmask: 0 }),
                }]),
            }),
        }
    }

    #[test]
    fn decode_encoded_options() {
        let basic = full();
        assert_eq!(Basic::decode(&basic.encode().unwrap()).unwrap(), basic);
    }

    #[test]
    fn unset_fields_are_not_emitted() {
        let basic = Basic { class_id: Some(1), ..Default::default() };
        let encoded = basic.encode().unwrap();

        let tags: Vec<u16> = AttributeDecoder::new(&encoded).map(|nla| nla.unwrap().kind()).collect();
        assert_eq!(tags, vec![TCA_BASIC_CLASSID]);
        assert_eq!(Basic::decode(&encoded).unwrap(), basic);
    }

    #[test]
    fn fields_are_emitted_in_tag_order() {
        let encoded = full().encode().unwrap();
        let tags: Vec<u16> = AttributeDecoder::new(&encoded).map(|nla| nla.unwrap().kind()).collect();
        assert_eq!(tags, vec![TCA_BASIC_CLASSID, TCA_BASIC_EMATCHES, TCA_BASIC_POLICE]);
    }

    #[test]
    fn encode_nothing_is_a_usage_error() {
        let err = Basic::default().encode().unwrap_err();
        assert!(matches!(err, Error::NoArgument("basic")));
        assert!(err.is_usage());
    }

    #[test]
    fn actions_are_outside_the_schema() {
        const TCA_BASIC_ACT: u16 = 3;
        let mut enc = AttributeEncoder::new();
        enc.append_u32(TCA_BASIC_CLASSID, 1).unwrap();
        enc.append(TCA_BASIC_ACT, &[0; 8]).unwrap();

        let err = Basic::decode(&enc.finish()).unwrap_err();
        let Error::UnknownAttribute { context, tag, payload } = err else { panic!("{err:?}") };
        assert_eq!((context, tag), ("basic", TCA_BASIC_ACT));
        assert_eq!(payload.as_ref(), &[0; 8]);
    }

    #[test]
    fn every_broken_field_is_reported() {
        let mut enc = AttributeEncoder::new();
        enc.append_u16(TCA_BASIC_CLASSID, 1).unwrap();
        enc.append(TCA_BASIC_POLICE, &[1, 2]).unwrap();

        let Err(Error::Fields(fields)) = Basic::decode(&enc.finish()) else {
            panic!("expected field errors")
        };
        assert_eq!(fields.tags(), vec![TCA_BASIC_CLASSID, TCA_BASIC_POLICE]);
    }

    #[test]
    fn first_failure_policy_stops_at_the_first_field() {
        let mut enc = AttributeEncoder::new();
        enc.append_u16(TCA_BASIC_CLASSID, 1).unwrap();
        enc.append(TCA_BASIC_POLICE, &[1, 2]).unwrap();

        let err = Basic::decode_with(&enc.finish(), ErrorPolicy::FirstFailure).unwrap_err();
        assert!(matches!(err, Error::Nla(tc_nla::NlaError::InvalidValue { expected: 4, actual: 2 })));
    }
}
