//! The top-level attributes of a tc message and their resolution.
//!
//! # Two-pass resolution
//!
//! The schema of `TCA_OPTIONS` and `TCA_XSTATS` depends on `TCA_KIND`, but the kernel
//! gives no ordering guarantee between them. The resolver therefore walks the message
//! once, decoding everything that is kind-independent and keeping the two kind-dependent
//! payloads as raw slices, then dispatches those through the [kind registry](crate::kind)
//! once the whole message has been seen.

use bytes::Bytes;
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder};
use tracing::{debug, trace};

use crate::config::DecodeConfig;
use crate::error::{Collector, Error, Result};
use crate::kind;
use crate::options::TcOptions;
use crate::stats::{Stab, Stats, Stats2};
use crate::xstats::XStats;

// Top-level tcmsg attributes (from linux/rtnetlink.h)
const TCA_KIND: u16 = 1;
const TCA_OPTIONS: u16 = 2;
const TCA_STATS: u16 = 3;
const TCA_XSTATS: u16 = 4;
const TCA_STATS2: u16 = 7;
const TCA_STAB: u16 = 8;
const TCA_CHAIN: u16 = 11;
const TCA_HW_OFFLOAD: u16 = 12;
const TCA_INGRESS_BLOCK: u16 = 13;
const TCA_EGRESS_BLOCK: u16 = 14;

// rtnetlink message types carrying a tcmsg
const RTM_NEWQDISC: u16 = 36;
const RTM_GETQDISC: u16 = 38;
const RTM_NEWTCLASS: u16 = 40;
const RTM_GETTCLASS: u16 = 42;
const RTM_NEWTFILTER: u16 = 44;
const RTM_GETTFILTER: u16 = 46;
const RTM_NEWACTION: u16 = 48;
const RTM_GETACTION: u16 = 50;

/// The kind of tc object a message describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageAction {
    /// A queueing discipline.
    Qdisc,
    /// A class of a classful qdisc.
    Class,
    /// A classifier.
    Filter,
    /// A standalone action.
    Action,
}

impl MessageAction {
    /// Derives the action from an rtnetlink message type (`RTM_NEWQDISC` and friends).
    pub const fn from_message_type(message_type: u16) -> Option<Self> {
        match message_type {
            RTM_NEWQDISC..=RTM_GETQDISC => Some(Self::Qdisc),
            RTM_NEWTCLASS..=RTM_GETTCLASS => Some(Self::Class),
            RTM_NEWTFILTER..=RTM_GETTFILTER => Some(Self::Filter),
            RTM_NEWACTION..=RTM_GETACTION => Some(Self::Action),
            _ => None,
        }
    }
}

/// The decoded attributes of one tc object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    /// Name of the qdisc, class or classifier implementation. Empty if absent.
    pub kind: String,
    /// Filter chain index.
    pub chain: Option<u32>,
    /// Non-zero if the object is offloaded to hardware.
    pub hw_offload: Option<u8>,
    /// Shared block the egress hook is bound to.
    pub egress_block: Option<u32>,
    /// Shared block the ingress hook is bound to.
    pub ingress_block: Option<u32>,
    /// Legacy `tc_stats` counters.
    pub stats: Option<Stats>,
    /// Basic counters of the `TCA_STATS2` family.
    pub stats2: Option<Stats2>,
    /// Size table.
    pub stab: Option<Stab>,
    /// Kind-specific extended statistics.
    pub xstats: Option<XStats>,
    /// Kind-specific options. `None` for parameterless kinds.
    pub options: Option<TcOptions>,
}

/// Resolves the attributes of a tc message body, collecting all field errors.
///
/// `action` decides how the options of classful qdiscs are read: the qdisc object and its
/// classes use different schemas, and only the message type tells them apart.
pub fn resolve(action: MessageAction, raw: &[u8]) -> Result<Attribute> {
    resolve_with(&DecodeConfig::default(), action, raw)
}

/// Like [`resolve`], with an explicit [`DecodeConfig`].
pub fn resolve_with(config: &DecodeConfig, action: MessageAction, raw: &[u8]) -> Result<Attribute> {
    let policy = config.error_policy;
    let mut attr = Attribute::default();
    let mut errors = Collector::new(policy);
    let mut options: Option<&[u8]> = None;
    let mut xstats: Option<&[u8]> = None;

    for nla in AttributeDecoder::new(raw) {
        let nla = nla?;
        let tag = nla.kind();
        match tag {
            TCA_KIND => {
                if let Some(kind) = errors.check(tag, nla.string())? {
                    attr.kind = kind;
                }
            }
            TCA_OPTIONS => {
                trace!(len = nla.value().len(), "deferring options");
                options = Some(nla.value());
            }
            TCA_XSTATS => {
                trace!(len = nla.value().len(), "deferring extended statistics");
                xstats = Some(nla.value());
            }
            TCA_STATS => attr.stats = errors.check(tag, unmarshal(nla.value()))?,
            TCA_STATS2 => attr.stats2 = errors.check(tag, unmarshal(nla.value()))?,
            TCA_STAB => attr.stab = errors.check(tag, Stab::decode_with(nla.value(), policy))?,
            TCA_CHAIN => attr.chain = errors.check(tag, nla.u32())?,
            TCA_HW_OFFLOAD => attr.hw_offload = errors.check(tag, nla.u8())?,
            TCA_EGRESS_BLOCK => attr.egress_block = errors.check(tag, nla.u32())?,
            TCA_INGRESS_BLOCK => attr.ingress_block = errors.check(tag, nla.u32())?,
            _ => return Err(Error::unknown_attribute("tcmsg", &nla)),
        }
    }

    errors.finish()?;

    if let Some(data) = options.filter(|data| !data.is_empty()) {
        let entry = kind::lookup(&attr.kind)?;
        attr.options = match entry.class_options {
            Some(decode) if action == MessageAction::Qdisc => {
                debug!(kind = entry.name, "decoding qdisc options of classful kind");
                decode(data, policy)?
            }
            _ => {
                debug!(kind = entry.name, ?action, "decoding options");
                (entry.options)(data, policy)?
            }
        };
    }

    if let Some(data) = xstats.filter(|data| !data.is_empty()) {
        debug!(kind = %attr.kind, "decoding extended statistics");
        attr.xstats = Some(kind::decode_xstats(&attr.kind, data)?);
    }

    Ok(attr)
}

impl Attribute {
    /// Encodes the populated attributes, in tag order.
    ///
    /// # Errors
    ///
    /// [`Error::NoArgument`] if nothing is populated, [`Error::KindMismatch`] if the options
    /// or extended statistics belong to another kind than [`Attribute::kind`], or any error
    /// from encoding the options or size table.
    pub fn encode(&self) -> Result<Bytes> {
        let records = [
            self.options.as_ref().map(TcOptions::kind),
            self.xstats.as_ref().map(XStats::kind),
        ];
        if let Some(record) = records.into_iter().flatten().find(|record| *record != self.kind) {
            return Err(Error::KindMismatch { kind: self.kind.clone(), record });
        }

        let mut enc = AttributeEncoder::new();

        if !self.kind.is_empty() {
            enc.append_string(TCA_KIND, &self.kind)?;
        }
        if let Some(options) = &self.options {
            enc.append(TCA_OPTIONS, &options.encode()?)?;
        }
        if let Some(stats) = &self.stats {
            enc.append(TCA_STATS, &marshal(stats))?;
        }
        if let Some(xstats) = &self.xstats {
            enc.append(TCA_XSTATS, &xstats.encode())?;
        }
        if let Some(stats2) = &self.stats2 {
            enc.append(TCA_STATS2, &marshal(stats2))?;
        }
        if let Some(stab) = &self.stab {
            enc.append(TCA_STAB, &stab.encode()?)?;
        }
        if let Some(chain) = self.chain {
            enc.append_u32(TCA_CHAIN, chain)?;
        }
        if let Some(hw_offload) = self.hw_offload {
            enc.append_u8(TCA_HW_OFFLOAD, hw_offload)?;
        }
        if let Some(ingress_block) = self.ingress_block {
            enc.append_u32(TCA_INGRESS_BLOCK, ingress_block)?;
        }
        if let Some(egress_block) = self.egress_block {
            enc.append_u32(TCA_EGRESS_BLOCK, egress_block)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("tcmsg"));
        }
        Ok(enc.finish())
    }
}
