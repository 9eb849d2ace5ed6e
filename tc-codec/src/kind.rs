//! The kind registry.
//!
//! Maps a kind string to the decoders for its options, its extended statistics and, for
//! classful qdiscs, the options of the qdisc object itself. The table is closed and built
//! once; adding a kind means adding one entry and one record type.

use std::sync::LazyLock;

use bytes::Bytes;
use rustc_hash::FxHashMap;
use tc_nla::unmarshal;

use crate::config::ErrorPolicy;
use crate::error::{Error, Result};
use crate::options::{
    hook, Basic, Drr, Fw, Hfsc, Htb, HtbQdisc, Matchall, Netem, Qfq, Tbf, TcOptions,
};
use crate::xstats::XStats;

/// Decodes an options payload. `None` means the kind takes no options.
pub(crate) type OptionsFn = fn(&[u8], ErrorPolicy) -> Result<Option<TcOptions>>;

/// Decodes an extended statistics payload.
pub(crate) type XStatsFn = fn(&[u8]) -> Result<XStats>;

/// The decoders registered for one kind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KindEntry {
    pub(crate) name: &'static str,
    pub(crate) options: OptionsFn,
    pub(crate) xstats: Option<XStatsFn>,
    /// Qdisc-level options, for kinds whose qdisc and classes use different schemas.
    pub(crate) class_options: Option<OptionsFn>,
}

impl KindEntry {
    const fn new(name: &'static str, options: OptionsFn) -> Self {
        Self { name, options, xstats: None, class_options: None }
    }

    const fn with_xstats(mut self, xstats: XStatsFn) -> Self {
        self.xstats = Some(xstats);
        self
    }

    const fn with_class_options(mut self, class_options: OptionsFn) -> Self {
        self.class_options = Some(class_options);
        self
    }
}

static REGISTRY: LazyLock<FxHashMap<&'static str, KindEntry>> = LazyLock::new(|| {
    let entries = [
        KindEntry::new("basic", basic),
        KindEntry::new("fw", fw),
        KindEntry::new("matchall", matchall),
        KindEntry::new("htb", htb_class)
            .with_class_options(htb_qdisc)
            .with_xstats(htb_xstats),
        KindEntry::new("hfsc", hfsc_class)
            .with_class_options(hfsc_qdisc)
            .with_xstats(hfsc_xstats),
        KindEntry::new("qfq", qfq).with_class_options(qfq),
        KindEntry::new("drr", drr).with_xstats(drr_xstats),
        KindEntry::new("tbf", tbf),
        KindEntry::new("netem", netem),
        KindEntry::new("pfifo", pfifo),
        KindEntry::new("bfifo", bfifo),
        KindEntry::new("prio", prio),
        KindEntry::new("pfifo_fast", pfifo_fast),
        KindEntry::new("ingress", ingress),
        KindEntry::new("clsact", clsact),
    ];

    let mut registry = FxHashMap::with_capacity_and_hasher(entries.len(), Default::default());
    for entry in entries {
        registry.insert(entry.name, entry);
    }
    registry
});

/// Looks up the registry entry for `kind`.
pub(crate) fn lookup(kind: &str) -> Result<&'static KindEntry> {
    REGISTRY.get(kind).ok_or_else(|| Error::UnknownKind(kind.to_owned()))
}

/// Returns true if `kind` is registered.
pub fn is_supported(kind: &str) -> bool {
    REGISTRY.contains_key(kind)
}

/// Returns true if the qdisc of `kind` uses a different options schema than its classes.
///
/// Unknown kinds are not classful.
pub fn has_class_options(kind: &str) -> bool {
    REGISTRY.get(kind).is_some_and(|entry| entry.class_options.is_some())
}

/// Every registered kind, sorted.
pub fn supported_kinds() -> Vec<&'static str> {
    let mut kinds: Vec<_> = REGISTRY.keys().copied().collect();
    kinds.sort_unstable();
    kinds
}

/// Decodes the options of `kind`, collecting all field errors.
///
/// Returns `Ok(None)` for parameterless kinds.
pub fn decode_options(kind: &str, data: &[u8]) -> Result<Option<TcOptions>> {
    decode_options_with(kind, data, ErrorPolicy::default())
}

pub(crate) fn decode_options_with(
    kind: &str,
    data: &[u8],
    policy: ErrorPolicy,
) -> Result<Option<TcOptions>> {
    (lookup(kind)?.options)(data, policy)
}

/// Decodes the options of a `kind` qdisc whose classes use a different schema.
///
/// # Errors
///
/// [`Error::NoClassOptions`] if `kind` has no such schema; see [`has_class_options`].
pub fn decode_class_options(kind: &str, data: &[u8]) -> Result<Option<TcOptions>> {
    decode_class_options_with(kind, data, ErrorPolicy::default())
}

pub(crate) fn decode_class_options_with(
    kind: &str,
    data: &[u8],
    policy: ErrorPolicy,
) -> Result<Option<TcOptions>> {
    let entry = lookup(kind)?;
    let decode = entry.class_options.ok_or_else(|| Error::NoClassOptions(kind.to_owned()))?;
    decode(data, policy)
}

/// Decodes the extended statistics of `kind`.
///
/// # Errors
///
/// [`Error::UnsupportedXStats`] if `kind` reports none.
pub fn decode_xstats(kind: &str, data: &[u8]) -> Result<XStats> {
    let entry = lookup(kind)?;
    let decode = entry.xstats.ok_or_else(|| Error::UnsupportedXStats(kind.to_owned()))?;
    decode(data)
}

/// Encodes `options` into a `TCA_OPTIONS` value.
pub fn encode_options(options: &TcOptions) -> Result<Bytes> {
    options.encode()
}

/// Encodes `xstats` into a `TCA_XSTATS` value.
pub fn encode_xstats(xstats: &XStats) -> Bytes {
    xstats.encode()
}

fn basic(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Basic::decode_with(data, policy).map(|basic| Some(TcOptions::Basic(basic)))
}

fn fw(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Fw::decode_with(data, policy).map(|fw| Some(TcOptions::Fw(fw)))
}

fn matchall(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Matchall::decode_with(data, policy).map(|matchall| Some(TcOptions::Matchall(matchall)))
}

fn htb_class(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Htb::decode_with(data, policy).map(|htb| Some(TcOptions::Htb(htb)))
}

fn htb_qdisc(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    HtbQdisc::decode_with(data, policy).map(|htb| Some(TcOptions::HtbQdisc(htb)))
}

fn htb_xstats(data: &[u8]) -> Result<XStats> {
    Ok(XStats::Htb(unmarshal(data)?))
}

fn hfsc_class(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Hfsc::decode_with(data, policy).map(|hfsc| Some(TcOptions::Hfsc(hfsc)))
}

fn hfsc_qdisc(data: &[u8], _: ErrorPolicy) -> Result<Option<TcOptions>> {
    Ok(Some(TcOptions::HfscQdisc(unmarshal(data)?)))
}

fn hfsc_xstats(data: &[u8]) -> Result<XStats> {
    Ok(XStats::Hfsc(unmarshal(data)?))
}

fn qfq(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Qfq::decode_with(data, policy).map(|qfq| Some(TcOptions::Qfq(qfq)))
}

fn drr(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Drr::decode_with(data, policy).map(|drr| Some(TcOptions::Drr(drr)))
}

fn drr_xstats(data: &[u8]) -> Result<XStats> {
    Ok(XStats::Drr(unmarshal(data)?))
}

fn tbf(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Tbf::decode_with(data, policy).map(|tbf| Some(TcOptions::Tbf(tbf)))
}

fn netem(data: &[u8], policy: ErrorPolicy) -> Result<Option<TcOptions>> {
    Netem::decode_with(data, policy).map(|netem| Some(TcOptions::Netem(netem)))
}

fn pfifo(data: &[u8], _: ErrorPolicy) -> Result<Option<TcOptions>> {
    Ok(Some(TcOptions::Pfifo(unmarshal(data)?)))
}

fn bfifo(data: &[u8], _: ErrorPolicy) -> Result<Option<TcOptions>> {
    Ok(Some(TcOptions::Bfifo(unmarshal(data)?)))
}

fn prio(data: &[u8], _: ErrorPolicy) -> Result<Option<TcOptions>> {
    Ok(Some(TcOptions::Prio(unmarshal(data)?)))
}

fn pfifo_fast(data: &[u8], _: ErrorPolicy) -> Result<Option<TcOptions>> {
    Ok(Some(TcOptions::PfifoFast(unmarshal(data)?)))
}

fn ingress(data: &[u8], _: ErrorPolicy) -> Result<Option<TcOptions>> {
    hook::parameterless("ingress", data).map(|()| None)
}

fn clsact(data: &[u8], _: ErrorPolicy) -> Result<Option<TcOptions>> {
    hook::parameterless("clsact", data).map(|()| None)
}

#[cfg(test)]
mod tests {
    use tc_nla::marshal;

    use super::*;
    use crate::options::{FifoOpt, HfscQdisc, Prio};
    use crate::xstats::DrrXStats;

    #[test]
    fn every_kind_is_registered_once() {
        let kinds = supported_kinds();
        assert_eq!(kinds.len(), 15);
        assert!(kinds.windows(2).all(|pair| pair[0] < pair[1]));
        for kind in kinds {
            assert_eq!(lookup(kind).unwrap().name, kind);
        }
    }

    #[test]
    fn classful_kinds() {
        assert!(has_class_options("htb"));
        assert!(has_class_options("hfsc"));
        assert!(has_class_options("qfq"));
        assert!(!has_class_options("drr"));
        assert!(!has_class_options("basic"));
        assert!(!has_class_options("not-a-real-kind"));
    }

    #[test]
    fn unknown_kind_is_reported_with_its_name() {
        let err = decode_options("not-a-real-kind", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownKind(kind) if kind == "not-a-real-kind"));
    }

    #[test]
    fn fixed_layout_kinds() {
        let fifo = FifoOpt { limit: 1000 };
        assert_eq!(
            decode_options("bfifo", &marshal(&fifo)).unwrap(),
            Some(TcOptions::Bfifo(fifo))
        );
        assert_eq!(
            decode_options("pfifo_fast", &marshal(&Prio::default())).unwrap(),
            Some(TcOptions::PfifoFast(Prio::default()))
        );
        assert_eq!(
            decode_class_options("hfsc", &[1, 0, 0, 0]).unwrap(),
            Some(TcOptions::HfscQdisc(HfscQdisc { defcls: u16::from_ne_bytes([1, 0]) }))
        );
    }

    #[test]
    fn parameterless_kinds_go_through_the_table() {
        assert_eq!(decode_options("ingress", &[]).unwrap(), None);
        assert!(matches!(
            decode_options("clsact", &[0; 8]).unwrap_err(),
            Error::UnexpectedPayload { kind: "clsact", len: 8 }
        ));
    }

    #[test]
    fn class_options_of_plain_kind_is_a_usage_error() {
        let err = decode_class_options("tbf", &[0; 4]).unwrap_err();
        assert!(matches!(&err, Error::NoClassOptions(kind) if kind == "tbf"));
        assert!(err.is_usage());
    }

    #[test]
    fn xstats_dispatch() {
        let stats = DrrXStats { deficit: 1514 };
        let encoded = encode_xstats(&XStats::Drr(stats));
        assert_eq!(decode_xstats("drr", &encoded).unwrap(), XStats::Drr(stats));

        let err = decode_xstats("tbf", &encoded).unwrap_err();
        assert!(matches!(&err, Error::UnsupportedXStats(kind) if kind == "tbf"));
        assert!(!err.is_usage());
    }

    #[test]
    fn options_encode_through_the_registry() {
        let options = TcOptions::Drr(Drr { quantum: Some(1514) });
        let encoded = encode_options(&options).unwrap();
        assert_eq!(decode_options("drr", &encoded).unwrap(), Some(options));
    }
}
