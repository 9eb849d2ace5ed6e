use tc_codec::{
    ematch::{CmpMatch, EmatchData, EmatchMatch, EmatchTreeHdr, TCF_EM_REL_END},
    options::Basic,
    police::{Policy, TC_ACT_SHOT},
    resolve,
    stats::SizeSpec,
    Ematch, Error, MessageAction, Police, RateSpec, Stab, Stats, Stats2, TcOptions,
};
use tc_nla::marshal;

use crate::helpers::*;

fn basic_options() -> Basic {
    Basic {
        class_id: Some(0x0001_0010),
        police: Some(Police {
            tbf: Some(Policy {
                action: TC_ACT_SHOT,
                burst: 12_500,
                mtu: 2040,
                rate: RateSpec { rate: 125_000, ..Default::default() },
                ..Default::default()
            }),
            ..Default::default()
        }),
        ematch: Some(Ematch {
            hdr: Some(EmatchTreeHdr { nmatches: 1, progid: 0 }),
            matches: Some(vec![EmatchMatch {
                match_id: 0,
                flags: TCF_EM_REL_END,
                data: EmatchData::Cmp(CmpMatch { val: 6, mask: 0xff, off: 9, ..Default::default() }),
            }]),
        }),
    }
}

#[test]
fn kind_before_or_after_options() {
    init_tracing();

    let options = basic_options().encode().unwrap();
    let kind = kind("basic");

    let kind_first = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &options)]);
    let options_first = message(&[(TCA_OPTIONS, &options), (TCA_KIND, &kind)]);

    let a = resolve(MessageAction::Filter, &kind_first).unwrap();
    let b = resolve(MessageAction::Filter, &options_first).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.kind, "basic");
    assert_eq!(a.options, Some(TcOptions::Basic(basic_options())));
}

#[test]
fn unknown_kind_is_only_looked_up_for_payloads() {
    init_tracing();

    let kind = kind("not-a-real-kind");
    let raw = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &[8, 0, 1, 0, 1, 0, 0, 0])]);
    let err = resolve(MessageAction::Qdisc, &raw).unwrap_err();
    assert!(matches!(err, Error::UnknownKind(name) if name == "not-a-real-kind"));

    let raw = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &[])]);
    let attr = resolve(MessageAction::Qdisc, &raw).unwrap();
    assert_eq!(attr.kind, "not-a-real-kind");
    assert_eq!(attr.options, None);
}

#[test]
fn unknown_kind_with_extended_statistics() {
    init_tracing();

    let kind = kind("not-a-real-kind");
    let raw = message(&[(TCA_KIND, &kind), (TCA_XSTATS, &[0; 4])]);
    let err = resolve(MessageAction::Class, &raw).unwrap_err();
    assert!(matches!(err, Error::UnknownKind(name) if name == "not-a-real-kind"));

    let raw = message(&[(TCA_KIND, &kind), (TCA_XSTATS, &[])]);
    let attr = resolve(MessageAction::Class, &raw).unwrap();
    assert_eq!(attr.xstats, None);
}

#[test]
fn unknown_top_level_tag_fails_the_whole_message() {
    init_tracing();

    const TCA_PAD: u16 = 9;
    let kind = kind("ingress");
    let raw = message(&[(TCA_KIND, &kind), (TCA_PAD, &[1, 2, 3, 4]), (TCA_CHAIN, &[0; 4])]);

    let err = resolve(MessageAction::Qdisc, &raw).unwrap_err();
    let Error::UnknownAttribute { context, tag, payload } = err else { panic!("{err:?}") };
    assert_eq!(context, "tcmsg");
    assert_eq!(tag, TCA_PAD);
    assert_eq!(payload.as_ref(), &[1, 2, 3, 4]);
}

#[test]
fn malformed_message_is_fatal() {
    let mut raw = message(&[(TCA_CHAIN, &[0; 4])]).to_vec();
    raw.extend_from_slice(&[64, 0, 1, 0]);

    let err = resolve(MessageAction::Filter, &raw).unwrap_err();
    assert!(matches!(err, Error::Nla(tc_nla::NlaError::InvalidLength { offset: 8, .. })));
}

#[test]
fn statistics_do_not_depend_on_kind() {
    init_tracing();

    let stats = Stats { bytes: 1 << 33, packets: 42, drops: 1, qlen: 3, ..Default::default() };
    let stats2 = Stats2 { bytes: 1 << 33, packets: 42, requeues: 2, ..Default::default() };
    let stab = Stab {
        base: Some(SizeSpec { linklayer: 1, overhead: -4, mtu: 2048, tsize: 2, ..Default::default() }),
        data: Some(bytes::Bytes::from_static(&[0, 1, 0, 2])),
    };

    // The kernel pads tc_stats to 40 bytes.
    let mut padded_stats = marshal(&stats).to_vec();
    padded_stats.extend_from_slice(&[0; 4]);
    let stats2_raw = marshal(&stats2);
    let stab_raw = stab.encode().unwrap();

    let mut seen = Vec::new();
    for name in ["htb", "ingress", "fw", "not-a-real-kind"] {
        let kind = kind(name);
        let raw = message(&[
            (TCA_STATS, &padded_stats),
            (TCA_KIND, &kind),
            (TCA_STATS2, &stats2_raw),
            (TCA_STAB, &stab_raw),
        ]);
        let attr = resolve(MessageAction::Class, &raw).unwrap();
        assert_eq!(attr.kind, name);
        seen.push((attr.stats, attr.stats2, attr.stab));
    }

    assert!(seen.iter().all(|entry| *entry == (Some(stats), Some(stats2), Some(stab.clone()))));
}
