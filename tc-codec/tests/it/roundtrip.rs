use bytes::Bytes;
use tc_codec::{
    ematch::{EmatchData, EmatchMatch, EmatchTreeHdr, U32Match, TCF_EM_REL_AND, TCF_EM_REL_END},
    options::{
        Basic, Drr, FifoOpt, Fw, Hfsc, HfscQdisc, Htb, HtbOpt, Matchall, Netem, NetemCorr,
        NetemQopt, Prio, ServiceCurve, Tbf, TbfQopt,
    },
    police::Tcft,
    resolve,
    xstats::{DrrXStats, HfscXStats, HtbXStats},
    Attribute, Ematch, Error, MessageAction, Police, RateSpec, Stats, TcOptions, XStats,
};

use crate::helpers::init_tracing;

fn rate(bytes_per_sec: u32) -> RateSpec {
    RateSpec { cell_log: 3, linklayer: 1, cell_align: -1, rate: bytes_per_sec, ..Default::default() }
}

/// Every kind with a representative record, and the action its options are read under.
fn records() -> Vec<(MessageAction, TcOptions)> {
    vec![
        (
            MessageAction::Filter,
            TcOptions::Basic(Basic {
                class_id: Some(0x0001_0002),
                ematch: Some(Ematch {
                    hdr: Some(EmatchTreeHdr { nmatches: 2, progid: 0 }),
                    matches: Some(vec![
                        EmatchMatch {
                            match_id: 0,
                            flags: TCF_EM_REL_AND,
                            data: EmatchData::U32(U32Match {
                                mask: 0xffff_0000,
                                val: 0x0050_0000,
                                off: 20,
                                offmask: 0,
                            }),
                        },
                        EmatchMatch { match_id: 0, flags: TCF_EM_REL_END, data: EmatchData::Container(0) },
                    ]),
                }),
                police: None,
            }),
        ),
        (
            MessageAction::Filter,
            TcOptions::Fw(Fw {
                class_id: Some(0x0001_0003),
                police: Some(Police {
                    rate64: Some(10_000_000_000),
                    tm: Some(Tcft { install: 5, last_use: 6, ..Default::default() }),
                    ..Default::default()
                }),
                indev: Some("eth0".to_string()),
                mask: Some(0xff),
            }),
        ),
        (
            MessageAction::Filter,
            TcOptions::Matchall(Matchall { class_id: Some(7), flags: Some(1), pcnt: None }),
        ),
        (
            MessageAction::Class,
            TcOptions::Htb(Htb {
                parms: Some(HtbOpt {
                    rate: rate(125_000),
                    ceil: rate(250_000),
                    buffer: 1600,
                    cbuffer: 1600,
                    prio: 1,
                    ..Default::default()
                }),
                rtab: Some(Bytes::from(vec![0u8; 1024])),
                rate64: Some(1 << 33),
                ..Default::default()
            }),
        ),
        (
            MessageAction::Class,
            TcOptions::Hfsc(Hfsc {
                rsc: Some(ServiceCurve { m1: 0, d: 0, m2: 125_000 }),
                usc: Some(ServiceCurve { m1: 250_000, d: 10_000, m2: 125_000 }),
                ..Default::default()
            }),
        ),
        (MessageAction::Qdisc, TcOptions::HfscQdisc(HfscQdisc { defcls: 0x11 })),
        (MessageAction::Class, TcOptions::Drr(Drr { quantum: Some(1514) })),
        (
            MessageAction::Qdisc,
            TcOptions::Tbf(Tbf {
                parms: Some(TbfQopt {
                    rate: rate(12_500_000),
                    limit: 3_000_000,
                    buffer: 1600,
                    mtu: 1500,
                    ..Default::default()
                }),
                burst: Some(20_000),
                ..Default::default()
            }),
        ),
        (
            MessageAction::Qdisc,
            TcOptions::Netem(Netem {
                qopt: NetemQopt { latency: 50_000, limit: 1000, jitter: 5_000, ..Default::default() },
                corr: Some(NetemCorr { delay_corr: u32::MAX / 4, ..Default::default() }),
                latency64: Some(50_000_000),
                ..Default::default()
            }),
        ),
        (MessageAction::Qdisc, TcOptions::Pfifo(FifoOpt { limit: 1000 })),
        (MessageAction::Qdisc, TcOptions::Bfifo(FifoOpt { limit: 1_500_000 })),
        (MessageAction::Qdisc, TcOptions::Prio(Prio { bands: 4, ..Default::default() })),
        (MessageAction::Qdisc, TcOptions::PfifoFast(Prio::default())),
    ]
}

#[test]
fn every_kind_survives_a_message_round_trip() {
    init_tracing();

    for (action, options) in records() {
        let attr = Attribute {
            kind: options.kind().to_string(),
            chain: (action == MessageAction::Filter).then_some(0),
            stats: Some(Stats { packets: 10, bytes: 15_140, ..Default::default() }),
            options: Some(options),
            ..Default::default()
        };

        let raw = attr.encode().unwrap();
        assert_eq!(resolve(action, &raw).unwrap(), attr, "kind {}", attr.kind);
    }
}

#[test]
fn extended_statistics_round_trip() {
    let cases = [
        XStats::Htb(HtbXStats { lends: 1, borrows: 2, giants: 0, tokens: -5, ctokens: 7 }),
        XStats::Hfsc(HfscXStats { work: 1 << 40, rtwork: 1 << 20, period: 3, level: 1 }),
        XStats::Drr(DrrXStats { deficit: 1514 }),
    ];

    for xstats in cases {
        let attr =
            Attribute { kind: xstats.kind().to_string(), xstats: Some(xstats), ..Default::default() };
        let raw = attr.encode().unwrap();
        assert_eq!(resolve(MessageAction::Class, &raw).unwrap(), attr);
    }
}

#[test]
fn unset_fields_are_never_emitted() {
    let attr = Attribute {
        kind: "drr".to_string(),
        options: Some(TcOptions::Drr(Drr { quantum: Some(1514) })),
        ..Default::default()
    };

    // "drr\0" (8) + options holding a single u32 (4 + 8).
    assert_eq!(attr.encode().unwrap().len(), 8 + 12);
}

#[test]
fn records_of_another_kind_are_refused() {
    let attr = Attribute {
        kind: "basic".to_string(),
        options: Some(TcOptions::Drr(Drr { quantum: Some(1514) })),
        ..Default::default()
    };
    let err = attr.encode().unwrap_err();
    assert!(matches!(&err, Error::KindMismatch { kind, record: "drr" } if kind == "basic"));
    assert!(err.is_usage());

    // Without a kind the options could never be read back.
    let attr = Attribute { kind: String::new(), ..attr };
    assert!(matches!(attr.encode().unwrap_err(), Error::KindMismatch { record: "drr", .. }));

    let attr = Attribute {
        kind: "drr".to_string(),
        xstats: Some(XStats::Htb(HtbXStats::default())),
        ..Default::default()
    };
    assert!(matches!(attr.encode().unwrap_err(), Error::KindMismatch { record: "htb", .. }));
}
