use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use tc_codec::{
    ematch::{CmpMatch, EmatchData, EmatchMatch, EmatchTreeHdr, TCF_EM_REL_AND, TCF_EM_REL_END},
    options::{Basic, HtbGlob, HtbQdisc},
    police::{Policy, TC_ACT_SHOT},
    resolve, Attribute, Ematch, MessageAction, Police, RateSpec, Stats, Stats2, TcOptions,
};

/// A `basic` filter with a policer and a two-entry match tree, as dumped by the kernel.
fn filter_message() -> Bytes {
    let cmp = |off| EmatchData::Cmp(CmpMatch { val: 6, mask: 0xff, off, ..Default::default() });

    Attribute {
        kind: "basic".to_string(),
        chain: Some(0),
        stats: Some(Stats { bytes: 1 << 30, packets: 1 << 20, ..Default::default() }),
        stats2: Some(Stats2 { bytes: 1 << 30, packets: 1 << 20, ..Default::default() }),
        options: Some(TcOptions::Basic(Basic {
            class_id: Some(0x0001_0010),
            police: Some(Police {
                tbf: Some(Policy {
                    action: TC_ACT_SHOT,
                    burst: 12_500,
                    rate: RateSpec { rate: 125_000, ..Default::default() },
                    ..Default::default()
                }),
                rate64: Some(125_000),
                ..Default::default()
            }),
            ematch: Some(Ematch {
                hdr: Some(EmatchTreeHdr { nmatches: 2, progid: 0 }),
                matches: Some(vec![
                    EmatchMatch { match_id: 0, flags: TCF_EM_REL_AND, data: cmp(9) },
                    EmatchMatch { match_id: 0, flags: TCF_EM_REL_END, data: cmp(23) },
                ]),
            }),
        })),
        ..Default::default()
    }
    .encode()
    .unwrap()
}

fn qdisc_message() -> Bytes {
    Attribute {
        kind: "htb".to_string(),
        options: Some(TcOptions::HtbQdisc(HtbQdisc {
            init: Some(HtbGlob { version: 3, rate2quantum: 10, defcls: 0x10, ..Default::default() }),
            direct_qlen: Some(1000),
            offload: false,
        })),
        ..Default::default()
    }
    .encode()
    .unwrap()
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for (name, action, raw) in [
        ("basic_filter", MessageAction::Filter, filter_message()),
        ("htb_qdisc", MessageAction::Qdisc, qdisc_message()),
    ] {
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| resolve(black_box(action), black_box(&raw)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
