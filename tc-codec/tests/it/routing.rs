use tc_codec::{
    options::{HtbGlob, HtbQdisc, Qfq},
    resolve, Error, MessageAction, TcOptions,
};

use crate::helpers::*;

fn htb_qdisc() -> HtbQdisc {
    HtbQdisc {
        init: Some(HtbGlob { version: 3, rate2quantum: 10, defcls: 0x10, ..Default::default() }),
        direct_qlen: Some(1000),
        offload: false,
    }
}

#[test]
fn htb_qdisc_options_need_a_qdisc_message() {
    init_tracing();

    let options = htb_qdisc().encode().unwrap();
    let kind = kind("htb");
    let raw = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &options)]);

    let attr = resolve(MessageAction::Qdisc, &raw).unwrap();
    assert_eq!(attr.options, Some(TcOptions::HtbQdisc(htb_qdisc())));

    // The same payload read as class options hits TCA_HTB_INIT, which classes never carry.
    let err = resolve(MessageAction::Filter, &raw).unwrap_err();
    let Error::UnknownAttribute { context, tag, .. } = err else { panic!("{err:?}") };
    assert_eq!((context, tag), ("htb class", 2));
}

#[test]
fn classful_kind_with_shared_schema() {
    let qfq = Qfq { weight: Some(10), lmax: Some(1514) };
    let options = qfq.encode().unwrap();
    let kind = kind("qfq");
    let raw = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &options)]);

    for action in [MessageAction::Qdisc, MessageAction::Class] {
        let attr = resolve(action, &raw).unwrap();
        assert_eq!(attr.options, Some(TcOptions::Qfq(qfq.clone())));
    }
}

#[test]
fn parameterless_kinds() {
    init_tracing();

    for name in ["ingress", "clsact"] {
        let kind = kind(name);

        let raw = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &[])]);
        let attr = resolve(MessageAction::Qdisc, &raw).unwrap();
        assert_eq!(attr.kind, name);
        assert_eq!(attr.options, None);
        assert_eq!(attr.xstats, None);

        let raw = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &[0; 4])]);
        let err = resolve(MessageAction::Qdisc, &raw).unwrap_err();
        assert!(matches!(err, Error::UnexpectedPayload { kind, len: 4 } if kind == name));
    }
}
