use tc_codec::{
    options::Basic, resolve, resolve_with, DecodeConfig, Error, ErrorPolicy, MessageAction,
};
use tc_nla::{AttributeEncoder, NlaError};

use crate::helpers::*;

/// A `basic` options payload whose class id and policing descriptor are both broken.
fn broken_basic() -> bytes::Bytes {
    let mut enc = AttributeEncoder::new();
    enc.append_u16(1, 7).unwrap();
    enc.append(4, &[0; 3]).unwrap();
    enc.finish()
}

#[test]
fn collect_all_reports_every_failing_tag() {
    init_tracing();

    let options = broken_basic();
    let kind = kind("basic");
    let raw = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &options)]);

    let Err(Error::Fields(fields)) = resolve(MessageAction::Filter, &raw) else {
        panic!("expected field errors")
    };
    assert_eq!(fields.tags(), vec![1, 4]);
    assert!(fields.to_string().starts_with("2 attribute(s) failed to decode"));
    assert!(matches!(
        fields.iter().next(),
        Some((1, Error::Nla(NlaError::InvalidValue { expected: 4, actual: 2 })))
    ));
}

#[test]
fn first_failure_returns_the_first_error_unwrapped() {
    let options = broken_basic();
    let kind = kind("basic");
    let raw = message(&[(TCA_KIND, &kind), (TCA_OPTIONS, &options)]);

    let config = DecodeConfig::new().with_error_policy(ErrorPolicy::FirstFailure);
    let err = resolve_with(&config, MessageAction::Filter, &raw).unwrap_err();
    assert!(matches!(err, Error::Nla(NlaError::InvalidValue { expected: 4, actual: 2 })));
}

#[test]
fn top_level_failures_are_collected_before_dispatch() {
    let kind = kind("basic");
    let raw = message(&[
        (TCA_STATS, &[0; 8]),
        (TCA_KIND, &kind),
        (TCA_XSTATS, &[0; 4]),
        (TCA_CHAIN, &[0; 2]),
    ]);

    let Err(Error::Fields(fields)) = resolve(MessageAction::Filter, &raw) else {
        panic!("expected field errors")
    };
    assert_eq!(fields.tags(), vec![TCA_STATS, TCA_CHAIN]);
    assert!(fields
        .into_iter()
        .all(|(_, err)| matches!(err, Error::Nla(_)) && !err.is_usage()));
}

#[test]
fn usage_errors_are_distinct() {
    let err = Basic::default().encode().unwrap_err();
    assert!(err.is_usage());

    let err = tc_codec::decode_class_options("basic", &[0; 4]).unwrap_err();
    assert!(err.is_usage());

    let err = tc_codec::decode_options("basic", &[0; 2]).unwrap_err();
    assert!(!err.is_usage());
}
