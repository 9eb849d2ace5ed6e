//! Kind-aware decoding and encoding of Linux traffic-control attributes.
//!
//! A tc message describes a qdisc, class, filter or action. Its body is a tree of netlink
//! attributes in which `TCA_OPTIONS` and `TCA_XSTATS` can only be read once the sibling
//! `TCA_KIND` string is known. [`resolve`] walks the top-level attributes, defers those
//! two payloads and dispatches them through the kind registry afterwards.
//!
//! ```no_run
//! use tc_codec::{resolve, MessageAction, TcOptions};
//!
//! # fn handle(raw: &[u8]) -> tc_codec::Result<()> {
//! let attr = resolve(MessageAction::Filter, raw)?;
//! if let Some(TcOptions::Basic(basic)) = &attr.options {
//!     println!("{} -> {:?}", attr.kind, basic.class_id);
//! }
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod attribute;
pub use attribute::{resolve, resolve_with, Attribute, MessageAction};

mod config;
pub use config::{DecodeConfig, ErrorPolicy};

/// Extended match trees.
pub mod ematch;
pub use ematch::Ematch;

mod error;
pub use error::{Error, FieldErrors, Result};

/// The kind registry.
pub mod kind;
pub use kind::{decode_class_options, decode_options, decode_xstats, encode_options, encode_xstats};

/// Per-kind option records.
pub mod options;
pub use options::TcOptions;

/// Policing parameters.
pub mod police;
pub use police::Police;

mod ratespec;
pub use ratespec::RateSpec;

/// Kind-independent statistics and the size table.
pub mod stats;
pub use stats::{Stab, Stats, Stats2};

/// Kind-specific extended statistics.
pub mod xstats;
pub use xstats::XStats;
