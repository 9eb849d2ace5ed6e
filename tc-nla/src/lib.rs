//! Generic netlink attribute primitives.
//!
//! Netlink carries its payloads as a flat or nested sequence of TLV (Type-Length-Value)
//! attributes. This crate provides the three primitives the tc codec is built on:
//!
//! - [`AttributeDecoder`]: walks a buffer and yields `(type, value)` pairs in wire order.
//! - [`AttributeEncoder`]: appends `(type, value)` pairs to a buffer, with padding.
//! - [`FixedRecord`], [`unmarshal`] and [`marshal`]: fixed-layout kernel structs such as
//!   `struct tc_stats`, in native byte order.
//!
//! # NLA Header Format
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Length (2 bytes) │  Type (2 bytes)     │  <- NLA header (4 bytes)
//! ├─────────────────────────────────────────┤
//! │  Value (variable length, padded to 4)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Reference: <linux/netlink.h>

use thiserror::Error;

mod attr;
mod record;

pub use attr::{AttributeDecoder, AttributeEncoder, Nla};
pub use record::{marshal, unmarshal, FixedRecord};

/// Size of the attribute header (`struct nlattr`).
pub const NLA_HEADER_SIZE: usize = 4;

/// Attribute values are padded to this alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Set on the type of an attribute that carries nested attributes.
pub const NLA_F_NESTED: u16 = 1 << 15;

/// Set on the type of an attribute whose value is in network byte order.
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;

/// Masks the flag bits off an attribute type.
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// Rounds `len` up to the attribute alignment.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Errors produced while walking, encoding or unmarshalling attributes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NlaError {
    /// The buffer ends inside an attribute header.
    #[error("truncated attribute header at offset {offset}: {remaining} bytes left")]
    Truncated { offset: usize, remaining: usize },
    /// The header length is shorter than a header or runs past the buffer.
    #[error("attribute at offset {offset} declares length {len}, {remaining} bytes available")]
    InvalidLength { offset: usize, len: usize, remaining: usize },
    /// A scalar value has the wrong size.
    #[error("attribute value has {actual} bytes, expected {expected}")]
    InvalidValue { expected: usize, actual: usize },
    /// A string value is not valid UTF-8.
    #[error("attribute value is not a valid UTF-8 string")]
    InvalidString,
    /// The buffer is shorter than a fixed record.
    #[error("record needs {expected} bytes, got {actual}")]
    ShortRecord { expected: usize, actual: usize },
    /// The value is too large for the 16-bit length field.
    #[error("value of {0} bytes does not fit in a netlink attribute")]
    ValueTooLarge(usize),
}
