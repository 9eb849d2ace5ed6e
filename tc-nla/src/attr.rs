use bytes::{BufMut, Bytes, BytesMut};

use crate::{nla_align, NlaError, NLA_HEADER_SIZE, NLA_TYPE_MASK};

/// A single attribute borrowed from the buffer being walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nla<'a> {
    kind: u16,
    value: &'a [u8],
}

impl<'a> Nla<'a> {
    /// The attribute type, with the nested / byte-order flag bits masked off.
    #[inline]
    pub const fn kind(&self) -> u16 {
        self.kind
    }

    /// The raw attribute value, without header or padding.
    #[inline]
    pub const fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Returns an owned copy of the value.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.value)
    }

    fn array<const N: usize>(&self) -> Result<[u8; N], NlaError> {
        self.value
            .try_into()
            .map_err(|_| NlaError::InvalidValue { expected: N, actual: self.value.len() })
    }

    /// Decodes a `u8` value.
    pub fn u8(&self) -> Result<u8, NlaError> {
        self.array::<1>().map(|b| b[0])
    }

    /// Decodes a native-endian `u16` value.
    pub fn u16(&self) -> Result<u16, NlaError> {
        self.array().map(u16::from_ne_bytes)
    }

    /// Decodes a native-endian `u32` value.
    pub fn u32(&self) -> Result<u32, NlaError> {
        self.array().map(u32::from_ne_bytes)
    }

    /// Decodes a native-endian `u64` value.
    pub fn u64(&self) -> Result<u64, NlaError> {
        self.array().map(u64::from_ne_bytes)
    }

    /// Decodes a native-endian `i32` value.
    pub fn i32(&self) -> Result<i32, NlaError> {
        self.array().map(i32::from_ne_bytes)
    }

    /// Decodes a native-endian `i64` value.
    pub fn i64(&self) -> Result<i64, NlaError> {
        self.array().map(i64::from_ne_bytes)
    }

    /// Checks a flag attribute, whose presence is the value. Flags carry no payload.
    pub fn flag(&self) -> Result<(), NlaError> {
        if self.value.is_empty() {
            Ok(())
        } else {
            Err(NlaError::InvalidValue { expected: 0, actual: self.value.len() })
        }
    }

    /// Decodes a NUL-terminated string. Trailing NULs are stripped.
    pub fn string(&self) -> Result<String, NlaError> {
        let end = self.value.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        std::str::from_utf8(&self.value[..end])
            .map(str::to_owned)
            .map_err(|_| NlaError::InvalidString)
    }

    /// Walks the value as a nested attribute stream.
    pub fn nested(&self) -> AttributeDecoder<'a> {
        AttributeDecoder::new(self.value)
    }
}

/// Walks a buffer of attributes in wire order.
///
/// The iterator yields an error at most once: a malformed header leaves nothing that can
/// be trusted after it, so the walk stops there.
#[derive(Debug, Clone)]
pub struct AttributeDecoder<'a> {
    buf: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> AttributeDecoder<'a> {
    /// Creates a decoder over `buf`.
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0, done: false }
    }
}

impl<'a> Iterator for AttributeDecoder<'a> {
    type Item = Result<Nla<'a>, NlaError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.buf.len() {
            return None;
        }

        let rest = &self.buf[self.offset..];
        if rest.len() < NLA_HEADER_SIZE {
            self.done = true;
            return Some(Err(NlaError::Truncated { offset: self.offset, remaining: rest.len() }));
        }

        let len = u16::from_ne_bytes([rest[0], rest[1]]) as usize;
        let kind = u16::from_ne_bytes([rest[2], rest[3]]) & NLA_TYPE_MASK;

        if len < NLA_HEADER_SIZE || len > rest.len() {
            self.done = true;
            return Some(Err(NlaError::InvalidLength {
                offset: self.offset,
                len,
                remaining: rest.len(),
            }));
        }

        // The last attribute may come without its padding.
        self.offset += nla_align(len);

        Some(Ok(Nla { kind, value: &rest[NLA_HEADER_SIZE..len] }))
    }
}

impl std::iter::FusedIterator for AttributeDecoder<'_> {}

/// Builds a buffer of attributes, in the order they are appended.
#[derive(Debug, Default, Clone)]
pub struct AttributeEncoder {
    buf: BytesMut,
}

impl AttributeEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends one attribute, padding the value to 4-byte alignment.
    pub fn append(&mut self, kind: u16, value: &[u8]) -> Result<(), NlaError> {
        let len = NLA_HEADER_SIZE + value.len();
        let len16 = u16::try_from(len).map_err(|_| NlaError::ValueTooLarge(value.len()))?;
        let padded = nla_align(len);

        self.buf.reserve(padded);
        self.buf.put_u16_ne(len16);
        self.buf.put_u16_ne(kind);
        self.buf.put_slice(value);
        self.buf.put_bytes(0, padded - len);

        Ok(())
    }

    /// Appends a `u8` value.
    pub fn append_u8(&mut self, kind: u16, value: u8) -> Result<(), NlaError> {
        self.append(kind, &[value])
    }

    /// Appends a native-endian `u16` value.
    pub fn append_u16(&mut self, kind: u16, value: u16) -> Result<(), NlaError> {
        self.append(kind, &value.to_ne_bytes())
    }

    /// Appends a native-endian `u32` value.
    pub fn append_u32(&mut self, kind: u16, value: u32) -> Result<(), NlaError> {
        self.append(kind, &value.to_ne_bytes())
    }

    /// Appends a native-endian `u64` value.
    pub fn append_u64(&mut self, kind: u16, value: u64) -> Result<(), NlaError> {
        self.append(kind, &value.to_ne_bytes())
    }

    /// Appends a native-endian `i32` value.
    pub fn append_i32(&mut self, kind: u16, value: i32) -> Result<(), NlaError> {
        self.append(kind, &value.to_ne_bytes())
    }

    /// Appends a native-endian `i64` value.
    pub fn append_i64(&mut self, kind: u16, value: i64) -> Result<(), NlaError> {
        self.append(kind, &value.to_ne_bytes())
    }

    /// Appends a flag attribute with an empty value.
    pub fn append_flag(&mut self, kind: u16) -> Result<(), NlaError> {
        self.append(kind, &[])
    }

    /// Appends a string together with its NUL terminator.
    pub fn append_string(&mut self, kind: u16, value: &str) -> Result<(), NlaError> {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        self.append(kind, &bytes)
    }

    /// Appends the contents of another encoder as a nested attribute.
    pub fn append_nested(&mut self, kind: u16, nested: Self) -> Result<(), NlaError> {
        self.append(kind, &nested.buf)
    }

    /// Consumes the encoder, returning the encoded attributes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}
