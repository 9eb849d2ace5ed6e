use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::NlaError;

/// A fixed-layout kernel struct carried as a plain attribute value.
///
/// Fields are read and written in declaration order and native byte order, with any
/// padding the C layout requires spelled out by the implementation.
pub trait FixedRecord: Sized {
    /// Number of bytes the record occupies on the wire.
    const SIZE: usize;

    /// Reads the record. The buffer is guaranteed to hold at least [`Self::SIZE`] bytes.
    fn read<B: Buf>(buf: &mut B) -> Self;

    /// Writes exactly [`Self::SIZE`] bytes.
    fn write<B: BufMut>(&self, buf: &mut B);
}

/// Decodes a fixed record from `data`.
///
/// Bytes past [`FixedRecord::SIZE`] are ignored: newer kernels append fields to existing
/// structs, and older readers are expected to keep working.
pub fn unmarshal<T: FixedRecord>(data: &[u8]) -> Result<T, NlaError> {
    if data.len() < T::SIZE {
        return Err(NlaError::ShortRecord { expected: T::SIZE, actual: data.len() });
    }

    let mut buf = &data[..T::SIZE];
    Ok(T::read(&mut buf))
}

/// Encodes a fixed record.
pub fn marshal<T: FixedRecord>(record: &T) -> Bytes {
    let mut buf = BytesMut::with_capacity(T::SIZE);
    record.write(&mut buf);
    debug_assert_eq!(buf.len(), T::SIZE);
    buf.freeze()
}

impl FixedRecord for u32 {
    const SIZE: usize = 4;

    fn read<B: Buf>(buf: &mut B) -> Self {
        buf.get_u32_ne()
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(*self);
    }
}
