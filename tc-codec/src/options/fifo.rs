//! `pfifo` / `bfifo` options: a bare `tc_fifo_qopt`.

use bytes::{Buf, BufMut};
use tc_nla::FixedRecord;

/// The kernel's `tc_fifo_qopt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoOpt {
    /// Queue limit, in packets for `pfifo` and in bytes for `bfifo`.
    pub limit: u32,
}

impl FixedRecord for FifoOpt {
    const SIZE: usize = 4;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self { limit: buf.get_u32_ne() }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.limit);
    }
}
