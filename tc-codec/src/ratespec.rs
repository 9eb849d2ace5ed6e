//! The kernel's rate specification, shared by policing, HTB and TBF.

use bytes::{Buf, BufMut};
use tc_nla::FixedRecord;

/// The kernel's `tc_ratespec` structure.
///
/// # Linklayer Modes
///
/// - `linklayer = 0` (TC_LINKLAYER_UNAWARE): the kernel auto-detects using the rate table.
/// - `linklayer = 1` (TC_LINKLAYER_ETHERNET): explicit Ethernet.
/// - `linklayer = 2` (TC_LINKLAYER_ATM): explicit ATM with 48-byte cell accounting.
///
/// # Kernel Definition
///
/// From `<linux/pkt_sched.h>`:
///
/// ```c
/// struct tc_ratespec {
///     unsigned char cell_log;    /* Cell size log2 */
///     __u8 linklayer;            /* Link layer type */
///     unsigned short overhead;   /* Link layer overhead */
///     short cell_align;          /* Cell alignment */
///     unsigned short mpu;        /* Minimum packet unit */
///     __u32 rate;                /* Rate in bytes/sec */
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateSpec {
    /// Log2 of the cell size.
    pub cell_log: u8,
    /// Link layer type (0 = unaware, 1 = ethernet, 2 = ATM).
    pub linklayer: u8,
    /// Overhead added by link layer framing (bytes).
    pub overhead: u16,
    /// Cell alignment for ATM networks (typically -1 for Ethernet).
    pub cell_align: i16,
    /// Minimum packet unit (minimum bytes charged per packet).
    pub mpu: u16,
    /// Rate in bytes per second. Rates above `u32::MAX` travel in a separate 64-bit
    /// attribute next to the struct.
    pub rate: u32,
}

impl FixedRecord for RateSpec {
    const SIZE: usize = 12;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            cell_log: buf.get_u8(),
            linklayer: buf.get_u8(),
            overhead: buf.get_u16_ne(),
            cell_align: buf.get_i16_ne(),
            mpu: buf.get_u16_ne(),
            rate: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.cell_log);
        buf.put_u8(self.linklayer);
        buf.put_u16_ne(self.overhead);
        buf.put_i16_ne(self.cell_align);
        buf.put_u16_ne(self.mpu);
        buf.put_u32_ne(self.rate);
    }
}
