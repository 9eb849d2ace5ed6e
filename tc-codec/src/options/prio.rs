//! `prio` / `pfifo_fast` options: a bare `tc_prio_qopt`.

use bytes::{Buf, BufMut};
use tc_nla::FixedRecord;

/// Number of bands `prio` creates when none is given.
pub const DEFAULT_PRIORITY_BANDS: i32 = 3;

/// Maps the packet priority (`TC_PRIO_*`) to a band.
pub const DEFAULT_PRIORITY_MAP: [u8; 16] = [0, 1, 2, 2, 1, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1];

/// The kernel's `tc_prio_qopt`.
///
/// ```c
/// struct tc_prio_qopt {
///     int bands;                       /* Number of bands */
///     __u8 priomap[TC_PRIO_MAX + 1];   /* Map: logical priority -> PRIO band */
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prio {
    /// Number of bands.
    pub bands: i32,
    /// Band of each packet priority.
    pub priomap: [u8; 16],
}

impl Default for Prio {
    fn default() -> Self {
        Self { bands: DEFAULT_PRIORITY_BANDS, priomap: DEFAULT_PRIORITY_MAP }
    }
}

impl FixedRecord for Prio {
    const SIZE: usize = 20;

    fn read<B: Buf>(buf: &mut B) -> Self {
        let bands = buf.get_i32_ne();
        let mut priomap = [0u8; 16];
        buf.copy_to_slice(&mut priomap);
        Self { bands, priomap }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_i32_ne(self.bands);
        buf.put_slice(&self.priomap);
    }
}
