//! Kind-specific extended statistics (`TCA_XSTATS`).

use bytes::{Buf, BufMut, Bytes};
use tc_nla::{marshal, FixedRecord};

/// Extended statistics, one variant per kind that reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XStats {
    /// Statistics of an HTB class.
    Htb(HtbXStats),
    /// Statistics of an HFSC class.
    Hfsc(HfscXStats),
    /// Statistics of a DRR class.
    Drr(DrrXStats),
}

impl XStats {
    /// The kind these statistics belong to.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Htb(_) => "htb",
            Self::Hfsc(_) => "hfsc",
            Self::Drr(_) => "drr",
        }
    }

    /// Encodes the statistics into a `TCA_XSTATS` value.
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Htb(stats) => marshal(stats),
            Self::Hfsc(stats) => marshal(stats),
            Self::Drr(stats) => marshal(stats),
        }
    }
}

/// The kernel's `tc_htb_xstats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtbXStats {
    /// Times the class lent tokens.
    pub lends: u32,
    /// Times the class borrowed tokens.
    pub borrows: u32,
    /// Oversized packets.
    pub giants: u32,
    /// Tokens left at `rate`.
    pub tokens: i32,
    /// Tokens left at `ceil`.
    pub ctokens: i32,
}

impl FixedRecord for HtbXStats {
    const SIZE: usize = 20;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            lends: buf.get_u32_ne(),
            borrows: buf.get_u32_ne(),
            giants: buf.get_u32_ne(),
            tokens: buf.get_i32_ne(),
            ctokens: buf.get_i32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.lends);
        buf.put_u32_ne(self.borrows);
        buf.put_u32_ne(self.giants);
        buf.put_i32_ne(self.tokens);
        buf.put_i32_ne(self.ctokens);
    }
}

/// The kernel's `tc_hfsc_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HfscXStats {
    /// Total work done.
    pub work: u64,
    /// Work done by the real-time criteria.
    pub rtwork: u64,
    /// Current period.
    pub period: u32,
    /// Level in the class tree.
    pub level: u32,
}

impl FixedRecord for HfscXStats {
    const SIZE: usize = 24;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            work: buf.get_u64_ne(),
            rtwork: buf.get_u64_ne(),
            period: buf.get_u32_ne(),
            level: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_ne(self.work);
        buf.put_u64_ne(self.rtwork);
        buf.put_u32_ne(self.period);
        buf.put_u32_ne(self.level);
    }
}

/// The kernel's `tc_drr_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrrXStats {
    /// Bytes left in the current round.
    pub deficit: u32,
}

impl FixedRecord for DrrXStats {
    const SIZE: usize = 4;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self { deficit: buf.get_u32_ne() }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.deficit);
    }
}
