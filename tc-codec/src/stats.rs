//! Kind-independent statistics and the size table.

use bytes::{Buf, BufMut, Bytes};
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder, FixedRecord};

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};

// Size table attributes (from linux/pkt_sched.h)
const TCA_STAB_BASE: u16 = 1;
const TCA_STAB_DATA: u16 = 2;

/// The kernel's `tc_stats` structure, carried in `TCA_STATS`.
///
/// The C struct is padded to 40 bytes on 64-bit targets; only the first 36 carry data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of enqueued bytes.
    pub bytes: u64,
    /// Number of enqueued packets.
    pub packets: u32,
    /// Packets dropped because of lack of resources.
    pub drops: u32,
    /// Number of throttle events when this flow goes out of allocated bandwidth.
    pub overlimits: u32,
    /// Current flow byte rate.
    pub bps: u32,
    /// Current flow packet rate.
    pub pps: u32,
    /// Current queue length.
    pub qlen: u32,
    /// Bytes queued.
    pub backlog: u32,
}

impl FixedRecord for Stats {
    const SIZE: usize = 36;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            bytes: buf.get_u64_ne(),
            packets: buf.get_u32_ne(),
            drops: buf.get_u32_ne(),
            overlimits: buf.get_u32_ne(),
            bps: buf.get_u32_ne(),
            pps: buf.get_u32_ne(),
            qlen: buf.get_u32_ne(),
            backlog: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_ne(self.bytes);
        buf.put_u32_ne(self.packets);
        buf.put_u32_ne(self.drops);
        buf.put_u32_ne(self.overlimits);
        buf.put_u32_ne(self.bps);
        buf.put_u32_ne(self.pps);
        buf.put_u32_ne(self.qlen);
        buf.put_u32_ne(self.backlog);
    }
}

/// Extended kind-independent statistics, carried in `TCA_STATS2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats2 {
    /// Number of enqueued bytes.
    pub bytes: u64,
    /// Number of enqueued packets.
    pub packets: u32,
    /// Queue length.
    pub qlen: u32,
    /// Bytes queued.
    pub backlog: u32,
    /// Dropped packets.
    pub drops: u32,
    /// Requeued packets.
    pub requeues: u32,
    /// Throttle events.
    pub overlimits: u32,
}

impl FixedRecord for Stats2 {
    const SIZE: usize = 32;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            bytes: buf.get_u64_ne(),
            packets: buf.get_u32_ne(),
            qlen: buf.get_u32_ne(),
            backlog: buf.get_u32_ne(),
            drops: buf.get_u32_ne(),
            requeues: buf.get_u32_ne(),
            overlimits: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_ne(self.bytes);
        buf.put_u32_ne(self.packets);
        buf.put_u32_ne(self.qlen);
        buf.put_u32_ne(self.backlog);
        buf.put_u32_ne(self.drops);
        buf.put_u32_ne(self.requeues);
        buf.put_u32_ne(self.overlimits);
    }
}

/// Size table (`TCA_STAB`): overrides how packet sizes are accounted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stab {
    /// Size table parameters.
    pub base: Option<SizeSpec>,
    /// `tsize` u16 entries of the size table.
    pub data: Option<Bytes>,
}

impl Stab {
    /// Decodes a size table, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut stab = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_STAB_BASE => stab.base = errors.check(tag, unmarshal(nla.value()))?,
                TCA_STAB_DATA => stab.data = Some(nla.to_bytes()),
                _ => return Err(Error::unknown_attribute("stab", &nla)),
            }
        }

        errors.finish()?;
        Ok(stab)
    }

    /// Encodes the populated attributes, in tag order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(base) = &self.base {
            enc.append(TCA_STAB_BASE, &marshal(base))?;
        }
        if let Some(data) = &self.data {
            enc.append(TCA_STAB_DATA, data)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("stab"));
        }
        Ok(enc.finish())
    }
}

/// The kernel's `tc_sizespec` structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeSpec {
    /// Cell size as a power of two.
    pub cell_log: u8,
    /// Size granularity as a power of two.
    pub size_log: u8,
    /// Cell alignment.
    pub cell_align: i16,
    /// Per-packet overhead.
    pub overhead: i32,
    /// Link layer type.
    pub linklayer: u32,
    /// Minimum packet size.
    pub mpu: u32,
    /// Maximum packet size.
    pub mtu: u32,
    /// Number of table entries.
    pub tsize: u32,
}

impl FixedRecord for SizeSpec {
    const SIZE: usize = 24;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            cell_log: buf.get_u8(),
            size_log: buf.get_u8(),
            cell_align: buf.get_i16_ne(),
            overhead: buf.get_i32_ne(),
            linklayer: buf.get_u32_ne(),
            mpu: buf.get_u32_ne(),
            mtu: buf.get_u32_ne(),
            tsize: buf.get_u32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.cell_log);
        buf.put_u8(self.size_log);
        buf.put_i16_ne(self.cell_align);
        buf.put_i32_ne(self.overhead);
        buf.put_u32_ne(self.linklayer);
        buf.put_u32_ne(self.mpu);
        buf.put_u32_ne(self.mtu);
        buf.put_u32_ne(self.tsize);
    }
}
