//! Extended match trees (`TCA_EMATCH_TREE_*`).
//!
//! An ematch tree is a flat list of matches combined by their relation flags; container
//! matches jump to another position in the list to express nesting.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tc_nla::{marshal, unmarshal, AttributeDecoder, AttributeEncoder, FixedRecord, Nla};

use crate::config::ErrorPolicy;
use crate::error::{Collector, Error, Result};

// Ematch tree attributes (from linux/pkt_cls.h)
const TCA_EMATCH_TREE_HDR: u16 = 1;
const TCA_EMATCH_TREE_LIST: u16 = 2;

// Ematch kinds (from linux/pkt_cls.h)
/// Container match that jumps to another list position.
pub const TCF_EM_CONTAINER: u16 = 0;
/// Simple comparison match.
pub const TCF_EM_CMP: u16 = 1;
/// Byte-sequence match.
pub const TCF_EM_NBYTE: u16 = 2;
/// u32 key match.
pub const TCF_EM_U32: u16 = 3;
/// Metadata match.
pub const TCF_EM_META: u16 = 4;

// Relation flags
/// Last match of the tree.
pub const TCF_EM_REL_END: u16 = 0;
/// Logical AND with the next match.
pub const TCF_EM_REL_AND: u16 = 1;
/// Logical OR with the next match.
pub const TCF_EM_REL_OR: u16 = 2;
/// Inverts the result of the match.
pub const TCF_EM_INVERT: u16 = 1 << 2;

/// An extended match tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ematch {
    /// Tree header, announcing the number of matches.
    pub hdr: Option<EmatchTreeHdr>,
    /// Match list, in wire order.
    pub matches: Option<Vec<EmatchMatch>>,
}

impl Ematch {
    /// Decodes an ematch tree, collecting all field errors.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, ErrorPolicy::default())
    }

    pub(crate) fn decode_with(data: &[u8], policy: ErrorPolicy) -> Result<Self> {
        let mut ematch = Self::default();
        let mut errors = Collector::new(policy);

        for nla in AttributeDecoder::new(data) {
            let nla = nla?;
            let tag = nla.kind();
            match tag {
                TCA_EMATCH_TREE_HDR => ematch.hdr = errors.check(tag, unmarshal(nla.value()))?,
                TCA_EMATCH_TREE_LIST => {
                    ematch.matches = errors.check(tag, decode_list(&nla, policy))?;
                }
                _ => return Err(Error::unknown_attribute("ematch", &nla)),
            }
        }

        errors.finish()?;
        Ok(ematch)
    }

    /// Encodes the tree. List entries are numbered from 1 in order.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = AttributeEncoder::new();

        if let Some(hdr) = &self.hdr {
            enc.append(TCA_EMATCH_TREE_HDR, &marshal(hdr))?;
        }
        if let Some(matches) = &self.matches {
            let mut list = AttributeEncoder::new();
            for (position, m) in (1u16..).zip(matches) {
                list.append(position, &m.encode())?;
            }
            enc.append_nested(TCA_EMATCH_TREE_LIST, list)?;
        }

        if enc.is_empty() {
            return Err(Error::NoArgument("ematch"));
        }
        Ok(enc.finish())
    }
}

fn decode_list(list: &Nla<'_>, policy: ErrorPolicy) -> Result<Vec<EmatchMatch>> {
    let mut matches = Vec::new();
    let mut errors = Collector::new(policy);

    // Entry types are positions, not schema tags, so any value is accepted.
    for nla in list.nested() {
        let nla = nla?;
        if let Some(m) = errors.check(nla.kind(), EmatchMatch::decode(nla.value()))? {
            matches.push(m);
        }
    }

    errors.finish()?;
    Ok(matches)
}

/// The kernel's `tcf_ematch_tree_hdr`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmatchTreeHdr {
    /// Number of matches in the tree.
    pub nmatches: u16,
    /// Program id.
    pub progid: u16,
}

impl FixedRecord for EmatchTreeHdr {
    const SIZE: usize = 4;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self { nmatches: buf.get_u16_ne(), progid: buf.get_u16_ne() }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16_ne(self.nmatches);
        buf.put_u16_ne(self.progid);
    }
}

/// One entry of the match list: a `tcf_ematch_hdr` followed by kind-specific data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmatchMatch {
    /// Matching module id.
    pub match_id: u16,
    /// Relation to the next match plus `TCF_EM_INVERT`.
    pub flags: u16,
    /// Kind-specific payload.
    pub data: EmatchData,
}

/// Header in front of every match.
///
/// ```c
/// struct tcf_ematch_hdr {
///     __u16 matchid;
///     __u16 kind;
///     __u16 flags;
///     __u16 pad;
/// };
/// ```
#[derive(Debug, Clone, Copy)]
struct EmatchHdr {
    match_id: u16,
    kind: u16,
    flags: u16,
}

impl FixedRecord for EmatchHdr {
    const SIZE: usize = 8;

    fn read<B: Buf>(buf: &mut B) -> Self {
        let hdr = Self { match_id: buf.get_u16_ne(), kind: buf.get_u16_ne(), flags: buf.get_u16_ne() };
        buf.advance(2);
        hdr
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16_ne(self.match_id);
        buf.put_u16_ne(self.kind);
        buf.put_u16_ne(self.flags);
        buf.put_u16_ne(0);
    }
}

impl EmatchMatch {
    fn decode(data: &[u8]) -> Result<Self> {
        let hdr: EmatchHdr = unmarshal(data)?;
        let payload = &data[EmatchHdr::SIZE..];

        let data = match hdr.kind {
            TCF_EM_CONTAINER => EmatchData::Container(unmarshal(payload)?),
            TCF_EM_CMP => EmatchData::Cmp(unmarshal(payload)?),
            TCF_EM_U32 => EmatchData::U32(unmarshal(payload)?),
            kind => return Err(Error::UnknownEmatchKind(kind)),
        };

        Ok(Self { match_id: hdr.match_id, flags: hdr.flags, data })
    }

    fn encode(&self) -> Bytes {
        let hdr = EmatchHdr { match_id: self.match_id, kind: self.data.kind(), flags: self.flags };

        let mut buf = BytesMut::with_capacity(EmatchHdr::SIZE + CmpMatch::SIZE.max(U32Match::SIZE));
        hdr.write(&mut buf);
        match &self.data {
            EmatchData::Container(position) => position.write(&mut buf),
            EmatchData::Cmp(cmp) => cmp.write(&mut buf),
            EmatchData::U32(key) => key.write(&mut buf),
        }
        buf.freeze()
    }
}

/// Kind-specific part of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmatchData {
    /// Position in the list to continue at.
    Container(u32),
    /// A `cmp` comparison.
    Cmp(CmpMatch),
    /// A u32 key.
    U32(U32Match),
}

impl EmatchData {
    /// The `TCF_EM_*` kind this data is sent as.
    pub const fn kind(&self) -> u16 {
        match self {
            Self::Container(_) => TCF_EM_CONTAINER,
            Self::Cmp(_) => TCF_EM_CMP,
            Self::U32(_) => TCF_EM_U32,
        }
    }
}

/// The kernel's `tcf_em_cmp`.
///
/// `align`/`flags` and `layer`/`opnd` are 4-bit fields sharing a byte, low nibble first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CmpMatch {
    /// Value to compare against.
    pub val: u32,
    /// Mask applied to the packet data.
    pub mask: u32,
    /// Offset from the layer start.
    pub off: u16,
    /// Operand alignment.
    pub align: u8,
    /// `TCF_EM_CMP_TRANS` and friends.
    pub flags: u8,
    /// Layer the offset is relative to.
    pub layer: u8,
    /// Comparison operator.
    pub opnd: u8,
}

impl FixedRecord for CmpMatch {
    const SIZE: usize = 12;

    fn read<B: Buf>(buf: &mut B) -> Self {
        let val = buf.get_u32_ne();
        let mask = buf.get_u32_ne();
        let off = buf.get_u16_ne();
        let align_flags = buf.get_u8();
        let layer_opnd = buf.get_u8();
        Self {
            val,
            mask,
            off,
            align: align_flags & 0x0f,
            flags: align_flags >> 4,
            layer: layer_opnd & 0x0f,
            opnd: layer_opnd >> 4,
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.val);
        buf.put_u32_ne(self.mask);
        buf.put_u16_ne(self.off);
        buf.put_u8((self.align & 0x0f) | (self.flags << 4));
        buf.put_u8((self.layer & 0x0f) | (self.opnd << 4));
    }
}

/// The kernel's `tc_u32_key`, as used by the u32 ematch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct U32Match {
    /// Mask applied to the packet word.
    pub mask: u32,
    /// Value to match after masking.
    pub val: u32,
    /// Offset of the word.
    pub off: i32,
    /// Offset mask for variable headers.
    pub offmask: i32,
}

impl FixedRecord for U32Match {
    const SIZE: usize = 16;

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            mask: buf.get_u32_ne(),
            val: buf.get_u32_ne(),
            off: buf.get_i32_ne(),
            offmask: buf.get_i32_ne(),
        }
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_ne(self.mask);
        buf.put_u32_ne(self.val);
        buf.put_i32_ne(self.off);
        buf.put_i32_ne(self.offmask);
    }
}
