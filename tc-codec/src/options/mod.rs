//! Per-kind option records carried in `TCA_OPTIONS`.

use bytes::Bytes;
use tc_nla::marshal;

use crate::error::Result;

mod basic;
pub use basic::Basic;

mod drr;
pub use drr::Drr;

mod fifo;
pub use fifo::FifoOpt;

mod fw;
pub use fw::Fw;

mod hfsc;
pub use hfsc::{Hfsc, HfscQdisc, ServiceCurve};

pub(crate) mod hook;

mod htb;
pub use htb::{Htb, HtbGlob, HtbOpt, HtbQdisc};

mod matchall;
pub use matchall::{Matchall, MatchallPcnt};

mod netem;
pub use netem::{Netem, NetemCorr, NetemProbability, NetemQopt, NetemRate, NetemSlot};

mod prio;
pub use prio::{Prio, DEFAULT_PRIORITY_BANDS, DEFAULT_PRIORITY_MAP};

mod qfq;
pub use qfq::Qfq;

mod tbf;
pub use tbf::{Tbf, TbfQopt};

/// The decoded options of a tc object, one variant per record type.
///
/// Which variant a payload decodes into is decided by the kind and, for classful
/// qdiscs, by whether the message describes the qdisc itself or one of its classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcOptions {
    /// Options of the basic classifier.
    Basic(Basic),
    /// Options of the firewall-mark classifier.
    Fw(Fw),
    /// Options of the match-all classifier.
    Matchall(Matchall),
    /// Options of an HTB class.
    Htb(Htb),
    /// Options of the HTB qdisc itself.
    HtbQdisc(HtbQdisc),
    /// Options of an HFSC class.
    Hfsc(Hfsc),
    /// Options of the HFSC qdisc itself.
    HfscQdisc(HfscQdisc),
    /// Options of a QFQ class or qdisc, which share one schema.
    Qfq(Qfq),
    /// Options of a DRR class.
    Drr(Drr),
    /// Options of a TBF qdisc.
    Tbf(Tbf),
    /// Options of a netem qdisc.
    Netem(Netem),
    /// Packet limit of a pfifo qdisc.
    Pfifo(FifoOpt),
    /// Byte limit of a bfifo qdisc.
    Bfifo(FifoOpt),
    /// Band map of a prio qdisc.
    Prio(Prio),
    /// Band map of a pfifo_fast qdisc, laid out like prio.
    PfifoFast(Prio),
}

impl TcOptions {
    /// The kind string this record belongs to.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Fw(_) => "fw",
            Self::Matchall(_) => "matchall",
            Self::Htb(_) | Self::HtbQdisc(_) => "htb",
            Self::Hfsc(_) | Self::HfscQdisc(_) => "hfsc",
            Self::Qfq(_) => "qfq",
            Self::Drr(_) => "drr",
            Self::Tbf(_) => "tbf",
            Self::Netem(_) => "netem",
            Self::Pfifo(_) => "pfifo",
            Self::Bfifo(_) => "bfifo",
            Self::Prio(_) => "prio",
            Self::PfifoFast(_) => "pfifo_fast",
        }
    }

    /// Encodes the record into a `TCA_OPTIONS` value.
    pub fn encode(&self) -> Result<Bytes> {
        match self {
            Self::Basic(basic) => basic.encode(),
            Self::Fw(fw) => fw.encode(),
            Self::Matchall(matchall) => matchall.encode(),
            Self::Htb(htb) => htb.encode(),
            Self::HtbQdisc(htb) => htb.encode(),
            Self::Hfsc(hfsc) => hfsc.encode(),
            Self::HfscQdisc(hfsc) => Ok(marshal(hfsc)),
            Self::Qfq(qfq) => qfq.encode(),
            Self::Drr(drr) => drr.encode(),
            Self::Tbf(tbf) => tbf.encode(),
            Self::Netem(netem) => netem.encode(),
            Self::Pfifo(fifo) | Self::Bfifo(fifo) => Ok(marshal(fifo)),
            Self::Prio(prio) | Self::PfifoFast(prio) => Ok(marshal(prio)),
        }
    }
}
