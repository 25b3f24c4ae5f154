//! SAM/MAP output (spec §6 "Output"): one record per match-trace, carrying
//! strand, position, MAPQ, CIGAR, and optional tags.
//!
//! The teacher writes its own delimited record format by hand in
//! `output.rs`/the consensus writers rather than going through a SAM crate,
//! so this module keeps that "format directly with `write!`" approach
//! instead of pulling in a dedicated SAM library, while following the field
//! layout of the standard SAM spec (spec §6 names both SAM and a terser
//! "MAP" record as acceptable outputs).

use std::io::{self, Write};

use crate::align::cigar::{render_cigar, CigarOp};
use crate::paired::MatchTrace;

/// Minimal SAM flag bits this core ever sets.
pub mod flag {
    pub const PAIRED: u16 = 0x1;
    pub const PROPER_PAIR: u16 = 0x2;
    pub const UNMAPPED: u16 = 0x4;
    pub const MATE_UNMAPPED: u16 = 0x8;
    pub const REVERSE: u16 = 0x10;
    pub const MATE_REVERSE: u16 = 0x20;
    pub const FIRST_IN_PAIR: u16 = 0x40;
    pub const SECOND_IN_PAIR: u16 = 0x80;
}

/// The subset of a SAM alignment record this core ever populates.
pub struct SamRecord<'a> {
    pub qname: &'a str,
    pub flags: u16,
    pub rname: &'a str,
    pub pos_1based: u64,
    pub mapq: u8,
    pub cigar: &'a [CigarOp],
    pub rnext: &'a str,
    pub pnext_1based: u64,
    pub tlen: i64,
    pub seq: &'a str,
    pub qual: &'a str,
    pub tags: &'a [(&'a str, String)],
}

pub fn write_header<W: Write>(out: &mut W, reference_name: &str, reference_length: u64) -> io::Result<()> {
    writeln!(out, "@HD\tVN:1.6\tSO:unknown")?;
    writeln!(out, "@SQ\tSN:{reference_name}\tLN:{reference_length}")?;
    writeln!(out, "@PG\tID:readmap\tPN:readmap")
}

pub fn write_record<W: Write>(out: &mut W, rec: &SamRecord) -> io::Result<()> {
    let cigar_str = if rec.cigar.is_empty() { "*".to_string() } else { render_cigar(rec.cigar) };
    write!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        rec.qname,
        rec.flags,
        rec.rname,
        rec.pos_1based,
        rec.mapq,
        cigar_str,
        rec.rnext,
        rec.pnext_1based,
        rec.tlen,
        rec.seq,
        rec.qual,
    )?;
    for (tag, value) in rec.tags {
        write!(out, "\t{tag}:Z:{value}")?;
    }
    writeln!(out)
}

/// A mapped mate's position and strand, carried into this end's own record
/// as `RNEXT`/`PNEXT`/`MATE_REVERSE` (spec §4.12 paired-end controller
/// output). Both ends of a pair share one reference in this core, so a
/// mapped mate is always reported via `RNEXT "="`.
pub struct MateInfo {
    pub pos_1based: u64,
    pub reverse: bool,
}

/// Builds an unmapped-record tag set, per spec §7: "per-read errors
/// optionally emit a SAM record with flag 4 (unmapped) and a tag describing
/// the cause". `pair_flags` carries `PAIRED`/`FIRST_IN_PAIR`/`SECOND_IN_PAIR`
/// for a paired read; `mate` carries the other end's position when it
/// mapped, per the SAM convention of placing an unmapped read's `RNAME`/`POS`
/// at its mapped mate's coordinates so sorted output keeps the pair adjacent.
pub fn unmapped_record<'a>(
    qname: &'a str,
    rname: &'a str,
    seq: &'a str,
    qual: &'a str,
    reason_tag: &'a str,
    pair_flags: u16,
    mate: Option<&MateInfo>,
) -> SamRecord<'a> {
    let mut flags = pair_flags | flag::UNMAPPED;
    let (out_rname, pos_1based, rnext, pnext_1based) = match mate {
        Some(m) => {
            if m.reverse {
                flags |= flag::MATE_REVERSE;
            }
            (rname, m.pos_1based, "=", m.pos_1based)
        }
        None => {
            flags |= flag::MATE_UNMAPPED;
            ("*", 0, "*", 0)
        }
    };
    SamRecord {
        qname,
        flags,
        rname: out_rname,
        pos_1based,
        mapq: 0,
        cigar: &[],
        rnext,
        pnext_1based,
        tlen: 0,
        seq,
        qual,
        tags: &[("zr", reason_tag.to_string())],
    }
}

pub fn mapped_record<'a>(
    qname: &'a str,
    trace: &'a MatchTrace,
    rname: &'a str,
    seq: &'a str,
    qual: &'a str,
    mapq: u8,
    pair_flags: u16,
    mate: Option<&MateInfo>,
    tlen: i64,
) -> SamRecord<'a> {
    let mut flags = pair_flags | if trace.reverse_strand { flag::REVERSE } else { 0 };
    let (rnext, pnext_1based) = match mate {
        Some(m) => {
            if m.reverse {
                flags |= flag::MATE_REVERSE;
            }
            ("=", m.pos_1based)
        }
        None => {
            flags |= flag::MATE_UNMAPPED;
            ("*", 0)
        }
    };
    SamRecord {
        qname,
        flags,
        rname,
        pos_1based: trace.text_position + 1,
        mapq,
        cigar: &trace.cigar,
        rnext,
        pnext_1based,
        tlen,
        seq,
        qual,
        tags: &[],
    }
}
