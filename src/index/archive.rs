//! Archive file format: the little-endian, 4 KiB-aligned on-disk layout an
//! `FmIndex` is loaded from (spec §6 "Archive file").
//!
//! Building the archive (suffix sorting the reference into a BWT) is the
//! offline indexer, explicitly out of core scope (spec §1); this module only
//! implements the load side plus a writer used by tests to produce fixture
//! archives, grounded on the same `std::io`/byteorder-by-hand style the
//! teacher uses for its own binary formats (`rust_htslib`/`noodles` wrap BAM
//! the same way: a typed header struct read with explicit field-by-field
//! `read_u64`/`write_u64` calls).

use std::io::{self, Read, Write};

use crate::error::{CoreError, CoreResult};
use crate::index::bwt::Bwt;
use crate::index::fm_index::FmIndex;
use crate::index::rank_table::{RankTable, LEVELS, MMD_THRESHOLD};
use crate::index::sampled_sa::{SampledSa, SamplingRate};

/// Sections are padded to this boundary so they can be mmap-loaded directly.
const SECTION_ALIGN: u64 = 4096;

/// Marker written at the start of the header; a mismatch means the archive
/// was produced by an incompatible model version.
const MODEL_MARKER: u64 = 0x4652_4d58_3031; // "FRMX01" in hex-ish ASCII bytes

fn read_u64(r: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn write_u64(w: &mut impl Write, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn pad_to_alignment(w: &mut impl Write, written_so_far: u64) -> io::Result<u64> {
    let remainder = written_so_far % SECTION_ALIGN;
    if remainder == 0 {
        return Ok(written_so_far);
    }
    let pad = SECTION_ALIGN - remainder;
    w.write_all(&vec![0u8; pad as usize])?;
    Ok(written_so_far + pad)
}

/// Reads and discards alignment padding; returns the new absolute offset.
fn skip_padding(r: &mut impl Read, read_so_far: u64) -> io::Result<u64> {
    let remainder = read_so_far % SECTION_ALIGN;
    if remainder == 0 {
        return Ok(read_so_far);
    }
    let pad = SECTION_ALIGN - remainder;
    io::copy(&mut r.by_ref().take(pad), &mut io::sink())?;
    Ok(read_so_far + pad)
}

pub struct Archive;

impl Archive {
    /// Serializes `index` to `w` in the format described in spec §6.
    pub fn write(w: &mut impl Write, index: &FmIndex) -> CoreResult<()> {
        Self::write_inner(w, index).map_err(|e| CoreError::Io { path: "<archive>".into(), source: e })
    }

    fn write_inner(w: &mut impl Write, index: &FmIndex) -> io::Result<()> {
        let mut offset = 0u64;

        // (i) header
        write_u64(w, MODEL_MARKER)?;
        write_u64(w, index.length() as u64)?;
        write_u64(w, index.proper_length() as u64)?;
        offset += 24;
        offset = pad_to_alignment(w, offset)?;

        // (ii) sampled SA
        let sa = index.sampled_sa();
        write_u64(w, sa.index_length() as u64)?;
        write_u64(w, sa.sampling_rate() as u64)?;
        let sa_bytes = sa.to_bytes();
        write_u64(w, sa_bytes.len() as u64)?;
        w.write_all(&sa_bytes)?;
        offset += 24 + sa_bytes.len() as u64;
        offset = pad_to_alignment(w, offset)?;

        // (iii) rank memoization table
        let rt = index.rank_table();
        let rt_bytes = rt.to_bytes();
        write_u64(w, rt_bytes.len() as u64)?;
        write_u64(w, LEVELS as u64)?;
        w.write_all(&rt_bytes)?;
        write_u64(w, MMD_THRESHOLD)?;
        offset += 16 + rt_bytes.len() as u64 + 8;
        offset = pad_to_alignment(w, offset)?;

        // (iv) BWT blocks
        let bwt_bytes = index.bwt().to_bytes();
        write_u64(w, bwt_bytes.len() as u64)?;
        w.write_all(&bwt_bytes)?;
        offset += 8 + bwt_bytes.len() as u64;
        let _ = pad_to_alignment(w, offset)?;

        Ok(())
    }

    /// Loads an `FmIndex` from `r`. Rejects a missing/mismatched model marker
    /// with `CoreError::ArchiveLoad`, per spec §6 ("a wrong-model marker...
    /// is rejected with a distinctive error").
    pub fn load(r: &mut impl Read) -> CoreResult<FmIndex> {
        Self::load_inner(r).map_err(|e| match e {
            LoadError::Io(e) => CoreError::Io { path: "<archive>".into(), source: e },
            LoadError::Model(msg) => CoreError::ArchiveLoad(msg),
        })
    }

    fn load_inner(r: &mut impl Read) -> Result<FmIndex, LoadError> {
        let mut offset = 0u64;

        let marker = read_u64(r)?;
        if marker != MODEL_MARKER {
            return Err(LoadError::Model(format!(
                "archive model marker mismatch: expected {MODEL_MARKER:#x}, found {marker:#x}"
            )));
        }
        let _text_length = read_u64(r)?;
        let _proper_length = read_u64(r)?;
        offset += 24;
        offset = skip_padding(r, offset)?;

        let sa_index_length = read_u64(r)? as usize;
        let sa_rate_code = read_u64(r)?;
        let sampling_rate = decode_sampling_rate(sa_rate_code)
            .ok_or_else(|| LoadError::Model(format!("unknown sampling rate code {sa_rate_code}")))?;
        let sa_bytes_len = read_u64(r)? as usize;
        let mut sa_bytes = vec![0u8; sa_bytes_len];
        r.read_exact(&mut sa_bytes)?;
        let sampled_sa = SampledSa::from_bytes(sa_index_length, sampling_rate, &sa_bytes);
        offset += 24 + sa_bytes_len as u64;
        offset = skip_padding(r, offset)?;

        let rt_bytes_len = read_u64(r)? as usize;
        let _num_levels = read_u64(r)?;
        let mut rt_bytes = vec![0u8; rt_bytes_len];
        r.read_exact(&mut rt_bytes)?;
        let _mmd_threshold = read_u64(r)?;
        let rank_table = RankTable::from_bytes(&rt_bytes);
        offset += 16 + rt_bytes_len as u64 + 8;
        offset = skip_padding(r, offset)?;

        let bwt_bytes_len = read_u64(r)? as usize;
        let mut bwt_bytes = vec![0u8; bwt_bytes_len];
        r.read_exact(&mut bwt_bytes)?;
        let bwt = Bwt::from_bytes(&bwt_bytes);
        let _ = offset;

        Ok(FmIndex::new(bwt, rank_table, sampled_sa))
    }
}

enum LoadError {
    Io(io::Error),
    Model(String),
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::Io(e)
    }
}

fn decode_sampling_rate(code: u64) -> Option<SamplingRate> {
    Some(match code {
        0 => SamplingRate::Rate1,
        1 => SamplingRate::Rate2,
        2 => SamplingRate::Rate4,
        3 => SamplingRate::Rate8,
        4 => SamplingRate::Rate16,
        5 => SamplingRate::Rate32,
        6 => SamplingRate::Rate64,
        7 => SamplingRate::Rate128,
        8 => SamplingRate::Rate256,
        _ => return None,
    })
}
