//! FM-index facade: wraps the BWT, rank table, and sampled SA behind the
//! four operations the rest of the pipeline calls (spec §4.5).
//!
//! Grounded on the `FMIndexable` trait (`occ`/`less`/`backward_search`) in
//! `johanneskoester-rust-bio`'s `data_structures::fmindex` — this facade
//! plays the same role but as a concrete struct rather than a trait, since
//! this core has exactly one index implementation (spec §9: "owning value
//! types... no cyclic ownership is needed").

use crate::alphabet::Symbol;
use crate::index::bwt::Bwt;
use crate::index::rank_table::{RankQuery, RankTable};
use crate::index::sampled_sa::{SampledSa, SamplingRate};

pub struct FmIndex {
    bwt: Bwt,
    rank_table: RankTable,
    sampled_sa: SampledSa,
    /// `text_length` excludes the trailing sentinel; `bwt.len() == text_length + 1`.
    text_length: usize,
}

impl FmIndex {
    pub fn new(bwt: Bwt, rank_table: RankTable, sampled_sa: SampledSa) -> Self {
        let text_length = bwt.len() - 1;
        FmIndex { bwt, rank_table, sampled_sa, text_length }
    }

    /// Builds directly from a raw (unterminated) symbol text, for tests and
    /// small demos; production archives are loaded via
    /// [`crate::index::archive::Archive::load`].
    pub fn build_in_memory(text: &[Symbol], sampling_rate: SamplingRate) -> Self {
        let (bwt, full_sa) = super::bwt::build_naive(text);
        let rank_table = RankTable::build(&bwt);
        let sampled_sa = SampledSa::from_full_sa(&full_sa, sampling_rate);
        FmIndex::new(bwt, rank_table, sampled_sa)
    }

    pub fn length(&self) -> usize {
        self.text_length
    }

    /// `⌊log2(n)/2⌋`, used by the extension heuristics as a reference region
    /// length; `0` for an empty or single-symbol text.
    pub fn proper_length(&self) -> usize {
        if self.text_length < 2 {
            return 0;
        }
        let log2_n = usize::BITS - 1 - self.text_length.leading_zeros();
        (log2_n / 2) as usize
    }

    pub fn bwt(&self) -> &Bwt {
        &self.bwt
    }

    pub fn rank_table(&self) -> &RankTable {
        &self.rank_table
    }

    pub fn sampled_sa(&self) -> &SampledSa {
        &self.sampled_sa
    }

    /// Full backward search of `key` (read in natural, left-to-right order)
    /// against the whole index. Uses the rank table for the trailing
    /// characters of `key` while its depth is not exhausted, falling back to
    /// direct BWT rank queries once it is — mirroring the region-profile
    /// algorithm in spec §4.6 applied to a single, non-adaptive call.
    pub fn backward_search(&self, key: &[Symbol]) -> (u64, u64) {
        let mut query = RankQuery::new();
        let mut lo = 0u64;
        let mut hi = self.bwt.len() as u64;
        for &sym in key.iter().rev() {
            if !query.is_exhausted() {
                query.add_char(sym);
                let (table_lo, table_hi) = self.rank_table.fetch(&query);
                lo = table_lo;
                hi = table_hi;
            } else {
                lo = self.bwt.less(sym) + self.bwt.rank(sym, lo as usize);
                hi = self.bwt.less(sym) + self.bwt.rank(sym, hi as usize);
            }
            if lo >= hi {
                return (lo, hi);
            }
        }
        (lo, hi)
    }

    /// Decode every SA row in `[lo, hi)` into a text position, appended to
    /// `out_positions`.
    pub fn locate_interval(&self, lo: u64, hi: u64, out_positions: &mut Vec<u64>) {
        out_positions.reserve((hi - lo) as usize);
        for row in lo..hi {
            out_positions.push(self.sampled_sa.locate(&self.bwt, row as usize));
        }
    }

    /// Extends an existing `(last_lo, last_hi)` interval by the characters of
    /// `key[begin..end]`, stopping either at the first character rejected by
    /// `allowed_enc` or when the interval empties. Returns the resulting
    /// interval and the index (within `[begin, end)`) of the last character
    /// actually consumed, exclusive (i.e. how far extension reached).
    pub fn extend(
        &self,
        last_lo: u64,
        last_hi: u64,
        key: &[Symbol],
        begin: usize,
        end: usize,
        allowed_enc: impl Fn(Symbol) -> bool,
    ) -> (u64, u64, usize) {
        let mut lo = last_lo;
        let mut hi = last_hi;
        let mut idx = end;
        // Characters are consumed right-to-left within [begin, end), matching
        // the backward-search direction used throughout this core.
        while idx > begin {
            let sym = key[idx - 1];
            if !allowed_enc(sym) {
                break;
            }
            let new_lo = self.bwt.less(sym) + self.bwt.rank(sym, lo as usize);
            let new_hi = self.bwt.less(sym) + self.bwt.rank(sym, hi as usize);
            if new_lo >= new_hi {
                break;
            }
            lo = new_lo;
            hi = new_hi;
            idx -= 1;
        }
        (lo, hi, idx)
    }
}
