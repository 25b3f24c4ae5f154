//! Rank memoization table: precomputed backward-search intervals for every
//! fixed-length prefix up to `SEARCH_DEPTH`, letting the first several steps
//! of a backward search become a single array lookup (spec §4.3).
//!
//! Constants (`SEARCH_DEPTH = 11`, `LEVELS = 12`, `MMD_THRESHOLD = 20`) are
//! carried over verbatim from `rank_mtable.h` in the retrieved original
//! source (`RANK_MTABLE_SEARCH_DEPTH`, `RANK_MTABLE_LEVELS`,
//! `RANK_MTABLE_MMD_THRESHOLD`) per spec §9's open question on rank-table
//! sizing. The level-by-level query cursor (`RankQuery::add_char`) mirrors
//! `rank_mquery_t`/`rank_mquery_add_char` from the same header, adapted to
//! this crate's `Symbol`/`Bwt` types.

use crate::alphabet::{Symbol, ALPHABET_SIZE};
use crate::index::bwt::Bwt;

/// Maximum prefix length the table memoizes exact hi/lo pairs for.
pub const SEARCH_DEPTH: usize = 11;
/// One level per prefix length `0..=SEARCH_DEPTH`.
pub const LEVELS: usize = SEARCH_DEPTH + 1;
/// Once an interval narrows below this many rows, further table levels stop
/// paying for themselves and backward search falls back to direct `rank()`
/// calls against the BWT.
pub const MMD_THRESHOLD: u64 = 20;

/// `hi_position` table indexed `[level][encoded_prefix]`, where
/// `encoded_prefix` packs the last `level` symbols most-significant-first
/// using `ALPHABET_SIZE` as the radix. `lo_position` is recovered as the
/// previous sibling's `hi`, so only the `hi` values need to be stored (the
/// same trick `rank_mtable_fetch` uses via `mtable->sa_ranks_levels`).
pub struct RankTable {
    /// `hi[level]` has `ALPHABET_SIZE.pow(level)` entries.
    hi: Vec<Vec<u64>>,
}

impl RankTable {
    /// Build by exhaustively backward-searching every prefix of length
    /// `0..=SEARCH_DEPTH` over `bwt`.
    pub fn build(bwt: &Bwt) -> Self {
        let mut hi: Vec<Vec<u64>> = Vec::with_capacity(LEVELS);
        hi.push(vec![bwt.len() as u64]); // level 0: whole BWT range
        for level in 1..LEVELS {
            let prev = &hi[level - 1];
            let mut cur = vec![0u64; prev.len() * ALPHABET_SIZE];
            for prefix_idx in 0..prev.len() {
                let (lo0, hi0) = interval_at(&hi, level - 1, prefix_idx);
                for c in 0..ALPHABET_SIZE as u8 {
                    let sym = Symbol::from_code(c);
                    let new_lo = bwt.less(sym) + bwt.rank(sym, lo0 as usize);
                    let new_hi = bwt.less(sym) + bwt.rank(sym, hi0 as usize);
                    cur[prefix_idx * ALPHABET_SIZE + c as usize] = new_hi.max(new_lo);
                    debug_assert!(new_lo <= new_hi);
                }
            }
            hi.push(cur);
        }
        RankTable { hi }
    }

    /// Flattens every level's `hi` array into one little-endian byte blob;
    /// level boundaries are deterministic from `LEVELS`/`ALPHABET_SIZE`, so
    /// `from_bytes` needs no extra length table.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.hi.iter().flatten().flat_map(|v| v.to_le_bytes()).collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut values = bytes.chunks_exact(8).map(|c| u64::from_le_bytes(c.try_into().unwrap()));
        let mut hi = Vec::with_capacity(LEVELS);
        for level in 0..LEVELS {
            let count = ALPHABET_SIZE.pow(level as u32);
            hi.push((0..count).map(|_| values.next().expect("truncated rank table blob")).collect());
        }
        RankTable { hi }
    }

    /// `(lo, hi)` for the characters accumulated so far in `query`, per
    /// `rank_mtable_fetch`.
    pub fn fetch(&self, query: &RankQuery) -> (u64, u64) {
        interval_at(&self.hi, query.level, query.idx)
    }

    /// Convenience for building a query from a slice in one call: `chars`
    /// must be given in the order the backward search consumes them (first
    /// element = first character consumed), not reading order. Returns
    /// `None` once `chars.len() > SEARCH_DEPTH`.
    pub fn lookup(&self, chars: &[Symbol]) -> Option<(u64, u64)> {
        if chars.len() > SEARCH_DEPTH {
            return None;
        }
        let mut query = RankQuery::new();
        for &c in chars {
            query.add_char(c);
        }
        Some(self.fetch(&query))
    }
}

/// Incremental cursor over the table, mirroring `rank_mquery_t` /
/// `rank_mquery_add_char` / `rank_mquery_is_exhausted`: characters are added
/// one at a time as the backward search consumes them (right-to-left over
/// the pattern), and the cursor silently stops absorbing characters past
/// `SEARCH_DEPTH` — callers must check [`RankQuery::is_exhausted`] and
/// continue with direct BWT `rank` calls once it returns `true`.
#[derive(Clone, Copy, Default)]
pub struct RankQuery {
    idx: usize,
    level: usize,
}

impl RankQuery {
    pub fn new() -> Self {
        RankQuery { idx: 0, level: 0 }
    }

    pub fn add_char(&mut self, sym: Symbol) {
        debug_assert!(!self.is_exhausted(), "add_char called on an exhausted query");
        self.idx = self.idx * ALPHABET_SIZE + sym.code() as usize;
        self.level += 1;
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_exhausted(&self) -> bool {
        self.level >= SEARCH_DEPTH
    }
}

/// `(lo, hi)` for entry `idx` at `level`, where `lo` is the previous sibling's
/// `hi` (or the parent's `lo` if `idx` is the first child at this level).
fn interval_at(hi: &[Vec<u64>], level: usize, idx: usize) -> (u64, u64) {
    if level == 0 {
        return (0, hi[0][0]);
    }
    let lo = if idx % ALPHABET_SIZE == 0 {
        parent_lo(hi, level - 1, idx / ALPHABET_SIZE)
    } else {
        hi[level][idx - 1]
    };
    (lo, hi[level][idx])
}

fn parent_lo(hi: &[Vec<u64>], parent_level: usize, parent_idx: usize) -> u64 {
    if parent_level == 0 {
        0
    } else {
        interval_at(hi, parent_level, parent_idx).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::bwt::tests::naive_bwt_and_sa;

    #[test]
    fn single_symbol_lookup_matches_c_array() {
        let (bwt, _) = naive_bwt_and_sa(b"GATTACAGATTACA");
        let table = RankTable::build(&bwt);
        for c in 0..ALPHABET_SIZE as u8 {
            let sym = Symbol::from_code(c);
            let (lo, hi) = table.lookup(&[sym]).unwrap();
            let expected_lo = bwt.less(sym);
            let expected_hi = bwt.less(sym) + bwt.total_occurrences(sym);
            assert_eq!((lo, hi), (expected_lo, expected_hi), "symbol {sym:?}");
        }
    }

    #[test]
    fn deep_lookup_matches_manual_backward_search() {
        let (bwt, _) = naive_bwt_and_sa(b"ACGTACGTACGTACGTACGT");
        let table = RankTable::build(&bwt);
        // consumption order: sym0 first, then sym1, then sym2
        let consumed = [Symbol::from_code(0), Symbol::from_code(1), Symbol::from_code(2)];
        let (lo, hi) = table.lookup(&consumed).unwrap();

        let mut cur_lo = 0u64;
        let mut cur_hi = bwt.len() as u64;
        for &sym in consumed.iter() {
            cur_lo = bwt.less(sym) + bwt.rank(sym, cur_lo as usize);
            cur_hi = bwt.less(sym) + bwt.rank(sym, cur_hi as usize);
        }
        assert_eq!((lo, hi), (cur_lo, cur_hi));
    }

    #[test]
    fn beyond_search_depth_returns_none() {
        let (bwt, _) = naive_bwt_and_sa(b"ACGTACGTACGTACGTACGTACGT");
        let table = RankTable::build(&bwt);
        let prefix = vec![Symbol::from_code(0); SEARCH_DEPTH + 1];
        assert!(table.lookup(&prefix).is_none());
    }
}
