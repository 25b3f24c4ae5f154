//! Compiled form of a read: encoded key, BPM tiles, k-mer histogram, and the
//! scalar thresholds every downstream stage reads instead of recomputing
//! them (spec §3 "Pattern").
//!
//! Grounded on the teacher's `ScoringFunction`-adjacent pattern of
//! precomputing once per alignment call in `scoring_functions.rs`; this
//! struct generalizes that "compile once, reuse per candidate" shape to the
//! read as a whole rather than just the scoring parameters.

use crate::alphabet::{encode_text, Symbol};
use crate::verify::bpm::{compile_tiles, BpmTile};
use crate::verify::kmer_filter::KmerFilter;

pub struct Pattern {
    key: Vec<Symbol>,
    /// Count of non-`N` symbols; N positions still occupy a slot in `key` so
    /// offsets line up with the original read, but are excluded from error
    /// budgeting.
    effective_key_length: usize,
    tiles: Vec<BpmTile>,
    kmer_filter: Option<KmerFilter>,
    max_effective_error: u32,
    max_bandwidth: u32,
}

impl Pattern {
    /// Compiles a pattern from raw ASCII bases plus the CLI-level error and
    /// bandwidth fractions (spec §6: `-e` defaults to `0.04*L`, `-s` to
    /// `0.2*L`).
    pub fn compile(raw: &[u8], error_fraction: f64, bandwidth_fraction: f64) -> Result<Self, usize> {
        let key = encode_text(raw)?;
        Ok(Self::compile_symbols(key, error_fraction, bandwidth_fraction))
    }

    pub fn compile_symbols(key: Vec<Symbol>, error_fraction: f64, bandwidth_fraction: f64) -> Self {
        let effective_key_length = key.iter().filter(|s| s.is_nucleotide()).count();
        let l = key.len() as f64;
        let max_effective_error = (error_fraction * l).round() as u32;
        let max_bandwidth = (bandwidth_fraction * l).round().max(1.0) as u32;

        let tiles = compile_tiles(&key);
        let kmer_filter = KmerFilter::compile(&key, max_effective_error);

        Pattern {
            key,
            effective_key_length,
            tiles,
            kmer_filter,
            max_effective_error,
            max_bandwidth,
        }
    }

    pub fn key(&self) -> &[Symbol] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    pub fn effective_key_length(&self) -> usize {
        self.effective_key_length
    }

    pub fn tiles(&self) -> &[BpmTile] {
        &self.tiles
    }

    pub fn kmer_filter(&self) -> Option<&KmerFilter> {
        self.kmer_filter.as_ref()
    }

    pub fn max_effective_error(&self) -> u32 {
        self.max_effective_error
    }

    pub fn max_bandwidth(&self) -> u32 {
        self.max_bandwidth
    }

    /// A pattern of all `N`s, or of length 0, contributes no searchable
    /// characters: region profiling and verification both short-circuit on
    /// this (spec §8 boundary behaviors).
    pub fn is_unsearchable(&self) -> bool {
        self.effective_key_length == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_cli_fractions() {
        let pattern = Pattern::compile(b"ACGTACGTACGTACGTACGTACGTACGTACGT", 0.04, 0.2).unwrap();
        assert_eq!(pattern.len(), 32);
        assert_eq!(pattern.max_effective_error(), 1); // round(0.04*32) = round(1.28) = 1
        assert_eq!(pattern.max_bandwidth(), 6); // round(0.2*32) = round(6.4) = 6
    }

    #[test]
    fn all_n_pattern_is_unsearchable() {
        let pattern = Pattern::compile(b"NNNNNNNN", 0.04, 0.2).unwrap();
        assert!(pattern.is_unsearchable());
    }

    #[test]
    fn empty_pattern_is_unsearchable() {
        let pattern = Pattern::compile(b"", 0.04, 0.2).unwrap();
        assert!(pattern.is_unsearchable());
        assert!(pattern.is_empty());
    }

    #[test]
    fn tiles_cover_whole_key() {
        let pattern = Pattern::compile(&vec![b'A'; 150], 0.04, 0.2).unwrap();
        let total: usize = pattern.tiles().iter().map(|_| 1).count();
        assert_eq!(total, 3); // ceil(150/64)
    }
}
