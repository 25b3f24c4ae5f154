//! 5-mer histogram prefilter: a cheap lower bound on edit distance that
//! rejects most candidates before they reach the BPM verifier (spec §4.8).
//!
//! The exact bound (`kmers_in_text >= L - 4 - 5*max_error`) and the
//! disabling heuristics (`L < 5`, `L / max_error < 12`, any `N` in the
//! pattern) are carried over from `kmer_counting.c` in the retrieved
//! original source, named there as `kmer_counting_min_matches`.

use crate::alphabet::Symbol;

/// Fixed k-mer length; 2 bits per nucleotide, packed into a 10-bit index.
pub const K: usize = 5;
const HISTOGRAM_SIZE: usize = 1 << (2 * K); // 1024

pub struct KmerFilter {
    pattern_counts: [u16; HISTOGRAM_SIZE],
    pattern_len: usize,
    max_error: u32,
}

/// Below this ratio of pattern length to max_error, the k-mer bound can't
/// discriminate enough candidates to be worth computing.
const MIN_LENGTH_TO_ERROR_RATIO: u32 = 12;

impl KmerFilter {
    /// Compiles the filter for a pattern, or `None` if it should be disabled:
    /// the pattern contains an `N`, is shorter than `K`, or
    /// `pattern_len / max_error < MIN_LENGTH_TO_ERROR_RATIO`.
    pub fn compile(key: &[Symbol], max_error: u32) -> Option<Self> {
        if key.len() < K {
            return None;
        }
        if key.iter().any(|s| !s.is_nucleotide()) {
            return None;
        }
        if max_error == 0 || key.len() as u32 / max_error < MIN_LENGTH_TO_ERROR_RATIO {
            return None;
        }

        let mut pattern_counts = [0u16; HISTOGRAM_SIZE];
        for window in key.windows(K) {
            pattern_counts[kmer_index(window)] += 1;
        }
        Some(KmerFilter { pattern_counts, pattern_len: key.len(), max_error })
    }

    /// Slides a window of `pattern_len` over `text` and reports whether any
    /// frame accumulates enough shared k-mers to admit the candidate. `true`
    /// means "don't filter, proceed to BPM"; `false` means reject.
    pub fn passes(&self, text: &[Symbol]) -> bool {
        if text.len() < self.pattern_len {
            return self.frame_passes(text);
        }
        let required = self.required_kmers();
        for frame_start in 0..=(text.len() - self.pattern_len) {
            let frame = &text[frame_start..frame_start + self.pattern_len];
            if self.kmers_in_text(frame) >= required {
                return true;
            }
        }
        false
    }

    fn frame_passes(&self, text: &[Symbol]) -> bool {
        self.kmers_in_text(text) >= self.required_kmers()
    }

    fn required_kmers(&self) -> i64 {
        self.pattern_len as i64 - 4 - 5 * self.max_error as i64
    }

    fn kmers_in_text(&self, frame: &[Symbol]) -> i64 {
        if frame.len() < K {
            return 0;
        }
        let mut text_counts = [0u16; HISTOGRAM_SIZE];
        for window in frame.windows(K) {
            if window.iter().any(|s| !s.is_nucleotide()) {
                continue;
            }
            text_counts[kmer_index(window)] += 1;
        }
        self.pattern_counts
            .iter()
            .zip(text_counts.iter())
            .map(|(&p, &t)| p.min(t) as i64)
            .sum()
    }
}

fn kmer_index(window: &[Symbol]) -> usize {
    debug_assert_eq!(window.len(), K);
    let mut idx = 0usize;
    for s in window {
        idx = (idx << 2) | (s.code() as usize & 0b11);
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::encode_text;

    #[test]
    fn exact_match_passes() {
        let key = encode_text(b"ACGTACGTACGTACGT").unwrap();
        let filter = KmerFilter::compile(&key, 1).unwrap();
        let text = encode_text(b"ACGTACGTACGTACGT").unwrap();
        assert!(filter.passes(&text));
    }

    #[test]
    fn wildly_different_text_rejects() {
        let key = encode_text(b"ACGTACGTACGTACGT").unwrap();
        let filter = KmerFilter::compile(&key, 1).unwrap();
        let text = encode_text(b"TTTTTTTTTTTTTTTT").unwrap();
        assert!(!filter.passes(&text));
    }

    #[test]
    fn disabled_when_pattern_has_n() {
        let key = encode_text(b"ACGTNCGTACGTACGT").unwrap();
        assert!(KmerFilter::compile(&key, 1).is_none());
    }

    #[test]
    fn disabled_when_length_too_short() {
        let key = encode_text(b"ACGT").unwrap();
        assert!(KmerFilter::compile(&key, 1).is_none());
    }

    #[test]
    fn disabled_when_ratio_too_low() {
        let key = encode_text(b"ACGTACGTACGT").unwrap(); // len 12
        assert!(KmerFilter::compile(&key, 2).is_none()); // 12/2 = 6 < 12
    }
}
