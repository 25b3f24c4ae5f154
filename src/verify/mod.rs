//! Candidate verification: the k-mer prefilter and the tiled BPM
//! edit-distance verifier (spec §4.8, §4.9).

pub mod bpm;
pub mod kmer_filter;
