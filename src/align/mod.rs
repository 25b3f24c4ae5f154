//! Alignment stage: scoring model, banded Gotoh DP, scaffolded multi-anchor
//! alignment, and CIGAR curation (spec §4.10).

pub mod cigar;
pub mod scaffold;
pub mod scoring;
pub mod swg;
