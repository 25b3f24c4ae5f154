//! Approximate-string-matching core of a short-read DNA aligner: FM-index
//! search, region-profile seeding, kmer/BPM filtering, affine-gap alignment,
//! and the paired-end controller.

pub mod alphabet;
pub mod arena;
pub mod error;
pub mod index;
pub mod pattern;

pub mod seeding;
pub mod verify;

pub mod align;
pub mod paired;

pub mod gpu;
pub mod io;

pub mod cli;
pub mod search;
pub mod worker;
