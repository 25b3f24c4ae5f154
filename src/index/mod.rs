//! FM-index data structures: packed text, BWT/rank, rank memoization table,
//! sampled suffix array, the facade tying them together, and the on-disk
//! archive format (spec §3, §4.2-§4.5, §6).

pub mod archive;
pub mod bwt;
pub mod fm_index;
pub mod packed_text;
pub mod rank_table;
pub mod sampled_sa;

pub use fm_index::FmIndex;
