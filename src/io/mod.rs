//! Input/output: FASTA/FASTQ record streams and SAM record writing
//! (spec §6 "External interfaces").

pub mod fastx;
pub mod sam;
