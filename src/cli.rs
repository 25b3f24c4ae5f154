//! Command-line surface (spec §6 "CLI"): `index` (offline archive build, out
//! of core scope) and `map` (run the search core).
//!
//! Grounded on the teacher's `Args` struct in `main.rs` — a flat `clap`
//! derive struct parsed once in `main` — generalized to `clap`'s `Subcommand`
//! derive since this core exposes two distinct commands instead of the
//! teacher's single implicit one.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "Approximate-string-matching core of a short-read aligner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an archive from a reference FASTA. Out of this core's scope;
    /// kept as a CLI-recognized stub so `readmap index` fails with a usage
    /// diagnostic rather than "unknown command".
    Index {
        #[arg(short = 'i', long)]
        reference: PathBuf,
        #[arg(short = 'o', long)]
        archive: PathBuf,
    },
    /// Map reads against a prebuilt archive.
    Map(MapArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Orientation {
    Fr,
    Rf,
    Ff,
}

#[derive(Parser, Debug)]
pub struct MapArgs {
    /// Archive path.
    #[arg(short = 'I', long = "archive")]
    pub archive: PathBuf,

    /// Input reads: one path for single-end, or two comma-separated paths
    /// for paired-end with two physical streams.
    #[arg(short = 'i', long = "input", value_delimiter = ',')]
    pub input: Vec<PathBuf>,

    /// Treat a single `-i` input as interleaved paired-end.
    #[arg(long, default_value_t = false)]
    pub interleaved: bool,

    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Max effective edit distance. Defaults to `0.04 * read_length`,
    /// applied per-read once the read length is known.
    #[arg(short = 'e', long = "max-error")]
    pub max_error_fraction: Option<f64>,

    /// SWG bandwidth. Defaults to `0.2 * read_length`.
    #[arg(short = 's', long = "max-bandwidth")]
    pub max_bandwidth_fraction: Option<f64>,

    #[arg(long = "min-identity", default_value_t = 0.80)]
    pub min_identity: f64,

    #[arg(long = "gpu", default_value = "off")]
    pub gpu: String,

    #[arg(long = "pe-min")]
    pub pe_min: Option<u32>,

    #[arg(long = "pe-max")]
    pub pe_max: Option<u32>,

    #[arg(long = "orientations", value_delimiter = ',', default_values_t = vec![Orientation::Fr])]
    pub orientations: Vec<Orientation>,

    #[arg(long = "left-gap-alignment", default_value_t = true)]
    pub left_gap_alignment: bool,
}

impl MapArgs {
    pub fn error_fraction(&self) -> f64 {
        self.max_error_fraction.unwrap_or(0.04)
    }

    pub fn bandwidth_fraction(&self) -> f64 {
        self.max_bandwidth_fraction.unwrap_or(0.2)
    }

    pub fn gpu_enabled(&self) -> bool {
        self.gpu.eq_ignore_ascii_case("on")
    }
}
