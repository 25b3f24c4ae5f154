//! Binary entry point: CLI dispatch, archive load, pipeline wiring, and exit
//! code mapping (spec §6/§7).
//!
//! Grounded on the teacher's `main` in `main.rs` (`Args::parse()`, a thread
//! pool built from the parsed thread count, then one top-level call into the
//! library) generalized to this core's two subcommands and its exit-code
//! contract, which the teacher — a single always-success batch tool — never
//! needed.

use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::bounded;

use readmap::align::scoring::AffineScoring;
use readmap::alphabet::{decode_text, Symbol};
use readmap::arena::Arena;
use readmap::cli::{Cli, Command, MapArgs, Orientation as CliOrientation};
use readmap::error::{exit_code, CoreError};
use readmap::index::archive::Archive;
use readmap::index::fm_index::FmIndex;
use readmap::index::packed_text::PackedText;
use readmap::io::fastx::{ReadPair, ReadStream};
use readmap::io::sam::{self, flag, mapped_record, unmapped_record, MateInfo};
use readmap::paired::{
    run_paired, EndClassification, InsertSizeModel, MatchTrace, Orientation as PairedOrientation, Pair, PairedControllerParams,
    SearchOutcome,
};
use readmap::search::{search_end, EndMatch, SearchParams, SearchReport};
use readmap::worker::{render_record, run_pool, ReadBlock, SamLine, WorkerContext};

const BLOCK_SIZE: usize = 256;
const SLAB_BYTES: usize = 1 << 20;

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Index { reference, archive } => {
            log::error!("index building is out of this core's scope (reference={reference:?}, archive={archive:?})");
            Err(CoreError::Config("the `index` subcommand is not implemented by this core".to_string()))
        }
        Command::Map(args) => run_map(args),
    };

    match result {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Resources shared read-only across every worker for the lifetime of the
/// run (spec §5: "FM-index, archive text, reference locator: read-only after
/// load; shared by all workers without locking").
struct ReferenceData {
    index: FmIndex,
    text: PackedText,
    /// Fully decoded once at load time so `paired::run_paired`'s shortcut and
    /// recovery extension alignments (spec §4.12) can index an insert window
    /// directly, rather than decoding from `text` on every read pair.
    full_text: Vec<Symbol>,
}

fn run_map(args: MapArgs) -> Result<(), CoreError> {
    let mut archive_file = File::open(&args.archive).map_err(|source| CoreError::Io { path: args.archive.clone(), source })?;
    let index = Archive::load(&mut archive_file)?;

    let text_path = sibling_text_path(&args.archive);
    let text_bytes = std::fs::read(&text_path).map_err(|source| CoreError::Io { path: text_path.clone(), source })?;
    let text = PackedText::from_bytes(&text_bytes);
    let full_text = text.to_symbols();

    let reference = Arc::new(ReferenceData { index, text, full_text });

    let input_paths: Vec<&std::path::Path> = args.input.iter().map(|p| p.as_path()).collect();
    let stream = ReadStream::open(&input_paths, args.interleaved)?;

    let output_file = File::create(&args.output).map_err(|source| CoreError::Io { path: args.output.clone(), source })?;
    let writer = BufWriter::new(output_file);

    let mut header = Vec::new();
    sam::write_header(&mut header, "reference", reference.index.length() as u64)
        .map_err(|source| CoreError::Io { path: args.output.clone(), source })?;

    let (work_tx, work_rx) = bounded::<ReadBlock>(4);

    let params = Arc::new(args);
    let reference_for_worker = Arc::clone(&reference);
    let params_for_worker = Arc::clone(&params);

    let writer_thread = std::thread::spawn(move || {
        run_pool(params_for_worker.threads, SLAB_BYTES, work_rx, writer, &header, move |block, ctx| {
            search_block(block, &reference_for_worker, &params_for_worker, ctx)
        })
    });

    let mut block_number = 0u64;
    let mut current_block = Vec::with_capacity(BLOCK_SIZE);
    for record in stream {
        let pair = record?;
        current_block.push(pair);
        if current_block.len() == BLOCK_SIZE {
            send_block(&work_tx, &mut block_number, &mut current_block);
        }
    }
    if !current_block.is_empty() {
        send_block(&work_tx, &mut block_number, &mut current_block);
    }
    drop(work_tx);

    writer_thread.join().map_err(|_| CoreError::Invariant("worker pool thread panicked".to_string()))??;
    Ok(())
}

fn sibling_text_path(archive_path: &std::path::Path) -> std::path::PathBuf {
    let mut path = archive_path.to_path_buf();
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".txt");
    path.set_file_name(name);
    path
}

fn send_block(work_tx: &crossbeam_channel::Sender<ReadBlock>, block_number: &mut u64, reads: &mut Vec<ReadPair>) {
    let block = ReadBlock { block_number: *block_number, reads: std::mem::take(reads) };
    *block_number += 1;
    let _ = work_tx.send(block);
}

fn search_params(args: &MapArgs) -> SearchParams {
    SearchParams {
        error_fraction: args.error_fraction(),
        bandwidth_fraction: args.bandwidth_fraction(),
        min_identity: args.min_identity,
        max_candidates: 2000,
        max_matches: 1,
        left_gap_alignment: args.left_gap_alignment,
    }
}

/// Runs the search pipeline (spec §2 "Data flow") for every read in `block`,
/// producing one rendered SAM line per read. Pairs with a second end are
/// routed through the paired-end controller (spec §4.12); single-end reads
/// go through the plain single-end pipeline. `ctx`'s arena backs every
/// candidate's text-window scratch for the whole block (spec §5: "per-thread
/// arena... exclusively owned by one worker for the duration of one read").
fn search_block(block: &ReadBlock, reference: &ReferenceData, args: &MapArgs, ctx: &mut WorkerContext) -> Vec<SamLine> {
    let scoring = AffineScoring::default();
    let params = search_params(args);
    let mut lines = Vec::with_capacity(block.reads.len() * 2);

    for pair in &block.reads {
        match &pair.end2 {
            Some(_) => lines.extend(render_pair(pair, reference, &scoring, &params, args, &mut ctx.arena)),
            None => lines.push(render_end(&pair.end1.id, &pair.end1.sequence, reference, &scoring, &params, &mut ctx.arena)),
        }
    }

    lines
}

/// Aligns and renders one unpaired read directly into a SAM line. All
/// borrowed data (`trace`, `seq`) is kept alive for the duration of the
/// `write_record` call; nothing here needs to outlive this function.
fn render_end(id: &str, key: &[Symbol], reference: &ReferenceData, scoring: &AffineScoring, params: &SearchParams, arena: &mut Arena) -> SamLine {
    let seq = decode_seq(key);
    let report = search_end(key, &reference.index, &reference.text, scoring, params, arena);
    match best_match(report.matches) {
        Some(alignment) => {
            let trace = MatchTrace {
                text_position: alignment.text_position,
                cigar: alignment.cigar,
                score: alignment.score,
                reverse_strand: false,
                edit_distance: alignment.edit_distance,
            };
            let rec = mapped_record(id, &trace, "reference", &seq, "*", 60, 0, None, 0);
            render_record(&rec)
        }
        None => {
            let rec = unmapped_record(id, "reference", &seq, "*", "no_candidates", 0, None);
            render_record(&rec)
        }
    }
}

/// Runs `paired::run_paired` for one read pair and renders both ends' SAM
/// lines from its result (spec §4.12; spec §6 "paired-end is two parallel
/// streams or interleaved"). When the controller reports no pair within the
/// insert window, each end is still rendered from its own best outcome, with
/// mate fields filled in from the other end when it mapped.
fn render_pair(pair: &ReadPair, reference: &ReferenceData, scoring: &AffineScoring, params: &SearchParams, args: &MapArgs, arena: &mut Arena) -> Vec<SamLine> {
    let end2 = pair.end2.as_ref().expect("render_pair is only called when end2 is present");
    let key1 = &pair.end1.sequence;
    let key2 = &end2.sequence;
    let seq1 = decode_seq(key1);
    let seq2 = decode_seq(key2);

    let insert_model = insert_size_model(args);
    let controller_params = PairedControllerParams { min_identity: args.min_identity, ..PairedControllerParams::default() };

    let result = run_paired(key1, key2, &reference.full_text, &insert_model, &controller_params, scoring, |_end_index, key| {
        outcome_from_report(search_end(key, &reference.index, &reference.text, scoring, params, arena))
    });

    let base1 = flag::PAIRED | flag::FIRST_IN_PAIR;
    let base2 = flag::PAIRED | flag::SECOND_IN_PAIR;

    match best_pair(&result.pairs, &args.orientations) {
        Some(p) => {
            let proper_bit = if matches_requested_orientation(p.orientation, &args.orientations) { flag::PROPER_PAIR } else { 0 };
            let tlen1 = if p.end1.text_position <= p.end2.text_position { p.template_length } else { -p.template_length };
            let mate1 = MateInfo { pos_1based: p.end2.text_position + 1, reverse: p.end2.reverse_strand };
            let mate2 = MateInfo { pos_1based: p.end1.text_position + 1, reverse: p.end1.reverse_strand };
            let rec1 = mapped_record(&pair.end1.id, &p.end1, "reference", &seq1, "*", 60, base1 | proper_bit, Some(&mate1), tlen1);
            let rec2 = mapped_record(&end2.id, &p.end2, "reference", &seq2, "*", 60, base2 | proper_bit, Some(&mate2), -tlen1);
            vec![render_record(&rec1), render_record(&rec2)]
        }
        None => {
            let best1 = best_trace(&result.end1_outcome);
            let best2 = best_trace(&result.end2_outcome);
            vec![
                render_single_from_outcome(&pair.end1.id, best1, best2, &seq1, base1),
                render_single_from_outcome(&end2.id, best2, best1, &seq2, base2),
            ]
        }
    }
}

/// Renders one end of a pair that the controller could not place into a
/// concordant pair, using `own`'s best trace if it has one and filling mate
/// fields in from `other`'s best trace when available.
fn render_single_from_outcome(id: &str, own: Option<&MatchTrace>, other: Option<&MatchTrace>, seq: &str, pair_flags_base: u16) -> SamLine {
    let mate = other.map(|o| MateInfo { pos_1based: o.text_position + 1, reverse: o.reverse_strand });
    match own {
        Some(trace) => {
            let rec = mapped_record(id, trace, "reference", seq, "*", 60, pair_flags_base, mate.as_ref(), 0);
            render_record(&rec)
        }
        None => {
            let rec = unmapped_record(id, "reference", seq, "*", "no_candidates", pair_flags_base, mate.as_ref());
            render_record(&rec)
        }
    }
}

fn best_trace(outcome: &SearchOutcome) -> Option<&MatchTrace> {
    outcome.matches.iter().max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
}

/// Picks the best-scoring pair, preferring one whose orientation was
/// requested via `--orientations` (spec §6 CLI flags) over one that wasn't.
fn best_pair<'a>(pairs: &'a [Pair], orientations: &[CliOrientation]) -> Option<&'a Pair> {
    let by_score = |a: &&Pair, b: &&Pair| (a.end1.score + a.end2.score).partial_cmp(&(b.end1.score + b.end2.score)).unwrap_or(std::cmp::Ordering::Equal);
    pairs
        .iter()
        .filter(|p| matches_requested_orientation(p.orientation, orientations))
        .max_by(by_score)
        .or_else(|| pairs.iter().max_by(by_score))
}

fn matches_requested_orientation(orientation: PairedOrientation, requested: &[CliOrientation]) -> bool {
    requested.iter().any(|o| paired_orientation(*o) == orientation)
}

fn paired_orientation(o: CliOrientation) -> PairedOrientation {
    match o {
        CliOrientation::Fr => PairedOrientation::Fr,
        CliOrientation::Rf => PairedOrientation::Rf,
        CliOrientation::Ff => PairedOrientation::Ff,
    }
}

/// Builds the template-length model `run_paired` gates shortcut extension
/// and pair-window search on (spec §4.12), from `--pe-min`/`--pe-max` when
/// both are given. Without them, a wide, unconverged default still lets
/// `find_pairs`/recovery run, just without the shortcut-extension fast path.
fn insert_size_model(args: &MapArgs) -> InsertSizeModel {
    match (args.pe_min, args.pe_max) {
        (Some(lo), Some(hi)) => {
            let lo = lo as f64;
            let hi = hi as f64;
            let mean = (lo + hi) / 2.0;
            let half_width = ((hi - lo) / 2.0).max(1.0);
            let stddev = (half_width / PairedControllerParams::default().confidence_widths).max(1.0);
            InsertSizeModel { mean, stddev, converged: true }
        }
        _ => InsertSizeModel { mean: 500.0, stddev: 200.0, converged: false },
    }
}

fn outcome_from_report(report: SearchReport) -> SearchOutcome {
    let matches: Vec<MatchTrace> = report
        .matches
        .iter()
        .map(|m| MatchTrace { text_position: m.text_position, cigar: m.cigar.clone(), score: m.score, reverse_strand: false, edit_distance: m.edit_distance })
        .collect();
    if matches.is_empty() {
        return SearchOutcome { matches, classification: EndClassification::Unmapped, confidence: 0.0 };
    }
    let best_score = matches.iter().map(|m| m.score).fold(f64::MIN, f64::max);
    let tied_at_best = matches.iter().filter(|m| (m.score - best_score).abs() < 1e-9).count();
    let (classification, confidence) = if matches.len() == 1 {
        (EndClassification::Unique, 1.0)
    } else if tied_at_best >= 2 {
        (EndClassification::Tied, 0.5)
    } else {
        (EndClassification::Multi, 0.3)
    };
    SearchOutcome { matches, classification, confidence }
}

fn best_match(matches: Vec<EndMatch>) -> Option<EndMatch> {
    matches.into_iter().fold(None, |best, candidate| match &best {
        Some(current) if current.score >= candidate.score => best,
        _ => Some(candidate),
    })
}

fn decode_seq(seq: &[Symbol]) -> String {
    String::from_utf8(decode_text(seq)).expect("decoded bases are always ASCII")
}
