//! Single-end search pipeline: region profile → candidate generation →
//! k-mer prefilter → BPM verification → SWG refinement → CIGAR curation
//! (spec §2 "Data flow"). Shared by the `map` binary and this crate's own
//! integration tests so both exercise the identical pipeline.
//!
//! A single candidate window from [`crate::seeding::candidates`] can span
//! several true occurrences once overlapping per-position windows have been
//! coalesced (e.g. a tandem repeat shorter than the bandwidth padding); the
//! banded aligner in [`crate::align::swg`] only reaches diagonals near the
//! window's own start, so one `align()` call per merged window would find at
//! most the occurrence nearest that start. This module re-splits a merged
//! window into fixed-size, band-width-sized sub-windows stepped finely
//! enough across its span that every occurrence lands within reach of at
//! least one sub-window's own diagonal, then dedupes the results by final
//! text position.

use crate::align::cigar::{curate, recompute_stats, CigarOp};
use crate::align::scaffold::{align_scaffolded, Anchor, AnchorType, ScaffoldParams};
use crate::align::scoring::AffineScoring;
use crate::align::swg::{align, AlignMode};
use crate::alphabet::Symbol;
use crate::arena::Arena;
use crate::index::fm_index::FmIndex;
use crate::index::packed_text::PackedText;
use crate::pattern::Pattern;
use crate::seeding::candidates::{generate_candidates, SeedHit};
use crate::seeding::region_profile::{build_adaptive, RegionProfileModel};
use crate::verify::bpm::{sum_tile_distances, verify_tiled};

pub struct SearchParams {
    pub error_fraction: f64,
    pub bandwidth_fraction: f64,
    pub min_identity: f64,
    pub max_candidates: usize,
    pub max_matches: usize,
    pub left_gap_alignment: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            error_fraction: 0.04,
            bandwidth_fraction: 0.2,
            min_identity: 0.80,
            max_candidates: 2000,
            max_matches: 10,
            left_gap_alignment: true,
        }
    }
}

/// One accepted placement of a read against the reference.
pub struct EndMatch {
    pub text_position: u64,
    pub cigar: Vec<CigarOp>,
    pub edit_distance: u32,
    pub score: f64,
}

pub struct SearchReport {
    pub matches: Vec<EndMatch>,
    /// Set when candidate generation hit `max_candidates` before exhausting
    /// every region hit (spec §8 scenario 6).
    pub candidates_limited: bool,
}

/// Chains a candidate window's exact region-profile seeds into a
/// non-overlapping, monotonically-ordered list of [`Anchor`]s local to that
/// window, dropping any seed that would overlap or regress the chain built
/// so far (a later, conflicting occurrence inside a merged tandem-repeat
/// window). Seeds only partially inside `[window_begin, window_end)` are
/// dropped rather than clipped, since a clipped seed is no longer the exact
/// FM-index-guaranteed match `align_scaffolded`'s `Exact` anchors require.
fn build_anchors(seeds: &[SeedHit], window_begin: usize, window_end: usize) -> Vec<Anchor> {
    let mut local: Vec<(usize, usize, usize, usize)> = seeds
        .iter()
        .filter(|s| s.text_begin >= window_begin && s.text_end <= window_end)
        .map(|s| (s.key_begin, s.key_end, s.text_begin - window_begin, s.text_end - window_begin))
        .collect();
    local.sort_unstable_by_key(|&(key_begin, _, text_begin, _)| (key_begin, text_begin));

    let mut anchors = Vec::new();
    let mut key_cursor = 0usize;
    let mut text_cursor = 0usize;
    for (key_begin, key_end, text_begin, text_end) in local {
        if key_begin < key_cursor || text_begin < text_cursor {
            continue;
        }
        anchors.push(Anchor { key_begin, key_end, text_begin, text_end, anchor_type: AnchorType::Exact, anchor_error: 0 });
        key_cursor = key_end;
        text_cursor = text_end;
    }
    anchors
}

/// Runs the full pipeline for one read against `index`/`text`, returning up
/// to `params.max_matches` best-scoring distinct placements in ascending
/// text-position order. `arena` backs every candidate's text-window scratch
/// buffer; callers push/pop it once per block via [`crate::worker::WorkerContext`]
/// and this function pushes/pops its own mark once per sub-window on top of
/// that, so scratch from one sub-window never survives into the next.
pub fn search_end(key: &[Symbol], index: &FmIndex, text: &PackedText, scoring: &AffineScoring, params: &SearchParams, arena: &mut Arena) -> SearchReport {
    if key.is_empty() {
        return SearchReport { matches: Vec::new(), candidates_limited: false };
    }
    let pattern = Pattern::compile_symbols(key.to_vec(), params.error_fraction, params.bandwidth_fraction);
    if pattern.is_unsearchable() {
        return SearchReport { matches: Vec::new(), candidates_limited: false };
    }

    let model = RegionProfileModel::default();
    let regions = build_adaptive(pattern.key(), index, &model, 100, true);
    let (candidates, candidates_limited) =
        generate_candidates(&regions, index, pattern.len(), pattern.max_bandwidth(), params.max_candidates);

    // Stepping by more than `bandwidth` could leave a true occurrence more
    // than `bandwidth` columns from every sub-window's own diagonal origin,
    // which the banded aligner below could never reach; stepping by
    // `bandwidth` guarantees every reference position falls within reach of
    // at least one sub-window.
    let bandwidth = pattern.max_bandwidth() as usize;
    let sub_window_len = pattern.len() + 2 * bandwidth;
    let step = bandwidth.max(1);

    let mut best_by_position: std::collections::BTreeMap<u64, EndMatch> = std::collections::BTreeMap::new();

    for candidate in &candidates {
        if candidate.text_end > text.len() {
            continue;
        }
        let mut start = 0usize;
        loop {
            let window_begin = candidate.text_begin + start;
            let window_end = (window_begin + sub_window_len).min(candidate.text_end);
            if window_begin >= window_end {
                break;
            }
            let owned_window = text.slice(window_begin, window_end);
            let mark = arena.push();
            let text_window = arena.alloc_symbols(&owned_window);

            let passes_kmer = pattern.kmer_filter().map(|f| f.passes(text_window)).unwrap_or(true);
            if passes_kmer {
                let records = verify_tiled(pattern.tiles(), text_window, pattern.max_effective_error());
                if sum_tile_distances(&records) <= pattern.max_effective_error() {
                    let anchors = build_anchors(&candidate.seeds, window_begin, window_end);
                    let result = if anchors.is_empty() {
                        align(pattern.key(), text_window, scoring, AlignMode::FreeBoth, pattern.max_bandwidth())
                    } else {
                        align_scaffolded(
                            pattern.key(),
                            text_window,
                            &anchors,
                            scoring,
                            pattern.max_bandwidth(),
                            &ScaffoldParams::default(),
                        )
                    };
                    let curated = curate(&result.cigar, params.left_gap_alignment);
                    let stats = recompute_stats(&curated, scoring);

                    if (stats.matching_bases as f64) >= params.min_identity * pattern.effective_key_length() as f64 {
                        let text_position = (window_begin + result.key_clip_begin) as u64;
                        let candidate_match = EndMatch { text_position, cigar: curated, edit_distance: stats.edit_distance, score: stats.score };
                        match best_by_position.get(&text_position) {
                            Some(existing) if existing.score >= candidate_match.score => {}
                            _ => {
                                best_by_position.insert(text_position, candidate_match);
                            }
                        }
                    }
                }
            }
            arena.pop(mark);

            if window_end >= candidate.text_end {
                break;
            }
            start += step;
        }
    }

    let mut matches: Vec<EndMatch> = best_by_position.into_values().collect();
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(params.max_matches);
    matches.sort_by_key(|m| m.text_position);

    SearchReport { matches, candidates_limited }
}
