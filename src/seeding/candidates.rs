//! Candidate generation: decodes region-profile BWT intervals into genome
//! positions and turns them into deduplicated filtering regions (spec §4.7).
//!
//! Grounded on `find_greedy_non_overlapping_segments`/`align_with_anchors` in
//! the teacher's `linked_alignment.rs`, which decodes a `SuffixTableLookup`
//! into candidate text windows the same way; this module generalizes that
//! shape from the teacher's ad-hoc suffix table to this core's sampled-SA
//! `locate` and its `key_source_offset`/`max_bandwidth` clamped-window
//! arithmetic.

use crate::index::fm_index::FmIndex;
use crate::seeding::region_profile::{Region, RegionType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateStatus {
    Pending,
    Accepted,
    VerifiedDiscarded,
}

/// One region-profile hit retained as scaffold provenance: the exact match of
/// `key[key_begin..key_end]` against `text[text_begin..text_end]` that the
/// FM-index backward search already guarantees, before any candidate-window
/// padding is applied. `search_end` filters these down to the seeds that fall
/// inside a given sub-window and chains them into `align::scaffold::Anchor`s.
#[derive(Clone, Copy, Debug)]
pub struct SeedHit {
    pub key_begin: usize,
    pub key_end: usize,
    pub text_begin: usize,
    pub text_end: usize,
}

#[derive(Clone, Debug)]
pub struct FilteringRegion {
    pub text_begin: usize,
    pub text_end: usize,
    /// Trim applied to the key when `text_end - text_begin < key_length`.
    pub key_trim_begin: usize,
    pub key_trim_end: usize,
    pub status: CandidateStatus,
    /// Exact region-profile hits whose padded window was merged into this
    /// candidate, in the order they were located.
    pub seeds: Vec<SeedHit>,
}

/// For every region of type `Unique`/`Standard`, decodes each row in
/// `[lo, hi)` via `locate` and emits a clamped, bandwidth-padded text window.
/// Overlapping windows are merged (deduplicated) by sorting and coalescing.
pub fn generate_candidates(
    regions: &[Region],
    index: &FmIndex,
    key_length: usize,
    max_bandwidth: u32,
    max_candidates: usize,
) -> (Vec<FilteringRegion>, bool) {
    let mut windows: Vec<(usize, usize, usize, usize, SeedHit)> = Vec::new(); // (tb, te, trim_begin, trim_end, seed)
    let mut candidates_limited = false;
    let text_length = index.length();

    'regions: for region in regions {
        if region.region_type == RegionType::Gap {
            continue;
        }
        let mut positions = Vec::new();
        index.locate_interval(region.lo, region.hi, &mut positions);
        // A region the profiler had to escalate past its first qualifying
        // cut (`degree > 0`) carries more positional uncertainty than one
        // accepted outright, so its candidate window is padded wider in
        // proportion to the escalation steps taken.
        let region_bandwidth = max_bandwidth + region.degree;
        for t in positions {
            if windows.len() >= max_candidates {
                candidates_limited = true;
                break 'regions;
            }
            let key_source_offset = region.begin;
            let t = t as i64;
            let lo_bound = t - key_source_offset as i64 - region_bandwidth as i64;
            let hi_bound = t - key_source_offset as i64 + key_length as i64 + region_bandwidth as i64;
            let tb = lo_bound.max(0) as usize;
            let te = (hi_bound.max(0) as usize).min(text_length);
            if tb >= te {
                continue;
            }
            let trim_begin = if te - tb < key_length { region.begin } else { 0 };
            let trim_end = if te - tb < key_length { key_length - region.end } else { 0 };
            let seed = SeedHit {
                key_begin: region.begin,
                key_end: region.end,
                text_begin: t as usize,
                text_end: t as usize + region.len(),
            };
            windows.push((tb, te, trim_begin, trim_end, seed));
        }
    }

    windows.sort_unstable_by_key(|&(tb, te, _, _, _)| (tb, te));
    let mut merged: Vec<(usize, usize, usize, usize, Vec<SeedHit>)> = Vec::new();
    for w in windows {
        if let Some(last) = merged.last_mut() {
            if w.0 <= last.1 {
                last.1 = last.1.max(w.1);
                last.4.push(w.4);
                continue;
            }
        }
        merged.push((w.0, w.1, w.2, w.3, vec![w.4]));
    }

    let regions_out = merged
        .into_iter()
        .map(|(tb, te, trim_begin, trim_end, seeds)| FilteringRegion {
            text_begin: tb,
            text_end: te,
            key_trim_begin: trim_begin,
            key_trim_end: trim_end,
            status: CandidateStatus::Pending,
            seeds,
        })
        .collect();

    (regions_out, candidates_limited)
}
