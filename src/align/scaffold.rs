//! Scaffolded alignment: chains SWG across the gaps between ordered anchor
//! regions, bridging gaps whose local score is too low with a synthetic
//! deletion+insertion pair or a trim (spec §4.10 "Scaffolded alignment").
//!
//! Grounded on `align_with_anchors`/`align_string_with_anchors` in the
//! teacher's `linked_alignment.rs`, which walks the same kind of ordered
//! anchor list and fills the gaps between them with full alignment calls;
//! this module replaces the teacher's `find_greedy_non_overlapping_segments`
//! suffix-table anchors with this core's region-profile-derived ones and its
//! WFA-backed gap fill with the local `swg::align`.

use crate::align::cigar::CigarOp;
use crate::align::scoring::AffineScoring;
use crate::align::swg::{align, AlignMode, SwgResult, SWG_SCORE_MIN};
use crate::alphabet::Symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorType {
    Exact,
    Approximate,
}

#[derive(Clone, Copy, Debug)]
pub struct Anchor {
    pub key_begin: usize,
    pub key_end: usize,
    pub text_begin: usize,
    pub text_end: usize,
    pub anchor_type: AnchorType,
    /// For `Approximate` anchors: the filtering-stage error estimate, used to
    /// pick a tight re-alignment bandwidth (`anchor_error + 1`).
    pub anchor_error: u32,
}

/// Per-gap score floor below which the gap is bridged instead of trusted.
pub struct ScaffoldParams {
    pub gap_threshold: f64,
    pub force_threshold: bool,
}

impl Default for ScaffoldParams {
    fn default() -> Self {
        ScaffoldParams { gap_threshold: SWG_SCORE_MIN, force_threshold: false }
    }
}

/// Aligns `key` against `text` by chaining SWG through `anchors` (assumed
/// sorted and non-overlapping in both key and text coordinates), filling the
/// head, each inter-anchor gap, and the tail.
pub fn align_scaffolded(
    key: &[Symbol],
    text: &[Symbol],
    anchors: &[Anchor],
    scoring: &AffineScoring,
    bandwidth: u32,
    params: &ScaffoldParams,
) -> SwgResult {
    let mut ops: Vec<CigarOp> = Vec::new();
    let mut total_score = 0.0f64;

    let mut key_cursor = 0usize;
    let mut text_cursor = 0usize;

    // Leading/trailing key clip, taken from the head/tail sub-alignments
    // exactly as a flat `align()` call over the whole span would report them;
    // 0 when there's no head (or tail) because the first (or last) anchor
    // already starts (or ends) at the sequence boundary.
    let mut key_clip_begin = 0usize;
    let mut key_clip_end = 0usize;

    // head: free-begin alignment up to the first anchor
    if let Some(first) = anchors.first() {
        if first.key_begin > 0 || first.text_begin > 0 {
            let head_key = &key[0..first.key_begin];
            let head_text = &text[0..first.text_begin];
            let head = align(head_key, head_text, scoring, AlignMode::FreeBegin, bandwidth);
            if head.score < params.gap_threshold && params.force_threshold {
                push_bridge_or_trim(&mut ops, head_key.len(), head_text.len(), true);
            } else {
                key_clip_begin = head.key_clip_begin;
                ops.extend(head.cigar);
                total_score += head.score;
            }
        }
    }

    for (idx, anchor) in anchors.iter().enumerate() {
        match anchor.anchor_type {
            AnchorType::Exact => {
                let len = (anchor.key_end - anchor.key_begin) as u32;
                ops.push(CigarOp::Match(len));
                total_score += scoring.score_match_run(len as usize);
            }
            AnchorType::Approximate => {
                let sub_key = &key[anchor.key_begin..anchor.key_end];
                let sub_text = &text[anchor.text_begin..anchor.text_end];
                let realigned = align(sub_key, sub_text, scoring, AlignMode::Global, anchor.anchor_error + 1);
                ops.extend(realigned.cigar);
                total_score += realigned.score;
            }
        }
        key_cursor = anchor.key_end;
        text_cursor = anchor.text_end;

        if let Some(next) = anchors.get(idx + 1) {
            let gap_key = &key[key_cursor..next.key_begin];
            let gap_text = &text[text_cursor..next.text_begin];
            if gap_key.is_empty() && gap_text.is_empty() {
                continue;
            }
            let gap = align(gap_key, gap_text, scoring, AlignMode::Global, bandwidth);
            if gap.score < params.gap_threshold {
                push_bridge_or_trim(&mut ops, gap_key.len(), gap_text.len(), false);
            } else {
                ops.extend(gap.cigar);
                total_score += gap.score;
            }
        }
    }

    // tail: free-end alignment from the last anchor to the end of both sequences
    if key_cursor < key.len() || text_cursor < text.len() {
        let tail_key = &key[key_cursor..];
        let tail_text = &text[text_cursor..];
        let tail = align(tail_key, tail_text, scoring, AlignMode::FreeEnd, bandwidth);
        if tail.score < params.gap_threshold && params.force_threshold {
            push_bridge_or_trim(&mut ops, tail_key.len(), tail_text.len(), true);
        } else {
            key_clip_end = tail.key_clip_end;
            ops.extend(tail.cigar);
            total_score += tail.score;
        }
    }

    let merged = crate::align::cigar::merge_adjacent(&ops);
    SwgResult { cigar: merged, score: total_score, key_clip_begin, key_clip_end }
}

/// Bridges a low-scoring gap with a synthetic deletion (consuming the text
/// span) followed by an insertion (consuming the key span) — per spec
/// §4.10, "a synthetic deletion+insertion pair of the correct lengths (or a
/// trim, for head/tail when force_threshold is true in local mode)".
fn push_bridge_or_trim(ops: &mut Vec<CigarOp>, key_len: usize, text_len: usize, is_edge: bool) {
    if is_edge {
        if key_len > 0 {
            ops.push(CigarOp::Trim(key_len as u32));
        }
        if text_len > 0 {
            ops.push(CigarOp::Del(text_len as u32));
        }
        return;
    }
    if text_len > 0 {
        ops.push(CigarOp::Del(text_len as u32));
    }
    if key_len > 0 {
        ops.push(CigarOp::Ins(key_len as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::encode_text;

    #[test]
    fn single_exact_anchor_covering_whole_read() {
        let key = encode_text(b"ACGTACGT").unwrap();
        let text = encode_text(b"ACGTACGT").unwrap();
        let anchor = Anchor { key_begin: 0, key_end: 8, text_begin: 0, text_end: 8, anchor_type: AnchorType::Exact, anchor_error: 0 };
        let scoring = AffineScoring::default();
        let result = align_scaffolded(&key, &text, &[anchor], &scoring, 2, &ScaffoldParams::default());
        assert_eq!(result.cigar, vec![CigarOp::Match(8)]);
    }

    #[test]
    fn gap_between_two_anchors_is_filled() {
        let key = encode_text(b"ACGTTTACGT").unwrap();
        let text = encode_text(b"ACGTACGT").unwrap();
        let a1 = Anchor { key_begin: 0, key_end: 4, text_begin: 0, text_end: 4, anchor_type: AnchorType::Exact, anchor_error: 0 };
        let a2 = Anchor { key_begin: 6, key_end: 10, text_begin: 4, text_end: 8, anchor_type: AnchorType::Exact, anchor_error: 0 };
        let scoring = AffineScoring::default();
        let result = align_scaffolded(&key, &text, &[a1, a2], &scoring, 3, &ScaffoldParams::default());
        let total_key_len: u32 = result
            .cigar
            .iter()
            .map(|op| match op {
                CigarOp::Match(n) | CigarOp::Mismatch(n) | CigarOp::Ins(n) => *n,
                _ => 0,
            })
            .sum();
        assert_eq!(total_key_len, key.len() as u32);
    }
}
