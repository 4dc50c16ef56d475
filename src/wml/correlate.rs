//! Drive the generic LCS kernel over a WML token stream and apply the
//! paragraph-level post-processing the word engine needs on top of it.

use std::collections::HashSet;

use crate::diff::{self, LcsSettings, Segment, SegmentStatus};
use crate::wml::token::Token;

pub fn correlate(old: &[Token], new: &[Token], detail_threshold: f64, match_threshold: f64) -> Vec<Segment> {
    let settings = LcsSettings {
        min_match_length: 1,
        detail_threshold,
    };
    let segments = diff::diff(old, new, &settings, &|t: &Token| t.is_anchor_skippable());
    apply_paragraph_similarity_threshold(segments, old, new, match_threshold)
}

/// Group the flat segment list into paragraph-aligned windows (bucketed by
/// the old-side paragraph a segment belongs to) and, for any window that
/// mixes Equal with Deleted/Inserted content, collapse the whole window to
/// a plain delete+insert pair when the two sides' word-level Jaccard
/// similarity falls below `match_threshold`. This avoids confusing inline
/// edits for paragraphs that were effectively rewritten rather than
/// lightly edited.
fn apply_paragraph_similarity_threshold(
    segments: Vec<Segment>,
    old: &[Token],
    new: &[Token],
    match_threshold: f64,
) -> Vec<Segment> {
    let mut windows: Vec<Vec<Segment>> = Vec::new();
    let mut last_para: Option<usize> = None;

    for seg in segments {
        let seg_para = old
            .get(seg.items1.start)
            .map(|t| t.para_index)
            .or_else(|| old.get(seg.items1.start.saturating_sub(1)).map(|t| t.para_index))
            .or(last_para);

        let start_new_window = match (seg_para, last_para) {
            (Some(p), Some(last)) => p != last,
            _ => windows.is_empty(),
        };

        if start_new_window || windows.is_empty() {
            windows.push(Vec::new());
        }
        if let Some(p) = seg_para {
            last_para = Some(p);
        }
        windows.last_mut().unwrap().push(seg);
    }

    let mut out = Vec::new();
    for window in windows {
        if window_is_mixed(&window) {
            let similarity = word_jaccard_similarity(&window, old, new);
            if similarity < match_threshold {
                out.extend(collapse_window(&window));
                continue;
            }
        }
        out.extend(window);
    }
    out
}

fn window_is_mixed(window: &[Segment]) -> bool {
    let has_equal = window.iter().any(|s| s.status == SegmentStatus::Equal);
    let has_edit = window
        .iter()
        .any(|s| s.status == SegmentStatus::Deleted || s.status == SegmentStatus::Inserted);
    has_equal && has_edit
}

fn word_jaccard_similarity(window: &[Segment], old: &[Token], new: &[Token]) -> f64 {
    let mut old_words: HashSet<&str> = HashSet::new();
    let mut new_words: HashSet<&str> = HashSet::new();

    for seg in window {
        for t in &old[seg.items1.clone()] {
            if matches!(t.kind, crate::wml::token::TokenKind::Word) && !t.text.trim().is_empty() {
                old_words.insert(t.hash.as_str());
            }
        }
        for t in &new[seg.items2.clone()] {
            if matches!(t.kind, crate::wml::token::TokenKind::Word) && !t.text.trim().is_empty() {
                new_words.insert(t.hash.as_str());
            }
        }
    }

    if old_words.is_empty() && new_words.is_empty() {
        return 1.0;
    }
    let intersection = old_words.intersection(&new_words).count();
    let union = old_words.union(&new_words).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

fn collapse_window(window: &[Segment]) -> Vec<Segment> {
    let old_start = window.iter().map(|s| s.items1.start).min().unwrap_or(0);
    let old_end = window.iter().map(|s| s.items1.end).max().unwrap_or(0);
    let new_start = window.iter().map(|s| s.items2.start).min().unwrap_or(0);
    let new_end = window.iter().map(|s| s.items2.end).max().unwrap_or(0);

    let mut out = Vec::new();
    if old_end > old_start {
        out.push(Segment {
            status: SegmentStatus::Deleted,
            items1: old_start..old_end,
            items2: new_start..new_start,
        });
    }
    if new_end > new_start {
        out.push(Segment {
            status: SegmentStatus::Inserted,
            items1: old_end..old_end,
            items2: new_start..new_end,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wml::token::Context;

    fn word(text: &str, para: usize) -> Token {
        Token::word(text.to_string(), para, None, &Context::default())
    }

    fn pmark(para: usize) -> Token {
        Token::paragraph_mark(para, None, &Context::default())
    }

    #[test]
    fn lightly_edited_paragraph_keeps_inline_diff() {
        let old = vec![word("the", 0), word("quick", 0), word("fox", 0), pmark(0)];
        let new = vec![word("the", 0), word("quick", 0), word("dog", 0), pmark(0)];
        let segs = correlate(&old, &new, 0.0, 0.4);
        assert!(segs.iter().any(|s| s.status == SegmentStatus::Equal));
        assert!(segs.iter().any(|s| s.status == SegmentStatus::Deleted));
        assert!(segs.iter().any(|s| s.status == SegmentStatus::Inserted));
    }

    #[test]
    fn heavily_rewritten_paragraph_collapses_to_whole_replace() {
        let old = vec![word("alpha", 0), word("beta", 0), pmark(0)];
        let new = vec![word("gamma", 0), word("delta", 0), word("epsilon", 0), pmark(0)];
        let segs = correlate(&old, &new, 0.0, 0.4);
        assert!(!segs.iter().any(|s| s.status == SegmentStatus::Equal && s.items1.len() > 1));
    }
}
