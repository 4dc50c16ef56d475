//! Slide alignment (placeholder-exact, then LCS, then fuzzy similarity) and
//! per-matched-slide shape alignment (placeholder role+index, name+type,
//! name only, then fuzzy similarity — first method to match a pair wins).

use std::collections::HashSet;

use crate::diff::{self, Hashable, LcsSettings, SegmentStatus};
use crate::pml::signature::{ShapeSignature, SlideSignature};

impl Hashable for SlideSignature {
    fn hash(&self) -> &str {
        &self.hash
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    PlaceholderExact,
    Lcs,
    Fuzzy,
    /// Neither content-based pass found a match, but the slide sits at the
    /// same position on both sides — treated as "rewritten in place" rather
    /// than a delete+insert pair.
    Positional,
}

pub struct SlideMatch<'a> {
    pub old: &'a SlideSignature,
    pub new: &'a SlideSignature,
    pub method: MatchMethod,
    pub similarity: f64,
}

pub struct SlideAlignment<'a> {
    pub matched: Vec<SlideMatch<'a>>,
    pub deleted: Vec<&'a SlideSignature>,
    pub inserted: Vec<&'a SlideSignature>,
}

pub fn align_slides<'a>(old: &'a [SlideSignature], new: &'a [SlideSignature], use_lcs: bool, similarity_threshold: f64) -> SlideAlignment<'a> {
    let mut matched_old: HashSet<usize> = HashSet::new();
    let mut matched_new: HashSet<usize> = HashSet::new();
    let mut matches = Vec::new();

    // Pass 1: exact placeholder-role signature (same layout ref and same
    // ordered placeholder type/index list) among still-unmatched slides.
    for (i, o) in old.iter().enumerate() {
        for (j, n) in new.iter().enumerate() {
            if matched_old.contains(&i) || matched_new.contains(&j) {
                continue;
            }
            if o.layout_ref == n.layout_ref && placeholder_signature(o) == placeholder_signature(n) && !placeholder_signature(o).is_empty() {
                matched_old.insert(i);
                matched_new.insert(j);
                matches.push(SlideMatch {
                    old: o,
                    new: n,
                    method: MatchMethod::PlaceholderExact,
                    similarity: 1.0,
                });
                break;
            }
        }
    }

    // Pass 2: LCS over remaining slides' content hashes, preserving order.
    if use_lcs {
        let remaining_old: Vec<(usize, &SlideSignature)> = old.iter().enumerate().filter(|(i, _)| !matched_old.contains(i)).collect();
        let remaining_new: Vec<(usize, &SlideSignature)> = new.iter().enumerate().filter(|(j, _)| !matched_new.contains(j)).collect();

        let old_sigs: Vec<SlideSignature> = remaining_old.iter().map(|(_, s)| (*s).clone()).collect();
        let new_sigs: Vec<SlideSignature> = remaining_new.iter().map(|(_, s)| (*s).clone()).collect();
        let settings = LcsSettings {
            min_match_length: 1,
            detail_threshold: 0.0,
        };
        let segments = diff::diff(&old_sigs, &new_sigs, &settings, &|_: &SlideSignature| false);

        for seg in segments {
            if seg.status == SegmentStatus::Equal {
                for (a, b) in seg.items1.clone().zip(seg.items2.clone()) {
                    let (oi, o) = remaining_old[a];
                    let (nj, n) = remaining_new[b];
                    matched_old.insert(oi);
                    matched_new.insert(nj);
                    matches.push(SlideMatch {
                        old: o,
                        new: n,
                        method: MatchMethod::Lcs,
                        similarity: 1.0,
                    });
                }
            }
        }
    }

    // Pass 3: fuzzy similarity over whatever remains.
    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for (i, o) in old.iter().enumerate() {
            if matched_old.contains(&i) {
                continue;
            }
            for (j, n) in new.iter().enumerate() {
                if matched_new.contains(&j) {
                    continue;
                }
                let sim = slide_similarity(o, n);
                if sim >= similarity_threshold && best.map(|(_, _, b)| sim > b).unwrap_or(true) {
                    best = Some((i, j, sim));
                }
            }
        }
        match best {
            Some((i, j, sim)) => {
                matched_old.insert(i);
                matched_new.insert(j);
                matches.push(SlideMatch {
                    old: &old[i],
                    new: &new[j],
                    method: MatchMethod::Fuzzy,
                    similarity: sim,
                });
            }
            None => break,
        }
    }

    // Pass 4: anything left at the same position on both sides is the same
    // slide rewritten in place, not a deletion paired with an unrelated
    // insertion.
    for (i, o) in old.iter().enumerate() {
        if matched_old.contains(&i) {
            continue;
        }
        for (j, n) in new.iter().enumerate() {
            if matched_new.contains(&j) {
                continue;
            }
            if o.index == n.index {
                matched_old.insert(i);
                matched_new.insert(j);
                matches.push(SlideMatch {
                    old: o,
                    new: n,
                    method: MatchMethod::Positional,
                    similarity: slide_similarity(o, n),
                });
                break;
            }
        }
    }

    matches.sort_by_key(|m| m.new.index);

    let deleted = old.iter().enumerate().filter(|(i, _)| !matched_old.contains(i)).map(|(_, s)| s).collect();
    let inserted = new.iter().enumerate().filter(|(j, _)| !matched_new.contains(j)).map(|(_, s)| s).collect();

    SlideAlignment {
        matched: matches,
        deleted,
        inserted,
    }
}

fn placeholder_signature(slide: &SlideSignature) -> Vec<(String, String)> {
    slide
        .shapes
        .iter()
        .filter_map(|s| s.placeholder_type.clone().map(|t| (t, s.placeholder_idx.clone().unwrap_or_default())))
        .collect()
}

fn slide_similarity(old: &SlideSignature, new: &SlideSignature) -> f64 {
    jaccard(&old.text(), &new.text())
}

fn jaccard(a: &str, b: &str) -> f64 {
    let a_words: HashSet<&str> = a.split_whitespace().collect();
    let b_words: HashSet<&str> = b.split_whitespace().collect();
    if a_words.is_empty() && b_words.is_empty() {
        return 1.0;
    }
    let intersection = a_words.intersection(&b_words).count();
    let union = a_words.union(&b_words).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeMatchMethod {
    PlaceholderRoleAndIndex,
    NameAndType,
    NameOnly,
    Fuzzy,
}

pub struct ShapeMatch<'a> {
    pub old: &'a ShapeSignature,
    pub new: &'a ShapeSignature,
    pub method: ShapeMatchMethod,
}

pub struct ShapeAlignment<'a> {
    pub matched: Vec<ShapeMatch<'a>>,
    pub deleted: Vec<&'a ShapeSignature>,
    pub inserted: Vec<&'a ShapeSignature>,
}

pub fn align_shapes<'a>(old: &'a [ShapeSignature], new: &'a [ShapeSignature], shape_similarity_threshold: f64, enable_fuzzy: bool) -> ShapeAlignment<'a> {
    let mut matched_old: HashSet<usize> = HashSet::new();
    let mut matched_new: HashSet<usize> = HashSet::new();
    let mut matched = Vec::new();

    let passes: [fn(&ShapeSignature, &ShapeSignature) -> bool; 3] = [
        |o, n| o.placeholder_type.is_some() && o.placeholder_type == n.placeholder_type && o.placeholder_idx == n.placeholder_idx,
        |o, n| !o.name.is_empty() && o.name == n.name && o.kind == n.kind,
        |o, n| !o.name.is_empty() && o.name == n.name,
    ];
    let methods = [ShapeMatchMethod::PlaceholderRoleAndIndex, ShapeMatchMethod::NameAndType, ShapeMatchMethod::NameOnly];

    for (pass, method) in passes.iter().zip(methods.iter()) {
        for (i, o) in old.iter().enumerate() {
            if matched_old.contains(&i) {
                continue;
            }
            for (j, n) in new.iter().enumerate() {
                if matched_new.contains(&j) {
                    continue;
                }
                if pass(o, n) {
                    matched_old.insert(i);
                    matched_new.insert(j);
                    matched.push(ShapeMatch { old: o, new: n, method: *method });
                    break;
                }
            }
        }
    }

    if enable_fuzzy {
        loop {
            let mut best: Option<(usize, usize, f64)> = None;
            for (i, o) in old.iter().enumerate() {
                if matched_old.contains(&i) {
                    continue;
                }
                for (j, n) in new.iter().enumerate() {
                    if matched_new.contains(&j) {
                        continue;
                    }
                    let sim = jaccard(&o.text(), &n.text());
                    if sim >= shape_similarity_threshold && best.map(|(_, _, b)| sim > b).unwrap_or(true) {
                        best = Some((i, j, sim));
                    }
                }
            }
            match best {
                Some((i, j, _)) => {
                    matched_old.insert(i);
                    matched_new.insert(j);
                    matched.push(ShapeMatch {
                        old: &old[i],
                        new: &new[j],
                        method: ShapeMatchMethod::Fuzzy,
                    });
                }
                None => break,
            }
        }
    }

    let deleted = old.iter().enumerate().filter(|(i, _)| !matched_old.contains(i)).map(|(_, s)| s).collect();
    let inserted = new.iter().enumerate().filter(|(j, _)| !matched_new.contains(j)).map(|(_, s)| s).collect();

    ShapeAlignment { matched, deleted, inserted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pml::signature::{ShapeKind, ShapeSignature, SlideSignature, Transform};

    fn slide(index: usize, hash: &str) -> SlideSignature {
        SlideSignature {
            index,
            layout_ref: "layout1".to_string(),
            shapes: Vec::new(),
            notes_hash: String::new(),
            background_hash: String::new(),
            transition_hash: String::new(),
            hash: hash.to_string(),
        }
    }

    #[test]
    fn reordered_slides_match_via_lcs_not_fuzzy() {
        let old = vec![slide(0, "a"), slide(1, "b"), slide(2, "c")];
        let new = vec![slide(0, "a"), slide(1, "c"), slide(2, "b")];
        let alignment = align_slides(&old, &new, true, 0.5);
        assert_eq!(alignment.matched.len(), 3);
        assert!(alignment.deleted.is_empty());
        assert!(alignment.inserted.is_empty());
    }

    #[test]
    fn single_slide_with_unrelated_content_matches_by_position_not_delete_insert() {
        let old = vec![slide(0, "a")];
        let new = vec![slide(0, "z")];
        let alignment = align_slides(&old, &new, true, 0.5);
        assert_eq!(alignment.matched.len(), 1);
        assert_eq!(alignment.matched[0].method, MatchMethod::Positional);
        assert!(alignment.deleted.is_empty());
        assert!(alignment.inserted.is_empty());
    }

    fn shape(name: &str, kind: ShapeKind) -> ShapeSignature {
        ShapeSignature {
            id: "1".to_string(),
            name: name.to_string(),
            kind,
            placeholder_type: None,
            placeholder_idx: None,
            transform: Transform::default(),
            style_hash: String::new(),
            runs: Vec::new(),
            content_hash: String::new(),
            hash: String::new(),
        }
    }

    #[test]
    fn shapes_matched_by_name_and_type() {
        let old = vec![shape("Title 1", ShapeKind::TextBox)];
        let new = vec![shape("Title 1", ShapeKind::TextBox)];
        let alignment = align_shapes(&old, &new, 0.5, true);
        assert_eq!(alignment.matched.len(), 1);
        assert_eq!(alignment.matched[0].method, ShapeMatchMethod::NameAndType);
    }
}
