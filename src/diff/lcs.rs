//! The generic longest-contiguous-match diff kernel.
//!
//! Reused, unmodified in algorithm, across the WML/SML/PML engines: each
//! family only needs to supply a sequence of items exposing a stable
//! [`Hashable::hash`]. The kernel never inspects unit kind.

/// A comparison unit: anything that can expose a stable content hash.
pub trait Hashable {
    fn hash(&self) -> &str;
}

impl Hashable for String {
    fn hash(&self) -> &str {
        self.as_str()
    }
}

/// Status of one segment of a correlated sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Equal,
    Deleted,
    Inserted,
}

/// One segment of the LCS kernel's output.
///
/// `items1`/`items2` hold indices into the original `A`/`B` slices rather
/// than clones, so callers can map back to whatever richer type the raw
/// hash was derived from.
#[derive(Debug, Clone)]
pub struct Segment {
    pub status: SegmentStatus,
    pub items1: std::ops::Range<usize>,
    pub items2: std::ops::Range<usize>,
}

/// Tunables controlling match acceptance, per §4.4.
#[derive(Debug, Clone)]
pub struct LcsSettings {
    pub min_match_length: usize,
    pub detail_threshold: f64,
}

impl Default for LcsSettings {
    fn default() -> Self {
        Self {
            min_match_length: 1,
            detail_threshold: 0.15,
        }
    }
}

/// Diff two hash sequences, returning the ordered list of correlated
/// segments such that `items1` concatenated across Deleted+Equal segments
/// reconstructs `a`, and `items2` concatenated across Inserted+Equal
/// segments reconstructs `b`.
///
/// `skip_as_anchor` rejects trim candidates (e.g. whitespace-only tokens)
/// from counting toward a match's boundary trimming; it does not reject the
/// match itself.
pub fn diff<T: Hashable>(
    a: &[T],
    b: &[T],
    settings: &LcsSettings,
    skip_as_anchor: &dyn Fn(&T) -> bool,
) -> Vec<Segment> {
    let mut out = Vec::new();
    diff_range(a, b, 0, a.len(), 0, b.len(), settings, skip_as_anchor, &mut out);
    coalesce(out)
}

fn diff_range<T: Hashable>(
    a: &[T],
    b: &[T],
    a_start: usize,
    a_end: usize,
    b_start: usize,
    b_end: usize,
    settings: &LcsSettings,
    skip_as_anchor: &dyn Fn(&T) -> bool,
    out: &mut Vec<Segment>,
) {
    let a_slice = &a[a_start..a_end];
    let b_slice = &b[b_start..b_end];

    if a_slice.is_empty() && b_slice.is_empty() {
        return;
    }
    if a_slice.is_empty() {
        out.push(Segment {
            status: SegmentStatus::Inserted,
            items1: a_start..a_start,
            items2: b_start..b_end,
        });
        return;
    }
    if b_slice.is_empty() {
        out.push(Segment {
            status: SegmentStatus::Deleted,
            items1: a_start..a_end,
            items2: b_start..b_start,
        });
        return;
    }

    match longest_match(a_slice, b_slice) {
        Some((mut i, mut j, mut len)) => {
            // Trim anchors rejected by skip_as_anchor from both ends of the match.
            while len > 0 && skip_as_anchor(&a_slice[i]) {
                i += 1;
                j += 1;
                len -= 1;
            }
            while len > 0 && skip_as_anchor(&a_slice[i + len - 1]) {
                len -= 1;
            }

            let max_len = a_slice.len().max(b_slice.len());
            let ratio = if max_len == 0 {
                0.0
            } else {
                len as f64 / max_len as f64
            };

            if len < settings.min_match_length || ratio < settings.detail_threshold {
                out.push(Segment {
                    status: SegmentStatus::Deleted,
                    items1: a_start..a_end,
                    items2: b_start..b_start,
                });
                out.push(Segment {
                    status: SegmentStatus::Inserted,
                    items1: a_start..a_start,
                    items2: b_start..b_end,
                });
                return;
            }

            let abs_i = a_start + i;
            let abs_j = b_start + j;

            diff_range(a, b, a_start, abs_i, b_start, abs_j, settings, skip_as_anchor, out);
            out.push(Segment {
                status: SegmentStatus::Equal,
                items1: abs_i..abs_i + len,
                items2: abs_j..abs_j + len,
            });
            diff_range(
                a,
                b,
                abs_i + len,
                a_end,
                abs_j + len,
                b_end,
                settings,
                skip_as_anchor,
                out,
            );
        }
        None => {
            out.push(Segment {
                status: SegmentStatus::Deleted,
                items1: a_start..a_end,
                items2: b_start..b_start,
            });
            out.push(Segment {
                status: SegmentStatus::Inserted,
                items1: a_start..a_start,
                items2: b_start..b_end,
            });
        }
    }
}

/// Find the single longest contiguous run where `a[i..i+len] == b[j..j+len]`
/// by hash, tie-breaking on smallest `i` then smallest `j`.
///
/// Builds an index of hash -> positions in `b` so the scan is, in the common
/// case of few repeats, much better than the naive O(|a|*|b|) comparison;
/// worst case remains O(|a|*|b|).
fn longest_match<T: Hashable>(a: &[T], b: &[T]) -> Option<(usize, usize, usize)> {
    use std::collections::HashMap;

    let mut b_index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, item) in b.iter().enumerate() {
        b_index.entry(item.hash()).or_default().push(j);
    }

    let mut best: Option<(usize, usize, usize)> = None;

    for i in 0..a.len() {
        // Early exit: no candidate starting at i or later can beat best.
        if let Some((_, _, best_len)) = best {
            if a.len() - i <= best_len {
                break;
            }
        }

        let Some(js) = b_index.get(a[i].hash()) else {
            continue;
        };

        for &j in js {
            if let Some((_, _, best_len)) = best {
                if b.len() - j <= best_len {
                    continue;
                }
            }

            let mut len = 0;
            while i + len < a.len() && j + len < b.len() && a[i + len].hash() == b[j + len].hash() {
                len += 1;
            }

            let better = match best {
                None => true,
                Some((bi, bj, bl)) => len > bl || (len == bl && (i < bi || (i == bi && j < bj))),
            };
            if better && len > 0 {
                best = Some((i, j, len));
            }
        }
    }

    best
}

fn coalesce(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.items1.is_empty() && seg.items2.is_empty() {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.status == seg.status
                && last.items1.end == seg.items1.start
                && last.items2.end == seg.items2.start
            {
                last.items1.end = seg.items1.end;
                last.items2.end = seg.items2.end;
                continue;
            }
        }
        out.push(seg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    fn no_skip<T>(_: &T) -> bool {
        false
    }

    #[test]
    fn identical_inputs_yield_one_equal_segment() {
        let a = seq(&["the", "quick", "brown", "fox"]);
        let b = a.clone();
        let segs = diff(&a, &b, &LcsSettings::default(), &no_skip);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].status, SegmentStatus::Equal);
    }

    #[test]
    fn both_empty_yields_empty_list() {
        let a: Vec<String> = vec![];
        let b: Vec<String> = vec![];
        let segs = diff(&a, &b, &LcsSettings::default(), &no_skip);
        assert!(segs.is_empty());
    }

    #[test]
    fn one_empty_yields_single_segment() {
        let a = seq(&["a", "b"]);
        let b: Vec<String> = vec![];
        let segs = diff(&a, &b, &LcsSettings::default(), &no_skip);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].status, SegmentStatus::Deleted);
    }

    #[test]
    fn insertion_in_the_middle() {
        let a = seq(&["the", "quick", "brown", "fox"]);
        let b = seq(&["the", "very", "quick", "brown", "fox"]);
        let settings = LcsSettings {
            min_match_length: 1,
            detail_threshold: 0.0,
        };
        let segs = diff(&a, &b, &settings, &no_skip);

        // Reconstruction invariant.
        let recon_a: Vec<&str> = segs
            .iter()
            .filter(|s| s.status != SegmentStatus::Inserted)
            .flat_map(|s| a[s.items1.clone()].iter().map(|x| x.as_str()))
            .collect();
        let recon_b: Vec<&str> = segs
            .iter()
            .filter(|s| s.status != SegmentStatus::Deleted)
            .flat_map(|s| b[s.items2.clone()].iter().map(|x| x.as_str()))
            .collect();
        assert_eq!(recon_a, vec!["the", "quick", "brown", "fox"]);
        assert_eq!(recon_b, vec!["the", "very", "quick", "brown", "fox"]);

        assert!(segs.iter().any(|s| s.status == SegmentStatus::Inserted));
    }

    #[test]
    fn no_match_below_min_length_splits_whole_sequences() {
        let a = seq(&["alpha"]);
        let b = seq(&["zulu"]);
        let segs = diff(&a, &b, &LcsSettings::default(), &no_skip);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].status, SegmentStatus::Deleted);
        assert_eq!(segs[1].status, SegmentStatus::Inserted);
    }

    #[test]
    fn lcs_maximality() {
        let a = seq(&["a", "b", "c", "x", "a", "b", "c"]);
        let b = seq(&["a", "b", "c", "y", "a", "b", "c"]);
        let (_, _, len) = longest_match(&a, &b).unwrap();
        assert_eq!(len, 3);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn reconstruct(a: &[String], b: &[String], segs: &[Segment]) -> (Vec<String>, Vec<String>) {
            let recon_a: Vec<String> = segs
                .iter()
                .filter(|s| s.status != SegmentStatus::Inserted)
                .flat_map(|s| a[s.items1.clone()].iter().cloned())
                .collect();
            let recon_b: Vec<String> = segs
                .iter()
                .filter(|s| s.status != SegmentStatus::Deleted)
                .flat_map(|s| b[s.items2.clone()].iter().cloned())
                .collect();
            (recon_a, recon_b)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            /// Every segment list the kernel emits reconstructs both inputs
            /// exactly, regardless of how the random sequences overlap.
            #[test]
            fn prop_segments_reconstruct_both_inputs(
                a in prop::collection::vec("[a-d]", 0..12),
                b in prop::collection::vec("[a-d]", 0..12),
            ) {
                let a = a.into_iter().map(String::from).collect::<Vec<_>>();
                let b = b.into_iter().map(String::from).collect::<Vec<_>>();
                let settings = LcsSettings { min_match_length: 1, detail_threshold: 0.0 };
                let segs = diff(&a, &b, &settings, &no_skip);
                let (recon_a, recon_b) = reconstruct(&a, &b, &segs);
                prop_assert_eq!(recon_a, a);
                prop_assert_eq!(recon_b, b);
            }

            /// Diffing a sequence against itself always yields a single Equal
            /// segment spanning the whole thing, never a spurious split.
            #[test]
            fn prop_identical_sequences_never_split(a in prop::collection::vec("[a-d]", 1..12)) {
                let a = a.into_iter().map(String::from).collect::<Vec<_>>();
                let b = a.clone();
                let settings = LcsSettings { min_match_length: 1, detail_threshold: 0.0 };
                let segs = diff(&a, &b, &settings, &no_skip);
                prop_assert_eq!(segs.len(), 1);
                prop_assert_eq!(segs[0].status, SegmentStatus::Equal);
            }
        }
    }
}
