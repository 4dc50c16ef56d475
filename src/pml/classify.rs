//! Turn aligned slides/shapes into [`PmlChange`] records.

use std::ops::Range;

use crate::config::PmlSettings;
use crate::diff::{self, LcsSettings, SegmentStatus};
use crate::pml::align::{align_shapes, align_slides, ShapeMatch};
use crate::pml::change::{PmlChange, PmlChangeKind, PmlLocation};
use crate::pml::signature::{ShapeSignature, SlideSignature, TextRunSignature};

pub fn classify_presentation(old: &[SlideSignature], new: &[SlideSignature], settings: &PmlSettings) -> Vec<PmlChange> {
    let alignment = align_slides(old, new, settings.use_slide_alignment_lcs, settings.slide_similarity_threshold);
    let mut changes = Vec::new();

    if settings.compare_slide_structure {
        for slide in &alignment.deleted {
            changes.push(PmlChange {
                kind: PmlChangeKind::SlideDeleted,
                summary: format!("Slide {} deleted", slide.index + 1),
                old_text: Some(slide.text()),
                new_text: None,
                location: PmlLocation {
                    slide_index: slide.index,
                    shape_id: None,
                    shape_name: None,
                },
                old_index: Some(slide.index),
                new_index: None,
            });
        }
        for slide in &alignment.inserted {
            changes.push(PmlChange {
                kind: PmlChangeKind::SlideInserted,
                summary: format!("Slide {} inserted", slide.index + 1),
                old_text: None,
                new_text: Some(slide.text()),
                location: PmlLocation {
                    slide_index: slide.index,
                    shape_id: None,
                    shape_name: None,
                },
                old_index: None,
                new_index: Some(slide.index),
            });
        }
    }

    for m in &alignment.matched {
        if settings.compare_slide_structure && m.old.index != m.new.index {
            changes.push(PmlChange {
                kind: PmlChangeKind::SlideMoved,
                summary: format!("Slide moved: position {} -> {}", m.old.index + 1, m.new.index + 1),
                old_text: None,
                new_text: None,
                location: PmlLocation {
                    slide_index: m.new.index,
                    shape_id: None,
                    shape_name: None,
                },
                old_index: Some(m.old.index),
                new_index: Some(m.new.index),
            });
        }
        if m.old.hash != m.new.hash {
            changes.extend(classify_slide_shapes(m, settings));
        }
        if settings.compare_transitions && m.old.transition_hash != m.new.transition_hash {
            changes.push(PmlChange {
                kind: PmlChangeKind::TransitionChanged,
                summary: format!("Transition changed on slide {}", m.new.index + 1),
                old_text: None,
                new_text: None,
                location: PmlLocation {
                    slide_index: m.new.index,
                    shape_id: None,
                    shape_name: None,
                },
                old_index: None,
                new_index: None,
            });
        }
    }

    changes.sort_by_key(|c| c.location.slide_index);
    changes
}

fn classify_slide_shapes(slide_match: &crate::pml::align::SlideMatch, settings: &PmlSettings) -> Vec<PmlChange> {
    let alignment = align_shapes(&slide_match.old.shapes, &slide_match.new.shapes, settings.shape_similarity_threshold, settings.enable_fuzzy_shape_matching);
    let mut changes = Vec::new();
    let slide_index = slide_match.new.index;

    if settings.compare_shape_structure {
        for shape in &alignment.deleted {
            changes.push(shape_change(slide_index, shape, PmlChangeKind::ShapeDeleted, format!("Shape \"{}\" deleted", shape.name)));
        }
        for shape in &alignment.inserted {
            changes.push(shape_change(slide_index, shape, PmlChangeKind::ShapeInserted, format!("Shape \"{}\" inserted", shape.name)));
        }
    }

    for m in &alignment.matched {
        changes.extend(classify_shape_pair(slide_index, m, settings));
    }

    changes
}

fn classify_shape_pair(slide_index: usize, m: &ShapeMatch, settings: &PmlSettings) -> Vec<PmlChange> {
    let mut changes = Vec::new();
    let old = m.old;
    let new = m.new;

    if settings.compare_text_content {
        changes.extend(classify_shape_text(slide_index, old, new));
    }

    if settings.compare_shape_transforms {
        let dx = (old.transform.x - new.transform.x).abs();
        let dy = (old.transform.y - new.transform.y).abs();
        let dcx = (old.transform.cx - new.transform.cx).abs();
        let dcy = (old.transform.cy - new.transform.cy).abs();
        let drot = (old.transform.rot - new.transform.rot).abs();

        if (dx > settings.position_tolerance || dy > settings.position_tolerance) && dcx <= settings.position_tolerance && dcy <= settings.position_tolerance {
            changes.push(transform_change(slide_index, new, PmlChangeKind::ShapeMoved, "moved"));
        }
        if dcx > settings.position_tolerance || dcy > settings.position_tolerance {
            changes.push(transform_change(slide_index, new, PmlChangeKind::ShapeResized, "resized"));
        }
        if drot > 0 {
            changes.push(transform_change(slide_index, new, PmlChangeKind::ShapeRotated, "rotated"));
        }
    }

    if settings.compare_shape_styles && old.style_hash != new.style_hash {
        changes.push(PmlChange {
            kind: PmlChangeKind::ShapeStyleChanged,
            summary: format!("Style changed on \"{}\"", new.name),
            old_text: None,
            new_text: None,
            location: loc(slide_index, new),
            old_index: None,
            new_index: None,
        });
    }

    let image_kind = matches!(new.kind, crate::pml::signature::ShapeKind::Picture);
    if settings.compare_image_content && image_kind && old.content_hash != new.content_hash {
        changes.push(PmlChange {
            kind: PmlChangeKind::ImageReplaced,
            summary: format!("Image replaced in \"{}\"", new.name),
            old_text: None,
            new_text: None,
            location: loc(slide_index, new),
            old_index: None,
            new_index: None,
        });
    }

    if settings.compare_charts && matches!(new.kind, crate::pml::signature::ShapeKind::Chart) && old.content_hash != new.content_hash {
        changes.push(PmlChange {
            kind: PmlChangeKind::ChartChanged,
            summary: format!("Chart data changed in \"{}\"", new.name),
            old_text: None,
            new_text: None,
            location: loc(slide_index, new),
            old_index: None,
            new_index: None,
        });
    }
    if settings.compare_tables && matches!(new.kind, crate::pml::signature::ShapeKind::Table) && old.content_hash != new.content_hash {
        changes.push(PmlChange {
            kind: PmlChangeKind::TableChanged,
            summary: format!("Table content changed in \"{}\"", new.name),
            old_text: None,
            new_text: None,
            location: loc(slide_index, new),
            old_index: None,
            new_index: None,
        });
    }

    changes
}

/// Per-run LCS diff over a shape's text runs, instead of a single
/// whole-shape text comparison: a run whose text survives unchanged but
/// whose run properties differ is reported as `RunFormatChanged`, not as a
/// `TextChanged` delete+insert pair.
fn classify_shape_text(slide_index: usize, old: &ShapeSignature, new: &ShapeSignature) -> Vec<PmlChange> {
    if old.runs.is_empty() && new.runs.is_empty() {
        return Vec::new();
    }
    let lcs_settings = LcsSettings {
        min_match_length: 1,
        detail_threshold: 0.0,
    };
    let segments = diff::diff(&old.runs, &new.runs, &lcs_settings, &|r: &TextRunSignature| r.text.trim().is_empty());

    let mut changes = Vec::new();
    let mut i = 0;
    while i < segments.len() {
        let seg = &segments[i];
        match seg.status {
            SegmentStatus::Equal => {}
            SegmentStatus::Deleted => {
                if let Some(next) = segments.get(i + 1) {
                    if next.status == SegmentStatus::Inserted {
                        let old_text = run_text(&old.runs, seg.items1.clone());
                        let new_text = run_text(&new.runs, next.items2.clone());
                        if old_text == new_text {
                            changes.push(run_change(slide_index, new, PmlChangeKind::RunFormatChanged, Some(old_text), Some(new_text)));
                        } else {
                            changes.push(run_change(slide_index, new, PmlChangeKind::TextChanged, Some(old_text), Some(new_text)));
                        }
                        i += 2;
                        continue;
                    }
                }
                changes.push(run_change(slide_index, new, PmlChangeKind::TextChanged, Some(run_text(&old.runs, seg.items1.clone())), None));
            }
            SegmentStatus::Inserted => {
                changes.push(run_change(slide_index, new, PmlChangeKind::TextChanged, None, Some(run_text(&new.runs, seg.items2.clone()))));
            }
        }
        i += 1;
    }
    changes
}

fn run_text(runs: &[TextRunSignature], range: Range<usize>) -> String {
    runs[range].iter().map(|r| r.text.as_str()).collect()
}

fn run_change(slide_index: usize, shape: &ShapeSignature, kind: PmlChangeKind, old_text: Option<String>, new_text: Option<String>) -> PmlChange {
    let summary = match kind {
        PmlChangeKind::RunFormatChanged => format!("Formatting changed in \"{}\"", shape.name),
        _ => format!("Text changed in \"{}\"", shape.name),
    };
    PmlChange {
        kind,
        summary,
        old_text,
        new_text,
        location: loc(slide_index, shape),
        old_index: None,
        new_index: None,
    }
}

fn transform_change(slide_index: usize, shape: &ShapeSignature, kind: PmlChangeKind, verb: &str) -> PmlChange {
    PmlChange {
        kind,
        summary: format!("Shape \"{}\" {}", shape.name, verb),
        old_text: None,
        new_text: None,
        location: loc(slide_index, shape),
        old_index: None,
        new_index: None,
    }
}

fn shape_change(slide_index: usize, shape: &ShapeSignature, kind: PmlChangeKind, summary: String) -> PmlChange {
    PmlChange {
        kind,
        summary,
        old_text: None,
        new_text: None,
        location: loc(slide_index, shape),
        old_index: None,
        new_index: None,
    }
}

fn loc(slide_index: usize, shape: &ShapeSignature) -> PmlLocation {
    PmlLocation {
        slide_index,
        shape_id: Some(shape.id.clone()),
        shape_name: Some(shape.name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pml::signature::signature_for_slide;
    use crate::xml::parse;

    fn slide_sig(index: usize, text: &str) -> SlideSignature {
        let xml = format!(
            r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/></p:nvSpPr><p:txBody><a:p xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            text
        );
        let nodes = parse(xml.as_bytes()).unwrap();
        signature_for_slide(index, &nodes[0], "layout1", "", &PmlSettings::default())
    }

    #[test]
    fn unchanged_slide_produces_no_changes() {
        let old = vec![slide_sig(0, "Hello")];
        let new = vec![slide_sig(0, "Hello")];
        let settings = PmlSettings::default();
        let changes = classify_presentation(&old, &new, &settings);
        assert!(changes.is_empty());
    }

    #[test]
    fn text_change_is_reported() {
        let old = vec![slide_sig(0, "Hello")];
        let new = vec![slide_sig(0, "Goodbye")];
        let settings = PmlSettings::default();
        let changes = classify_presentation(&old, &new, &settings);
        assert!(changes.iter().any(|c| c.kind == PmlChangeKind::TextChanged));
    }
}
