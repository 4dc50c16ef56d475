//! The PowerPoint (PresentationML) comparison engine: build per-slide/shape
//! signatures, align slides and shapes, classify changes, and emit a marked
//! presentation with colored overlays, optional slide-change banners, an
//! optional summary slide, and optional notes annotations.

pub mod align;
pub mod change;
pub mod classify;
pub mod emit;
pub mod error;
pub mod signature;

use rayon::prelude::*;

use crate::config::PmlSettings;
use crate::opc::constants::{content_type as ct, relationship_type};
use crate::opc::{OpcPackage, PackUri};
use crate::xml::XmlNode;

pub use change::{PmlChange, PmlChangeKind, PmlLocation};
pub use error::PmlError;

use signature::{signature_for_slide, SlideSignature};

pub struct PmlCompareResult {
    pub document_bytes: Vec<u8>,
    pub changes: Vec<PmlChange>,
    pub insertions: usize,
    pub deletions: usize,
    pub moved: usize,
    pub modifications: usize,
}

#[tracing::instrument(skip_all)]
pub fn compare_pptx(old_bytes: &[u8], new_bytes: &[u8], settings: &PmlSettings) -> crate::error::Result<PmlCompareResult> {
    let old_pkg = OpcPackage::open(old_bytes)?;
    let mut new_pkg = OpcPackage::open(new_bytes)?;

    let old_slides = load_slides(&old_pkg)?;
    let new_slides = load_slides(&new_pkg)?;

    tracing::debug!(old_slides = old_slides.len(), new_slides = new_slides.len(), "building slide signatures");

    // Each slide's signature is independent of its neighbors, so this fans
    // out over rayon's global pool instead of walking slides one at a time.
    let old_sigs: Vec<SlideSignature> = old_slides
        .par_iter()
        .enumerate()
        .map(|(i, s)| signature_for_slide(i, &s.root, &s.layout_ref, &s.notes_text, settings))
        .collect();
    let new_sigs: Vec<SlideSignature> = new_slides
        .par_iter()
        .enumerate()
        .map(|(i, s)| signature_for_slide(i, &s.root, &s.layout_ref, &s.notes_text, settings))
        .collect();

    let changes = classify::classify_presentation(&old_sigs, &new_sigs, settings);

    for (index, slide) in new_slides.iter().enumerate() {
        mark_slide(&mut new_pkg, slide, index, &changes, settings)?;
    }

    if settings.add_summary_slide {
        add_summary_slide(&mut new_pkg, &changes)?;
    }

    let document_bytes = new_pkg.save()?;

    let insertions = changes.iter().filter(|c| matches!(c.kind, PmlChangeKind::SlideInserted | PmlChangeKind::ShapeInserted)).count();
    let deletions = changes.iter().filter(|c| matches!(c.kind, PmlChangeKind::SlideDeleted | PmlChangeKind::ShapeDeleted)).count();
    let moved = changes.iter().filter(|c| matches!(c.kind, PmlChangeKind::SlideMoved | PmlChangeKind::ShapeMoved)).count();
    let modifications = changes
        .iter()
        .filter(|c| matches!(c.kind, PmlChangeKind::TextChanged | PmlChangeKind::ShapeResized | PmlChangeKind::ShapeRotated | PmlChangeKind::ShapeStyleChanged | PmlChangeKind::ImageReplaced))
        .count();

    Ok(PmlCompareResult {
        document_bytes,
        changes,
        insertions,
        deletions,
        moved,
        modifications,
    })
}

struct LoadedSlide {
    uri: PackUri,
    root: XmlNode,
    layout_ref: String,
    notes_text: String,
}

/// Load every slide of a presentation, in `sldIdLst` document order.
fn load_slides(pkg: &OpcPackage) -> crate::error::Result<Vec<LoadedSlide>> {
    let (pres_uri, pres_part) = pkg.main_part().map_err(|_| PmlError::NoPresentationPart)?;
    let pres_uri = pres_uri.clone();
    let pres_roots = crate::xml::parse(pres_part.blob())?;
    let pres_root = pres_roots.first().ok_or(PmlError::NoPresentationPart)?;
    let sld_id_lst = pres_root.find_by_local_name("sldIdLst").ok_or(PmlError::NoPresentationPart)?;
    let rels = pkg.relationships(Some(&pres_uri));

    let mut slides = Vec::new();
    for sld_id in sld_id_lst.children_by_local_name("sldId") {
        let r_id = sld_id.attr("r:id").or_else(|| sld_id.attr("id")).unwrap_or_default();
        let Some(rel) = rels.get(r_id) else { continue };
        let Ok(slide_uri) = rel.target_partname() else { continue };
        let Some(part) = pkg.part(&slide_uri) else { continue };
        let roots = crate::xml::parse(part.blob())?;
        let Some(root) = roots.into_iter().next() else { continue };

        let slide_rels = pkg.relationships(Some(&slide_uri));
        let layout_ref = slide_rels
            .part_with_reltype(relationship_type::SLIDE_LAYOUT)
            .ok()
            .and_then(|r| r.target_partname().ok())
            .map(|u| u.to_string())
            .unwrap_or_default();
        let notes_text = slide_rels
            .part_with_reltype(relationship_type::NOTES_SLIDE)
            .ok()
            .and_then(|r| r.target_partname().ok())
            .and_then(|u| pkg.part(&u).map(|p| (u, p)))
            .and_then(|(_, p)| crate::xml::parse(p.blob()).ok())
            .and_then(|roots| roots.into_iter().next())
            .map(|root| extract_notes_text(&root))
            .unwrap_or_default();

        slides.push(LoadedSlide {
            uri: slide_uri,
            root,
            layout_ref,
            notes_text,
        });
    }
    Ok(slides)
}

fn extract_notes_text(notes_root: &XmlNode) -> String {
    let Some(tree) = notes_root.find_by_local_name("spTree") else {
        return String::new();
    };
    tree.children()
        .iter()
        .filter_map(|sp| {
            let ph = sp.find_by_local_name("ph")?;
            if ph.attr("type") == Some("body") {
                sp.find_by_local_name("txBody").map(|t| t.text_content())
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn mark_slide(pkg: &mut OpcPackage, slide: &LoadedSlide, index: usize, changes: &[PmlChange], settings: &PmlSettings) -> crate::error::Result<()> {
    let mut root = slide.root.clone();

    let highlights = emit::shape_highlights(index, changes, settings);
    if !highlights.is_empty() {
        root = emit::apply_shape_highlights(&root, &highlights);
    }

    if changes.iter().any(|c| c.kind == PmlChangeKind::SlideInserted && c.location.slide_index == index) {
        root = emit::insert_banner(&root, "Inserted slide", &settings.inserted_color, 9000 + index as u32);
    }
    if let Some(c) = changes.iter().find(|c| c.kind == PmlChangeKind::SlideMoved && c.new_index == Some(index)) {
        let label = format!("Moved from slide {}", c.old_index.unwrap_or(0) + 1);
        root = emit::insert_banner(&root, &label, &settings.moved_color, 9500 + index as u32);
    }

    if settings.add_notes_annotations {
        if let Some(text) = emit::notes_annotation_text(changes, index) {
            let slide_rels = pkg.relationships(Some(&slide.uri)).clone();
            if let Ok(rel) = slide_rels.part_with_reltype(relationship_type::NOTES_SLIDE) {
                if let Ok(notes_uri) = rel.target_partname() {
                    if let Some(notes_part) = pkg.part(&notes_uri) {
                        let notes_roots = crate::xml::parse(notes_part.blob())?;
                        if let Some(notes_root) = notes_roots.first() {
                            let marked_notes = emit::append_notes_text(notes_root, &text);
                            let xml = crate::xml::build(std::slice::from_ref(&marked_notes))?;
                            if let Some(part) = pkg.part_mut(&notes_uri) {
                                part.set_blob(xml.into_bytes());
                            }
                        }
                    }
                }
            }
        }
    }

    let xml = crate::xml::build(std::slice::from_ref(&root))?;
    pkg.part_mut(&slide.uri).ok_or(PmlError::NoSlidePart(slide.uri.to_string()))?.set_blob(xml.into_bytes());
    Ok(())
}

fn add_summary_slide(pkg: &mut OpcPackage, changes: &[PmlChange]) -> crate::error::Result<()> {
    let counts = emit::summarize(changes);
    let summary_roots = emit::build_summary_slide(&counts);
    let xml = crate::xml::build(&summary_roots)?;

    let next_index = next_slide_index(pkg);
    let slide_uri_str = format!("/ppt/slides/slide{next_index}.xml");
    let slide_uri = PackUri::new(slide_uri_str).map_err(PmlError::Xml)?;
    pkg.create_part(slide_uri.clone(), ct::PML_SLIDE, xml.into_bytes());

    let (pres_uri, pres_part) = pkg.main_part().map_err(|_| PmlError::NoPresentationPart)?;
    let pres_uri = pres_uri.clone();
    let pres_roots = crate::xml::parse(pres_part.blob())?;
    let next_id = next_sld_id(&pres_roots);

    let r_id = pkg
        .part_mut(&pres_uri)
        .ok_or(PmlError::NoPresentationPart)?
        .rels_mut()
        .get_or_add(relationship_type::SLIDE, &format!("slides/slide{next_index}.xml"), false);

    let updated_roots = emit::append_sld_id(&pres_roots, next_id, &r_id);
    let updated_xml = crate::xml::build(&updated_roots)?;
    pkg.part_mut(&pres_uri).ok_or(PmlError::NoPresentationPart)?.set_blob(updated_xml.into_bytes());
    Ok(())
}

fn next_slide_index(pkg: &OpcPackage) -> u32 {
    let mut max = 0u32;
    for (uri, _) in pkg.parts() {
        if let Some(name) = uri.filename().strip_prefix("slide").and_then(|s| s.strip_suffix(".xml")) {
            if let Ok(n) = name.parse::<u32>() {
                max = max.max(n);
            }
        }
    }
    max + 1
}

fn next_sld_id(pres_roots: &[XmlNode]) -> u32 {
    let mut max = 255u32;
    for root in pres_roots {
        if let Some(lst) = root.find_by_local_name("sldIdLst") {
            for sld_id in lst.children_by_local_name("sldId") {
                if let Some(id) = sld_id.attr("id").and_then(|v| v.parse::<u32>().ok()) {
                    max = max.max(id);
                }
            }
        }
    }
    max + 1
}
