//! Build the marked-up presentation: colored outlines on changed shapes,
//! banners on inserted/moved slides, an optional summary slide, and optional
//! per-slide notes annotations.
//!
//! Deleted slides and deleted shapes have no counterpart in the new-side
//! package to decorate, so (like the workbook engine's deleted rows) they are
//! reported in the change list only — nothing is spliced back in visually.

use std::collections::HashMap;

use crate::config::{PmlSettings, RgbColor};
use crate::pml::change::{PmlChange, PmlChangeKind};
use crate::xml::node::local_name;
use crate::xml::XmlNode;

fn hex(color: &RgbColor) -> String {
    format!("{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

fn is_shape_tag(name: &str) -> bool {
    matches!(name, "sp" | "pic" | "graphicFrame" | "grpSp" | "cxnSp")
}

fn shape_id(node: &XmlNode) -> Option<String> {
    node.find_by_local_name("cNvPr").and_then(|n| n.attr("id")).map(|s| s.to_string())
}

/// Rebuild `node`'s tree, replacing the first descendant matching `pred` with
/// `f`'s result (without descending further into that replacement).
fn retarget(node: &XmlNode, pred: &dyn Fn(&XmlNode) -> bool, f: &dyn Fn(&XmlNode) -> XmlNode) -> XmlNode {
    if matches!(node, XmlNode::Element { .. }) && pred(node) {
        return f(node);
    }
    match node {
        XmlNode::Element { name, attrs, children } => XmlNode::Element {
            name: name.clone(),
            attrs: attrs.clone(),
            children: children.iter().map(|c| retarget(c, pred, f)).collect(),
        },
        other => other.clone(),
    }
}

/// Which change color wins when a shape has more than one kind of change.
fn color_for_kind(kind: PmlChangeKind, settings: &PmlSettings) -> Option<RgbColor> {
    match kind {
        PmlChangeKind::ShapeInserted => Some(settings.inserted_color),
        PmlChangeKind::ShapeMoved | PmlChangeKind::ShapeResized | PmlChangeKind::ShapeRotated => Some(settings.moved_color),
        PmlChangeKind::TextChanged | PmlChangeKind::ShapeStyleChanged | PmlChangeKind::ImageReplaced | PmlChangeKind::ChartChanged | PmlChangeKind::TableChanged => {
            Some(settings.modified_color)
        }
        PmlChangeKind::RunFormatChanged => Some(settings.formatting_color),
        _ => None,
    }
}

fn severity(kind: PmlChangeKind) -> u8 {
    match kind {
        PmlChangeKind::ShapeInserted => 4,
        PmlChangeKind::ShapeMoved | PmlChangeKind::ShapeResized | PmlChangeKind::ShapeRotated => 3,
        PmlChangeKind::ImageReplaced | PmlChangeKind::ChartChanged | PmlChangeKind::TableChanged => 2,
        PmlChangeKind::TextChanged | PmlChangeKind::ShapeStyleChanged => 1,
        PmlChangeKind::RunFormatChanged => 1,
        _ => 0,
    }
}

/// Compute the per-shape highlight color for one slide from its changes.
pub fn shape_highlights(slide_index: usize, changes: &[PmlChange], settings: &PmlSettings) -> HashMap<String, String> {
    let mut best: HashMap<String, (u8, String)> = HashMap::new();
    for change in changes {
        if change.location.slide_index != slide_index {
            continue;
        }
        let Some(id) = &change.location.shape_id else { continue };
        let Some(color) = color_for_kind(change.kind, settings) else { continue };
        let rank = severity(change.kind);
        best.entry(id.clone())
            .and_modify(|(r, c)| {
                if rank > *r {
                    *r = rank;
                    *c = hex(&color);
                }
            })
            .or_insert((rank, hex(&color)));
    }
    best.into_iter().map(|(id, (_, c))| (id, c)).collect()
}

/// Apply outline-color highlights to every shape named in `highlights`.
pub fn apply_shape_highlights(sld_root: &XmlNode, highlights: &HashMap<String, String>) -> XmlNode {
    if highlights.is_empty() {
        return sld_root.clone();
    }
    let pred = |n: &XmlNode| -> bool {
        n.name()
            .map(local_name)
            .map(|name| is_shape_tag(name) && shape_id(n).map(|id| highlights.contains_key(&id)).unwrap_or(false))
            .unwrap_or(false)
    };
    retarget(sld_root, &pred, &|n| {
        let id = shape_id(n).unwrap_or_default();
        let color = highlights.get(&id).cloned().unwrap_or_default();
        add_outline(n, &color)
    })
}

fn add_outline(shape_node: &XmlNode, hex: &str) -> XmlNode {
    match shape_node {
        XmlNode::Element { name, attrs, children } => {
            let new_children = children
                .iter()
                .map(|c| {
                    if c.name().map(local_name) == Some("spPr") {
                        add_ln_to_sppr(c, hex)
                    } else {
                        c.clone()
                    }
                })
                .collect();
            XmlNode::Element {
                name: name.clone(),
                attrs: attrs.clone(),
                children: new_children,
            }
        }
        other => other.clone(),
    }
}

fn add_ln_to_sppr(sppr: &XmlNode, hex: &str) -> XmlNode {
    let ln = XmlNode::element("a:ln")
        .with_attr("w", "38100")
        .with_child(XmlNode::element("a:solidFill").with_child(XmlNode::element("a:srgbClr").with_attr("val", hex)));
    match sppr {
        XmlNode::Element { name, attrs, children } => {
            let mut new_children: Vec<XmlNode> = children.iter().filter(|c| c.name().map(local_name) != Some("ln")).cloned().collect();
            new_children.push(ln);
            XmlNode::Element {
                name: name.clone(),
                attrs: attrs.clone(),
                children: new_children,
            }
        }
        other => other.clone(),
    }
}

/// Append a small colored banner shape to a slide's shape tree, used to mark
/// inserted/moved slides since there is no document-level "slide status" to
/// annotate the way a workbook's highlighted row can be.
pub fn insert_banner(sld_root: &XmlNode, label: &str, color: &RgbColor, banner_id: u32) -> XmlNode {
    let pred = |n: &XmlNode| n.name().map(local_name) == Some("spTree");
    retarget(sld_root, &pred, &|tree| match tree {
        XmlNode::Element { name, attrs, children } => {
            let mut new_children = children.clone();
            new_children.push(banner_shape(label, color, banner_id));
            XmlNode::Element {
                name: name.clone(),
                attrs: attrs.clone(),
                children: new_children,
            }
        }
        other => other.clone(),
    })
}

fn banner_shape(label: &str, color: &RgbColor, id: u32) -> XmlNode {
    XmlNode::element("p:sp")
        .with_child(
            XmlNode::element("p:nvSpPr")
                .with_child(
                    XmlNode::element("p:cNvPr")
                        .with_attr("id", &id.to_string())
                        .with_attr("name", &format!("ChangeBanner {id}")),
                )
                .with_child(XmlNode::element("p:cNvSpPr"))
                .with_child(XmlNode::element("p:nvPr")),
        )
        .with_child(
            XmlNode::element("p:spPr")
                .with_child(
                    XmlNode::element("a:xfrm")
                        .with_child(XmlNode::element("a:off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(XmlNode::element("a:ext").with_attr("cx", "2286000").with_attr("cy", "274638")),
                )
                .with_child(XmlNode::element("a:prstGeom").with_attr("prst", "rect"))
                .with_child(XmlNode::element("a:solidFill").with_child(XmlNode::element("a:srgbClr").with_attr("val", &hex(color)))),
        )
        .with_child(
            XmlNode::element("p:txBody")
                .with_child(XmlNode::element("a:bodyPr"))
                .with_child(
                    XmlNode::element("a:p").with_child(
                        XmlNode::element("a:r")
                            .with_child(XmlNode::element("a:rPr").with_attr("sz", "1200").with_child(XmlNode::element("a:solidFill").with_child(XmlNode::element("a:srgbClr").with_attr("val", "FFFFFF"))))
                            .with_child(XmlNode::element("a:t").with_child(XmlNode::Text(label.to_string()))),
                    ),
                ),
        )
}

/// Text appended to a slide's notes when `add_notes_annotations` is enabled.
pub fn notes_annotation_text(changes: &[PmlChange], slide_index: usize) -> Option<String> {
    let lines: Vec<String> = changes.iter().filter(|c| c.location.slide_index == slide_index).map(|c| format!("- {}", c.summary)).collect();
    if lines.is_empty() {
        None
    } else {
        Some(format!("Changes:\n{}", lines.join("\n")))
    }
}

/// Append a text block to a notes slide's body placeholder, creating one
/// minimal paragraph per line.
pub fn append_notes_text(notes_root: &XmlNode, text: &str) -> XmlNode {
    let pred = |n: &XmlNode| -> bool {
        n.name().map(local_name) == Some("sp")
            && n.find_by_local_name("ph").map(|p| p.attr("type") == Some("body")).unwrap_or(false)
    };
    retarget(notes_root, &pred, &|sp| {
        let tx_pred = |n: &XmlNode| n.name().map(local_name) == Some("txBody");
        retarget(sp, &tx_pred, &|tx_body| match tx_body {
            XmlNode::Element { name, attrs, children } => {
                let mut new_children = children.clone();
                for line in text.lines() {
                    new_children.push(XmlNode::element("a:p").with_child(XmlNode::element("a:r").with_child(XmlNode::element("a:t").with_child(XmlNode::Text(line.to_string())))));
                }
                XmlNode::Element {
                    name: name.clone(),
                    attrs: attrs.clone(),
                    children: new_children,
                }
            }
            other => other.clone(),
        })
    })
}

pub struct SummaryCounts {
    pub slides_inserted: usize,
    pub slides_deleted: usize,
    pub slides_moved: usize,
    pub shapes_changed: usize,
}

pub fn summarize(changes: &[PmlChange]) -> SummaryCounts {
    SummaryCounts {
        slides_inserted: changes.iter().filter(|c| c.kind == PmlChangeKind::SlideInserted).count(),
        slides_deleted: changes.iter().filter(|c| c.kind == PmlChangeKind::SlideDeleted).count(),
        slides_moved: changes.iter().filter(|c| c.kind == PmlChangeKind::SlideMoved).count(),
        shapes_changed: changes
            .iter()
            .filter(|c| {
                matches!(
                    c.kind,
                    PmlChangeKind::ShapeInserted
                        | PmlChangeKind::ShapeDeleted
                        | PmlChangeKind::TextChanged
                        | PmlChangeKind::ShapeMoved
                        | PmlChangeKind::ShapeResized
                        | PmlChangeKind::ShapeRotated
                        | PmlChangeKind::ShapeStyleChanged
                        | PmlChangeKind::ImageReplaced
                        | PmlChangeKind::RunFormatChanged
                        | PmlChangeKind::ChartChanged
                        | PmlChangeKind::TableChanged
                )
            })
            .count(),
    }
}

/// Build a standalone `p:sld` document body for a slide that lists change
/// counts, using no placeholders from any layout so it renders standalone.
pub fn build_summary_slide(counts: &SummaryCounts) -> Vec<XmlNode> {
    let lines = [
        format!("Slides inserted: {}", counts.slides_inserted),
        format!("Slides deleted: {}", counts.slides_deleted),
        format!("Slides moved: {}", counts.slides_moved),
        format!("Shapes changed: {}", counts.shapes_changed),
    ];

    let title_body = XmlNode::element("p:txBody")
        .with_child(XmlNode::element("a:bodyPr"))
        .with_child(XmlNode::element("a:p").with_child(XmlNode::element("a:r").with_child(XmlNode::element("a:t").with_child(XmlNode::Text("Comparison summary".to_string())))));

    let body_text = lines.iter().fold(XmlNode::element("p:txBody").with_child(XmlNode::element("a:bodyPr")), |body, line| {
        body.with_child(XmlNode::element("a:p").with_child(XmlNode::element("a:r").with_child(XmlNode::element("a:t").with_child(XmlNode::Text(line.clone())))))
    });

    let title_shape = XmlNode::element("p:sp")
        .with_child(
            XmlNode::element("p:nvSpPr")
                .with_child(XmlNode::element("p:cNvPr").with_attr("id", "2").with_attr("name", "Title"))
                .with_child(XmlNode::element("p:cNvSpPr"))
                .with_child(XmlNode::element("p:nvPr")),
        )
        .with_child(XmlNode::element("p:spPr"))
        .with_child(title_body);

    let body_shape = XmlNode::element("p:sp")
        .with_child(
            XmlNode::element("p:nvSpPr")
                .with_child(XmlNode::element("p:cNvPr").with_attr("id", "3").with_attr("name", "Body"))
                .with_child(XmlNode::element("p:cNvSpPr"))
                .with_child(XmlNode::element("p:nvPr")),
        )
        .with_child(XmlNode::element("p:spPr"))
        .with_child(body_text);

    vec![XmlNode::element("p:sld")
        .with_attr("xmlns:a", "http://schemas.openxmlformats.org/drawingml/2006/main")
        .with_attr("xmlns:r", "http://schemas.openxmlformats.org/officeDocument/2006/relationships")
        .with_attr("xmlns:p", "http://schemas.openxmlformats.org/presentationml/2006/main")
        .with_child(
            XmlNode::element("p:cSld").with_child(
                XmlNode::element("p:spTree")
                    .with_child(XmlNode::element("p:nvGrpSpPr").with_child(XmlNode::element("p:cNvPr").with_attr("id", "1").with_attr("name", "")))
                    .with_child(XmlNode::element("p:grpSpPr"))
                    .with_child(title_shape)
                    .with_child(body_shape),
            ),
        )]
}

/// Append a `<p:sldId>` entry to a parsed presentation document's `sldIdLst`,
/// used to register a newly created summary slide.
pub fn append_sld_id(pres_roots: &[XmlNode], id: u32, r_id: &str) -> Vec<XmlNode> {
    let pred = |n: &XmlNode| n.name().map(local_name) == Some("sldIdLst");
    pres_roots
        .iter()
        .map(|root| {
            retarget(root, &pred, &|lst| match lst {
                XmlNode::Element { name, attrs, children } => {
                    let mut new_children = children.clone();
                    new_children.push(XmlNode::element("p:sldId").with_attr("id", &id.to_string()).with_attr("r:id", r_id));
                    XmlNode::Element {
                        name: name.clone(),
                        attrs: attrs.clone(),
                        children: new_children,
                    }
                }
                other => other.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    #[test]
    fn shape_highlights_picks_highest_severity_color() {
        let change_insert = PmlChange {
            kind: PmlChangeKind::ShapeInserted,
            summary: String::new(),
            old_text: None,
            new_text: None,
            location: crate::pml::change::PmlLocation {
                slide_index: 0,
                shape_id: Some("5".to_string()),
                shape_name: None,
            },
            old_index: None,
            new_index: None,
        };
        let settings = PmlSettings::default();
        let highlights = shape_highlights(0, std::slice::from_ref(&change_insert), &settings);
        assert_eq!(highlights.get("5").cloned(), Some(hex(&settings.inserted_color)));
    }

    #[test]
    fn apply_highlight_adds_outline_to_matching_shape() {
        let xml = r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="5" name="Title"/></p:nvSpPr><p:spPr/></p:sp></p:spTree></p:cSld></p:sld>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        let mut highlights = HashMap::new();
        highlights.insert("5".to_string(), "00B050".to_string());
        let marked = apply_shape_highlights(&nodes[0], &highlights);
        let built = crate::xml::build(std::slice::from_ref(&marked)).unwrap();
        assert!(built.contains("a:ln"));
        assert!(built.contains("00B050"));
    }
}
