//! Per-slide and per-shape signatures: the comparison units the PML engine
//! aligns and diffs. Unlike the WML token stream, these are composite
//! structures (a slide owns an ordered list of shapes, each shape owns an
//! ordered list of text runs) rather than a single flat sequence, since the
//! spec's alignment strategy operates at the slide level first and only
//! descends into a matched pair's shapes.

use crate::config::PmlSettings;
use crate::diff::Hashable;
use crate::hash::{combine, hash_string};
use crate::xml::node::local_name;
use crate::xml::{build_fragment, XmlNode};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
    pub rot: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    TextBox,
    Picture,
    Table,
    Chart,
    GraphicFrame,
    Group,
    Connector,
    Other,
}

#[derive(Debug, Clone)]
pub struct TextRunSignature {
    pub text: String,
    pub rpr_hash: String,
    pub hash: String,
}

impl Hashable for TextRunSignature {
    fn hash(&self) -> &str {
        &self.hash
    }
}

#[derive(Debug, Clone)]
pub struct ShapeSignature {
    pub id: String,
    pub name: String,
    pub kind: ShapeKind,
    pub placeholder_type: Option<String>,
    pub placeholder_idx: Option<String>,
    pub transform: Transform,
    /// Hash of non-text visual properties: fill, line, effect, geometry.
    pub style_hash: String,
    pub runs: Vec<TextRunSignature>,
    /// Content hash for image/table/chart shapes, opaque to the text diff.
    pub content_hash: String,
    pub hash: String,
}

impl ShapeSignature {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    fn rehash(&mut self) {
        let run_hash = combine(self.runs.iter().flat_map(|r| [r.text.as_str(), r.rpr_hash.as_str()]));
        self.hash = combine([
            self.name.as_str(),
            &format!("{:?}", self.kind),
            &self.style_hash,
            &run_hash,
            &self.content_hash,
        ]);
    }
}

#[derive(Debug, Clone)]
pub struct SlideSignature {
    pub index: usize,
    pub layout_ref: String,
    pub shapes: Vec<ShapeSignature>,
    pub notes_hash: String,
    pub background_hash: String,
    /// Kept out of `rehash()`'s combine so a transition-only difference
    /// never forces a false reclassification of the slide's shapes; compared
    /// directly in `classify_presentation` instead.
    pub transition_hash: String,
    pub hash: String,
}

impl SlideSignature {
    fn rehash(&mut self) {
        let shapes_hash = combine(self.shapes.iter().map(|s| s.hash.as_str()));
        self.hash = combine([&self.layout_ref, &shapes_hash, &self.notes_hash, &self.background_hash]);
    }

    pub fn text(&self) -> String {
        self.shapes.iter().map(|s| s.text()).collect::<Vec<_>>().join(" ")
    }
}

/// Build a slide's signature from its parsed `p:sld` root plus the layout
/// relationship target (used only as an opaque reference string) and the
/// notes slide's text, if any.
pub fn signature_for_slide(index: usize, sld_root: &XmlNode, layout_ref: &str, notes_text: &str, settings: &PmlSettings) -> SlideSignature {
    let c_sld = sld_root.find_by_local_name("cSld");
    let sp_tree = c_sld.and_then(|c| c.find_by_local_name("spTree"));
    let background_hash = c_sld
        .and_then(|c| c.find_by_local_name("bg"))
        .and_then(|bg| build_fragment(std::slice::from_ref(bg)).ok())
        .map(|xml| hash_string(&xml))
        .unwrap_or_default();

    let transition_hash = sld_root
        .find_by_local_name("transition")
        .and_then(|t| build_fragment(std::slice::from_ref(t)).ok())
        .map(|xml| hash_string(&xml))
        .unwrap_or_default();

    let mut shapes = Vec::new();
    if let Some(tree) = sp_tree {
        for child in tree.children() {
            if let Some(sig) = signature_for_shape_node(child, settings) {
                shapes.push(sig);
            }
        }
    }

    let notes_hash = if settings.compare_notes { hash_string(notes_text.trim()) } else { String::new() };

    let mut sig = SlideSignature {
        index,
        layout_ref: layout_ref.to_string(),
        shapes,
        notes_hash,
        background_hash,
        transition_hash,
        hash: String::new(),
    };
    sig.rehash();
    sig
}

fn signature_for_shape_node(node: &XmlNode, settings: &PmlSettings) -> Option<ShapeSignature> {
    let local = node.name().map(local_name)?;
    let kind = match local {
        "sp" => ShapeKind::TextBox,
        "pic" => ShapeKind::Picture,
        "graphicFrame" => graphic_frame_kind(node),
        "grpSp" => ShapeKind::Group,
        "cxnSp" => ShapeKind::Connector,
        _ => return None,
    };

    let nv_pr = node.find_by_local_name("cNvPr");
    let id = nv_pr.and_then(|n| n.attr("id")).unwrap_or_default().to_string();
    let name = nv_pr.and_then(|n| n.attr("name")).unwrap_or_default().to_string();

    let ph = node.find_by_local_name("ph");
    let placeholder_type = ph.and_then(|p| p.attr("type")).map(|s| s.to_string());
    let placeholder_idx = ph.and_then(|p| p.attr("idx")).map(|s| s.to_string());

    let transform = node.find_by_local_name("xfrm").map(parse_xfrm).unwrap_or_default();

    let style_xml = node
        .find_by_local_name("spPr")
        .and_then(|p| build_fragment(std::slice::from_ref(p)).ok())
        .unwrap_or_default();
    let style_hash = hash_string(&style_xml);

    let runs = collect_runs(node, settings);

    let content_hash = match kind {
        ShapeKind::Picture => node
            .find_by_local_name("blip")
            .and_then(|b| b.attr("r:embed").or_else(|| b.attr("embed")))
            .map(hash_string)
            .unwrap_or_default(),
        ShapeKind::Table | ShapeKind::Chart | ShapeKind::GraphicFrame => build_fragment(std::slice::from_ref(node))
            .map(|xml| hash_string(&xml))
            .unwrap_or_default(),
        _ => String::new(),
    };

    let mut sig = ShapeSignature {
        id,
        name,
        kind,
        placeholder_type,
        placeholder_idx,
        transform,
        style_hash,
        runs,
        content_hash,
        hash: String::new(),
    };
    sig.rehash();
    Some(sig)
}

fn graphic_frame_kind(node: &XmlNode) -> ShapeKind {
    let xml = build_fragment(std::slice::from_ref(node)).unwrap_or_default();
    if xml.contains("tbl") {
        ShapeKind::Table
    } else if xml.contains("chart") {
        ShapeKind::Chart
    } else {
        ShapeKind::GraphicFrame
    }
}

fn parse_xfrm(xfrm: &XmlNode) -> Transform {
    let rot = xfrm.attr("rot").and_then(|v| v.parse().ok()).unwrap_or(0);
    let off = xfrm.find_by_local_name("off");
    let ext = xfrm.find_by_local_name("ext");
    Transform {
        x: off.and_then(|n| n.attr("x")).and_then(|v| v.parse().ok()).unwrap_or(0),
        y: off.and_then(|n| n.attr("y")).and_then(|v| v.parse().ok()).unwrap_or(0),
        cx: ext.and_then(|n| n.attr("cx")).and_then(|v| v.parse().ok()).unwrap_or(0),
        cy: ext.and_then(|n| n.attr("cy")).and_then(|v| v.parse().ok()).unwrap_or(0),
        rot,
    }
}

fn collect_runs(shape_node: &XmlNode, settings: &PmlSettings) -> Vec<TextRunSignature> {
    let Some(tx_body) = shape_node.find_by_local_name("txBody") else {
        return Vec::new();
    };
    let mut runs = Vec::new();
    for p in tx_body.children_by_local_name("p") {
        for r in p.children_by_local_name("r") {
            let text = r.find_by_local_name("t").map(|t| t.text_content()).unwrap_or_default();
            let rpr_xml = r
                .find_by_local_name("rPr")
                .and_then(|n| build_fragment(std::slice::from_ref(n)).ok())
                .unwrap_or_default();
            let rpr_hash = if settings.compare_text_formatting { hash_string(&rpr_xml) } else { String::new() };
            runs.push(run_signature(text, rpr_hash));
        }
        runs.push(run_signature("\n".to_string(), String::new()));
    }
    runs
}

fn run_signature(text: String, rpr_hash: String) -> TextRunSignature {
    let hash = combine(["run", &text, &rpr_hash]);
    TextRunSignature { text, rpr_hash, hash }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    #[test]
    fn signature_collects_shape_text() {
        let xml = r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/></p:nvSpPr><p:txBody><a:p xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:r><a:t>Hello</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        let sig = signature_for_slide(0, &nodes[0], "layout1", "", &PmlSettings::default());
        assert_eq!(sig.shapes.len(), 1);
        assert!(sig.shapes[0].text().contains("Hello"));
    }
}
