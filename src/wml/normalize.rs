//! Pre-diff normalization: accept pre-existing tracked revisions, and strip
//! non-semantic identifiers from drawings so identical drawings hash equally
//! across documents.

use crate::xml::node::local_name;
use crate::xml::XmlNode;

/// Accept all tracked revisions already present in a document: insertions
/// are kept (unwrapped), deletions are removed, and property-change markers
/// are dropped in favor of the properties already in force.
///
/// Idempotent: running this on an already-clean document (no revision
/// markup) returns an unchanged tree.
pub fn accept_revisions(node: &XmlNode) -> Option<XmlNode> {
    match node {
        XmlNode::Element { name, attrs, children } => {
            let local = local_name(name);
            match local {
                "del" | "moveFrom" => None,
                "ins" | "moveTo" => {
                    // Unwrap: splice children into the parent in place of this element.
                    // Callers use `accept_children` to flatten the Some(Vec) case; since
                    // this function returns a single Option<XmlNode>, unwrap via a
                    // synthetic fragment marker consumed by `accept_children`.
                    Some(XmlNode::Element {
                        name: "__fragment__".to_string(),
                        attrs: Vec::new(),
                        children: accept_children(children),
                    })
                }
                "rPrChange" | "pPrChange" | "tblPrChange" | "trPrChange" | "tcPrChange" | "sectPrChange" => None,
                _ => Some(XmlNode::Element {
                    name: name.clone(),
                    attrs: attrs.clone(),
                    children: accept_children(children),
                }),
            }
        }
        other => Some(other.clone()),
    }
}

fn accept_children(children: &[XmlNode]) -> Vec<XmlNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        if let Some(accepted) = accept_revisions(child) {
            if let XmlNode::Element { name, children, .. } = &accepted {
                if name == "__fragment__" {
                    out.extend(children.iter().cloned());
                    continue;
                }
            }
            out.push(accepted);
        }
    }
    out
}

/// Strip `@id`/`@name` from `wp:docPr` inside drawings so two structurally
/// identical drawings hash equally even if Word assigned them different ids.
pub fn strip_drawing_ids(node: &XmlNode) -> XmlNode {
    match node {
        XmlNode::Element { name, attrs, children } => {
            let local = local_name(name);
            let new_attrs = if local == "docPr" {
                attrs
                    .iter()
                    .filter(|(k, _)| local_name(k) != "id" && local_name(k) != "name")
                    .cloned()
                    .collect()
            } else {
                attrs.clone()
            };
            XmlNode::Element {
                name: name.clone(),
                attrs: new_attrs,
                children: children.iter().map(strip_drawing_ids).collect(),
            }
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    #[test]
    fn accept_revisions_keeps_insertions_and_drops_deletions() {
        let xml = r#"<w:p><w:ins><w:r><w:t>new</w:t></w:r></w:ins><w:del><w:r><w:delText>old</w:delText></w:r></w:del></w:p>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        let accepted = accept_revisions(&nodes[0]).unwrap();
        let text = accepted.text_content();
        assert!(text.contains("new"));
        assert!(!text.contains("old"));
    }

    #[test]
    fn accept_revisions_is_idempotent_on_clean_document() {
        let xml = r#"<w:p><w:r><w:t>hello</w:t></w:r></w:p>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        let once = accept_revisions(&nodes[0]).unwrap();
        let twice = accept_revisions(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn strip_drawing_ids_removes_id_and_name() {
        let xml = r#"<w:drawing><wp:docPr id="1" name="Picture 1" descr="x"/></w:drawing>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        let stripped = strip_drawing_ids(&nodes[0]);
        let doc_pr = stripped.find_by_local_name("docPr").unwrap();
        assert!(doc_pr.attr("id").is_none());
        assert!(doc_pr.attr("name").is_none());
        assert_eq!(doc_pr.attr("descr"), Some("x"));
    }
}
