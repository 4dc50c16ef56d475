//! A small, namespace-aware XML tree used as the common substrate for the
//! WML/SML/PML engines' canonicalization and emission passes.
//!
//! Parsing is idempotent with `build`: attributes, text (including
//! whitespace), CDATA, and comments round-trip; element order is preserved.
//! Namespace prefixes are kept as written rather than canonicalized, since
//! Office applications can be picky about a specific prefix surviving in
//! mixed content — only the effective binding is guaranteed, per the
//! component design's namespace contract.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Cursor;

use crate::error::{CompareError, Result};

/// One node of the parsed XML tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// An element, with its attributes in source order and its children.
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<XmlNode>,
    },
    Text(String),
    CData(String),
    Comment(String),
}

impl XmlNode {
    pub fn element<S: Into<String>>(name: S) -> Self {
        XmlNode::Element {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr<S: Into<String>>(mut self, key: S, value: S) -> Self {
        if let XmlNode::Element { attrs, .. } = &mut self {
            attrs.push((key.into(), value.into()));
        }
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        if let XmlNode::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            XmlNode::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            XmlNode::Element { attrs, .. } => {
                attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
            }
            _ => None,
        }
    }

    pub fn children(&self) -> &[XmlNode] {
        match self {
            XmlNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Concatenated text content of this node's descendants, depth-first.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
            XmlNode::Element { children, .. } => {
                for c in children {
                    c.collect_text(out);
                }
            }
            XmlNode::Comment(_) => {}
        }
    }

    /// Depth-first search for the first descendant element matching `pred`.
    pub fn find<'a>(&'a self, pred: &dyn Fn(&XmlNode) -> bool) -> Option<&'a XmlNode> {
        if pred(self) {
            return Some(self);
        }
        for child in self.children() {
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Depth-first collection of all descendants (including self) matching `pred`.
    pub fn find_all<'a>(&'a self, pred: &dyn Fn(&XmlNode) -> bool, out: &mut Vec<&'a XmlNode>) {
        if pred(self) {
            out.push(self);
        }
        for child in self.children() {
            child.find_all(pred, out);
        }
    }

    /// Find the first descendant element by local name (ignoring namespace prefix).
    pub fn find_by_local_name<'a>(&'a self, local: &str) -> Option<&'a XmlNode> {
        self.find(&|n| n.name().map(|n| local_name(n) == local).unwrap_or(false))
    }

    pub fn children_by_local_name<'a>(&'a self, local: &str) -> Vec<&'a XmlNode> {
        self.children()
            .iter()
            .filter(|n| n.name().map(|n| local_name(n) == local).unwrap_or(false))
            .collect()
    }
}

/// Strip a namespace prefix, returning the local part (`w:p` -> `p`).
pub fn local_name(qname: &str) -> &str {
    qname.split(':').next_back().unwrap_or(qname)
}

/// Parse an XML byte buffer into a forest of top-level nodes (normally one
/// root element, but comments/PIs before the root are preserved as siblings).
pub fn parse(bytes: &[u8]) -> Result<Vec<XmlNode>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut roots: Vec<XmlNode> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| CompareError::MalformedXml {
                part: String::new(),
                source: e,
            })?;

        match event {
            Event::Start(e) => stack.push(start_to_node(&e)?),
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    CompareError::DiffInternal("unbalanced XML end tag".to_string())
                })?;
                push_node(&mut stack, &mut roots, node);
            }
            Event::Empty(e) => {
                let node = start_to_node(&e)?;
                push_node(&mut stack, &mut roots, node);
            }
            Event::Text(t) => {
                let text = decode(&t)?;
                push_node(&mut stack, &mut roots, XmlNode::Text(text));
            }
            Event::CData(c) => {
                let text = decode_cdata(&c)?;
                push_node(&mut stack, &mut roots, XmlNode::CData(text));
            }
            Event::Comment(c) => {
                let text = decode(&c)?;
                push_node(&mut stack, &mut roots, XmlNode::Comment(text));
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
        buf.clear();
    }

    Ok(roots)
}

fn push_node(stack: &mut [XmlNode], roots: &mut Vec<XmlNode>, node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        if let XmlNode::Element { children, .. } = parent {
            children.push(node);
            return;
        }
    }
    roots.push(node);
}

fn start_to_node(e: &BytesStart) -> Result<XmlNode> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| CompareError::DiffInternal(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|c| c.into_owned())
            .unwrap_or_default();
        attrs.push((key, value));
    }
    Ok(XmlNode::Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn decode(bytes: &[u8]) -> Result<String> {
    let raw = String::from_utf8_lossy(bytes);
    quick_xml::escape::unescape(&raw)
        .map(|c| c.into_owned())
        .map_err(|e| CompareError::MalformedXml {
            part: String::new(),
            source: quick_xml::Error::EscapeError(e),
        })
}

fn decode_cdata(c: &BytesCData) -> Result<String> {
    Ok(String::from_utf8_lossy(c.as_ref()).into_owned())
}

/// Serialize a forest of nodes back to XML bytes, with an XML declaration.
pub fn build(nodes: &[XmlNode]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(|e| CompareError::DiffInternal(e.to_string()))?;

    for node in nodes {
        write_node(&mut writer, node)?;
    }

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| CompareError::DiffInternal(e.to_string()))
}

/// Serialize a forest of nodes without an XML declaration, for embedding a
/// subtree (a run, a structural token's content) inside a larger document.
pub fn build_fragment(nodes: &[XmlNode]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    for node in nodes {
        write_node(&mut writer, node)?;
    }
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| CompareError::DiffInternal(e.to_string()))
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<()> {
    match node {
        XmlNode::Element {
            name,
            attrs,
            children,
        } => {
            let mut start = BytesStart::new(name.as_str());
            for (k, v) in attrs {
                start.push_attribute((k.as_str(), v.as_str()));
            }
            if children.is_empty() {
                writer
                    .write_event(Event::Empty(start))
                    .map_err(|e| CompareError::DiffInternal(e.to_string()))?;
            } else {
                writer
                    .write_event(Event::Start(start))
                    .map_err(|e| CompareError::DiffInternal(e.to_string()))?;
                for child in children {
                    write_node(writer, child)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(name.as_str())))
                    .map_err(|e| CompareError::DiffInternal(e.to_string()))?;
            }
        }
        XmlNode::Text(t) => {
            writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(|e| CompareError::DiffInternal(e.to_string()))?;
        }
        XmlNode::CData(t) => {
            writer
                .write_event(Event::CData(BytesCData::new(t)))
                .map_err(|e| CompareError::DiffInternal(e.to_string()))?;
        }
        XmlNode::Comment(t) => {
            writer
                .write_event(Event::Comment(quick_xml::events::BytesText::new(t)))
                .map_err(|e| CompareError::DiffInternal(e.to_string()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_build_parse_is_idempotent() {
        let xml = r#"<root xmlns:w="urn:x"><w:p w:id="1">hello <!--c-->world</w:p></root>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        let rebuilt = build(&nodes).unwrap();
        let reparsed = parse(rebuilt.as_bytes()).unwrap();
        assert_eq!(nodes, reparsed);
    }

    #[test]
    fn preserves_attribute_order_and_text() {
        let xml = r#"<a x="1" y="2">text</a>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        match &nodes[0] {
            XmlNode::Element { attrs, children, .. } => {
                assert_eq!(attrs, &[("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())]);
                assert_eq!(children[0], XmlNode::Text("text".to_string()));
            }
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn local_name_strips_prefix() {
        assert_eq!(local_name("w:p"), "p");
        assert_eq!(local_name("p"), "p");
    }
}
