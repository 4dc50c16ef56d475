//! Relationships: typed links between a source part (or the package) and a
//! target part or external URI.

use std::collections::HashMap;

use crate::opc::constants::target_mode;
use crate::opc::packuri::PackUri;

/// One relationship entry: `(Id, Type URI, Target URI, TargetMode)`.
#[derive(Debug, Clone)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    base_uri: String,
    is_external: bool,
}

impl Relationship {
    pub fn new(
        r_id: impl Into<String>,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        base_uri: impl Into<String>,
        is_external: bool,
    ) -> Self {
        Self {
            r_id: r_id.into(),
            reltype: reltype.into(),
            target_ref: target_ref.into(),
            base_uri: base_uri.into(),
            is_external,
        }
    }

    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Resolve the target as an absolute PackUri. Errors for external targets.
    pub fn target_partname(&self) -> Result<PackUri, String> {
        if self.is_external {
            return Err(format!("relationship {} targets an external URI", self.r_id));
        }
        PackUri::from_rel_ref(&self.base_uri, &self.target_ref)
    }
}

/// The set of relationships originating from one source (a part or the package).
#[derive(Debug, Clone)]
pub struct Relationships {
    base_uri: String,
    rels: HashMap<String, Relationship>,
}

impl Relationships {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: HashMap::new(),
        }
    }

    pub fn add_relationship(&mut self, r_id: impl Into<String>, reltype: impl Into<String>, target_ref: impl Into<String>, is_external: bool) {
        let r_id = r_id.into();
        let rel = Relationship::new(r_id.clone(), reltype, target_ref, self.base_uri.clone(), is_external);
        self.rels.insert(r_id, rel);
    }

    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// Add a relationship if one with the same reltype+target doesn't already
    /// exist, returning its r_id either way.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str, is_external: bool) -> String {
        if let Some(existing) = self
            .rels
            .values()
            .find(|r| r.reltype == reltype && r.target_ref == target_ref && r.is_external == is_external)
        {
            return existing.r_id.clone();
        }
        let r_id = self.next_r_id();
        self.add_relationship(r_id.clone(), reltype, target_ref, is_external);
        r_id
    }

    fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self
            .rels
            .keys()
            .filter_map(|k| k.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
            .collect();
        used.sort_unstable();
        let mut candidate = 1u32;
        for n in used {
            if n == candidate {
                candidate += 1;
            } else if n > candidate {
                break;
            }
        }
        format!("rId{}", candidate)
    }

    /// Look up the single relationship of a given type, erroring if zero or
    /// more than one match (used to resolve e.g. the main document part).
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship, String> {
        let matches: Vec<&Relationship> = self.rels.values().filter(|r| r.reltype == reltype).collect();
        match matches.len() {
            0 => Err(format!("no relationship of type {}", reltype)),
            1 => Ok(matches[0]),
            n => Err(format!("{} relationships of type {}, expected exactly one", n, reltype)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    pub fn len(&self) -> usize {
        self.rels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// Serialize as a `.rels` XML document, entries sorted by Id for
    /// deterministic output.
    pub fn to_xml(&self) -> String {
        let mut entries: Vec<&Relationship> = self.rels.values().collect();
        entries.sort_by(|a, b| a.r_id.cmp(&b.r_id));

        let mut xml = String::with_capacity(256 + entries.len() * 96);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        for rel in entries {
            xml.push_str(r#"<Relationship Id=""#);
            xml.push_str(&escape_xml(&rel.r_id));
            xml.push_str(r#"" Type=""#);
            xml.push_str(&escape_xml(&rel.reltype));
            xml.push_str(r#"" Target=""#);
            xml.push_str(&escape_xml(&rel.target_ref));
            xml.push('"');
            if rel.is_external {
                xml.push_str(r#" TargetMode=""#);
                xml.push_str(target_mode::EXTERNAL);
                xml.push('"');
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_r_id_fills_gaps() {
        let mut rels = Relationships::new("/word");
        rels.add_relationship("rId1", "type", "target1", false);
        rels.add_relationship("rId3", "type", "target3", false);
        assert_eq!(rels.next_r_id(), "rId2");
    }

    #[test]
    fn get_or_add_reuses_existing_relationship() {
        let mut rels = Relationships::new("/word");
        let id1 = rels.get_or_add("reltype", "target.xml", false);
        let id2 = rels.get_or_add("reltype", "target.xml", false);
        assert_eq!(id1, id2);
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn part_with_reltype_errors_on_ambiguity() {
        let mut rels = Relationships::new("/");
        rels.add_relationship("rId1", "sametype", "a.xml", false);
        rels.add_relationship("rId2", "sametype", "b.xml", false);
        assert!(rels.part_with_reltype("sametype").is_err());
    }
}
