//! The OPC package: an in-memory ZIP-backed container of parts and
//! relationships, operating entirely over byte buffers per the core's
//! synchronous, filesystem-free contract (the CLI front-end is the only
//! thing that touches disk).

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::opc::constants::content_type as ct;
use crate::opc::constants::{relationship_type, target_mode};
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{PackUri, CONTENT_TYPES_URI, PACKAGE_URI};
use crate::opc::part::Part;
use crate::opc::rel::Relationships;

/// A ZIP-backed OOXML package: parts plus package-level relationships.
#[derive(Debug, Clone)]
pub struct OpcPackage {
    parts: HashMap<PackUri, Part>,
    rels: Relationships,
    /// Extension -> content type declared by `<Default>` entries, kept
    /// alongside per-part overrides so `save()` reproduces the same split.
    default_content_types: HashMap<String, String>,
}

impl OpcPackage {
    /// An empty package with no parts.
    pub fn create() -> Self {
        Self {
            parts: HashMap::new(),
            rels: Relationships::new(PACKAGE_URI),
            default_content_types: default_defaults(),
        }
    }

    /// Open a package from an in-memory ZIP buffer.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|_| OpcError::InvalidPackage("not a valid ZIP archive".to_string()))?;

        let mut raw: HashMap<String, Vec<u8>> = HashMap::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            raw.insert(file.name().to_string(), buf);
        }

        let content_types_blob = raw
            .get(CONTENT_TYPES_URI.trim_start_matches('/'))
            .ok_or_else(|| OpcError::InvalidPackage("missing [Content_Types].xml".to_string()))?;
        let content_types = ContentTypeMap::parse(content_types_blob)?;

        let mut pkg = Self {
            parts: HashMap::new(),
            rels: Relationships::new(PACKAGE_URI),
            default_content_types: content_types.defaults.clone(),
        };

        let package_uri = PackUri::new(PACKAGE_URI).unwrap();
        let pkg_rels_member = package_uri.rels_uri().unwrap().membername().to_string();
        if let Some(rels_blob) = raw.get(&pkg_rels_member) {
            pkg.rels = parse_rels_xml(rels_blob, PACKAGE_URI)?;
        }

        let membernames: Vec<String> = raw.keys().cloned().collect();
        for membername in &membernames {
            if membername == CONTENT_TYPES_URI.trim_start_matches('/') || membername.ends_with(".rels") {
                continue;
            }
            let partname =
                PackUri::new(format!("/{}", membername)).map_err(OpcError::InvalidPackUri)?;
            let content_type = content_types.get(&partname)?;
            let blob = raw.remove(membername).unwrap();
            let mut part = Part::new(content_type, blob, partname.base_uri());

            let rels_uri = partname.rels_uri().map_err(OpcError::InvalidPackUri)?;
            if let Some(part_rels_blob) = raw.get(rels_uri.membername()) {
                *part.rels_mut() = parse_rels_xml(part_rels_blob, partname.base_uri())?;
            }

            pkg.parts.insert(partname, part);
        }

        Ok(pkg)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::open(&bytes)
    }

    pub fn part(&self, uri: &PackUri) -> Option<&Part> {
        self.parts.get(uri)
    }

    pub fn part_mut(&mut self, uri: &PackUri) -> Option<&mut Part> {
        self.parts.get_mut(uri)
    }

    pub fn parts(&self) -> impl Iterator<Item = (&PackUri, &Part)> {
        self.parts.iter()
    }

    pub fn exists(&self, uri: &PackUri) -> bool {
        self.parts.contains_key(uri)
    }

    pub fn create_part(
        &mut self,
        uri: PackUri,
        content_type: impl Into<String>,
        blob: Vec<u8>,
    ) -> &mut Part {
        let base = uri.base_uri().to_string();
        self.parts.insert(uri.clone(), Part::new(content_type, blob, base));
        self.parts.get_mut(&uri).unwrap()
    }

    /// Package-level relationships, or a part's own relationships if `part`
    /// is given. A missing `.rels` file yields an empty list, never an error.
    pub fn relationships(&self, part: Option<&PackUri>) -> &Relationships {
        static EMPTY: std::sync::OnceLock<Relationships> = std::sync::OnceLock::new();
        match part {
            None => &self.rels,
            Some(uri) => self
                .parts
                .get(uri)
                .map(|p| p.rels())
                .unwrap_or_else(|| EMPTY.get_or_init(|| Relationships::new(PACKAGE_URI))),
        }
    }

    pub fn relationships_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Resolve the package's main document/workbook/presentation part.
    pub fn main_part(&self) -> Result<(&PackUri, &Part)> {
        let rel = self
            .rels
            .part_with_reltype(relationship_type::OFFICE_DOCUMENT)
            .map_err(OpcError::RelationshipNotFound)?;
        let partname = rel.target_partname().map_err(OpcError::InvalidPackUri)?;
        self.parts
            .get_key_value(&partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Serialize to ZIP bytes. Every part is written exactly once; file
    /// modification times are pinned for byte-determinism.
    pub fn save(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buf);
            let options = fixed_options();

            let cti = ContentTypeMap::from_package(self);
            writer.start_file(CONTENT_TYPES_URI.trim_start_matches('/'), options)?;
            writer.write_all(cti.to_xml().as_bytes())?;

            if !self.rels.is_empty() {
                let package_uri = PackUri::new(PACKAGE_URI).unwrap();
                let rels_uri = package_uri.rels_uri().map_err(OpcError::InvalidPackUri)?;
                writer.start_file(rels_uri.membername(), options)?;
                writer.write_all(self.rels.to_xml().as_bytes())?;
            }

            let mut partnames: Vec<&PackUri> = self.parts.keys().collect();
            partnames.sort();
            for partname in partnames {
                let part = &self.parts[partname];
                writer.start_file(partname.membername(), options)?;
                writer.write_all(part.blob())?;

                if !part.rels().is_empty() {
                    let rels_uri = partname.rels_uri().map_err(OpcError::InvalidPackUri)?;
                    writer.start_file(rels_uri.membername(), options)?;
                    writer.write_all(part.rels().to_xml().as_bytes())?;
                }
            }

            writer.finish()?;
        }
        Ok(buf.into_inner())
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::create()
    }
}

fn fixed_options() -> SimpleFileOptions {
    // Pinned so save() is byte-deterministic modulo this constant, per the
    // determinism requirement (implementations SHOULD fix ZIP timestamps).
    let fixed = zip::DateTime::from_date_and_time(2023, 1, 1, 0, 0, 0).unwrap();
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(6))
        .last_modified_time(fixed)
}

fn default_defaults() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
    m.insert("xml".to_string(), ct::XML.to_string());
    m
}

/// `[Content_Types].xml`'s Default and Override entries.
struct ContentTypeMap {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut defaults = HashMap::new();
        let mut overrides = HashMap::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) => {
                    let local = e.local_name();
                    match local.as_ref() {
                        b"Default" => {
                            let (ext, ct) = extract_two(&e, b"Extension", b"ContentType");
                            if let (Some(ext), Some(ct)) = (ext, ct) {
                                defaults.insert(ext, ct);
                            }
                        }
                        b"Override" => {
                            let (pn, ct) = extract_two(&e, b"PartName", b"ContentType");
                            if let (Some(pn), Some(ct)) = (pn, ct) {
                                overrides.insert(pn, ct);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { defaults, overrides })
    }

    fn get(&self, partname: &PackUri) -> Result<String> {
        if let Some(ct) = self.overrides.get(partname.as_str()) {
            return Ok(ct.clone());
        }
        if let Some(ct) = self.defaults.get(partname.ext()) {
            return Ok(ct.clone());
        }
        Err(OpcError::ContentTypeNotFound(partname.to_string()))
    }

    fn from_package(package: &OpcPackage) -> Self {
        let mut defaults = package.default_content_types.clone();
        let mut overrides = HashMap::new();

        for (partname, part) in package.parts.iter() {
            let ext = partname.ext();
            match defaults.get(ext) {
                Some(existing) if existing == part.content_type() => {}
                Some(_) => {
                    overrides.insert(partname.to_string(), part.content_type().to_string());
                }
                None => {
                    defaults.insert(ext.to_string(), part.content_type().to_string());
                }
            }
        }

        Self { defaults, overrides }
    }

    fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512 + (self.defaults.len() + self.overrides.len()) * 96);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);

        let mut exts: Vec<&String> = self.defaults.keys().collect();
        exts.sort();
        for ext in exts {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(&self.defaults[ext])
            ));
        }

        let mut partnames: Vec<&String> = self.overrides.keys().collect();
        partnames.sort();
        for partname in partnames {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(&self.overrides[partname])
            ));
        }

        xml.push_str("</Types>");
        xml
    }
}

fn extract_two(e: &quick_xml::events::BytesStart, k1: &[u8], k2: &[u8]) -> (Option<String>, Option<String>) {
    let mut v1 = None;
    let mut v2 = None;
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == k1 {
            v1 = Some(attr.unescape_value().unwrap_or_default().into_owned());
        } else if attr.key.as_ref() == k2 {
            v2 = Some(attr.unescape_value().unwrap_or_default().into_owned());
        }
    }
    (v1, v2)
}

fn parse_rels_xml(xml: &[u8], base_uri: &str) -> Result<Relationships> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut rels = Relationships::new(base_uri);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) | Event::Start(e) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = None;
                    let mut reltype = None;
                    let mut target = None;
                    let mut is_external = false;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => id = Some(attr.unescape_value().unwrap_or_default().into_owned()),
                            b"Type" => reltype = Some(attr.unescape_value().unwrap_or_default().into_owned()),
                            b"Target" => target = Some(attr.unescape_value().unwrap_or_default().into_owned()),
                            b"TargetMode" => {
                                is_external = attr
                                    .unescape_value()
                                    .map(|v| v == target_mode::EXTERNAL)
                                    .unwrap_or(false)
                            }
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(reltype), Some(target)) = (id, reltype, target) {
                        rels.add_relationship(id, reltype, target, is_external);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
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

    fn minimal_docx_bytes() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buf);
            let options = SimpleFileOptions::default();

            writer.start_file("[Content_Types].xml", options).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#,
                )
                .unwrap();

            writer.start_file("_rels/.rels", options).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#,
                )
                .unwrap();

            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(b"<w:document/>").unwrap();

            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn open_resolves_main_part() {
        let bytes = minimal_docx_bytes();
        let pkg = OpcPackage::open(&bytes).unwrap();
        let (uri, part) = pkg.main_part().unwrap();
        assert_eq!(uri.as_str(), "/word/document.xml");
        assert_eq!(part.blob(), b"<w:document/>");
    }

    #[test]
    fn round_trip_save_reopen() {
        let bytes = minimal_docx_bytes();
        let pkg = OpcPackage::open(&bytes).unwrap();
        let saved = pkg.save().unwrap();
        let reopened = OpcPackage::open(&saved).unwrap();
        let (_, part) = reopened.main_part().unwrap();
        assert_eq!(part.blob(), b"<w:document/>");
    }

    #[test]
    fn missing_rels_file_is_empty_not_error() {
        let mut pkg = OpcPackage::create();
        let uri = PackUri::new("/word/document.xml").unwrap();
        pkg.create_part(uri.clone(), ct::WML_DOCUMENT_MAIN, b"<w:document/>".to_vec());
        assert!(pkg.relationships(Some(&uri)).is_empty());
    }
}
