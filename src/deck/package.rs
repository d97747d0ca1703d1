//! In-memory OPC package: the zip container behind every `.pptx`.
//!
//! A package is loaded whole, edited part by part, and written back in one
//! pass. Parts are kept in a `BTreeMap` so the written archive is
//! deterministic: identical edits always produce byte-identical files.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Relationship type URIs used by this crate.
pub mod rel_type {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const NOTES_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
    pub const NOTES_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
}

/// Content types used by this crate.
pub mod content_type {
    pub const RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const XML: &str = "application/xml";
    pub const PNG: &str = "image/png";
    pub const PRESENTATION: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const SLIDE_LAYOUT: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
    pub const SLIDE_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
    pub const NOTES_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
    pub const NOTES_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml";
    pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
}

/// Failure while reading or writing a package.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml in '{part}': {detail}")]
    Xml { part: String, detail: String },
    #[error("missing part '{0}'")]
    MissingPart(String),
}

/// All parts of a package, keyed by part name (no leading slash).
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every entry of a zip archive into memory.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, PackageError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.insert(file.name().trim_start_matches('/').to_string(), data);
        }
        Ok(Self { parts })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(|v| v.as_slice())
    }

    /// A part decoded as UTF-8 text.
    pub fn part_str(&self, name: &str) -> Result<&str, PackageError> {
        let bytes = self
            .part(name)
            .ok_or_else(|| PackageError::MissingPart(name.to_string()))?;
        std::str::from_utf8(bytes).map_err(|e| PackageError::Xml {
            part: name.to_string(),
            detail: e.to_string(),
        })
    }

    /// Insert or replace a part.
    pub fn put(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.parts.insert(name.into(), data.into());
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(|k| k.as_str())
    }

    /// Smallest `n ≥ 1` such that `{prefix}{n}{suffix}` is not a part yet.
    pub fn next_free_name(&self, prefix: &str, suffix: &str) -> (usize, String) {
        (1..)
            .map(|n| (n, format!("{prefix}{n}{suffix}")))
            .find(|(_, name)| !self.contains(name))
            .unwrap_or_else(|| (0, format!("{prefix}0{suffix}")))
    }

    /// Relationships of `part`, empty when it has no `.rels` part.
    pub fn relationships(&self, part: &str) -> Result<Relationships, PackageError> {
        let rels_name = rels_part_name(part);
        match self.part(&rels_name) {
            None => Ok(Relationships::default()),
            Some(_) => Relationships::parse(self.part_str(&rels_name)?, &rels_name),
        }
    }

    pub fn put_relationships(&mut self, part: &str, rels: &Relationships) {
        self.put(rels_part_name(part), rels.to_xml());
    }

    pub fn content_types(&self) -> Result<ContentTypes, PackageError> {
        ContentTypes::parse(self.part_str(CONTENT_TYPES_PART)?)
    }

    pub fn put_content_types(&mut self, types: &ContentTypes) {
        self.put(CONTENT_TYPES_PART, types.to_xml());
    }

    /// Write the package as a zip archive.
    ///
    /// `[Content_Types].xml` goes first, every other part follows in name
    /// order, and all entries carry the zip epoch timestamp so repeated
    /// saves of the same content are byte-identical.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, PackageError> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        if let Some(types) = self.parts.get(CONTENT_TYPES_PART) {
            zip.start_file(CONTENT_TYPES_PART, options)?;
            zip.write_all(types)?;
        }
        for (name, data) in &self.parts {
            if name == CONTENT_TYPES_PART {
                continue;
            }
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }
        Ok(zip.finish()?)
    }
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns it.
///
/// `("ppt/slides/slide1.xml", "../media/image1.png")` → `ppt/media/image1.png`.
/// Absolute targets (`/ppt/…`) are taken from the package root.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        source_part
            .rsplit_once('/')
            .map(|(dir, _)| dir.split('/').collect())
            .unwrap_or_default()
    };
    for seg in target.trim_start_matches('/').split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Path of `target_part` relative to the directory of `source_part`.
///
/// `("ppt/slides/slide1.xml", "ppt/media/image1.png")` → `../media/image1.png`.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    let target: Vec<&str> = target_part.split('/').collect();
    let common = source_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out: Vec<&str> = vec![".."; source_dir.len() - common];
    out.extend_from_slice(&target[common..]);
    out.join("/")
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

// ── Relationships ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The contents of one `.rels` part, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    pub items: Vec<Relationship>,
}

impl Relationships {
    pub fn parse(xml: &str, part_name: &str) -> Result<Self, PackageError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut items = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let mut rel = Relationship {
                        id: String::new(),
                        rel_type: String::new(),
                        target: String::new(),
                        external: false,
                    };
                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map(|v| v.into_owned())
                            .unwrap_or_default();
                        match attr.key.as_ref() {
                            b"Id" => rel.id = value,
                            b"Type" => rel.rel_type = value,
                            b"Target" => rel.target = value,
                            b"TargetMode" => rel.external = value == "External",
                            _ => {}
                        }
                    }
                    items.push(rel);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(PackageError::Xml {
                        part: part_name.to_string(),
                        detail: e.to_string(),
                    })
                }
                _ => {}
            }
        }
        Ok(Self { items })
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    pub fn first_of_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.rel_type == rel_type)
    }

    /// Add a relationship and return its freshly allocated id.
    pub fn add(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        let id = (1..)
            .map(|n| format!("rId{n}"))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or_else(|| "rId0".to_string());
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            external: false,
        });
        id
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.items.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for rel in &self.items {
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(&rel.id),
                escape_xml(&rel.rel_type),
                escape_xml(&rel.target),
                if rel.external {
                    r#" TargetMode="External""#
                } else {
                    ""
                }
            );
        }
        xml.push_str("</Relationships>");
        xml
    }
}

// ── Content types ────────────────────────────────────────────────────────

/// The contents of `[Content_Types].xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// `(extension, content type)`
    pub defaults: Vec<(String, String)>,
    /// `(part name with leading slash, content type)`
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(xml: &str) -> Result<Self, PackageError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut types = ContentTypes::default();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    let kind = local_name(name.as_ref());
                    if kind != b"Default" && kind != b"Override" {
                        continue;
                    }
                    let mut key = String::new();
                    let mut value = String::new();
                    for attr in e.attributes().flatten() {
                        let v = attr
                            .unescape_value()
                            .map(|v| v.into_owned())
                            .unwrap_or_default();
                        match attr.key.as_ref() {
                            b"Extension" | b"PartName" => key = v,
                            b"ContentType" => value = v,
                            _ => {}
                        }
                    }
                    if kind == b"Default" {
                        types.defaults.push((key, value));
                    } else {
                        types.overrides.push((key, value));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(PackageError::Xml {
                        part: CONTENT_TYPES_PART.to_string(),
                        detail: e.to_string(),
                    })
                }
                _ => {}
            }
        }
        Ok(types)
    }

    /// Register a default content type for an extension, if not present.
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        if !self
            .defaults
            .iter()
            .any(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        {
            self.defaults
                .push((extension.to_string(), content_type.to_string()));
        }
    }

    /// Register (or replace) the content type of one part.
    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let part_name = format!("/{}", part.trim_start_matches('/'));
        match self.overrides.iter_mut().find(|(p, _)| *p == part_name) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.overrides.push((part_name, content_type.to_string())),
        }
    }

    pub fn override_for(&self, part: &str) -> Option<&str> {
        let part_name = format!("/{}", part.trim_start_matches('/'));
        self.overrides
            .iter()
            .find(|(p, _)| *p == part_name)
            .map(|(_, t)| t.as_str())
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512 + self.overrides.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        for (ext, ct) in &self.defaults {
            let _ = write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(ct)
            );
        }
        for (part, ct) in &self.overrides {
            let _ = write!(
                xml,
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(part),
                escape_xml(ct)
            );
        }
        xml.push_str("</Types>");
        xml
    }
}
