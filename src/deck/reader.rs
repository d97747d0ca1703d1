//! Reading existing `.pptx` decks.
//!
//! Slide order comes from `p:sldIdLst` in the presentation part, resolved
//! through its relationships (not from part names: `slide10.xml` may well
//! be shown before `slide2.xml`). Each slide's shape tree is flattened in
//! draw order; group transforms are applied so every shape's box is in
//! slide coordinates. Placeholders without their own `xfrm` inherit the
//! position of the matching placeholder on the slide layout or master.

use super::package::{local_name, rel_type, resolve_target, Package, PackageError};
use super::{
    BoundingBox, EmuRect, Shape, ShapeContent, Slide, DEFAULT_SLIDE_HEIGHT_EMU,
    DEFAULT_SLIDE_WIDTH_EMU,
};
use crate::error::NarratorError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An existing deck, fully loaded.
#[derive(Debug, Clone)]
pub struct SourceDeck {
    pub path: PathBuf,
    pub width_emu: i64,
    pub height_emu: i64,
    pub slides: Vec<Slide>,
    presentation_part: String,
    package: Package,
}

impl SourceDeck {
    /// Open and parse the deck at `path`.
    pub fn open(path: &Path) -> Result<Self, NarratorError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => NarratorError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => NarratorError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => NarratorError::CorruptDeck {
                path: path.to_path_buf(),
                detail: e.to_string(),
            },
        })?;
        let package = Package::from_reader(BufReader::new(file)).map_err(|e| corrupt(path, e))?;
        Self::from_package(package, path)
    }

    /// Parse an already loaded package; `path` is used in error messages.
    pub fn from_package(package: Package, path: &Path) -> Result<Self, NarratorError> {
        let presentation_part = presentation_part(&package).map_err(|e| corrupt(path, e))?;
        let pres_xml = package
            .part_str(&presentation_part)
            .map_err(|e| corrupt(path, e))?;
        let pres = parse_presentation(pres_xml, &presentation_part).map_err(|e| corrupt(path, e))?;
        let rels = package
            .relationships(&presentation_part)
            .map_err(|e| corrupt(path, e))?;

        let (width_emu, height_emu) = pres
            .slide_size
            .unwrap_or((DEFAULT_SLIDE_WIDTH_EMU, DEFAULT_SLIDE_HEIGHT_EMU));

        let mut ctx = SlideContext {
            package: &package,
            width: width_emu,
            height: height_emu,
            placeholder_cache: HashMap::new(),
        };

        let mut slides = Vec::with_capacity(pres.slide_rel_ids.len());
        for (index, rid) in pres.slide_rel_ids.iter().enumerate() {
            let rel = rels.get(rid).ok_or_else(|| NarratorError::CorruptDeck {
                path: path.to_path_buf(),
                detail: format!("slide relationship '{rid}' is missing"),
            })?;
            let part_name = resolve_target(&presentation_part, &rel.target);
            let slide = ctx
                .read_slide(index, &part_name)
                .map_err(|e| corrupt(path, e))?;
            debug!(
                "Slide {}: {} shapes ({})",
                index + 1,
                slide.shapes.len(),
                part_name
            );
            slides.push(slide);
        }

        info!(
            "Deck loaded: {} slides, {}x{} EMU",
            slides.len(),
            width_emu,
            height_emu
        );

        Ok(Self {
            path: path.to_path_buf(),
            width_emu,
            height_emu,
            slides,
            presentation_part,
            package,
        })
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn presentation_part(&self) -> &str {
        &self.presentation_part
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Give up the parsed model and keep only the raw package.
    pub fn into_package(self) -> Package {
        self.package
    }
}

fn corrupt(path: &Path, e: PackageError) -> NarratorError {
    NarratorError::CorruptDeck {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

fn xml_err(part: &str, e: impl std::fmt::Display) -> PackageError {
    PackageError::Xml {
        part: part.to_string(),
        detail: e.to_string(),
    }
}

/// Name of the main presentation part, from the package root relationships.
pub(crate) fn presentation_part(pkg: &Package) -> Result<String, PackageError> {
    let root = pkg.relationships("")?;
    let part = root
        .first_of_type(rel_type::OFFICE_DOCUMENT)
        .map(|r| r.target.trim_start_matches('/').to_string())
        .unwrap_or_else(|| "ppt/presentation.xml".to_string());
    if pkg.contains(&part) {
        Ok(part)
    } else {
        Err(PackageError::MissingPart(part))
    }
}

// ── presentation.xml ─────────────────────────────────────────────────────

struct PresentationInfo {
    slide_size: Option<(i64, i64)>,
    slide_rel_ids: Vec<String>,
}

fn parse_presentation(xml: &str, part: &str) -> Result<PresentationInfo, PackageError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut info = PresentationInfo {
        slide_size: None,
        slide_rel_ids: Vec::new(),
    };

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sldId" => {
                        if let Some(rid) = attr(e, b"id", true) {
                            info.slide_rel_ids.push(rid);
                        }
                    }
                    b"sldSz" => {
                        let cx = attr_i64(e, b"cx");
                        let cy = attr_i64(e, b"cy");
                        if let (Some(cx), Some(cy)) = (cx, cy) {
                            info.slide_size = Some((cx, cy));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(part, e)),
            _ => {}
        }
    }
    Ok(info)
}

/// Value of attribute `key`. With `prefixed`, only a namespaced attribute
/// (`r:id`) matches; otherwise only the bare name does.
fn attr(e: &BytesStart<'_>, key: &[u8], prefixed: bool) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let full = a.key.as_ref();
        let has_prefix = full.contains(&b':');
        if has_prefix == prefixed && local_name(full) == key {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn attr_i64(e: &BytesStart<'_>, key: &[u8]) -> Option<i64> {
    attr(e, key, false).and_then(|v| v.trim().parse().ok())
}

// ── Slides ───────────────────────────────────────────────────────────────

struct SlideContext<'a> {
    package: &'a Package,
    width: i64,
    height: i64,
    /// Parsed placeholder shapes of layouts and masters, by part name.
    placeholder_cache: HashMap<String, Vec<RawShape>>,
}

impl SlideContext<'_> {
    fn read_slide(&mut self, index: usize, part: &str) -> Result<Slide, PackageError> {
        let xml = self.package.part_str(part)?;
        let raw = parse_shape_tree(xml, part)?;
        let rels = self.package.relationships(part)?;

        let inherited = match rels.first_of_type(rel_type::SLIDE_LAYOUT) {
            Some(layout) => self.inherited_placeholders(&resolve_target(part, &layout.target))?,
            None => Vec::new(),
        };

        let shapes = raw
            .into_iter()
            .map(|r| {
                let rect = r.rect.or_else(|| {
                    r.placeholder
                        .as_ref()
                        .and_then(|ph| find_placeholder_rect(ph, &inherited))
                });
                let content = match r.content {
                    RawContent::Text(t) => ShapeContent::Text(t),
                    RawContent::Table(rows) => ShapeContent::Table(rows),
                    RawContent::Picture(rid) => ShapeContent::Picture(rid.and_then(|rid| {
                        let rel = rels.get(&rid)?;
                        if rel.external {
                            return None;
                        }
                        self.package
                            .part(&resolve_target(part, &rel.target))
                            .map(|b| b.to_vec())
                    })),
                    RawContent::Other => ShapeContent::Other,
                };
                Shape {
                    id: r.id,
                    name: r.name,
                    bounds: rect.and_then(|rect| BoundingBox::from_emu(rect, self.width, self.height)),
                    placeholder: r.placeholder.map(|ph| ph.kind),
                    content,
                }
            })
            .collect();

        let notes = match rels.first_of_type(rel_type::NOTES_SLIDE) {
            Some(n) => {
                let notes_part = resolve_target(part, &n.target);
                match self.package.part_str(&notes_part) {
                    Ok(xml) => notes_body_text(xml, &notes_part)?,
                    Err(PackageError::MissingPart(_)) => None,
                    Err(e) => return Err(e),
                }
            }
            None => None,
        };

        Ok(Slide {
            index,
            part_name: part.to_string(),
            shapes,
            notes,
        })
    }

    /// Placeholders of a layout, followed by those of its master.
    fn inherited_placeholders(&mut self, layout_part: &str) -> Result<Vec<RawShape>, PackageError> {
        let mut out = self.placeholders_of(layout_part)?;
        let layout_rels = self.package.relationships(layout_part)?;
        if let Some(master) = layout_rels.first_of_type(rel_type::SLIDE_MASTER) {
            let master_part = resolve_target(layout_part, &master.target);
            out.extend(self.placeholders_of(&master_part)?);
        }
        Ok(out)
    }

    fn placeholders_of(&mut self, part: &str) -> Result<Vec<RawShape>, PackageError> {
        if let Some(cached) = self.placeholder_cache.get(part) {
            return Ok(cached.clone());
        }
        let shapes = match self.package.part_str(part) {
            Ok(xml) => parse_shape_tree(xml, part)?
                .into_iter()
                .filter(|s| s.placeholder.is_some() && s.rect.is_some())
                .collect(),
            Err(PackageError::MissingPart(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        self.placeholder_cache
            .insert(part.to_string(), shapes.clone());
        Ok(shapes)
    }
}

/// Position of the placeholder matching `ph`: same `idx` first, then same
/// type.
fn find_placeholder_rect(ph: &Placeholder, candidates: &[RawShape]) -> Option<EmuRect> {
    let placeholders = || candidates.iter().filter_map(|c| Some((c.placeholder.as_ref()?, c.rect?)));
    if let Some(idx) = ph.idx.filter(|&i| i > 0) {
        if let Some((_, rect)) = placeholders().find(|(p, _)| p.idx == Some(idx)) {
            return Some(rect);
        }
    }
    let kind = normalise_placeholder_type(&ph.kind);
    placeholders()
        .find(|(p, _)| normalise_placeholder_type(&p.kind) == kind)
        .map(|(_, rect)| rect)
}

fn normalise_placeholder_type(kind: &str) -> &str {
    match kind {
        "ctrTitle" => "title",
        "subTitle" => "body",
        other => other,
    }
}

/// Text of the body placeholder of a notes slide.
pub(crate) fn notes_body_text(xml: &str, part: &str) -> Result<Option<String>, PackageError> {
    let shapes = parse_shape_tree(xml, part)?;
    Ok(shapes.into_iter().find_map(|s| {
        match (s.placeholder.as_ref().map(|p| p.kind.as_str()), s.content) {
            (Some("body"), RawContent::Text(t)) => Some(t),
            _ => None,
        }
    }))
}

// ── Shape tree parsing ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Placeholder {
    /// `type` attribute; `obj` when absent.
    kind: String,
    idx: Option<u32>,
}

#[derive(Debug, Clone)]
enum RawContent {
    Text(String),
    /// Relationship id of the embedded image.
    Picture(Option<String>),
    Table(Vec<Vec<String>>),
    Other,
}

#[derive(Debug, Clone)]
struct RawShape {
    id: u32,
    name: String,
    rect: Option<EmuRect>,
    placeholder: Option<Placeholder>,
    content: RawContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Sp,
    Pic,
    Frame,
    Connector,
}

#[derive(Debug)]
struct ShapeBuilder {
    kind: ShapeKind,
    id: Option<u32>,
    name: String,
    off: Option<(i64, i64)>,
    ext: Option<(i64, i64)>,
    placeholder: Option<Placeholder>,
    has_text_body: bool,
    paragraphs: Vec<String>,
    blip: Option<String>,
    table: Option<Vec<Vec<String>>>,
    /// Paragraphs already written into the current table cell.
    cell_paragraphs: usize,
}

impl ShapeBuilder {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            id: None,
            name: String::new(),
            off: None,
            ext: None,
            placeholder: None,
            has_text_body: false,
            paragraphs: Vec::new(),
            blip: None,
            table: None,
            cell_paragraphs: 0,
        }
    }

    fn current_cell(&mut self) -> Option<&mut String> {
        self.table.as_mut()?.last_mut()?.last_mut()
    }

    /// Append text to the open paragraph (or table cell).
    fn push_text(&mut self, text: &str) {
        if self.table.is_some() {
            if let Some(cell) = self.current_cell() {
                cell.push_str(text);
            }
        } else if let Some(p) = self.paragraphs.last_mut() {
            p.push_str(text);
        }
    }

    fn start_paragraph(&mut self) {
        if self.table.is_some() {
            let first = self.cell_paragraphs == 0;
            self.cell_paragraphs += 1;
            if !first {
                if let Some(cell) = self.current_cell() {
                    cell.push('\n');
                }
            }
        } else {
            self.paragraphs.push(String::new());
        }
    }

    fn finish(self, groups: &[GroupTransform]) -> RawShape {
        let rect = match (self.off, self.ext) {
            (Some((x, y)), Some((cx, cy))) => {
                let rect = EmuRect { x, y, cx, cy };
                Some(groups.iter().rev().fold(rect, |r, g| g.apply(r)))
            }
            _ => None,
        };
        let content = if let Some(rows) = self.table {
            RawContent::Table(rows)
        } else if self.kind == ShapeKind::Pic {
            RawContent::Picture(self.blip)
        } else if self.has_text_body && self.paragraphs.iter().any(|p| !p.trim().is_empty()) {
            RawContent::Text(self.paragraphs.join("\n"))
        } else if self.blip.is_some() {
            RawContent::Picture(self.blip)
        } else if self.has_text_body {
            RawContent::Text(String::new())
        } else {
            RawContent::Other
        };
        RawShape {
            id: self.id.unwrap_or(0),
            name: self.name,
            rect,
            placeholder: self.placeholder,
            content,
        }
    }
}

/// Child → parent coordinate mapping of one `p:grpSp`.
#[derive(Debug, Clone, Copy, Default)]
struct GroupTransform {
    off: (i64, i64),
    ext: (i64, i64),
    ch_off: (i64, i64),
    ch_ext: (i64, i64),
}

impl GroupTransform {
    fn apply(&self, r: EmuRect) -> EmuRect {
        if self.ch_ext.0 <= 0 || self.ch_ext.1 <= 0 || self.ext.0 <= 0 || self.ext.1 <= 0 {
            return r;
        }
        let sx = self.ext.0 as f64 / self.ch_ext.0 as f64;
        let sy = self.ext.1 as f64 / self.ch_ext.1 as f64;
        EmuRect {
            x: self.off.0 + ((r.x - self.ch_off.0) as f64 * sx).round() as i64,
            y: self.off.1 + ((r.y - self.ch_off.1) as f64 * sy).round() as i64,
            cx: (r.cx as f64 * sx).round() as i64,
            cy: (r.cy as f64 * sy).round() as i64,
        }
    }
}

fn point(e: &BytesStart<'_>, kx: &[u8], ky: &[u8]) -> Option<(i64, i64)> {
    Some((attr_i64(e, kx)?, attr_i64(e, ky)?))
}

/// Flatten a `p:spTree` into shapes in draw order.
fn parse_shape_tree(xml: &str, part: &str) -> Result<Vec<RawShape>, PackageError> {
    let mut reader = Reader::from_str(xml);
    // Whitespace inside <a:t> is content.
    reader.trim_text(false);

    let mut shapes = Vec::new();
    let mut groups: Vec<GroupTransform> = Vec::new();
    let mut shape: Option<ShapeBuilder> = None;
    let mut in_group_props = false;
    let mut in_xfrm = false;
    let mut in_t = false;
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| xml_err(part, e))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                let name = e.name();
                match local_name(name.as_ref()) {
                    // Alternate content: the first Choice is kept, Fallback duplicates it.
                    b"Fallback" if is_start => skip_depth = 1,
                    b"grpSp" if is_start && shape.is_none() => groups.push(GroupTransform::default()),
                    b"grpSpPr" if is_start && shape.is_none() => in_group_props = true,
                    b"sp" | b"pic" | b"graphicFrame" | b"cxnSp" if is_start && shape.is_none() => {
                        let kind = match local_name(name.as_ref()) {
                            b"sp" => ShapeKind::Sp,
                            b"pic" => ShapeKind::Pic,
                            b"graphicFrame" => ShapeKind::Frame,
                            _ => ShapeKind::Connector,
                        };
                        shape = Some(ShapeBuilder::new(kind));
                    }
                    b"xfrm" if is_start => in_xfrm = true,
                    b"off" | b"chOff" | b"ext" | b"chExt" if in_xfrm => {
                        let which = local_name(name.as_ref());
                        let value = if which == b"off" || which == b"chOff" {
                            point(e, b"x", b"y")
                        } else {
                            point(e, b"cx", b"cy")
                        };
                        if let Some(v) = value {
                            if let Some(ref mut s) = shape {
                                match which {
                                    b"off" if s.off.is_none() => s.off = Some(v),
                                    b"ext" if s.ext.is_none() => s.ext = Some(v),
                                    _ => {}
                                }
                            } else if in_group_props {
                                if let Some(g) = groups.last_mut() {
                                    match which {
                                        b"off" => g.off = v,
                                        b"ext" => g.ext = v,
                                        b"chOff" => g.ch_off = v,
                                        _ => g.ch_ext = v,
                                    }
                                }
                            }
                        }
                    }
                    b"cNvPr" => {
                        if let Some(ref mut s) = shape {
                            if s.id.is_none() {
                                s.id = attr(e, b"id", false).and_then(|v| v.parse().ok());
                                s.name = attr(e, b"name", false).unwrap_or_default();
                            }
                        }
                    }
                    b"ph" => {
                        if let Some(ref mut s) = shape {
                            s.placeholder = Some(Placeholder {
                                kind: attr(e, b"type", false).unwrap_or_else(|| "obj".to_string()),
                                idx: attr(e, b"idx", false).and_then(|v| v.parse().ok()),
                            });
                        }
                    }
                    b"txBody" => {
                        if let Some(ref mut s) = shape {
                            if s.table.is_none() {
                                s.has_text_body = true;
                            }
                        }
                    }
                    b"p" => {
                        if let Some(ref mut s) = shape {
                            if s.has_text_body || s.table.is_some() {
                                s.start_paragraph();
                            }
                        }
                    }
                    b"br" => {
                        if let Some(ref mut s) = shape {
                            s.push_text("\n");
                        }
                    }
                    b"t" if is_start => in_t = true,
                    b"blip" => {
                        if let Some(ref mut s) = shape {
                            if s.blip.is_none() {
                                s.blip = attr(e, b"embed", true);
                            }
                        }
                    }
                    b"tbl" if is_start => {
                        if let Some(ref mut s) = shape {
                            s.table = Some(Vec::new());
                        }
                    }
                    b"tr" => {
                        if let Some(rows) = shape.as_mut().and_then(|s| s.table.as_mut()) {
                            rows.push(Vec::new());
                        }
                    }
                    b"tc" => {
                        if let Some(ref mut s) = shape {
                            if let Some(row) = s.table.as_mut().and_then(|rows| rows.last_mut()) {
                                row.push(String::new());
                            }
                            s.cell_paragraphs = 0;
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref e) if in_t => {
                if let Some(ref mut s) = shape {
                    let text = e.unescape().map_err(|err| xml_err(part, err))?;
                    s.push_text(&text);
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"t" => in_t = false,
                    b"xfrm" => in_xfrm = false,
                    b"grpSpPr" => in_group_props = false,
                    b"grpSp" if shape.is_none() => {
                        groups.pop();
                    }
                    b"sp" | b"pic" | b"graphicFrame" | b"cxnSp" => {
                        let closes = shape.as_ref().is_some_and(|s| {
                            let kind = match local_name(name.as_ref()) {
                                b"sp" => ShapeKind::Sp,
                                b"pic" => ShapeKind::Pic,
                                b"graphicFrame" => ShapeKind::Frame,
                                _ => ShapeKind::Connector,
                            };
                            s.kind == kind
                        });
                        if closes {
                            if let Some(s) = shape.take() {
                                shapes.push(s.finish(&groups));
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    fn slide(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{body}</p:spTree></p:cSld></p:sld>"#
        )
    }

    #[test]
    fn text_shape_with_geometry() {
        let xml = slide(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
<p:spPr><a:xfrm><a:off x="100" y="200"/><a:ext cx="300" cy="400"/></a:xfrm></p:spPr>
<p:txBody><a:bodyPr/><a:p><a:r><a:t>Hello </a:t></a:r><a:r><a:t>world &amp; more</a:t></a:r></a:p><a:p><a:r><a:t>Line two</a:t></a:r></a:p></p:txBody></p:sp>"#,
        );
        let shapes = parse_shape_tree(&xml, "slide1.xml").unwrap();
        assert_eq!(shapes.len(), 1);
        let s = &shapes[0];
        assert_eq!(s.id, 2);
        assert_eq!(s.name, "Title 1");
        assert_eq!(s.rect, Some(EmuRect { x: 100, y: 200, cx: 300, cy: 400 }));
        assert_eq!(s.placeholder.as_ref().unwrap().kind, "title");
        match &s.content {
            RawContent::Text(t) => assert_eq!(t, "Hello world & more\nLine two"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn picture_and_table() {
        let xml = slide(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="4" name="Picture 3"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>
<p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>
<p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="10" cy="10"/></a:xfrm></p:spPr></p:pic>
<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="5" name="Table 4"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>
<p:xfrm><a:off x="5" y="6"/><a:ext cx="7" cy="8"/></p:xfrm>
<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblGrid><a:gridCol w="1"/></a:tblGrid>
<a:tr h="1"><a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>A1</a:t></a:r></a:p></a:txBody></a:tc><a:tc><a:txBody><a:bodyPr/><a:p/></a:txBody></a:tc></a:tr>
<a:tr h="1"><a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>B1</a:t></a:r></a:p><a:p><a:r><a:t>more</a:t></a:r></a:p></a:txBody></a:tc></a:tr>
</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        );
        let shapes = parse_shape_tree(&xml, "slide1.xml").unwrap();
        assert_eq!(shapes.len(), 2);
        assert!(matches!(&shapes[0].content, RawContent::Picture(Some(r)) if r == "rId2"));
        assert_eq!(shapes[1].rect, Some(EmuRect { x: 5, y: 6, cx: 7, cy: 8 }));
        match &shapes[1].content {
            RawContent::Table(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0], vec!["A1".to_string(), String::new()]);
                assert_eq!(rows[1], vec!["B1\nmore".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn group_transform_maps_children_to_slide_space() {
        let xml = slide(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="9" name="Group"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr><a:xfrm><a:off x="1000" y="1000"/><a:ext cx="2000" cy="2000"/><a:chOff x="0" y="0"/><a:chExt cx="1000" cy="1000"/></a:xfrm></p:grpSpPr>
<p:sp><p:nvSpPr><p:cNvPr id="10" name="Inner"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="100" y="0"/><a:ext cx="500" cy="250"/></a:xfrm></p:spPr></p:sp>
</p:grpSp>"#,
        );
        let shapes = parse_shape_tree(&xml, "slide1.xml").unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(
            shapes[0].rect,
            Some(EmuRect { x: 1200, y: 1000, cx: 1000, cy: 500 })
        );
        assert!(matches!(shapes[0].content, RawContent::Other));
    }

    #[test]
    fn placeholder_inherits_by_idx_then_type() {
        let layout = vec![
            RawShape {
                id: 2,
                name: "Title".into(),
                rect: Some(EmuRect { x: 1, y: 1, cx: 1, cy: 1 }),
                placeholder: Some(Placeholder { kind: "title".into(), idx: None }),
                content: RawContent::Other,
            },
            RawShape {
                id: 3,
                name: "Body".into(),
                rect: Some(EmuRect { x: 2, y: 2, cx: 2, cy: 2 }),
                placeholder: Some(Placeholder { kind: "body".into(), idx: Some(1) }),
                content: RawContent::Other,
            },
        ];
        let title = Placeholder { kind: "ctrTitle".into(), idx: None };
        assert_eq!(find_placeholder_rect(&title, &layout).unwrap().x, 1);
        let content = Placeholder { kind: "obj".into(), idx: Some(1) };
        assert_eq!(find_placeholder_rect(&content, &layout).unwrap().x, 2);
    }

    #[test]
    fn notes_text_comes_from_body_placeholder() {
        let xml = format!(
            r#"<p:notes {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Say hello.</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:notes>"#
        );
        assert_eq!(
            notes_body_text(&xml, "notesSlide1.xml").unwrap().as_deref(),
            Some("Say hello.")
        );
    }

    #[test]
    fn presentation_order_and_size() {
        let xml = format!(
            r#"<p:presentation {NS}><p:sldIdLst><p:sldId id="257" r:id="rId7"/><p:sldId id="256" r:id="rId3"/></p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#
        );
        let info = parse_presentation(&xml, "presentation.xml").unwrap();
        assert_eq!(info.slide_rel_ids, vec!["rId7", "rId3"]);
        assert_eq!(info.slide_size, Some((12_192_000, 6_858_000)));
    }
}
