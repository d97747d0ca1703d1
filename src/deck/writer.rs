//! Writing narrated decks.
//!
//! [`OutputDeck`] edits a [`Package`] in memory: it appends blank slides,
//! embeds PNG pictures, and creates or replaces notes slides. Nothing
//! touches the filesystem until [`OutputDeck::save`], which writes to a
//! temporary file next to the target and renames it into place.

use super::package::{
    content_type, escape_xml, local_name, rel_type, relative_target, resolve_target,
    ContentTypes, Package, PackageError, Relationships,
};
use super::reader::notes_body_text;
use super::{templates, EmuRect, SourceDeck};
use crate::error::NarratorError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt::Write as _;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;
use tracing::{debug, info};

const NS_DECL: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

/// Identifies one slide of an [`OutputDeck`] by presentation position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideHandle(usize);

impl SlideHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The deck under construction.
#[derive(Debug, Clone)]
pub struct OutputDeck {
    package: Package,
    types: ContentTypes,
    presentation_part: String,
    slide_parts: Vec<String>,
    width_emu: i64,
    height_emu: i64,
}

fn assembly(e: impl std::fmt::Display) -> NarratorError {
    NarratorError::DeckAssembly(e.to_string())
}

impl OutputDeck {
    /// An empty deck of `width × height` EMU with a blank layout.
    pub fn new(width_emu: i64, height_emu: i64) -> Result<Self, NarratorError> {
        let package = templates::empty_presentation(width_emu, height_emu);
        let types = package.content_types().map_err(assembly)?;
        Ok(Self {
            package,
            types,
            presentation_part: templates::PRESENTATION_PART.to_string(),
            slide_parts: Vec::new(),
            width_emu,
            height_emu,
        })
    }

    /// Continue an existing deck; every original part is kept.
    pub fn from_source(deck: SourceDeck) -> Result<Self, NarratorError> {
        let slide_parts = deck.slides.iter().map(|s| s.part_name.clone()).collect();
        let presentation_part = deck.presentation_part().to_string();
        let (width_emu, height_emu) = (deck.width_emu, deck.height_emu);
        let package = deck.into_package();
        let types = package.content_types().map_err(assembly)?;
        Ok(Self {
            package,
            types,
            presentation_part,
            slide_parts,
            width_emu,
            height_emu,
        })
    }

    pub fn width_emu(&self) -> i64 {
        self.width_emu
    }

    pub fn height_emu(&self) -> i64 {
        self.height_emu
    }

    pub fn slide_count(&self) -> usize {
        self.slide_parts.len()
    }

    /// Handle of the slide at `index`, if it exists.
    pub fn slide(&self, index: usize) -> Option<SlideHandle> {
        (index < self.slide_parts.len()).then_some(SlideHandle(index))
    }

    fn slide_part(&self, handle: SlideHandle) -> Result<&str, NarratorError> {
        self.slide_parts
            .get(handle.0)
            .map(|s| s.as_str())
            .ok_or_else(|| assembly(format!("slide {} does not exist", handle.0 + 1)))
    }

    fn part_string(&self, part: &str) -> Result<String, NarratorError> {
        self.package
            .part_str(part)
            .map(|s| s.to_string())
            .map_err(assembly)
    }

    // ── Slides ───────────────────────────────────────────────────────────

    /// Append an empty slide on the blank layout.
    pub fn add_blank_slide(&mut self) -> Result<SlideHandle, NarratorError> {
        let layout = self.blank_layout()?;
        let (_, part) = self.package.next_free_name("ppt/slides/slide", ".xml");

        let mut xml = String::with_capacity(640);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, "<p:sld {NS_DECL}>");
        xml.push_str("<p:cSld><p:spTree>");
        xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
        xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);
        xml.push_str("</p:spTree></p:cSld>");
        xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
        xml.push_str("</p:sld>");
        self.package.put(part.clone(), xml);

        let mut slide_rels = Relationships::default();
        slide_rels.add(rel_type::SLIDE_LAYOUT, relative_target(&part, &layout));
        self.package.put_relationships(&part, &slide_rels);

        let mut pres_rels = self
            .package
            .relationships(&self.presentation_part)
            .map_err(assembly)?;
        let rid = pres_rels.add(
            rel_type::SLIDE,
            relative_target(&self.presentation_part, &part),
        );
        self.package
            .put_relationships(&self.presentation_part, &pres_rels);

        let pres = self.part_string(&self.presentation_part)?;
        let slide_id = max_attr(&pres, b"sldId", b"id").map_or(256, |m| (m + 1).max(256));
        let entry = format!(r#"<p:sldId id="{slide_id}" r:id="{rid}"/>"#);
        let patched = if let Some(pos) = pres.find("</p:sldIdLst>") {
            insert_at(&pres, pos, &entry)
        } else if pres.contains("<p:sldIdLst/>") {
            pres.replacen("<p:sldIdLst/>", &format!("<p:sldIdLst>{entry}</p:sldIdLst>"), 1)
        } else if let Some(pos) = pres.find("<p:sldSz") {
            insert_at(&pres, pos, &format!("<p:sldIdLst>{entry}</p:sldIdLst>"))
        } else {
            return Err(assembly("presentation part has no slide list"));
        };
        self.package.put(self.presentation_part.clone(), patched);

        self.types.set_override(&part, content_type::SLIDE);
        self.slide_parts.push(part.clone());
        debug!("Added slide {} as {}", self.slide_parts.len(), part);
        Ok(SlideHandle(self.slide_parts.len() - 1))
    }

    /// The layout new slides are based on: a layout of type `blank` if the
    /// deck has one, else the first layout.
    fn blank_layout(&self) -> Result<String, NarratorError> {
        let layouts: Vec<&str> = self
            .package
            .part_names()
            .filter(|n| n.starts_with("ppt/slideLayouts/") && n.ends_with(".xml"))
            .collect();
        let blank = layouts.iter().find(|name| {
            self.package
                .part_str(name)
                .is_ok_and(|xml| xml.contains(r#"type="blank""#))
        });
        blank
            .or(layouts.first())
            .map(|s| s.to_string())
            .ok_or_else(|| assembly("deck has no slide layout"))
    }

    /// Embed `png` as a picture occupying `rect` on `slide`.
    pub fn place_image(
        &mut self,
        slide: SlideHandle,
        png: &[u8],
        rect: EmuRect,
    ) -> Result<(), NarratorError> {
        let part = self.slide_part(slide)?.to_string();
        let (n, media) = self.package.next_free_name("ppt/media/image", ".png");
        self.package.put(media.clone(), png.to_vec());
        self.types.ensure_default("png", content_type::PNG);

        let mut rels = self.package.relationships(&part).map_err(assembly)?;
        let rid = rels.add(rel_type::IMAGE, relative_target(&part, &media));
        self.package.put_relationships(&part, &rels);

        let xml = self.part_string(&part)?;
        let shape_id = max_attr(&xml, b"cNvPr", b"id").unwrap_or(1) + 1;

        let mut pic = String::with_capacity(512);
        pic.push_str("<p:pic><p:nvPicPr>");
        let _ = write!(
            pic,
            r#"<p:cNvPr id="{shape_id}" name="Picture {shape_id}" descr="image{n}.png"/>"#
        );
        pic.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/>"#);
        pic.push_str("</p:nvPicPr><p:blipFill>");
        let _ = write!(pic, r#"<a:blip r:embed="{rid}"/>"#);
        pic.push_str("<a:stretch><a:fillRect/></a:stretch></p:blipFill>");
        pic.push_str("<p:spPr><a:xfrm>");
        let _ = write!(
            pic,
            r#"<a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/>"#,
            rect.x, rect.y, rect.cx, rect.cy
        );
        pic.push_str(r#"</a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>"#);
        pic.push_str("</p:pic>");

        let pos = xml
            .rfind("</p:spTree>")
            .ok_or_else(|| assembly(format!("'{part}' has no shape tree")))?;
        self.package.put(part, insert_at(&xml, pos, &pic));
        Ok(())
    }

    // ── Notes ────────────────────────────────────────────────────────────

    /// Set the presenter notes of `slide` to exactly `text`, replacing any
    /// existing notes.
    pub fn set_notes(&mut self, slide: SlideHandle, text: &str) -> Result<(), NarratorError> {
        let slide_part = self.slide_part(slide)?.to_string();
        let notes_master = self.ensure_notes_master()?;

        let mut slide_rels = self.package.relationships(&slide_part).map_err(assembly)?;
        let notes_part = match slide_rels.first_of_type(rel_type::NOTES_SLIDE) {
            Some(rel) => resolve_target(&slide_part, &rel.target),
            None => {
                let (_, part) = self
                    .package
                    .next_free_name("ppt/notesSlides/notesSlide", ".xml");
                slide_rels.add(rel_type::NOTES_SLIDE, relative_target(&slide_part, &part));
                self.package.put_relationships(&slide_part, &slide_rels);
                part
            }
        };

        let mut notes_rels = Relationships::default();
        notes_rels.add(
            rel_type::NOTES_MASTER,
            relative_target(&notes_part, &notes_master),
        );
        notes_rels.add(rel_type::SLIDE, relative_target(&notes_part, &slide_part));
        self.package.put_relationships(&notes_part, &notes_rels);

        self.package.put(notes_part.clone(), notes_xml(text));
        self.types.set_override(&notes_part, content_type::NOTES_SLIDE);
        Ok(())
    }

    /// Current presenter notes of `slide`.
    pub fn notes(&self, slide: SlideHandle) -> Result<Option<String>, NarratorError> {
        let slide_part = self.slide_part(slide)?;
        let rels = self.package.relationships(slide_part).map_err(assembly)?;
        let Some(rel) = rels.first_of_type(rel_type::NOTES_SLIDE) else {
            return Ok(None);
        };
        let notes_part = resolve_target(slide_part, &rel.target);
        match self.package.part_str(&notes_part) {
            Ok(xml) => notes_body_text(xml, &notes_part).map_err(assembly),
            Err(PackageError::MissingPart(_)) => Ok(None),
            Err(e) => Err(assembly(e)),
        }
    }

    /// Part name of the notes master, creating one when the deck has none.
    fn ensure_notes_master(&mut self) -> Result<String, NarratorError> {
        let mut pres_rels = self
            .package
            .relationships(&self.presentation_part)
            .map_err(assembly)?;
        if let Some(rel) = pres_rels.first_of_type(rel_type::NOTES_MASTER) {
            return Ok(resolve_target(&self.presentation_part, &rel.target));
        }

        let (_, part) = self
            .package
            .next_free_name("ppt/notesMasters/notesMaster", ".xml");
        templates::add_notes_master(&mut self.package, &mut self.types, &part);
        let rid = pres_rels.add(
            rel_type::NOTES_MASTER,
            relative_target(&self.presentation_part, &part),
        );
        self.package
            .put_relationships(&self.presentation_part, &pres_rels);

        // notesMasterIdLst must directly follow sldMasterIdLst.
        let pres = self.part_string(&self.presentation_part)?;
        let entry = format!(r#"<p:notesMasterIdLst><p:notesMasterId r:id="{rid}"/></p:notesMasterIdLst>"#);
        let pos = pres
            .find("</p:sldMasterIdLst>")
            .map(|p| p + "</p:sldMasterIdLst>".len())
            .ok_or_else(|| assembly("presentation part has no slide master list"))?;
        self.package
            .put(self.presentation_part.clone(), insert_at(&pres, pos, &entry));
        debug!("Added notes master {}", part);
        Ok(part)
    }

    // ── Saving ───────────────────────────────────────────────────────────

    /// The complete `.pptx` as bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, NarratorError> {
        let mut package = self.package.clone();
        package.put_content_types(&self.types);
        package
            .write_to(Cursor::new(Vec::new()))
            .map(|c| c.into_inner())
            .map_err(assembly)
    }

    /// Write the deck to `path` atomically.
    ///
    /// The archive is written to a temporary file in the target directory
    /// and renamed over `path`; on failure the temporary file is removed and
    /// `path` is left untouched.
    pub fn save(&self, path: &Path) -> Result<(), NarratorError> {
        let write_failed = |source: std::io::Error| NarratorError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_failed)?;

        let mut package = self.package.clone();
        package.put_content_types(&self.types);
        let writer = package
            .write_to(BufWriter::new(tmp.as_file()))
            .map_err(|e| match e {
                PackageError::Io(io) => write_failed(io),
                other => assembly(other),
            })?;
        writer
            .into_inner()
            .map_err(|e| write_failed(e.into_error()))?
            .flush()
            .map_err(write_failed)?;

        tmp.persist(path).map_err(|e| write_failed(e.error))?;
        info!(
            "Saved {} slides to {}",
            self.slide_parts.len(),
            path.display()
        );
        Ok(())
    }
}

fn insert_at(s: &str, pos: usize, insert: &str) -> String {
    let mut out = String::with_capacity(s.len() + insert.len());
    out.push_str(&s[..pos]);
    out.push_str(insert);
    out.push_str(&s[pos..]);
    out
}

/// Largest numeric `attr` among `element`s in `xml`.
fn max_attr(xml: &str, element: &[u8], attr: &[u8]) -> Option<u64> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut max: Option<u64> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == element =>
            {
                for a in e.attributes().flatten() {
                    if a.key.as_ref() == attr {
                        if let Some(v) = a
                            .unescape_value()
                            .ok()
                            .and_then(|v| v.trim().parse::<u64>().ok())
                        {
                            max = Some(max.map_or(v, |m| m.max(v)));
                        }
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    max
}

/// A notes slide holding `text` in its body placeholder, one paragraph per line.
fn notes_xml(text: &str) -> String {
    let mut xml = String::with_capacity(1024 + text.len());
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    let _ = write!(xml, "<p:notes {NS_DECL}>");
    xml.push_str("<p:cSld><p:spTree>");
    xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
    xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);

    xml.push_str(r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/>"#);
    xml.push_str(r#"<p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr>"#);
    xml.push_str(r#"<p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#);

    xml.push_str(r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/>"#);
    xml.push_str(r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#);
    xml.push_str(r#"<p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/>"#);
    xml.push_str("<p:txBody><a:bodyPr/><a:lstStyle/>");
    for line in text.split('\n') {
        if line.is_empty() {
            xml.push_str(r#"<a:p><a:endParaRPr lang="en-US" dirty="0"/></a:p>"#);
        } else {
            let _ = write!(
                xml,
                r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape_xml(line)
            );
        }
    }
    xml.push_str("</p:txBody></p:sp>");

    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
    xml.push_str("</p:notes>");
    xml
}
