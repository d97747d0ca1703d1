//! Bundled OOXML parts for building a deck from scratch.
//!
//! A new deck needs one slide master, one blank layout, a theme and a notes
//! master before any slide can be added. The XML lives in `resources/`;
//! relationships and content types are generated here.

use super::package::{
    content_type, rel_type, ContentTypes, Package, Relationships, CONTENT_TYPES_PART,
};

pub const PRESENTATION_PART: &str = "ppt/presentation.xml";
pub const SLIDE_MASTER_PART: &str = "ppt/slideMasters/slideMaster1.xml";
pub const SLIDE_LAYOUT_PART: &str = "ppt/slideLayouts/slideLayout1.xml";
pub const THEME_PART: &str = "ppt/theme/theme1.xml";

const PRESENTATION_XML: &str = include_str!("../../resources/presentation.xml");
const SLIDE_MASTER_XML: &str = include_str!("../../resources/slideMaster1.xml");
const SLIDE_LAYOUT_XML: &str = include_str!("../../resources/slideLayout1.xml");
const NOTES_MASTER_XML: &str = include_str!("../../resources/notesMaster1.xml");
const THEME_XML: &str = include_str!("../../resources/theme1.xml");
const PRES_PROPS_XML: &str = include_str!("../../resources/presProps.xml");
const VIEW_PROPS_XML: &str = include_str!("../../resources/viewProps.xml");
const TABLE_STYLES_XML: &str = include_str!("../../resources/tableStyles.xml");
const APP_XML: &str = include_str!("../../resources/app.xml");
const CORE_XML: &str = include_str!("../../resources/core.xml");

/// A package holding an empty presentation of `width × height` EMU.
pub fn empty_presentation(width_emu: i64, height_emu: i64) -> Package {
    let mut pkg = Package::new();
    let mut types = ContentTypes::default();
    types.ensure_default("rels", content_type::RELS);
    types.ensure_default("xml", content_type::XML);
    types.ensure_default("png", content_type::PNG);

    // Package root
    let mut root = Relationships::default();
    root.add(rel_type::OFFICE_DOCUMENT, PRESENTATION_PART);
    root.add(
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
        "docProps/core.xml",
    );
    root.add(
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties",
        "docProps/app.xml",
    );
    pkg.put("_rels/.rels", root.to_xml());
    pkg.put("docProps/core.xml", CORE_XML);
    pkg.put("docProps/app.xml", APP_XML);
    types.set_override(
        "docProps/core.xml",
        "application/vnd.openxmlformats-package.core-properties+xml",
    );
    types.set_override(
        "docProps/app.xml",
        "application/vnd.openxmlformats-officedocument.extended-properties+xml",
    );

    // Presentation: rId1 master and rId2 notes master are referenced by the template.
    let presentation = PRESENTATION_XML
        .replace("{SLIDE_CX}", &width_emu.to_string())
        .replace("{SLIDE_CY}", &height_emu.to_string());
    pkg.put(PRESENTATION_PART, presentation);
    types.set_override(PRESENTATION_PART, content_type::PRESENTATION);

    let mut pres_rels = Relationships::default();
    pres_rels.add(rel_type::SLIDE_MASTER, "slideMasters/slideMaster1.xml");
    pres_rels.add(rel_type::NOTES_MASTER, "notesMasters/notesMaster1.xml");
    pres_rels.add(rel_type::THEME, "theme/theme1.xml");
    pres_rels.add(
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps",
        "presProps.xml",
    );
    pres_rels.add(
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps",
        "viewProps.xml",
    );
    pres_rels.add(
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles",
        "tableStyles.xml",
    );
    pkg.put_relationships(PRESENTATION_PART, &pres_rels);

    pkg.put("ppt/presProps.xml", PRES_PROPS_XML);
    pkg.put("ppt/viewProps.xml", VIEW_PROPS_XML);
    pkg.put("ppt/tableStyles.xml", TABLE_STYLES_XML);
    types.set_override(
        "ppt/presProps.xml",
        "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml",
    );
    types.set_override(
        "ppt/viewProps.xml",
        "application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml",
    );
    types.set_override(
        "ppt/tableStyles.xml",
        "application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml",
    );

    // Master, layout, theme
    pkg.put(SLIDE_MASTER_PART, SLIDE_MASTER_XML);
    let mut master_rels = Relationships::default();
    master_rels.add(rel_type::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
    master_rels.add(rel_type::THEME, "../theme/theme1.xml");
    pkg.put_relationships(SLIDE_MASTER_PART, &master_rels);
    types.set_override(SLIDE_MASTER_PART, content_type::SLIDE_MASTER);

    pkg.put(SLIDE_LAYOUT_PART, SLIDE_LAYOUT_XML);
    let mut layout_rels = Relationships::default();
    layout_rels.add(rel_type::SLIDE_MASTER, "../slideMasters/slideMaster1.xml");
    pkg.put_relationships(SLIDE_LAYOUT_PART, &layout_rels);
    types.set_override(SLIDE_LAYOUT_PART, content_type::SLIDE_LAYOUT);

    pkg.put(THEME_PART, THEME_XML);
    types.set_override(THEME_PART, content_type::THEME);

    add_notes_master(&mut pkg, &mut types, "ppt/notesMasters/notesMaster1.xml");

    pkg.put(CONTENT_TYPES_PART, types.to_xml());
    pkg
}

/// Add a notes master (and its own theme) at `part`.
///
/// The caller links it from the presentation.
pub fn add_notes_master(pkg: &mut Package, types: &mut ContentTypes, part: &str) {
    let (_, theme_part) = pkg.next_free_name("ppt/theme/theme", ".xml");
    pkg.put(part, NOTES_MASTER_XML);
    pkg.put(theme_part.clone(), THEME_XML);

    let mut rels = Relationships::default();
    rels.add(
        rel_type::THEME,
        super::package::relative_target(part, &theme_part),
    );
    pkg.put_relationships(part, &rels);

    types.set_override(part, content_type::NOTES_MASTER);
    types.set_override(&theme_part, content_type::THEME);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_presentation_is_self_consistent() {
        let pkg = empty_presentation(9_144_000, 5_143_500);
        let types = pkg.content_types().unwrap();
        for (part, _) in &types.overrides {
            assert!(pkg.contains(part.trim_start_matches('/')), "missing {part}");
        }
        let pres = pkg.part_str(PRESENTATION_PART).unwrap();
        assert!(pres.contains(r#"<p:sldSz cx="9144000" cy="5143500"/>"#));
        let rels = pkg.relationships(PRESENTATION_PART).unwrap();
        assert_eq!(rels.get("rId1").unwrap().rel_type, rel_type::SLIDE_MASTER);
        assert_eq!(rels.get("rId2").unwrap().rel_type, rel_type::NOTES_MASTER);
        assert!(pkg.contains("ppt/theme/theme2.xml"), "notes master gets its own theme");
    }
}
