//! PPTX slide decks: reading existing decks and writing narrated ones.
//!
//! * [`package`] — the zip/OPC container, relationships and content types
//! * [`reader`]  — [`SourceDeck`]: slide order, shapes, pictures, tables, notes
//! * [`writer`]  — [`OutputDeck`]: blank slides, pictures, presenter notes, save
//!
//! Shape geometry is exposed as fractions of the slide size so consumers
//! never deal in EMU (English Metric Units, 914 400 per inch).

pub mod package;
pub mod reader;
mod templates;
pub mod writer;

pub use reader::SourceDeck;
pub use writer::{OutputDeck, SlideHandle};

pub const EMU_PER_INCH: i64 = 914_400;

/// 10 in wide, the canonical 16:9 slide.
pub const DEFAULT_SLIDE_WIDTH_EMU: i64 = 9_144_000;
/// 5.625 in tall, the canonical 16:9 slide.
pub const DEFAULT_SLIDE_HEIGHT_EMU: i64 = 5_143_500;

/// A rectangle in EMU, origin at the slide's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuRect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

/// A shape's position and size as fractions of the slide width/height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn from_emu(rect: EmuRect, slide_width: i64, slide_height: i64) -> Option<Self> {
        if rect.cx <= 0 || rect.cy <= 0 || slide_width <= 0 || slide_height <= 0 {
            return None;
        }
        Some(Self {
            left: rect.x as f64 / slide_width as f64,
            top: rect.y as f64 / slide_height as f64,
            width: rect.cx as f64 / slide_width as f64,
            height: rect.cy as f64 / slide_height as f64,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeContent {
    /// A text-bearing shape; paragraphs joined with `\n`.
    Text(String),
    /// A picture; `None` when the image part could not be resolved.
    Picture(Option<Vec<u8>>),
    /// A table, row-major cell text.
    Table(Vec<Vec<String>>),
    /// Anything else (connectors, charts, empty shapes).
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: u32,
    pub name: String,
    /// `None` when the shape has no usable position or size.
    pub bounds: Option<BoundingBox>,
    /// Placeholder type (`title`, `body`, …) when the shape is a placeholder.
    pub placeholder: Option<String>,
    pub content: ShapeContent,
}

/// One slide of a source deck, shapes in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    /// 0-based position in presentation order.
    pub index: usize,
    pub part_name: String,
    pub shapes: Vec<Shape>,
    /// Existing presenter notes, if any.
    pub notes: Option<String>,
}

impl Slide {
    /// Newline-joined text of every non-empty text shape and table cell, in
    /// shape order.
    pub fn extracted_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for shape in &self.shapes {
            match &shape.content {
                ShapeContent::Text(t) => parts.push(t.trim()),
                ShapeContent::Table(rows) => {
                    parts.extend(rows.iter().flatten().map(|c| c.trim()));
                }
                ShapeContent::Picture(_) | ShapeContent::Other => {}
            }
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(content: ShapeContent) -> Shape {
        Shape {
            id: 1,
            name: "s".into(),
            bounds: None,
            placeholder: None,
            content,
        }
    }

    #[test]
    fn extracted_text_skips_empty_runs() {
        let slide = Slide {
            index: 0,
            part_name: "ppt/slides/slide1.xml".into(),
            shapes: vec![
                shape(ShapeContent::Text("  Agenda ".into())),
                shape(ShapeContent::Picture(None)),
                shape(ShapeContent::Text("   ".into())),
                shape(ShapeContent::Table(vec![
                    vec!["Q1".into(), "".into()],
                    vec!["Q2".into(), "12%".into()],
                ])),
            ],
            notes: None,
        };
        assert_eq!(slide.extracted_text(), "Agenda\nQ1\nQ2\n12%");
    }

    #[test]
    fn degenerate_boxes_have_no_bounds() {
        let r = EmuRect { x: 0, y: 0, cx: 0, cy: 100 };
        assert!(BoundingBox::from_emu(r, 100, 100).is_none());
        let r = EmuRect { x: 457_200, y: 0, cx: 4_572_000, cy: 2_571_750 };
        let b = BoundingBox::from_emu(r, DEFAULT_SLIDE_WIDTH_EMU, DEFAULT_SLIDE_HEIGHT_EMU).unwrap();
        assert!((b.left - 0.05).abs() < 1e-9);
        assert!((b.width - 0.5).abs() < 1e-9);
        assert!((b.height - 0.5).abs() < 1e-9);
    }
}
