//! Slide synthesis: an existing slide's shapes → a bitmap.
//!
//! Synthesis is split in two. [`layout`] is pure: it walks the slide's
//! shapes in draw order and produces a [`Composition`], a list of draw
//! operations in canvas pixels at [`VISUAL_DPI`]. Painting the composition
//! is the [`RenderEngine`]'s job (pdfium in production).
//!
//! A shape that cannot be drawn (no geometry, undecodable picture) is
//! skipped with a `debug!` log; it never fails the slide.

use crate::deck::{BoundingBox, ShapeContent, Slide, SourceDeck, EMU_PER_INCH};
use crate::error::{NarratorError, ShapeError};
use crate::pipeline::render::{self, RenderEngine, Visual, VISUAL_DPI};
use image::DynamicImage;
use std::sync::Arc;
use tracing::debug;

/// Characters of a text shape considered for drawing.
const MAX_TEXT_CHARS: usize = 500;
const MAX_TEXT_LINES: usize = 10;
const TEXT_SIZE_PX: f32 = 16.0;
/// Average glyph advance at [`TEXT_SIZE_PX`].
const CHAR_WIDTH_PX: f32 = 9.0;
const LINE_HEIGHT_PX: f32 = 20.0;
const PADDING_PX: f32 = 5.0;

const MAX_TABLE_ROWS: usize = 5;
const MAX_TABLE_COLS: usize = 5;
const MAX_CELL_CHARS: usize = 30;
const CELL_TEXT_SIZE_PX: f32 = 12.0;

const TEXT_FILL: [u8; 3] = [240, 240, 240];
const TABLE_BORDER: [u8; 3] = [0, 0, 0];
const CELL_BORDER: [u8; 3] = [128, 128, 128];

/// An axis-aligned rectangle in canvas pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PxRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl PxRect {
    fn from_bounds(b: &BoundingBox, canvas_w: u32, canvas_h: u32) -> Self {
        Self {
            x: (b.left * canvas_w as f64) as f32,
            y: (b.top * canvas_h as f64) as f32,
            w: (b.width * canvas_w as f64) as f32,
            h: (b.height * canvas_h as f64) as f32,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DrawOp {
    FillRect { rect: PxRect, color: [u8; 3] },
    StrokeRect { rect: PxRect, color: [u8; 3], width: f32 },
    /// One line of text; `y` is the top of the line box.
    Text { x: f32, y: f32, size: f32, text: String },
    Image { rect: PxRect, image: DynamicImage },
}

/// A laid-out slide, ready to paint on a white canvas.
#[derive(Debug, Clone)]
pub struct Composition {
    pub width_px: u32,
    pub height_px: u32,
    pub ops: Vec<DrawOp>,
    /// Whether any picture shape contributed.
    pub has_picture: bool,
}

/// Canvas edge length in pixels for `emu` at [`VISUAL_DPI`].
pub fn canvas_px(emu: i64) -> u32 {
    ((emu as f64 / EMU_PER_INCH as f64) * VISUAL_DPI as f64).round().max(1.0) as u32
}

/// Lay out `slide` on a canvas the size of a `width × height` EMU slide.
///
/// Returns `None` when no shape contributed anything drawable.
pub fn layout(slide: &Slide, width_emu: i64, height_emu: i64) -> Option<Composition> {
    let mut composition = Composition {
        width_px: canvas_px(width_emu),
        height_px: canvas_px(height_emu),
        ops: Vec::new(),
        has_picture: false,
    };

    for shape in &slide.shapes {
        match draw_shape(shape, &mut composition) {
            Ok(()) => {}
            Err(e) => debug!("Slide {}: skipped {}", slide.index + 1, e),
        }
    }

    if composition.ops.is_empty() {
        None
    } else {
        Some(composition)
    }
}

fn draw_shape(shape: &crate::deck::Shape, out: &mut Composition) -> Result<(), ShapeError> {
    let drawable = match &shape.content {
        ShapeContent::Text(t) => !t.trim().is_empty(),
        ShapeContent::Picture(_) | ShapeContent::Table(_) => true,
        ShapeContent::Other => false,
    };
    if !drawable {
        return Ok(());
    }

    let rect = shape
        .bounds
        .as_ref()
        .map(|b| PxRect::from_bounds(b, out.width_px, out.height_px))
        .filter(|r| r.w >= 1.0 && r.h >= 1.0)
        .ok_or_else(|| ShapeError::Geometry {
            shape: shape.name.clone(),
        })?;

    match &shape.content {
        ShapeContent::Picture(bytes) => {
            let bytes = bytes.as_deref().ok_or_else(|| ShapeError::Decode {
                shape: shape.name.clone(),
                detail: "image part not found".into(),
            })?;
            let image = image::load_from_memory(bytes).map_err(|e| ShapeError::Decode {
                shape: shape.name.clone(),
                detail: e.to_string(),
            })?;
            out.ops.push(DrawOp::Image { rect, image });
            out.has_picture = true;
        }
        ShapeContent::Text(text) => draw_text(text, rect, &mut out.ops),
        ShapeContent::Table(rows) => draw_table(rows, rect, &mut out.ops),
        ShapeContent::Other => {}
    }
    Ok(())
}

fn draw_text(text: &str, rect: PxRect, ops: &mut Vec<DrawOp>) {
    ops.push(DrawOp::FillRect {
        rect,
        color: TEXT_FILL,
    });
    let clipped: String = text.chars().take(MAX_TEXT_CHARS).collect();
    let per_line = (((rect.w - 2.0 * PADDING_PX) / CHAR_WIDTH_PX).floor() as usize).max(1);
    for (i, line) in wrap(&clipped, per_line)
        .into_iter()
        .take(MAX_TEXT_LINES)
        .enumerate()
    {
        ops.push(DrawOp::Text {
            x: rect.x + PADDING_PX,
            y: rect.y + PADDING_PX + i as f32 * LINE_HEIGHT_PX,
            size: TEXT_SIZE_PX,
            text: line,
        });
    }
}

fn draw_table(rows: &[Vec<String>], rect: PxRect, ops: &mut Vec<DrawOp>) {
    ops.push(DrawOp::StrokeRect {
        rect,
        color: TABLE_BORDER,
        width: 2.0,
    });
    if rows.is_empty() {
        return;
    }
    let row_h = rect.h / rows.len() as f32;
    for (r, row) in rows.iter().take(MAX_TABLE_ROWS).enumerate() {
        if row.is_empty() {
            continue;
        }
        let col_w = rect.w / row.len() as f32;
        for (c, cell) in row.iter().take(MAX_TABLE_COLS).enumerate() {
            let cell_rect = PxRect {
                x: rect.x + c as f32 * col_w,
                y: rect.y + r as f32 * row_h,
                w: col_w,
                h: row_h,
            };
            ops.push(DrawOp::StrokeRect {
                rect: cell_rect,
                color: CELL_BORDER,
                width: 1.0,
            });
            ops.push(DrawOp::Text {
                x: cell_rect.x + 4.0,
                y: cell_rect.y + 4.0,
                size: CELL_TEXT_SIZE_PX,
                text: cell.trim().chars().take(MAX_CELL_CHARS).collect(),
            });
        }
    }
}

/// Greedy word wrap to `width` characters. Words longer than a line are
/// split; explicit newlines start a new line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut len = 0usize;
        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                if len > 0 {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = chars.split_off(width);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }
            let wlen = chars.len();
            if wlen == 0 {
                continue;
            }
            if len > 0 && len + 1 + wlen > width {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            line.extend(chars);
            len += wlen;
        }
        if len > 0 {
            lines.push(line);
        }
    }
    lines
}

/// Synthesize the visual of slide `index` of `deck`, or `None` when the
/// slide has nothing drawable.
pub async fn synthesize(
    engine: Arc<dyn RenderEngine>,
    deck: &SourceDeck,
    index: usize,
) -> Result<Option<Visual>, NarratorError> {
    let slide = deck.slides.get(index).ok_or(NarratorError::PageOutOfRange {
        page: index + 1,
        total: deck.slides.len(),
    })?;
    match layout(slide, deck.width_emu, deck.height_emu) {
        Some(composition) => {
            debug!(
                "Slide {}: {} draw ops, picture={}",
                index + 1,
                composition.ops.len(),
                composition.has_picture
            );
            render::paint(engine, composition).await.map(Some)
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Shape, DEFAULT_SLIDE_HEIGHT_EMU, DEFAULT_SLIDE_WIDTH_EMU};
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn shape(name: &str, bounds: Option<BoundingBox>, content: ShapeContent) -> Shape {
        Shape {
            id: 2,
            name: name.into(),
            bounds,
            placeholder: None,
            content,
        }
    }

    fn half() -> Option<BoundingBox> {
        Some(BoundingBox {
            left: 0.25,
            top: 0.25,
            width: 0.5,
            height: 0.5,
        })
    }

    fn slide(shapes: Vec<Shape>) -> Slide {
        Slide {
            index: 0,
            part_name: "ppt/slides/slide1.xml".into(),
            shapes,
            notes: None,
        }
    }

    fn png() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(4, 3))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn lay(shapes: Vec<Shape>) -> Option<Composition> {
        layout(&slide(shapes), DEFAULT_SLIDE_WIDTH_EMU, DEFAULT_SLIDE_HEIGHT_EMU)
    }

    #[test]
    fn canvas_is_150_dpi() {
        assert_eq!(canvas_px(DEFAULT_SLIDE_WIDTH_EMU), 1500);
        assert_eq!(canvas_px(DEFAULT_SLIDE_HEIGHT_EMU), 844);
    }

    #[test]
    fn table_draws_at_most_five_by_five() {
        let rows: Vec<Vec<String>> = (0..7)
            .map(|r| (0..8).map(|c| format!("r{r}c{c}")).collect())
            .collect();
        let comp = lay(vec![shape("Table 1", half(), ShapeContent::Table(rows))]).unwrap();
        let texts: Vec<&str> = comp
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 25);
        assert!(texts.contains(&"r4c4"));
        assert!(!texts.iter().any(|t| t.starts_with("r5") || t.ends_with("c5")));
        assert!(!comp.has_picture);
    }

    #[test]
    fn cells_are_truncated() {
        let long = "x".repeat(80);
        let comp = lay(vec![shape(
            "Table",
            half(),
            ShapeContent::Table(vec![vec![long]]),
        )])
        .unwrap();
        let len = comp.ops.iter().find_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.chars().count()),
            _ => None,
        });
        assert_eq!(len, Some(30));
    }

    #[test]
    fn text_is_limited_to_ten_lines() {
        let words = "Quarterly revenue\n".repeat(40);
        let comp = lay(vec![shape("Body", half(), ShapeContent::Text(words))]).unwrap();
        let lines = comp
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { .. }))
            .count();
        assert_eq!(lines, 10);
        assert!(matches!(comp.ops[0], DrawOp::FillRect { color: TEXT_FILL, .. }));
    }

    #[test]
    fn bad_shapes_are_skipped() {
        let comp = lay(vec![
            shape("Broken", half(), ShapeContent::Picture(Some(b"not an image".to_vec()))),
            shape("Missing", half(), ShapeContent::Picture(None)),
            shape("Floating", None, ShapeContent::Text("no box".into())),
            shape("Picture", half(), ShapeContent::Picture(Some(png()))),
        ])
        .unwrap();
        assert_eq!(comp.ops.len(), 1);
        assert!(comp.has_picture);
        match &comp.ops[0] {
            DrawOp::Image { rect, .. } => {
                assert_eq!(rect.x, 375.0);
                assert_eq!(rect.w, 750.0);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn nothing_drawable_is_none() {
        assert!(lay(vec![]).is_none());
        assert!(lay(vec![
            shape("Empty", half(), ShapeContent::Text("   ".into())),
            shape("Line", half(), ShapeContent::Other),
        ])
        .is_none());
    }

    #[test]
    fn wrap_breaks_on_words_and_splits_long_ones() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("one\ntwo", 20), vec!["one", "two"]);
    }
}
