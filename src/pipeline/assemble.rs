//! Slide assembly: rendered pages → image slides, narration → presenter notes.

use crate::deck::{EmuRect, OutputDeck, SlideHandle};
use crate::error::NarratorError;
use crate::pipeline::encode;
use crate::pipeline::render::Visual;
use tracing::debug;

/// The largest rectangle of the image's aspect ratio that fits the slide,
/// centred on the axis with slack. Never crops or distorts.
pub fn fit_rect(image_w: u32, image_h: u32, slide_w: i64, slide_h: i64) -> EmuRect {
    if image_w == 0 || image_h == 0 {
        return EmuRect { x: 0, y: 0, cx: slide_w, cy: slide_h };
    }
    let (iw, ih) = (image_w as i128, image_h as i128);
    let (sw, sh) = (slide_w as i128, slide_h as i128);

    if iw * sh > sw * ih {
        // Wider than the slide: pin the width.
        let cy = (sw * ih / iw) as i64;
        EmuRect {
            x: 0,
            y: (slide_h - cy) / 2,
            cx: slide_w,
            cy,
        }
    } else {
        let cx = (sh * iw / ih) as i64;
        EmuRect {
            x: (slide_w - cx) / 2,
            y: 0,
            cx,
            cy: slide_h,
        }
    }
}

/// Append a blank slide showing `visual`, aspect-fitted.
pub fn place_image(deck: &mut OutputDeck, visual: &Visual) -> Result<SlideHandle, NarratorError> {
    let png = encode::png_bytes(&visual.image)
        .map_err(|e| NarratorError::DeckAssembly(format!("PNG encoding failed: {e}")))?;
    let rect = fit_rect(
        visual.width(),
        visual.height(),
        deck.width_emu(),
        deck.height_emu(),
    );
    let slide = deck.add_blank_slide()?;
    deck.place_image(slide, &png, rect)?;
    debug!(
        "Slide {}: placed {}x{} px image at {:?}",
        slide.index() + 1,
        visual.width(),
        visual.height(),
        rect
    );
    Ok(slide)
}

/// Set the presenter notes of `slide` to exactly `narration`.
pub fn attach_notes(
    deck: &mut OutputDeck,
    slide: SlideHandle,
    narration: &str,
) -> Result<(), NarratorError> {
    deck.set_notes(slide, narration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{DEFAULT_SLIDE_HEIGHT_EMU as H, DEFAULT_SLIDE_WIDTH_EMU as W};
    use image::{DynamicImage, RgbImage};

    #[test]
    fn aspect_equal_image_fills_the_slide() {
        assert_eq!(fit_rect(1600, 900, W, H), EmuRect { x: 0, y: 0, cx: W, cy: H });
    }

    #[test]
    fn portrait_page_is_pillarboxed() {
        // US Letter at 200 dpi.
        let r = fit_rect(1700, 2200, W, H);
        assert_eq!(r.y, 0);
        assert_eq!(r.cy, H);
        assert!(r.x > 0);
        assert_eq!(r.x, (W - r.cx) / 2);
    }

    #[test]
    fn wide_image_is_letterboxed() {
        let r = fit_rect(3000, 1000, W, H);
        assert_eq!((r.x, r.cx), (0, W));
        assert_eq!(r.cy, W / 3);
        assert_eq!(r.y, (H - W / 3) / 2);
    }

    #[test]
    fn place_and_annotate() {
        let mut deck = OutputDeck::new(W, H).unwrap();
        let visual = Visual::raster(DynamicImage::ImageRgb8(RgbImage::new(16, 9)));
        let slide = place_image(&mut deck, &visual).unwrap();
        attach_notes(&mut deck, slide, "Hello everyone.").unwrap();
        assert_eq!(deck.slide_count(), 1);
        assert_eq!(deck.notes(slide).unwrap().as_deref(), Some("Hello everyone."));
    }
}
