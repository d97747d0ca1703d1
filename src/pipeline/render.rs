//! Rasterisation: PDF pages and synthesized slide compositions → bitmaps.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is CPU-bound. The async helpers at the bottom of this module
//! move every engine call onto Tokio's blocking pool so the orchestrator
//! task never stalls a worker thread.
//!
//! ## Why a trait?
//!
//! [`RenderEngine`] is the seam between the pipeline and the document
//! library. [`PdfiumEngine`] is the production implementation; tests plug in
//! engines that fabricate bitmaps without a native library.

use crate::error::NarratorError;
use crate::pipeline::visualize::{Composition, DrawOp};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolution at which synthesized slide visuals are painted.
pub const VISUAL_DPI: f32 = 150.0;

/// A unit's visual representation.
#[derive(Debug, Clone)]
pub struct Visual {
    pub image: DynamicImage,
    /// Whether picture content (a rendered page, an embedded image)
    /// contributed to the bitmap, as opposed to synthesized text only.
    pub has_picture: bool,
}

impl Visual {
    /// A rendered PDF page.
    pub fn raster(image: DynamicImage) -> Self {
        Self {
            image,
            has_picture: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Page rendering and composition painting.
///
/// All methods are blocking. Implementations open the document per call
/// and keep no handle between calls.
pub trait RenderEngine: Send + Sync {
    /// Number of pages in the PDF at `path`.
    fn page_count(&self, path: &Path) -> Result<usize, NarratorError>;

    /// Render page `index` (0-based) at `dpi/72` scale on both axes, scaled
    /// down uniformly if the longest edge would exceed `max_pixels`.
    fn render_page(
        &self,
        path: &Path,
        index: usize,
        dpi: u32,
        max_pixels: u32,
    ) -> Result<DynamicImage, NarratorError>;

    /// Paint a laid-out slide composition onto a white canvas of
    /// `composition.width_px × composition.height_px`.
    fn paint(&self, composition: &Composition) -> Result<DynamicImage, NarratorError>;
}

/// Scale factor for a page of `width_pt × height_pt` points at `dpi`,
/// capped so the longest rendered edge stays within `max_pixels`.
pub fn scale_for(width_pt: f32, height_pt: f32, dpi: u32, max_pixels: u32) -> f32 {
    let scale = dpi as f32 / 72.0;
    let longest = width_pt.max(height_pt) * scale;
    if longest > max_pixels as f32 && longest > 0.0 {
        scale * max_pixels as f32 / longest
    } else {
        scale
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`RenderEngine`] backed by pdfium.
///
/// The library is located, in order, at an explicit path given to
/// [`PdfiumEngine::with_library`], at `PDFIUM_LIB_PATH` (a file or the
/// directory holding it), in the working directory, then as the system
/// library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    library: Option<PathBuf>,
}

impl PdfiumEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, NarratorError> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(ref lib) = self.library {
            candidates.push(lib.clone());
        }
        if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
            let p = PathBuf::from(env_path);
            if p.is_dir() {
                candidates.push(Pdfium::pdfium_platform_library_name_at_path(&p));
            } else {
                candidates.push(p);
            }
        }
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new("./")));

        let mut failures = Vec::new();
        for candidate in candidates.iter().filter(|c| c.exists()) {
            match Pdfium::bind_to_library(candidate) {
                Ok(bindings) => {
                    debug!("Bound pdfium from {}", candidate.display());
                    return Ok(Pdfium::new(bindings));
                }
                Err(e) => failures.push(format!("{}: {}", candidate.display(), e)),
            }
        }

        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| {
                failures.push(format!("system library: {e}"));
                NarratorError::PdfiumBindingFailed(failures.join("; "))
            })
    }

    fn open<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, NarratorError> {
        if !path.exists() {
            return Err(NarratorError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| NarratorError::CorruptPdf {
                path: path.to_path_buf(),
                detail: format!("{:?}", e),
            })
    }
}

impl RenderEngine for PdfiumEngine {
    fn page_count(&self, path: &Path) -> Result<usize, NarratorError> {
        let pdfium = self.bind()?;
        let document = Self::open(&pdfium, path)?;
        let total = document.pages().len() as usize;
        info!("PDF loaded: {} pages", total);
        Ok(total)
    }

    fn render_page(
        &self,
        path: &Path,
        index: usize,
        dpi: u32,
        max_pixels: u32,
    ) -> Result<DynamicImage, NarratorError> {
        let pdfium = self.bind()?;
        let document = Self::open(&pdfium, path)?;
        let pages = document.pages();
        let total = pages.len() as usize;
        if index >= total {
            return Err(NarratorError::PageOutOfRange {
                page: index + 1,
                total,
            });
        }

        let page = pages
            .get(index as u16)
            .map_err(|e| NarratorError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let scale = scale_for(page.width().value, page.height().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            NarratorError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn paint(&self, composition: &Composition) -> Result<DynamicImage, NarratorError> {
        let failed = |e: PdfiumError| NarratorError::Internal(format!("slide painting failed: {:?}", e));

        let pdfium = self.bind()?;
        let mut document = pdfium.create_new_pdf().map_err(failed)?;
        let font = document.fonts_mut().helvetica();

        // Composition coordinates are pixels at VISUAL_DPI with a top-left
        // origin; PDF space is points with a bottom-left origin.
        let pt = |px: f32| PdfPoints::new(px * 72.0 / VISUAL_DPI);
        let page_h = composition.height_px as f32;

        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::from_points(
                pt(composition.width_px as f32),
                pt(page_h),
            ))
            .map_err(failed)?;

        for op in &composition.ops {
            match op {
                DrawOp::FillRect { rect, color } => {
                    let [r, g, b] = *color;
                    page.objects_mut()
                        .create_path_object_rect(
                            PdfRect::new(
                                pt(page_h - rect.y - rect.h),
                                pt(rect.x),
                                pt(page_h - rect.y),
                                pt(rect.x + rect.w),
                            ),
                            None,
                            None,
                            Some(PdfColor::new(r, g, b, 255)),
                        )
                        .map_err(failed)?;
                }
                DrawOp::StrokeRect { rect, color, width } => {
                    let [r, g, b] = *color;
                    page.objects_mut()
                        .create_path_object_rect(
                            PdfRect::new(
                                pt(page_h - rect.y - rect.h),
                                pt(rect.x),
                                pt(page_h - rect.y),
                                pt(rect.x + rect.w),
                            ),
                            Some(PdfColor::new(r, g, b, 255)),
                            Some(pt(*width)),
                            None,
                        )
                        .map_err(failed)?;
                }
                DrawOp::Text { x, y, size, text } => {
                    // `y` is the top of the line box; pdfium places the baseline.
                    page.objects_mut()
                        .create_text_object(pt(*x), pt(page_h - y - size), text, font, pt(*size))
                        .map_err(failed)?;
                }
                DrawOp::Image { rect, image } => {
                    page.objects_mut()
                        .create_image_object(
                            pt(rect.x),
                            pt(page_h - rect.y - rect.h),
                            image,
                            Some(pt(rect.w)),
                            Some(pt(rect.h)),
                        )
                        .map_err(failed)?;
                }
            }
        }

        let render_config = PdfRenderConfig::new()
            .set_target_width(composition.width_px as i32)
            .set_maximum_height(composition.height_px as i32);
        let bitmap = page.render_with_config(&render_config).map_err(failed)?;
        let image = bitmap.as_image();
        debug!(
            "Painted {} draw ops → {}x{} px",
            composition.ops.len(),
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

// ── Async helpers ────────────────────────────────────────────────────────

/// [`RenderEngine::page_count`] on the blocking pool.
pub async fn page_count(engine: Arc<dyn RenderEngine>, path: PathBuf) -> Result<usize, NarratorError> {
    tokio::task::spawn_blocking(move || engine.page_count(&path))
        .await
        .map_err(|e| NarratorError::Internal(format!("Page count task panicked: {}", e)))?
}

/// Render one PDF page on the blocking pool.
pub async fn render_page(
    engine: Arc<dyn RenderEngine>,
    path: PathBuf,
    index: usize,
    dpi: u32,
    max_pixels: u32,
) -> Result<Visual, NarratorError> {
    tokio::task::spawn_blocking(move || engine.render_page(&path, index, dpi, max_pixels))
        .await
        .map_err(|e| NarratorError::Internal(format!("Render task panicked: {}", e)))?
        .map(Visual::raster)
}

/// Paint a composition on the blocking pool.
pub async fn paint(
    engine: Arc<dyn RenderEngine>,
    composition: Composition,
) -> Result<Visual, NarratorError> {
    let has_picture = composition.has_picture;
    tokio::task::spawn_blocking(move || engine.paint(&composition))
        .await
        .map_err(|e| NarratorError::Internal(format!("Paint task panicked: {}", e)))?
        .map(|image| Visual { image, has_picture })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_dpi_over_72() {
        assert!((scale_for(612.0, 792.0, 144, 4000) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn scale_is_capped_on_longest_edge() {
        // A0 portrait at 200 dpi would be ~9355 px tall.
        let s = scale_for(2384.0, 3370.0, 200, 4000);
        assert!((3370.0 * s - 4000.0).abs() < 0.5);
    }

    #[test]
    fn pdfium_engine_reports_missing_file() {
        let engine = PdfiumEngine::new();
        // Binding may fail on machines without pdfium; either way the call
        // must return an error, never panic.
        assert!(engine.page_count(Path::new("/no/such/file.pdf")).is_err());
    }
}
