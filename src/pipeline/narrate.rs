//! Narration generation with a fixed fallback chain.
//!
//! Every source unit ends up with non-empty narration:
//!
//! ```text
//! visual with picture content ──▶ from_image ──(encode error)──┐
//! visual built from text only ──┐                              ▼
//! no visual, text present ──────┴──────────────────────▶ from_text
//! no visual, no text ──▶ EMPTY_SLIDE placeholder (no backend call)
//! ```
//!
//! Backend failures never propagate: they are logged and replaced by
//! [`GENERATION_FAILED`].

use crate::config::{NarrationStyle, NarrationTone};
use crate::error::BackendError;
use crate::pipeline::encode::encode_page;
use crate::pipeline::llm::{NarrationBackend, PromptParts};
use crate::pipeline::postprocess::clean_narration;
use crate::pipeline::render::Visual;
use crate::prompts::{image_prompt, text_prompt};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Substituted when the backend fails or returns nothing usable.
pub const GENERATION_FAILED: &str = "Speaker notes could not be generated for this slide.";

/// Substituted by [`NarrationGenerator::from_text`] for empty input.
pub const NO_TEXT_CONTENT: &str =
    "No text content was found on this slide; please review and add appropriate notes.";

/// Substituted when a unit has neither a visual nor any text.
pub const EMPTY_SLIDE: &str =
    "This slide appears to be empty; please review and add appropriate notes.";

/// Where a narration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationSource {
    /// Generated from the unit's image.
    Image,
    /// Generated from the unit's extracted text.
    Text,
    /// A fixed placeholder; the backend failed or there was nothing to narrate.
    Placeholder,
}

/// Non-empty plain text destined for one slide's presenter notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub text: String,
    pub source: NarrationSource,
}

impl Narration {
    fn placeholder(text: &str) -> Self {
        Self {
            text: text.to_string(),
            source: NarrationSource::Placeholder,
        }
    }
}

/// Narration generator for one job: a backend plus the job's style and tone.
#[derive(Clone)]
pub struct NarrationGenerator {
    backend: Arc<dyn NarrationBackend>,
    style: NarrationStyle,
    tone: NarrationTone,
}

impl NarrationGenerator {
    pub fn new(backend: Arc<dyn NarrationBackend>, style: NarrationStyle, tone: NarrationTone) -> Self {
        Self {
            backend,
            style,
            tone,
        }
    }

    /// Narrate a slide image.
    ///
    /// Returns `Err` only when the image cannot be encoded for the request;
    /// backend failures are absorbed into a placeholder narration.
    pub async fn from_image(&self, image: &DynamicImage) -> Result<Narration, BackendError> {
        let encoded = encode_page(image).map_err(|e| BackendError::InvalidRequest(e.to_string()))?;
        let parts = PromptParts::with_image(image_prompt(self.style, self.tone), encoded);
        Ok(self.request(parts, NarrationSource::Image).await)
    }

    /// Narrate a slide from its extracted text.
    ///
    /// Empty or whitespace-only input short-circuits to [`NO_TEXT_CONTENT`]
    /// without calling the backend.
    pub async fn from_text(&self, text: &str) -> Narration {
        if text.trim().is_empty() {
            debug!("No text to narrate, using placeholder");
            return Narration::placeholder(NO_TEXT_CONTENT);
        }
        let parts = PromptParts::text(text_prompt(text, self.style, self.tone));
        self.request(parts, NarrationSource::Text).await
    }

    /// Pick the narration path for one unit.
    ///
    /// A visual that contains picture content goes through [`Self::from_image`].
    /// A visual synthesized only from text blocks and tables adds nothing the
    /// extracted text does not already say, so with text present it goes
    /// through [`Self::from_text`].
    pub async fn narrate(&self, visual: Option<&Visual>, text: &str) -> Narration {
        let has_text = !text.trim().is_empty();
        match visual {
            Some(v) if v.has_picture || !has_text => match self.from_image(&v.image).await {
                Ok(n) => n,
                Err(e) => {
                    warn!("Image narration unavailable ({}), falling back to text", e);
                    self.from_text(text).await
                }
            },
            _ if has_text => self.from_text(text).await,
            _ => Narration::placeholder(EMPTY_SLIDE),
        }
    }

    /// Narrate a slide whose content could not be drawn.
    ///
    /// The slide is not empty, so without text it gets the generation
    /// failure placeholder rather than [`EMPTY_SLIDE`].
    pub async fn narrate_unpainted(&self, text: &str) -> Narration {
        if text.trim().is_empty() {
            Narration::placeholder(GENERATION_FAILED)
        } else {
            self.from_text(text).await
        }
    }

    async fn request(&self, parts: PromptParts, source: NarrationSource) -> Narration {
        match self.backend.generate(parts).await {
            Ok(raw) => {
                let text = clean_narration(&raw);
                if text.is_empty() {
                    warn!("Backend returned no usable narration, using placeholder");
                    Narration::placeholder(GENERATION_FAILED)
                } else {
                    Narration { text, source }
                }
            }
            Err(e) => {
                warn!("Narration generation failed: {}", e);
                Narration::placeholder(GENERATION_FAILED)
            }
        }
    }
}
