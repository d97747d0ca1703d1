//! Configuration types for narrated-deck conversion.
//!
//! Process-wide behaviour (which LLM to call, sampling, preview size, the
//! rendering engine) lives in [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. Per-run parameters (source, output, dpi,
//! style, tone) live in [`crate::job::ConversionJob`].
//!
//! The two narration knobs, [`NarrationStyle`] and [`NarrationTone`], are
//! defined here as well. Both parse leniently: an unrecognised value falls
//! back to the default instead of failing the job.

use crate::error::NarratorError;
use crate::pipeline::llm::NarrationBackend;
use crate::pipeline::render::RenderEngine;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use slide_narrator::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .model("gemini-2.5-flash")
///     .temperature(0.3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Longest edge, in pixels, of a rasterised PDF page. Default: 4000.
    ///
    /// A 200-DPI render of an A0 poster would allocate hundreds of megabytes.
    /// When `dpi/72` would exceed this cap, both axes are scaled down by the
    /// same factor.
    pub max_rendered_pixels: u32,

    /// Maximum width of the base64 preview attached to progress events. Default: 800.
    pub preview_max_width: u32,

    /// LLM model identifier, e.g. "gemini-2.5-flash", "gpt-4.1-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed narration backend. Takes precedence over every
    /// provider setting; used to plug in non-LLM generators and test doubles.
    pub backend: Option<Arc<dyn NarrationBackend>>,

    /// Rendering engine for PDF pages and synthesized slide visuals.
    /// If None, pdfium is used.
    pub engine: Option<Arc<dyn RenderEngine>>,

    /// Sampling temperature for narration. Default: 0.4.
    ///
    /// Narration is prose, not transcription: a little variety keeps it from
    /// sounding mechanical, while staying well clear of invented content.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per slide. Default: 1024.
    ///
    /// The `detailed` style asks for up to 12 sentences (~350 tokens); the
    /// headroom covers verbose models without truncating mid-sentence.
    pub max_tokens: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_rendered_pixels: 4000,
            preview_max_width: 800,
            model: None,
            provider_name: None,
            provider: None,
            backend: None,
            engine: None,
            temperature: 0.4,
            max_tokens: 1024,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("preview_max_width", &self.preview_max_width)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn NarrationBackend>"))
            .field("engine", &self.engine.as_ref().map(|_| "<dyn RenderEngine>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn preview_max_width(mut self, px: u32) -> Self {
        self.config.preview_max_width = px;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn NarrationBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn RenderEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, NarratorError> {
        let c = &self.config;
        if c.preview_max_width == 0 {
            return Err(NarratorError::InvalidConfig(
                "Preview width must be ≥ 1".into(),
            ));
        }
        if c.max_tokens < 64 {
            return Err(NarratorError::InvalidConfig(format!(
                "max_tokens must be ≥ 64, got {}",
                c.max_tokens
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Narration length and pacing.
///
/// | Style | Spoken duration | Sentences |
/// |-------|-----------------|-----------|
/// | `brief` | 20–30 s | 2–4 |
/// | `standard` | 45–60 s | 4–6 (default) |
/// | `detailed` | 90–120 s | 8–12 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NarrationStyle {
    Brief,
    #[default]
    Standard,
    Detailed,
}

impl NarrationStyle {
    /// Target spoken duration, as phrased in the prompt.
    pub fn duration(&self) -> &'static str {
        match self {
            NarrationStyle::Brief => "20-30 seconds",
            NarrationStyle::Standard => "45-60 seconds",
            NarrationStyle::Detailed => "90-120 seconds",
        }
    }

    /// Target sentence count band, as phrased in the prompt.
    pub fn sentences(&self) -> &'static str {
        match self {
            NarrationStyle::Brief => "2-4 sentences",
            NarrationStyle::Standard => "4-6 sentences",
            NarrationStyle::Detailed => "8-12 sentences",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NarrationStyle::Brief => "brief",
            NarrationStyle::Standard => "standard",
            NarrationStyle::Detailed => "detailed",
        }
    }
}

impl FromStr for NarrationStyle {
    type Err = Infallible;

    /// Unrecognised names resolve to [`NarrationStyle::Standard`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "brief" => NarrationStyle::Brief,
            "standard" => NarrationStyle::Standard,
            "detailed" => NarrationStyle::Detailed,
            other => {
                debug!("Unknown narration style '{}', using standard", other);
                NarrationStyle::Standard
            }
        })
    }
}

impl From<String> for NarrationStyle {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for NarrationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NarrationTone {
    #[default]
    Professional,
    Casual,
    Academic,
    Persuasive,
    Enthusiastic,
    Storytelling,
    Technical,
    Inspirational,
    Educational,
}

impl NarrationTone {
    pub const ALL: [NarrationTone; 9] = [
        NarrationTone::Professional,
        NarrationTone::Casual,
        NarrationTone::Academic,
        NarrationTone::Persuasive,
        NarrationTone::Enthusiastic,
        NarrationTone::Storytelling,
        NarrationTone::Technical,
        NarrationTone::Inspirational,
        NarrationTone::Educational,
    ];

    /// Register instruction inserted into the prompt.
    pub fn register(&self) -> &'static str {
        match self {
            NarrationTone::Professional => {
                "professional and polished, suitable for a business audience"
            }
            NarrationTone::Casual => "relaxed and conversational, like talking to friends",
            NarrationTone::Academic => {
                "scholarly and precise, suitable for a lecture or conference talk"
            }
            NarrationTone::Persuasive => {
                "persuasive and compelling, building a case the audience will act on"
            }
            NarrationTone::Enthusiastic => "energetic and upbeat, conveying genuine excitement",
            NarrationTone::Storytelling => {
                "narrative and engaging, weaving the content into a story"
            }
            NarrationTone::Technical => {
                "technically precise, using correct terminology for an expert audience"
            }
            NarrationTone::Inspirational => "uplifting and motivating, leaving the audience inspired",
            NarrationTone::Educational => {
                "clear and instructive, explaining concepts step by step for learners"
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NarrationTone::Professional => "professional",
            NarrationTone::Casual => "casual",
            NarrationTone::Academic => "academic",
            NarrationTone::Persuasive => "persuasive",
            NarrationTone::Enthusiastic => "enthusiastic",
            NarrationTone::Storytelling => "storytelling",
            NarrationTone::Technical => "technical",
            NarrationTone::Inspirational => "inspirational",
            NarrationTone::Educational => "educational",
        }
    }
}

impl FromStr for NarrationTone {
    type Err = Infallible;

    /// Unrecognised names resolve to [`NarrationTone::Professional`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Ok(NarrationTone::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .unwrap_or_else(|| {
                debug!("Unknown narration tone '{}', using professional", wanted);
                NarrationTone::Professional
            }))
    }
}

impl From<String> for NarrationTone {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for NarrationTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.preview_max_width, 800);
        assert_eq!(c.max_tokens, 1024);
        assert!(c.backend.is_none());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ConversionConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_tiny_max_tokens() {
        let err = ConversionConfig::builder().max_tokens(10).build().unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn unknown_style_falls_back_to_standard() {
        let s: NarrationStyle = "epic".parse().unwrap();
        assert_eq!(s, NarrationStyle::Standard);
        assert_eq!(s.duration(), "45-60 seconds");
        assert_eq!(s.sentences(), "4-6 sentences");
    }

    #[test]
    fn style_parsing_is_case_insensitive() {
        assert_eq!(" Brief ".parse::<NarrationStyle>().unwrap(), NarrationStyle::Brief);
        assert_eq!("DETAILED".parse::<NarrationStyle>().unwrap(), NarrationStyle::Detailed);
    }

    #[test]
    fn every_tone_round_trips_through_its_name() {
        for tone in NarrationTone::ALL {
            assert_eq!(tone.as_str().parse::<NarrationTone>().unwrap(), tone);
            assert!(!tone.register().is_empty());
        }
    }

    #[test]
    fn unknown_tone_falls_back_to_professional() {
        assert_eq!(
            "sarcastic".parse::<NarrationTone>().unwrap(),
            NarrationTone::Professional
        );
        assert_eq!("".parse::<NarrationTone>().unwrap(), NarrationTone::Professional);
    }

    #[test]
    fn style_serialises_lowercase() {
        let json = serde_json::to_string(&NarrationStyle::Detailed).unwrap();
        assert_eq!(json, "\"detailed\"");
    }

    #[test]
    fn unknown_names_deserialise_to_defaults() {
        let style: NarrationStyle = serde_json::from_str("\"epic\"").unwrap();
        let tone: NarrationTone = serde_json::from_str("\"sarcastic\"").unwrap();
        assert_eq!(style, NarrationStyle::Standard);
        assert_eq!(tone, NarrationTone::Professional);

        let tone: NarrationTone = serde_json::from_str("\"Casual\"").unwrap();
        assert_eq!(tone, NarrationTone::Casual);
    }
}
