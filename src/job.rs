//! One conversion run: what to read, where to write, and how to narrate.

use crate::config::{NarrationStyle, NarrationTone};
use crate::error::NarratorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default rendering resolution for PDF pages.
pub const DEFAULT_DPI: u32 = 200;
pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 400;

/// What kind of document a job converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A paged document (PDF); every page becomes a new image slide.
    PagedDocument,
    /// An existing PPTX deck; slides are kept and receive notes.
    ExistingDeck,
}

impl SourceKind {
    /// Detect the kind from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, NarratorError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(SourceKind::PagedDocument),
            "pptx" => Ok(SourceKind::ExistingDeck),
            _ => Err(NarratorError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: if ext.is_empty() {
                    "(none)".to_string()
                } else {
                    format!(".{ext}")
                },
            }),
        }
    }

    /// Word used for one source unit in progress messages.
    pub fn unit_name(&self) -> &'static str {
        match self {
            SourceKind::PagedDocument => "page",
            SourceKind::ExistingDeck => "slide",
        }
    }
}

/// Identifies one run of the pipeline.
///
/// A job is owned by exactly one orchestrator invocation and never outlives
/// it. Output naming is explicit here; nothing is looked up from ambient
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub source_kind: SourceKind,
    /// Local path or HTTP(S) URL of the source document.
    pub source: String,
    pub output_path: PathBuf,
    /// Rasterisation resolution for PDF pages. Range: 72–400.
    pub dpi: u32,
    pub style: NarrationStyle,
    pub tone: NarrationTone,
}

impl ConversionJob {
    /// Create a job for `source`, writing to `<stem>_with_notes.pptx` in the
    /// current directory.
    pub fn new(source: impl Into<String>) -> Result<Self, NarratorError> {
        let source = source.into();
        let source_path = source_path_of(&source);
        let source_kind = SourceKind::from_path(&source_path)?;
        let output_path = default_output_path(&source_path);
        Ok(Self {
            source_kind,
            source,
            output_path,
            dpi: DEFAULT_DPI,
            style: NarrationStyle::default(),
            tone: NarrationTone::default(),
        })
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn with_style(mut self, style: NarrationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_tone(mut self, tone: NarrationTone) -> Self {
        self.tone = tone;
        self
    }

    /// File name reported in the `complete` progress event.
    pub fn output_filename(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output_path.display().to_string())
    }
}

/// `<stem>_with_notes.pptx`, relative to the working directory.
pub fn default_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "presentation".to_string());
    PathBuf::from(format!("{stem}_with_notes.pptx"))
}

/// The path component of a source string; URLs contribute their last segment.
fn source_path_of(source: &str) -> PathBuf {
    if crate::pipeline::input::is_url(source) {
        let without_query = source.split(['?', '#']).next().unwrap_or(source);
        let last = without_query.rsplit('/').next().unwrap_or_default();
        PathBuf::from(last)
    } else {
        PathBuf::from(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_source_defaults() {
        let job = ConversionJob::new("talks/Quarterly Review.pdf").unwrap();
        assert_eq!(job.source_kind, SourceKind::PagedDocument);
        assert_eq!(
            job.output_path,
            PathBuf::from("Quarterly Review_with_notes.pptx")
        );
        assert_eq!(job.dpi, DEFAULT_DPI);
        assert_eq!(job.style, NarrationStyle::Standard);
        assert_eq!(job.tone, NarrationTone::Professional);
    }

    #[test]
    fn pptx_extension_is_case_insensitive() {
        let job = ConversionJob::new("deck.PPTX").unwrap();
        assert_eq!(job.source_kind, SourceKind::ExistingDeck);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = ConversionJob::new("notes.docx").unwrap_err();
        assert!(matches!(err, NarratorError::UnsupportedFormat { .. }));
    }

    #[test]
    fn url_source_uses_last_segment() {
        let job = ConversionJob::new("https://example.com/files/slides.pdf?dl=1").unwrap();
        assert_eq!(job.source_kind, SourceKind::PagedDocument);
        assert_eq!(job.output_filename(), "slides_with_notes.pptx");
    }

    #[test]
    fn dpi_is_clamped() {
        let job = ConversionJob::new("a.pdf").unwrap().with_dpi(1200);
        assert_eq!(job.dpi, 400);
        let job = job.with_dpi(10);
        assert_eq!(job.dpi, 72);
    }

    #[test]
    fn job_with_unknown_style_and_tone_deserialises() {
        let json = r#"{"source_kind":"paged-document","source":"talk.pdf","output_path":"out.pptx","dpi":150,"style":"epic","tone":"sarcastic"}"#;
        let job: ConversionJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.style, NarrationStyle::Standard);
        assert_eq!(job.tone, NarrationTone::Professional);
        assert_eq!(job.dpi, 150);
    }
}
