//! Blocking (whole-job) conversion entry points.
//!
//! [`convert`] drains the same event stream [`crate::stream::convert_stream`]
//! returns and reports once the deck is saved. Both forms share the per-unit
//! logic, so with a deterministic backend they produce identical decks.

use crate::config::ConversionConfig;
use crate::error::NarratorError;
use crate::job::{ConversionJob, SourceKind};
use crate::pipeline::input;
use crate::stream::{self, NarrationCounts, Source};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Summary of a finished conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    /// File name as reported in the `complete` event.
    pub filename: String,
    pub total_slides: usize,
    pub narrations: NarrationCounts,
    pub duration_ms: u64,
}

/// What [`inspect`] learns about a source without narrating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub kind: SourceKind,
    /// Pages of a PDF or slides of a deck.
    pub units: usize,
    /// Slide size of a deck in EMU; `None` for PDFs.
    pub slide_size_emu: Option<(i64, i64)>,
    /// Slides that already carry presenter notes.
    pub slides_with_notes: usize,
}

/// Convert a PDF or PPTX into a narrated deck and wait for it to be saved.
///
/// # Errors
/// Pre-flight errors (input, provider) and any fatal error raised while the
/// job runs (rendering, saving). Backend failures for single slides are not
/// errors: those slides get placeholder notes.
///
/// # Example
/// ```rust,no_run
/// use slide_narrator::{convert, ConversionConfig, ConversionJob, NarrationStyle};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let job = ConversionJob::new("talk.pptx")?.with_style(NarrationStyle::Brief);
/// let report = convert(job, &ConversionConfig::default()).await?;
/// println!("{} slides → {}", report.total_slides, report.output_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    job: ConversionJob,
    config: &ConversionConfig,
) -> Result<ConversionReport, NarratorError> {
    let start = Instant::now();
    let output_path = job.output_path.clone();
    let filename = job.output_filename();

    let (mut events, outcome) = stream::start(job, config).await?;
    let mut total_slides = 0;
    while let Some(event) = events.next().await {
        debug!("{}: {}", event.status(), event.message());
        if let crate::ProgressEvent::Complete { total_slides: n, .. } = event {
            total_slides = n;
        }
    }

    let narrations = outcome
        .await
        .map_err(|e| NarratorError::Internal(format!("Conversion task panicked: {}", e)))??;

    let duration_ms = start.elapsed().as_millis() as u64;
    info!("Conversion finished in {} ms", duration_ms);
    Ok(ConversionReport {
        output_path,
        filename,
        total_slides,
        narrations,
        duration_ms,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    job: ConversionJob,
    config: &ConversionConfig,
) -> Result<ConversionReport, NarratorError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| NarratorError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(job, config))
}

/// Report the kind and size of a source without any narration backend.
///
/// PDFs still need the render engine to count pages.
pub async fn inspect(
    source: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<SourceSummary, NarratorError> {
    let source = source.as_ref();
    let kind = ConversionJob::new(source)?.source_kind;
    let resolved = input::resolve_input(source, kind, config.download_timeout_secs).await?;
    let opened = stream::open_source(kind, resolved.path(), stream::engine_for(config)).await?;

    Ok(match opened {
        Source::Paged { pages, .. } => SourceSummary {
            kind,
            units: pages,
            slide_size_emu: None,
            slides_with_notes: 0,
        },
        Source::Deck(deck) => SourceSummary {
            kind,
            units: deck.slide_count(),
            slide_size_emu: Some((deck.width_emu, deck.height_emu)),
            slides_with_notes: deck
                .slides
                .iter()
                .filter(|s| s.notes.as_deref().is_some_and(|n| !n.trim().is_empty()))
                .count(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inspect_rejects_unknown_extension() {
        let err = inspect("notes.docx", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NarratorError::UnsupportedFormat { .. }));
    }

    #[test]
    fn report_serialises() {
        let report = ConversionReport {
            output_path: PathBuf::from("talk_with_notes.pptx"),
            filename: "talk_with_notes.pptx".into(),
            total_slides: 3,
            narrations: NarrationCounts {
                image: 3,
                text: 0,
                placeholder: 0,
            },
            duration_ms: 1200,
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["narrations"]["image"], 3);
        assert_eq!(v["filename"], "talk_with_notes.pptx");
    }
}
