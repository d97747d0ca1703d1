//! # slide-narrator
//!
//! Turn PDFs and slide decks into PPTX decks with spoken-style presenter
//! notes written by a Vision Language Model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PPTX
//!  │
//!  ├─ 1. Input      resolve local file or download from URL, check magic bytes
//!  ├─ 2. Visual     rasterise PDF pages, or synthesize existing slides (pdfium)
//!  ├─ 3. Narrate    one VLM call per slide: image, or extracted text
//!  ├─ 4. Polish     strip markdown, fences and labels from the narration
//!  ├─ 5. Assemble   image slides for PDFs, notes slides for every slide
//!  └─ 6. Save       atomic write of the .pptx
//! ```
//!
//! Every step reports through [`ProgressEvent`]s:
//! `started, (processing, processing)*, saving, (complete | error)`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slide_narrator::{convert, ConversionConfig, ConversionJob, NarrationTone};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let job = ConversionJob::new("lecture.pdf")?.with_tone(NarrationTone::Educational);
//!     let report = convert(job, &ConversionConfig::default()).await?;
//!     println!("{} slides narrated → {}", report.total_slides, report.filename);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `slide-narrator` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! slide-narrator = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod deck;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, NarrationStyle, NarrationTone};
pub use convert::{convert, convert_sync, inspect, ConversionReport, SourceSummary};
pub use error::{BackendError, ErrorClass, NarratorError, ShapeError};
pub use job::{ConversionJob, SourceKind};
pub use pipeline::llm::{NarrationBackend, PromptParts};
pub use pipeline::narrate::{Narration, NarrationSource};
pub use pipeline::render::{PdfiumEngine, RenderEngine};
pub use progress::ProgressEvent;
pub use stream::{convert_stream, EventStream, NarrationCounts};
