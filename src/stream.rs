//! Streaming conversion: the orchestrator behind every entry point.
//!
//! [`convert_stream`] runs the pre-flight (input resolution, opening the
//! source, counting units, resolving the narration backend) before it
//! returns, so input errors surface as `Err` and no stream is created.
//! The job itself then runs on a spawned task and reports through a
//! bounded channel:
//!
//! ```text
//! started, (processing, processing)*, saving, (complete | error)
//! ```
//!
//! Units are processed strictly in order, one at a time. The channel holds
//! a single event, so the job never runs more than one event ahead of the
//! consumer. Dropping the stream stops the job at its next event.

use crate::config::ConversionConfig;
use crate::deck::{OutputDeck, SourceDeck, DEFAULT_SLIDE_HEIGHT_EMU, DEFAULT_SLIDE_WIDTH_EMU};
use crate::error::NarratorError;
use crate::job::{ConversionJob, SourceKind, MAX_DPI, MIN_DPI};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::narrate::{NarrationGenerator, NarrationSource};
use crate::pipeline::render::{self, PdfiumEngine, RenderEngine, Visual};
use crate::pipeline::{assemble, encode, llm, visualize};
use crate::progress::ProgressEvent;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A boxed stream of progress events.
pub type EventStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// How many narrations came from each source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationCounts {
    pub image: usize,
    pub text: usize,
    pub placeholder: usize,
}

impl NarrationCounts {
    pub fn record(&mut self, source: NarrationSource) {
        match source {
            NarrationSource::Image => self.image += 1,
            NarrationSource::Text => self.text += 1,
            NarrationSource::Placeholder => self.placeholder += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.image + self.text + self.placeholder
    }
}

/// An opened source document.
pub(crate) enum Source {
    Paged { path: PathBuf, pages: usize },
    Deck(SourceDeck),
}

impl Source {
    pub(crate) fn unit_count(&self) -> usize {
        match self {
            Source::Paged { pages, .. } => *pages,
            Source::Deck(deck) => deck.slide_count(),
        }
    }
}

pub(crate) fn engine_for(config: &ConversionConfig) -> Arc<dyn RenderEngine> {
    config
        .engine
        .clone()
        .unwrap_or_else(|| Arc::new(PdfiumEngine::new()))
}

/// Open `path` as `kind` and fail on an empty source.
pub(crate) async fn open_source(
    kind: SourceKind,
    path: &Path,
    engine: Arc<dyn RenderEngine>,
) -> Result<Source, NarratorError> {
    let source = match kind {
        SourceKind::PagedDocument => {
            let pages = render::page_count(engine, path.to_path_buf()).await?;
            Source::Paged {
                path: path.to_path_buf(),
                pages,
            }
        }
        SourceKind::ExistingDeck => {
            let owned = path.to_path_buf();
            let deck = tokio::task::spawn_blocking(move || SourceDeck::open(&owned))
                .await
                .map_err(|e| NarratorError::Internal(format!("Deck open task panicked: {}", e)))??;
            Source::Deck(deck)
        }
    };
    if source.unit_count() == 0 {
        return Err(NarratorError::EmptySource {
            path: path.to_path_buf(),
        });
    }
    Ok(source)
}

/// Convert a PDF or PPTX into a narrated deck, reporting progress as a
/// stream of [`ProgressEvent`]s.
///
/// # Returns
/// - `Ok(EventStream)`: the job is running; the stream always ends with
///   exactly one `complete` or `error` event.
/// - `Err(NarratorError)`: pre-flight failed (missing or corrupt source,
///   no provider configured). No event is produced.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use slide_narrator::{convert_stream, ConversionConfig, ConversionJob};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let job = ConversionJob::new("talk.pdf")?;
/// let mut events = convert_stream(job, &ConversionConfig::default()).await?;
/// while let Some(event) = events.next().await {
///     println!("{}", serde_json::to_string(&event)?);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream(
    job: ConversionJob,
    config: &ConversionConfig,
) -> Result<EventStream, NarratorError> {
    let (events, _outcome) = start(job, config).await?;
    Ok(events)
}

/// Pre-flight, then spawn the job.
///
/// The join handle yields the job's own result, so blocking callers get the
/// typed error instead of the event's string.
pub(crate) async fn start(
    job: ConversionJob,
    config: &ConversionConfig,
) -> Result<(EventStream, JoinHandle<Result<NarrationCounts, NarratorError>>), NarratorError> {
    info!("Starting conversion: {}", job.source);

    if !(MIN_DPI..=MAX_DPI).contains(&job.dpi) {
        return Err(NarratorError::InvalidConfig(format!(
            "dpi must be within {MIN_DPI}..={MAX_DPI}, got {}",
            job.dpi
        )));
    }
    let resolved = input::resolve_input(&job.source, job.source_kind, config.download_timeout_secs)
        .await?;
    let engine = engine_for(config);
    let source = open_source(job.source_kind, resolved.path(), Arc::clone(&engine)).await?;
    let backend = llm::resolve_backend(config)?;
    let generator = NarrationGenerator::new(backend, job.style, job.tone);

    info!(
        "{} {}s to narrate → {}",
        source.unit_count(),
        job.source_kind.unit_name(),
        job.output_path.display()
    );

    let (tx, rx) = mpsc::channel(1);
    let runner = Runner {
        job,
        config: config.clone(),
        engine,
        generator,
        tx,
    };
    let handle = tokio::spawn(runner.run(source, resolved));
    Ok((Box::pin(ReceiverStream::new(rx)), handle))
}

/// Why a running job stopped early.
enum Halt {
    /// The consumer dropped the stream.
    Detached,
    Failed(NarratorError),
}

impl From<NarratorError> for Halt {
    fn from(e: NarratorError) -> Self {
        Halt::Failed(e)
    }
}

struct Runner {
    job: ConversionJob,
    config: ConversionConfig,
    engine: Arc<dyn RenderEngine>,
    generator: NarrationGenerator,
    tx: mpsc::Sender<ProgressEvent>,
}

impl Runner {
    async fn run(
        self,
        source: Source,
        // Held until the job ends so a downloaded source outlives it.
        _input: ResolvedInput,
    ) -> Result<NarrationCounts, NarratorError> {
        let outcome = match AssertUnwindSafe(self.process(source)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(Halt::Failed(NarratorError::Internal(format!(
                "conversion task panicked: {}",
                panic_message(&*panic)
            )))),
        };
        match outcome {
            Ok(counts) => Ok(counts),
            Err(Halt::Detached) => {
                debug!("Progress stream dropped, job stopped");
                Err(NarratorError::Internal("conversion was cancelled".into()))
            }
            Err(Halt::Failed(e)) => {
                warn!("Conversion failed: {}", e);
                let _ = self
                    .tx
                    .send(ProgressEvent::Error {
                        message: "Conversion failed".into(),
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn emit(&self, event: ProgressEvent) -> Result<(), Halt> {
        self.tx.send(event).await.map_err(|_| Halt::Detached)
    }

    async fn process(&self, source: Source) -> Result<NarrationCounts, Halt> {
        let total = source.unit_count();
        let unit = self.job.source_kind.unit_name();
        self.emit(ProgressEvent::Started {
            total_slides: total,
            message: format!("Processing {total} {unit}s"),
        })
        .await?;

        let mut counts = NarrationCounts::default();
        let deck = match source {
            Source::Paged { path, .. } => {
                let mut deck = OutputDeck::new(DEFAULT_SLIDE_WIDTH_EMU, DEFAULT_SLIDE_HEIGHT_EMU)?;
                for index in 0..total {
                    let visual = render::render_page(
                        Arc::clone(&self.engine),
                        path.clone(),
                        index,
                        self.job.dpi,
                        self.config.max_rendered_pixels,
                    )
                    .await?;
                    let preview = self.preview(Some(&visual), index);
                    self.processing(index, total, format!("Rendering page {}/{}", index + 1, total), &preview)
                        .await?;

                    let narration = self.generator.narrate(Some(&visual), "").await;
                    let slide = assemble::place_image(&mut deck, &visual)?;
                    assemble::attach_notes(&mut deck, slide, &narration.text)?;
                    counts.record(narration.source);

                    self.processing(index, total, format!("Narrated page {}/{}", index + 1, total), &preview)
                        .await?;
                }
                deck
            }
            Source::Deck(source) => {
                let mut deck = OutputDeck::from_source(source.clone())?;
                for index in 0..total {
                    let text = source.slides[index].extracted_text();
                    let (visual, unpainted) =
                        match visualize::synthesize(Arc::clone(&self.engine), &source, index).await {
                            Ok(v) => (v, false),
                            Err(e) => {
                                warn!("Slide {}: visual unavailable ({}), using text only", index + 1, e);
                                (None, true)
                            }
                        };
                    let preview = self.preview(visual.as_ref(), index);
                    self.processing(index, total, format!("Reading slide {}/{}", index + 1, total), &preview)
                        .await?;

                    let narration = if unpainted {
                        self.generator.narrate_unpainted(&text).await
                    } else {
                        self.generator.narrate(visual.as_ref(), &text).await
                    };
                    let slide = deck.slide(index).ok_or_else(|| {
                        NarratorError::DeckAssembly(format!("slide {} disappeared", index + 1))
                    })?;
                    assemble::attach_notes(&mut deck, slide, &narration.text)?;
                    counts.record(narration.source);

                    self.processing(index, total, format!("Narrated slide {}/{}", index + 1, total), &preview)
                        .await?;
                }
                deck
            }
        };

        self.emit(ProgressEvent::Saving {
            total_slides: total,
            message: "Saving presentation".into(),
        })
        .await?;
        let output = self.job.output_path.clone();
        tokio::task::spawn_blocking(move || deck.save(&output))
            .await
            .map_err(|e| NarratorError::Internal(format!("Save task panicked: {}", e)))??;

        info!(
            "Done: {} slides ({} from images, {} from text, {} placeholders)",
            total, counts.image, counts.text, counts.placeholder
        );
        self.emit(ProgressEvent::Complete {
            total_slides: total,
            message: format!("Successfully processed {total} slides"),
            filename: self.job.output_filename(),
        })
        .await?;
        Ok(counts)
    }

    async fn processing(
        &self,
        index: usize,
        total: usize,
        message: String,
        preview: &Option<String>,
    ) -> Result<(), Halt> {
        self.emit(ProgressEvent::Processing {
            current_slide: index + 1,
            total_slides: total,
            message,
            slide_image: preview.clone(),
        })
        .await
    }

    fn preview(&self, visual: Option<&Visual>, index: usize) -> Option<String> {
        let visual = visual?;
        match encode::preview_base64(&visual.image, self.config.preview_max_width) {
            Ok(b64) => Some(b64),
            Err(e) => {
                warn!("Slide {}: preview encoding failed: {}", index + 1, e);
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
