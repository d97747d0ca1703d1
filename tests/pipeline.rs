//! Orchestrator integration tests.
//!
//! These drive the full pipeline (input resolution, visuals, narration,
//! assembly, save) with a fake render engine and a scripted backend, so they
//! need neither pdfium nor network access.

use futures::future::BoxFuture;
use futures::StreamExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use slide_narrator::deck::package::Package;
use slide_narrator::deck::{OutputDeck, ShapeContent, SourceDeck, EmuRect};
use slide_narrator::deck::{DEFAULT_SLIDE_HEIGHT_EMU as H, DEFAULT_SLIDE_WIDTH_EMU as W};
use slide_narrator::pipeline::narrate::{EMPTY_SLIDE, GENERATION_FAILED};
use slide_narrator::pipeline::visualize::Composition;
use slide_narrator::{
    convert, convert_stream, BackendError, ConversionConfig, ConversionJob, NarrationBackend,
    NarrationStyle, NarratorError, ProgressEvent, PromptParts, RenderEngine,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Renders every page as a flat 16:9 bitmap; paints compositions blank.
#[derive(Default)]
struct FakeEngine {
    pages: usize,
    /// Page whose render fails.
    broken_page: Option<usize>,
    /// Fail every `paint`, as when pdfium is missing.
    no_painter: bool,
}

impl RenderEngine for FakeEngine {
    fn page_count(&self, path: &Path) -> Result<usize, NarratorError> {
        if !path.exists() {
            return Err(NarratorError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(self.pages)
    }

    fn render_page(
        &self,
        _path: &Path,
        index: usize,
        _dpi: u32,
        _max_pixels: u32,
    ) -> Result<DynamicImage, NarratorError> {
        if self.broken_page == Some(index) {
            return Err(NarratorError::RasterisationFailed {
                page: index + 1,
                detail: "damaged content stream".into(),
            });
        }
        if index >= self.pages {
            return Err(NarratorError::PageOutOfRange {
                page: index + 1,
                total: self.pages,
            });
        }
        let shade = 40 * index as u8;
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            160,
            90,
            Rgb([shade, 100, 200]),
        )))
    }

    fn paint(&self, composition: &Composition) -> Result<DynamicImage, NarratorError> {
        if self.no_painter {
            return Err(NarratorError::Internal("no pdfium library".into()));
        }
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            composition.width_px,
            composition.height_px,
            Rgb([255, 255, 255]),
        )))
    }
}

/// Records each request as `(has_image, prompt)` and answers from a script.
struct Scripted {
    reply: Result<String, BackendError>,
    seen: Mutex<Vec<(bool, String)>>,
}

impl Scripted {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(BackendError::Request("quota exceeded".into())),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(bool, String)> {
        self.seen.lock().unwrap().clone()
    }
}

impl NarrationBackend for Scripted {
    fn generate<'a>(&'a self, parts: PromptParts) -> BoxFuture<'a, Result<String, BackendError>> {
        self.seen
            .lock()
            .unwrap()
            .push((parts.image.is_some(), parts.text));
        let reply = self.reply.clone();
        Box::pin(async move { reply })
    }
}

/// Panics inside the generation future.
struct Panicking;

impl NarrationBackend for Panicking {
    fn generate<'a>(&'a self, _parts: PromptParts) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(async { panic!("provider bug") })
    }
}

fn config(pages: usize, backend: Arc<Scripted>) -> ConversionConfig {
    config_with(FakeEngine { pages, ..Default::default() }, backend)
}

fn config_with(engine: FakeEngine, backend: Arc<dyn NarrationBackend>) -> ConversionConfig {
    ConversionConfig::builder()
        .engine(Arc::new(engine))
        .backend(backend)
        .build()
        .unwrap()
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn fake_pdf(dir: &Path) -> PathBuf {
    let path = dir.join("lecture.pdf");
    std::fs::write(&path, b"%PDF-1.7\n% fixture\n").unwrap();
    path
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 20, 30])))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

const TEXT_SHAPE: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="7" name="Body 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="457200"/><a:ext cx="8229600" cy="3429000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>Quarterly revenue grew 12%</a:t></a:r></a:p><a:p><a:r><a:t>Churn fell to 3%</a:t></a:r></a:p></p:txBody></p:sp>"#;

/// A deck of `picture`, `text` and (optionally) empty slides.
fn fixture_deck(dir: &Path, with_empty: bool) -> PathBuf {
    let mut deck = OutputDeck::new(W, H).unwrap();
    let first = deck.add_blank_slide().unwrap();
    deck.place_image(first, &png(32, 18), EmuRect { x: 0, y: 0, cx: W, cy: H })
        .unwrap();
    deck.add_blank_slide().unwrap();
    if with_empty {
        deck.add_blank_slide().unwrap();
    }

    let mut pkg = Package::from_reader(Cursor::new(deck.to_bytes().unwrap())).unwrap();
    let slide2 = "ppt/slides/slide2.xml";
    let xml = pkg.part_str(slide2).unwrap().replace(
        "</p:spTree>",
        &format!("{TEXT_SHAPE}</p:spTree>"),
    );
    pkg.put(slide2, xml);

    let path = dir.join("talk.pptx");
    let file = std::fs::File::create(&path).unwrap();
    pkg.write_to(file).unwrap();
    path
}

async fn collect(job: ConversionJob, config: &ConversionConfig) -> Vec<ProgressEvent> {
    convert_stream(job, config)
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await
}

fn statuses(events: &[ProgressEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.status()).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_becomes_one_image_slide_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(dir.path());
    let out = dir.path().join("out.pptx");
    let backend = Scripted::replying("**Welcome** to this part of the lecture.");

    let job = ConversionJob::new(pdf.to_string_lossy()).unwrap().with_output(&out);
    let events = collect(job, &config(3, backend.clone())).await;

    assert_eq!(
        statuses(&events),
        vec![
            "started",
            "processing",
            "processing",
            "processing",
            "processing",
            "processing",
            "processing",
            "saving",
            "complete"
        ]
    );
    match events.last().unwrap() {
        ProgressEvent::Complete { filename, total_slides, .. } => {
            assert_eq!(filename, "out.pptx");
            assert_eq!(*total_slides, 3);
        }
        other => panic!("unexpected terminal event {other:?}"),
    }
    for e in &events {
        if let ProgressEvent::Processing { slide_image, .. } = e {
            assert!(slide_image.as_deref().is_some_and(|s| !s.is_empty()));
        }
    }

    let deck = SourceDeck::open(&out).unwrap();
    assert_eq!(deck.slide_count(), 3);
    for slide in &deck.slides {
        assert_eq!(
            slide.notes.as_deref(),
            Some("Welcome to this part of the lecture.")
        );
        assert_eq!(slide.shapes.len(), 1);
        assert!(matches!(slide.shapes[0].content, ShapeContent::Picture(Some(_))));
        let b = slide.shapes[0].bounds.unwrap();
        assert!(b.left.abs() < 1e-9 && b.top.abs() < 1e-9);
        assert!((b.width - 1.0).abs() < 1e-9 && (b.height - 1.0).abs() < 1e-9);
    }

    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(has_image, _)| *has_image));
}

#[tokio::test]
async fn failing_backend_still_writes_notes() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(dir.path());
    let out = dir.path().join("fallback.pptx");

    let job = ConversionJob::new(pdf.to_string_lossy()).unwrap().with_output(&out);
    let report = convert(job, &config(2, Scripted::failing())).await.unwrap();
    assert_eq!(report.total_slides, 2);
    assert_eq!(report.narrations.placeholder, 2);

    let deck = SourceDeck::open(&out).unwrap();
    for slide in &deck.slides {
        assert_eq!(slide.notes.as_deref(), Some(GENERATION_FAILED));
    }
}

#[tokio::test]
async fn deck_slides_pick_image_or_text_narration() {
    let dir = tempfile::tempdir().unwrap();
    let source = fixture_deck(dir.path(), false);
    let out = dir.path().join("talk_with_notes.pptx");
    let backend = Scripted::replying("Let me walk you through this.");

    let style: NarrationStyle = "epic".parse().unwrap_or_default();
    let job = ConversionJob::new(source.to_string_lossy())
        .unwrap()
        .with_output(&out)
        .with_style(style);
    let report = convert(job, &config(0, backend.clone())).await.unwrap();

    assert_eq!(report.total_slides, 2);
    assert_eq!(report.narrations.image, 1);
    assert_eq!(report.narrations.text, 1);

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].0, "picture slide is narrated from its image");
    assert!(!calls[1].0, "text slide is narrated from its text");
    assert!(calls[1].1.contains("Quarterly revenue grew 12%\nChurn fell to 3%"));
    // Unknown style falls back to the standard band.
    assert!(calls.iter().all(|(_, prompt)| prompt.contains("45-60 seconds")));

    let deck = SourceDeck::open(&out).unwrap();
    assert_eq!(deck.slide_count(), 2);
    for slide in &deck.slides {
        assert_eq!(slide.notes.as_deref(), Some("Let me walk you through this."));
    }
    // Existing content is untouched.
    assert!(matches!(deck.slides[0].shapes[0].content, ShapeContent::Picture(Some(_))));
    assert_eq!(
        deck.slides[1].extracted_text(),
        "Quarterly revenue grew 12%\nChurn fell to 3%"
    );
}

#[tokio::test]
async fn empty_slide_gets_placeholder_without_backend_call() {
    let dir = tempfile::tempdir().unwrap();
    let source = fixture_deck(dir.path(), true);
    let out = dir.path().join("with_empty.pptx");
    let backend = Scripted::replying("Narration.");

    let job = ConversionJob::new(source.to_string_lossy()).unwrap().with_output(&out);
    let events = collect(job, &config(0, backend.clone())).await;
    assert_eq!(events.last().unwrap().status(), "complete");

    // The empty slide has no visual, so its processing events carry no preview.
    let third: Vec<&ProgressEvent> = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Processing { current_slide: 3, .. }))
        .collect();
    assert_eq!(third.len(), 2);
    assert!(third
        .iter()
        .all(|e| matches!(e, ProgressEvent::Processing { slide_image: None, .. })));

    assert_eq!(backend.calls().len(), 2);
    let deck = SourceDeck::open(&out).unwrap();
    assert_eq!(deck.slides[2].notes.as_deref(), Some(EMPTY_SLIDE));
}

#[tokio::test]
async fn save_failure_ends_with_error_event() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(dir.path());
    let out = dir.path().join("missing-dir").join("out.pptx");

    let job = ConversionJob::new(pdf.to_string_lossy()).unwrap().with_output(&out);
    let events = collect(job.clone(), &config(1, Scripted::replying("Hi."))).await;
    assert_eq!(
        statuses(&events),
        vec!["started", "processing", "processing", "saving", "error"]
    );
    assert!(!out.exists());

    let err = convert(job, &config(1, Scripted::replying("Hi.")))
        .await
        .unwrap_err();
    assert!(matches!(err, NarratorError::OutputWriteFailed { .. }));
}

#[tokio::test]
async fn wrong_magic_fails_before_any_event() {
    let dir = tempfile::tempdir().unwrap();
    let fake = dir.path().join("notes.pptx");
    std::fs::write(&fake, b"%PDF-1.4 not a deck").unwrap();

    let job = ConversionJob::new(fake.to_string_lossy()).unwrap();
    let result = convert_stream(job, &config(0, Scripted::replying("x"))).await;
    assert!(matches!(result, Err(NarratorError::BadMagic { .. })));
}

#[tokio::test]
async fn blocking_and_streaming_forms_write_identical_decks() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(dir.path());
    let a = dir.path().join("a.pptx");
    let b = dir.path().join("b.pptx");

    let job = ConversionJob::new(pdf.to_string_lossy()).unwrap();
    convert(job.clone().with_output(&a), &config(2, Scripted::replying("Same words.")))
        .await
        .unwrap();
    collect(job.with_output(&b), &config(2, Scripted::replying("Same words."))).await;

    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[tokio::test]
async fn render_failure_mid_job_stops_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(dir.path());
    let out = dir.path().join("truncated.pptx");
    let engine = FakeEngine {
        pages: 3,
        broken_page: Some(1),
        ..Default::default()
    };

    let job = ConversionJob::new(pdf.to_string_lossy()).unwrap().with_output(&out);
    let events = collect(job, &config_with(engine, Scripted::replying("Hi."))).await;
    assert_eq!(
        statuses(&events),
        vec!["started", "processing", "processing", "error"]
    );
    match events.last().unwrap() {
        ProgressEvent::Error { error, .. } => assert!(error.contains("page 2")),
        other => panic!("unexpected terminal event {other:?}"),
    }
    assert!(!out.exists());
}

#[tokio::test]
async fn panicking_backend_still_ends_with_error_event() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(dir.path());
    let out = dir.path().join("panicked.pptx");
    let engine = FakeEngine {
        pages: 2,
        ..Default::default()
    };

    let job = ConversionJob::new(pdf.to_string_lossy()).unwrap().with_output(&out);
    let config = config_with(engine, Arc::new(Panicking));
    let events = collect(job.clone(), &config).await;
    assert_eq!(statuses(&events), vec!["started", "processing", "error"]);
    assert!(events.last().unwrap().is_terminal());
    assert!(!out.exists());

    let err = convert(job, &config).await.unwrap_err();
    match err {
        NarratorError::Internal(msg) => assert!(msg.contains("provider bug")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn deck_without_painter_narrates_from_text() {
    let dir = tempfile::tempdir().unwrap();
    let source = fixture_deck(dir.path(), false);
    let out = dir.path().join("text_only.pptx");
    let backend = Scripted::replying("Here are the numbers.");
    let engine = FakeEngine {
        no_painter: true,
        ..Default::default()
    };

    let job = ConversionJob::new(source.to_string_lossy()).unwrap().with_output(&out);
    let events = collect(job, &config_with(engine, backend.clone())).await;
    assert_eq!(events.last().unwrap().status(), "complete");
    assert!(events
        .iter()
        .all(|e| !matches!(e, ProgressEvent::Processing { slide_image: Some(_), .. })));

    // Only the text slide reaches the backend, and without an image.
    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].0);
    assert!(calls[0].1.contains("Quarterly revenue grew 12%"));

    let deck = SourceDeck::open(&out).unwrap();
    // The picture slide had content that could not be drawn; it is not empty.
    assert_eq!(deck.slides[0].notes.as_deref(), Some(GENERATION_FAILED));
    assert_eq!(deck.slides[1].notes.as_deref(), Some("Here are the numbers."));
}
