//! CLI binary for slide-narrator.
//!
//! A thin shim over the library crate: maps CLI flags onto
//! `ConversionJob` + `ConversionConfig`, then renders the progress stream.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use slide_narrator::{
    convert_stream, inspect, ConversionConfig, ConversionJob, NarrationStyle, NarrationTone,
    ProgressEvent, SourceKind,
};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

const AFTER_HELP: &str = r#"EXAMPLES:
  # Narrate a PDF; writes lecture_with_notes.pptx
  slide-narrator lecture.pdf

  # Add notes to an existing deck
  slide-narrator talk.pptx -o talk_narrated.pptx --style brief --tone casual

  # Use a specific model
  slide-narrator --provider openai --model gpt-4.1-mini deck.pdf

  # Stream progress as JSON lines (one event per line)
  slide-narrator --json deck.pdf

  # Count pages/slides only (no API key needed)
  slide-narrator --inspect-only deck.pptx

STYLES:
  brief      20-30 seconds, 2-4 sentences
  standard   45-60 seconds, 4-6 sentences (default)
  detailed   90-120 seconds, 8-12 sentences

TONES:
  professional (default), casual, academic, persuasive, enthusiastic,
  storytelling, technical, inspirational, educational
  Unrecognised styles and tones fall back to the default.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY            Google Gemini API key (default provider)
  OPENAI_API_KEY            OpenAI API key
  ANTHROPIC_API_KEY         Anthropic API key
  SLIDE_NARRATOR_PROVIDER   Override provider (gemini, openai, anthropic, ollama)
  SLIDE_NARRATOR_MODEL      Override model ID
  PDFIUM_LIB_PATH           Path to libpdfium (file or directory)
"#;

/// Add AI-written presenter notes to PDFs and PPTX decks.
#[derive(Parser, Debug)]
#[command(
    name = "slide-narrator",
    version,
    about = "Turn PDFs and slide decks into PPTX decks with AI speaker notes",
    long_about = "Convert a PDF (every page becomes an image slide) or an existing PPTX \
(slides are kept) into a PowerPoint deck whose presenter notes hold a spoken-style \
narration written by a Vision Language Model.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local .pdf/.pptx path or HTTP/HTTPS URL.
    input: String,

    /// Output .pptx path. Default: <input stem>_with_notes.pptx
    #[arg(short, long, env = "SLIDE_NARRATOR_OUTPUT")]
    output: Option<PathBuf>,

    /// Narration length: brief, standard, detailed.
    #[arg(long, env = "SLIDE_NARRATOR_STYLE", default_value = "standard")]
    style: String,

    /// Narration tone: professional, casual, academic, …
    #[arg(long, env = "SLIDE_NARRATOR_TONE", default_value = "professional")]
    tone: String,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, env = "SLIDE_NARRATOR_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "SLIDE_NARRATOR_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-2.5-flash, gpt-4.1-mini).
    #[arg(long, env = "SLIDE_NARRATOR_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SLIDE_NARRATOR_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Max LLM output tokens per slide.
    #[arg(long, env = "SLIDE_NARRATOR_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SLIDE_NARRATOR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print every progress event as one JSON line on stdout.
    #[arg(long, env = "SLIDE_NARRATOR_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SLIDE_NARRATOR_NO_PROGRESS")]
    no_progress: bool,

    /// Report source kind and page/slide count only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SLIDE_NARRATOR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SLIDE_NARRATOR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters; keep library
    // INFO logs out of its way unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let summary = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect source")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        } else {
            println!("File:         {}", cli.input);
            match summary.kind {
                SourceKind::PagedDocument => println!("Kind:         PDF"),
                SourceKind::ExistingDeck => println!("Kind:         PPTX"),
            }
            println!("Units:        {}", summary.units);
            if let Some((cx, cy)) = summary.slide_size_emu {
                println!(
                    "Slide size:   {:.2} × {:.2} in",
                    cx as f64 / 914_400.0,
                    cy as f64 / 914_400.0
                );
                println!("With notes:   {}", summary.slides_with_notes);
            }
        }
        return Ok(());
    }

    let job = build_job(&cli)?;
    let output_path = job.output_path.clone();
    let started = Instant::now();

    // ── Run conversion ───────────────────────────────────────────────────
    let mut events = convert_stream(job, &config)
        .await
        .context("Conversion failed")?;

    let bar = show_progress.then(spinner);
    let mut failure: Option<String> = None;
    let mut completed = false;

    while let Some(event) = events.next().await {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string(&event).context("Failed to serialise event")?
            );
        }
        if let Some(ref bar) = bar {
            render_event(bar, &event);
        }
        match &event {
            ProgressEvent::Error { error, .. } => failure = Some(error.clone()),
            ProgressEvent::Complete { .. } => completed = true,
            _ => {}
        }
    }

    if let Some(error) = failure {
        anyhow::bail!("Conversion failed: {error}");
    }
    if !completed {
        if let Some(ref bar) = bar {
            bar.finish_and_clear();
        }
        anyhow::bail!("Conversion ended without completing");
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{}  {}ms  →  {}",
            green("✔"),
            started.elapsed().as_millis(),
            bold(&output_path.display().to_string()),
        );
    }
    Ok(())
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix("Preparing");
    bar.set_message("Opening source…");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Advance the terminal progress bar for one event.
fn render_event(bar: &ProgressBar, event: &ProgressEvent) {
    match event {
        ProgressEvent::Started { total_slides, message } => {
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {pos:>3}/{len} slides  \
                     ⏱ {elapsed_precise}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            bar.set_length(*total_slides as u64);
            bar.set_prefix("Narrating");
            bar.reset_eta();
            bar.println(format!("{} {}", cyan("◆"), bold(message)));
        }
        ProgressEvent::Processing {
            current_slide,
            message,
            ..
        } => {
            bar.set_message(message.clone());
            // The second event of a unit marks it done.
            if bar.position() < *current_slide as u64 && message.starts_with("Narrated") {
                bar.println(format!("  {} {}", green("✓"), dim(message)));
                bar.set_position(*current_slide as u64);
            }
        }
        ProgressEvent::Saving { message, .. } => {
            bar.set_prefix("Saving");
            bar.set_message(message.clone());
        }
        ProgressEvent::Complete { message, .. } => {
            bar.finish_and_clear();
            eprintln!("{} {}", green("✔"), message);
        }
        ProgressEvent::Error { error, .. } => {
            bar.finish_and_clear();
            eprintln!("{} {}", red("✘"), red(error));
        }
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    builder.build().context("Invalid configuration")
}

/// Map CLI args to `ConversionJob`.
fn build_job(cli: &Cli) -> Result<ConversionJob> {
    let style: NarrationStyle = cli.style.parse().unwrap_or_default();
    let tone: NarrationTone = cli.tone.parse().unwrap_or_default();
    let mut job = ConversionJob::new(cli.input.clone())
        .context("Unsupported input")?
        .with_dpi(cli.dpi)
        .with_style(style)
        .with_tone(tone);
    if let Some(ref output) = cli.output {
        job = job.with_output(output.clone());
    }
    Ok(job)
}
