//! CLI binary for invoice2csv.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use invoice2csv::{
    process_invoices, ExtractionConfig, ExtractionProgressCallback, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar across the run, one log line per
/// document as it completes or fails.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Create a callback whose bar length is set by `on_run_start` once the
    /// input directory has been listed.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Listing PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_documents as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_documents} invoice(s)…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, document: &str) {
        self.bar.set_message(document.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, document: &str, rows: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            document,
            dim(&format!("{rows} row(s)")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, document: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let mut m: String = error.chars().take(79).collect();
            m.push('\u{2026}');
            m
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            document,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_documents: usize, extracted: usize, rows: usize) {
        let failed = total_documents.saturating_sub(extracted);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} document(s) extracted, {} row(s)",
                green("✔"),
                bold(&extracted.to_string()),
                rows
            );
        } else {
            eprintln!(
                "{} {}/{} document(s) extracted  ({} failed), {} row(s)",
                if extracted == 0 { red("✘") } else { cyan("⚠") },
                bold(&extracted.to_string()),
                total_documents,
                red(&failed.to_string()),
                rows
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every PDF in ./invoices to invoices.csv
  invoice2csv invoices/

  # Choose the output CSV and image directory
  invoice2csv invoices/ -o export/march.csv --images-dir export/pages

  # Use a specific model
  invoice2csv --model gemini-2.5-pro invoices/

  # Use a custom extraction prompt
  invoice2csv --prompt my_prompt.txt invoices/

  # Machine-readable run summary
  invoice2csv --json invoices/ > summary.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (preferred when set)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium

SETUP:
  1. Set API key:     export GEMINI_API_KEY=...
  2. Extract:         invoice2csv invoices/ -o invoices.csv

OUTPUT:
  - One CSV row per invoice line item; invoice-level fields repeated per row.
  - Header = sorted union of all columns seen in the run.
  - Rendered page images land in the image directory as
    <document>_page_<n>.jpg for traceability.
  - The CSV is only written when at least one row was extracted.
"#;

/// Extract invoice data from PDFs to CSV using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "invoice2csv",
    version,
    about = "Extract invoice data from PDFs to CSV using Vision LLMs",
    long_about = "Extract structured invoice fields (seller, addresses, taxes, line items) from \
PDF documents using Vision Language Models and export them as a single CSV, one row per \
line item. Supports Google Gemini, OpenAI, Anthropic, and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the PDF invoices.
    input_dir: PathBuf,

    /// Output CSV path.
    #[arg(short, long, env = "INVOICE2CSV_OUTPUT", default_value = "invoices.csv")]
    output: PathBuf,

    /// Directory for rendered page images.
    #[arg(long, env = "INVOICE2CSV_IMAGES_DIR", default_value = "pages")]
    images_dir: PathBuf,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: gemini, openai, anthropic, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "INVOICE2CSV_PROMPT")]
    prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "INVOICE2CSV_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per document.
    #[arg(long, env = "INVOICE2CSV_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Maximum rendered page dimension in pixels.
    #[arg(long, env = "INVOICE2CSV_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// JPEG quality for rendered pages (1–100).
    #[arg(long, env = "INVOICE2CSV_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Print the run summary as JSON instead of human-readable text.
    #[arg(long, env = "INVOICE2CSV_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "INVOICE2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INVOICE2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INVOICE2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let summary = process_invoices(&cli.input_dir, &cli.images_dir, &cli.output, &config)
        .await
        .context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {} row(s) from {}/{} document(s)  {}ms  →  {}",
            if summary.documents_failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            summary.rows_written,
            summary.documents_extracted,
            summary.documents_total,
            summary.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} columns  {}  render {}ms  /  model {}ms",
            summary.columns.len(),
            dim("·"),
            summary.render_duration_ms,
            summary.llm_duration_ms,
        );
        for failure in &summary.failures {
            eprintln!("   {} {}", red("✗"), failure);
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let prompt = if let Some(ref path) = cli.prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {path:?}"))?,
        )
    } else {
        None
    };

    let mut builder = ExtractionConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_rendered_pixels(cli.max_pixels)
        .jpeg_quality(cli.jpeg_quality);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Apply fields the builder doesn't have setters for in this code path.
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    config.prompt = prompt;

    Ok(config)
}
