//! # invoice2csv
//!
//! Extract structured invoice data from PDF documents using Vision Language
//! Models (VLMs) and export the line items to CSV.
//!
//! ## Why this crate?
//!
//! Retail invoices are laid out for humans: header fields in one corner,
//! addresses in boxes, line items in a table that may continue across pages.
//! Template-based extractors break on every new seller layout. Instead this
//! crate rasterises each page into a JPEG and lets a VLM read the invoice as
//! a human would, returning a JSON record that is then flattened into one
//! spreadsheet row per line item.
//!
//! ## Pipeline Overview
//!
//! ```text
//! directory of PDFs
//!  │  (per document, strictly sequential)
//!  ├─ 1. Render   rasterise pages to JPEGs via pdfium (spawn_blocking)
//!  ├─ 2. Extract  one VLM call: instruction + all page images
//!  ├─ 3. Parse    strip ```json fences, decode, build the Invoice
//!  ├─ 4. Flatten  one row per line item, invoice fields repeated
//!  └─ 5. Export   single CSV, sorted union header, written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice2csv::{process_invoices, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let summary = process_invoices("invoices/", "pages/", "invoices.csv", &config).await?;
//!     eprintln!(
//!         "{} rows from {}/{} documents",
//!         summary.rows_written, summary.documents_extracted, summary.documents_total
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Every per-document error (unreadable PDF, model failure, non-JSON
//! response) is isolated: it is logged, recorded in
//! [`RunSummary::failures`], and the run continues with the next document.
//! Only a run that produces zero rows returns an error, and in that case no
//! CSV file is written.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice2csv` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! invoice2csv = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod invoice;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{DocumentError, ExtractError};
pub use invoice::{Address, ChargeBreakdown, Invoice, LineItem, RESERVED_ITEM_LABELS};
pub use output::RunSummary;
pub use pipeline::flatten::{flatten_invoice, normalize_whitespace, Row};
pub use pipeline::parse::{parse_invoice, strip_json_fences};
pub use process::{process_invoices, process_invoices_sync};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
