//! Error types for the invoice2csv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the run cannot proceed or produced nothing
//!   at all (unreadable input directory, no provider configured, zero rows
//!   accumulated, CSV write failure). Returned as `Err(ExtractError)` from
//!   the top-level `process_invoices*` functions.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (pdfium
//!   could not open it, the model call errored, the response was not JSON)
//!   but all other documents are fine. Stored inside
//!   [`crate::output::RunSummary::failures`] so callers can inspect partial
//!   success rather than losing the whole run to one bad invoice.
//!
//! The separation encodes the propagation policy: no error from one
//! document's pipeline may abort processing of subsequent documents; only
//! the final "no rows at all" condition surfaces as an overall failure.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice2csv library.
///
/// Per-document failures use [`DocumentError`] and are stored in
/// [`crate::output::RunSummary`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input directory was not found at the given path.
    #[error("Input directory not found: '{path}'\nCheck the path exists and is readable.")]
    InputDirNotFound { path: PathBuf },

    /// Listing the input directory failed mid-iteration.
    #[error("Failed to read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    ///
    /// Raised before the first document is touched — a missing credential
    /// must fail loudly at startup, never crash silently per document.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Every document yielded zero rows; the CSV file is not written.
    #[error("No invoice rows extracted from {documents} document(s); CSV not written")]
    NoRowsExtracted { documents: usize },

    /// Could not create or write the output CSV file.
    #[error("Failed to write output CSV '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Recorded in [`crate::output::RunSummary::failures`] when a document fails.
/// The overall run continues unless every document fails to produce rows.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// pdfium could not open or render the document.
    #[error("{document}: rasterisation failed: {detail}")]
    RenderFailed { document: String, detail: String },

    /// The document rendered to zero page images.
    #[error("{document}: produced no page images")]
    NoPages { document: String },

    /// The model call failed or returned an empty response.
    #[error("{document}: model call failed: {detail}")]
    LlmFailed { document: String, detail: String },

    /// The model response was not valid JSON after fence-stripping.
    ///
    /// `snippet` is the exact text that was handed to the JSON parser,
    /// preserved verbatim for diagnosis.
    #[error("{document}: model returned invalid JSON: {detail}\n---START---\n{snippet}\n---END---")]
    ParseFailed {
        document: String,
        detail: String,
        snippet: String,
    },
}

impl DocumentError {
    /// Name of the document this error belongs to.
    pub fn document(&self) -> &str {
        match self {
            DocumentError::RenderFailed { document, .. }
            | DocumentError::NoPages { document }
            | DocumentError::LlmFailed { document, .. }
            | DocumentError::ParseFailed { document, .. } => document,
        }
    }
}
