//! The driver: iterate a directory of PDFs, run the pipeline on each, write
//! one CSV at the end.
//!
//! ## Failure isolation
//!
//! Each document runs the full rasterise → extract → parse → flatten chain
//! on its own; any stage failure is logged, recorded in the summary, and the
//! loop moves on. Only two things are fatal: being unable to set up (input
//! directory unreadable, no provider configured) and finishing with zero
//! rows — in which case no CSV is written and
//! [`ExtractError::NoRowsExtracted`] is returned.
//!
//! ## Why accumulate-then-write?
//!
//! The header must be the sorted union of every row's keys, which is only
//! known after the last document. Rows therefore accumulate in memory and
//! the CSV is written once — an intentional simplification, not a bug.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, ExtractError};
use crate::output::{self, RunSummary};
use crate::pipeline::flatten::{self, Row};
use crate::pipeline::{extract, parse, render};
use crate::prompts::DEFAULT_EXTRACTION_PROMPT;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract every PDF in `input_dir` and write the flattened rows to
/// `output_csv`.
///
/// Page images land in `image_dir` (created if absent), one JPEG per page.
///
/// # Returns
/// `Ok(RunSummary)` when at least one row was written, even if some
/// documents failed (check `summary.failures`).
///
/// # Errors
/// Returns `Err(ExtractError)` only for run-level failures:
/// - Input directory missing or unreadable
/// - No LLM provider configured (missing API key)
/// - Zero rows accumulated across all documents
/// - CSV write failure
pub async fn process_invoices(
    input_dir: impl AsRef<Path>,
    image_dir: impl AsRef<Path>,
    output_csv: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<RunSummary, ExtractError> {
    let total_start = Instant::now();
    let input_dir = input_dir.as_ref();
    let image_dir = image_dir.as_ref();
    let output_csv = output_csv.as_ref();

    // ── Step 1: Resolve the provider once, before touching any document ──
    let provider = resolve_provider(config)?;
    let prompt = config.prompt.as_deref().unwrap_or(DEFAULT_EXTRACTION_PROMPT);

    // ── Step 2: List the input directory ─────────────────────────────────
    let documents = list_pdf_files(input_dir).await?;
    info!("Found {} PDF document(s) in {}", documents.len(), input_dir.display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(documents.len());
    }

    // ── Step 3: Per-document pipeline, accumulating rows ─────────────────
    let mut all_rows: Vec<Row> = Vec::new();
    let mut columns: BTreeSet<String> = BTreeSet::new();
    let mut failures: Vec<DocumentError> = Vec::new();
    let mut documents_extracted = 0usize;
    let mut render_duration_ms = 0u64;
    let mut llm_duration_ms = 0u64;

    let total = documents.len();
    for (i, pdf_path) in documents.iter().enumerate() {
        let document = render::document_name(pdf_path);
        info!("--- Processing {} ---", pdf_path.display());
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(i + 1, total, &document);
        }

        match process_one(
            &provider,
            pdf_path,
            &document,
            image_dir,
            prompt,
            config,
            &mut render_duration_ms,
            &mut llm_duration_ms,
        )
        .await
        {
            Ok(rows) => {
                debug!("{document}: {} row(s)", rows.len());
                for row in &rows {
                    columns.extend(row.keys().cloned());
                }
                documents_extracted += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_complete(i + 1, total, &document, rows.len());
                }
                all_rows.extend(rows);
            }
            Err(e) => {
                warn!("{e}");
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_error(i + 1, total, &document, &e.to_string());
                }
                failures.push(e);
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, documents_extracted, all_rows.len());
    }

    // ── Step 4: Write the CSV, or report that there is nothing to write ──
    if all_rows.is_empty() {
        warn!("No data extracted; CSV not written");
        return Err(ExtractError::NoRowsExtracted { documents: total });
    }

    let columns: Vec<String> = columns.into_iter().collect();
    output::write_rows(output_csv, &columns, &all_rows)?;
    info!("Wrote {} row(s) to {}", all_rows.len(), output_csv.display());

    Ok(RunSummary {
        documents_total: total,
        documents_extracted,
        documents_failed: failures.len(),
        rows_written: all_rows.len(),
        columns,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        llm_duration_ms,
        failures,
    })
}

/// Synchronous wrapper around [`process_invoices`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_invoices_sync(
    input_dir: impl AsRef<Path>,
    image_dir: impl AsRef<Path>,
    output_csv: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<RunSummary, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(process_invoices(input_dir, image_dir, output_csv, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run the full pipeline for one document.
#[allow(clippy::too_many_arguments)]
async fn process_one(
    provider: &Arc<dyn LLMProvider>,
    pdf_path: &Path,
    document: &str,
    image_dir: &Path,
    prompt: &str,
    config: &ExtractionConfig,
    render_duration_ms: &mut u64,
    llm_duration_ms: &mut u64,
) -> Result<Vec<Row>, DocumentError> {
    let render_start = Instant::now();
    let pages = render::rasterize_document(pdf_path, image_dir, config).await?;
    *render_duration_ms += render_start.elapsed().as_millis() as u64;

    if pages.is_empty() {
        return Err(DocumentError::NoPages {
            document: document.to_string(),
        });
    }

    let page_refs: Vec<&Path> = pages.iter().map(PathBuf::as_path).collect();
    let llm_start = Instant::now();
    let raw = extract::extract_document(provider, document, &page_refs, prompt, config).await?;
    *llm_duration_ms += llm_start.elapsed().as_millis() as u64;
    debug!("{document}: raw response:\n{raw}");

    let invoice = parse::parse_invoice(document, &raw)?;
    Ok(flatten::flatten_invoice(&invoice))
}

/// List regular files in `dir` with a case-insensitive `.pdf` extension,
/// sorted by file name for deterministic processing order.
async fn list_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    if !dir.is_dir() {
        return Err(ExtractError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let unreadable = |e: std::io::Error| ExtractError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut pdfs = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file && has_pdf_extension(&path) {
            pdfs.push(path);
        }
    }

    pdfs.sort();
    Ok(pdfs)
}

/// Case-insensitive check for a `.pdf` file name suffix.
fn has_pdf_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_lowercase().ends_with(".pdf"))
        .unwrap_or(false)
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// The fallback chain lets library users and CLI users each set exactly as
/// much or as little as they need:
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    and configured the provider entirely; used as-is. Useful in tests or
///    when the caller needs custom middleware.
///
/// 2. **Named provider + model** (`config.provider_name`) — the factory
///    reads the corresponding API key (`GEMINI_API_KEY`, `OPENAI_API_KEY`,
///    etc.) from the environment.
///
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    provider and model chosen at the execution-environment level
///    (Makefile, shell script, CI).
///
/// 4. **Gemini key** — invoices are typically extracted with Gemini vision
///    models; when `GEMINI_API_KEY` is present it wins over full
///    auto-detection so users with several keys get the expected provider.
///
/// 5. **Full auto-detection** (`ProviderFactory::from_env`) — scans all
///    known API key variables and picks the first available provider.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    // 4) Prefer Gemini when its key is present
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("gemini", model);
        }
    }

    // 5) Full auto-detection
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}

const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension(Path::new("invoice.pdf")));
        assert!(has_pdf_extension(Path::new("INVOICE.PDF")));
        assert!(has_pdf_extension(Path::new("scan.Pdf")));
        assert!(!has_pdf_extension(Path::new("notes.txt")));
        assert!(!has_pdf_extension(Path::new("pdf")));
        assert!(!has_pdf_extension(Path::new("archive.pdf.zip")));
    }

    #[tokio::test]
    async fn listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PDF", "a.pdf", "skip.txt", "c.pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let files = list_pdf_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF", "c.pdf"]);
    }

    #[tokio::test]
    async fn missing_input_dir_is_fatal() {
        let err = list_pdf_files(Path::new("/no/such/dir")).await.unwrap_err();
        assert!(matches!(err, ExtractError::InputDirNotFound { .. }));
    }
}
