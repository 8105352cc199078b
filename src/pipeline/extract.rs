//! Vision-model interaction: one chat request per document.
//!
//! ## Why one call for all pages?
//!
//! An invoice's line items may continue onto later pages while the header
//! fields (seller, invoice number, totals) appear once on the first. Sending
//! every page image in a single request lets the model reason across pages
//! and return one coherent record; per-page calls would have to re-merge
//! partial records afterwards.
//!
//! ## Message layout
//!
//! 1. **System message** — the extraction instruction (schema + rules)
//! 2. **User message** — all page JPEGs as base64 attachments (empty text)
//!
//! The empty user text is intentional: the APIs require at least one user
//! turn to respond to, but the images carry all the actual content.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Send the instruction plus all page images to the model and return its raw
/// text response.
///
/// A single attempt: transient API failures surface as
/// [`DocumentError::LlmFailed`] and the caller moves on to the next document.
/// An empty response body is treated the same way — there is nothing to parse.
pub async fn extract_document(
    provider: &Arc<dyn LLMProvider>,
    document: &str,
    image_paths: &[&Path],
    prompt: &str,
    config: &ExtractionConfig,
) -> Result<String, DocumentError> {
    let start = Instant::now();

    let mut images = Vec::with_capacity(image_paths.len());
    for path in image_paths {
        images.push(load_page_image(document, path).await?);
    }

    let messages = vec![
        ChatMessage::system(prompt),
        ChatMessage::user_with_images("", images),
    ];

    let options = build_options(config);

    let response = provider
        .chat(&messages, Some(&options))
        .await
        .map_err(|e| DocumentError::LlmFailed {
            document: document.to_string(),
            detail: e.to_string(),
        })?;

    debug!(
        "{document}: {} input tokens, {} output tokens, {:?}",
        response.prompt_tokens,
        response.completion_tokens,
        start.elapsed()
    );

    if response.content.trim().is_empty() {
        return Err(DocumentError::LlmFailed {
            document: document.to_string(),
            detail: "empty response".to_string(),
        });
    }

    Ok(response.content)
}

/// Read a rendered page from disk and wrap it as a base64 image attachment.
///
/// `detail: "high"` instructs GPT-4-class models to use the full image tile
/// budget; without it small print (tax columns, GSTIN digits) is lost.
async fn load_page_image(document: &str, path: &Path) -> Result<ImageData, DocumentError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DocumentError::LlmFailed {
            document: document.to_string(),
            detail: format!("cannot read page image '{}': {e}", path.display()),
        })?;

    let b64 = STANDARD.encode(&bytes);
    debug!("{document}: encoded {} → {} bytes base64", path.display(), b64.len());

    Ok(ImageData::new(b64, "image/jpeg").with_detail("high"))
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
