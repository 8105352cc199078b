//! PDF rasterisation: render every page of a document to a JPEG on disk.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, so the async driver never stalls
//! during CPU-heavy rendering.
//!
//! ## Why write files instead of keeping images in memory?
//!
//! The rendered pages are part of the tool's observable output: each JPEG is
//! named after its source document and 1-based page index
//! (`<stem>_page_<n>.jpg`), which makes any extracted row traceable back to
//! the exact page image the model saw.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use image::codecs::jpeg::JpegEncoder;
use pdfium_render::prelude::*;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasterise every page of `pdf_path` into `image_dir`.
///
/// Creates `image_dir` if absent. Returns the written JPEG paths in page
/// order. Any failure — missing pdfium library, corrupt document, I/O error —
/// is a [`DocumentError::RenderFailed`] the caller logs and skips; the run
/// continues with the next document.
pub async fn rasterize_document(
    pdf_path: &Path,
    image_dir: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<PathBuf>, DocumentError> {
    let path = pdf_path.to_path_buf();
    let dir = image_dir.to_path_buf();
    let max_pixels = config.max_rendered_pixels;
    let quality = config.jpeg_quality;
    let document = document_name(pdf_path);

    let doc = document.clone();
    tokio::task::spawn_blocking(move || rasterize_blocking(&path, &dir, max_pixels, quality, &doc))
        .await
        .map_err(|e| DocumentError::RenderFailed {
            document,
            detail: format!("render task panicked: {e}"),
        })?
}

/// Blocking implementation of page rasterisation.
fn rasterize_blocking(
    pdf_path: &Path,
    image_dir: &Path,
    max_pixels: u32,
    quality: u8,
    document: &str,
) -> Result<Vec<PathBuf>, DocumentError> {
    std::fs::create_dir_all(image_dir).map_err(|e| DocumentError::RenderFailed {
        document: document.to_string(),
        detail: format!("cannot create image directory '{}': {e}", image_dir.display()),
    })?;

    let pdfium = Pdfium::default();

    let pdf = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| DocumentError::RenderFailed {
            document: document.to_string(),
            detail: format!("{e:?}"),
        })?;

    let pages = pdf.pages();
    let total_pages = pages.len() as usize;
    info!("{document}: {total_pages} pages");

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let stem = document_stem(pdf_path);
    let mut paths = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| DocumentError::RenderFailed {
                document: document.to_string(),
                detail: format!("page {}: {e:?}", idx + 1),
            })?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DocumentError::RenderFailed {
                document: document.to_string(),
                detail: format!("page {}: {e:?}", idx + 1),
            })?;

        let image = bitmap.as_image();
        debug!(
            "{document}: rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        let image_path = image_dir.join(page_image_name(&stem, idx));
        write_jpeg(&image, &image_path, quality).map_err(|detail| DocumentError::RenderFailed {
            document: document.to_string(),
            detail: format!("page {}: {detail}", idx + 1),
        })?;

        paths.push(image_path);
    }

    Ok(paths)
}

/// Encode a rendered page as JPEG at the configured quality.
///
/// pdfium bitmaps carry an alpha channel; JPEG does not, so the image is
/// flattened to RGB first.
fn write_jpeg(image: &image::DynamicImage, path: &Path, quality: u8) -> Result<(), String> {
    let file = std::fs::File::create(path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| e.to_string())
}

/// File name for a rendered page: `<stem>_page_<1-based-index>.jpg`.
pub fn page_image_name(stem: &str, page_index: usize) -> String {
    format!("{stem}_page_{}.jpg", page_index + 1)
}

/// The document's base name without the `.pdf` extension.
fn document_stem(pdf_path: &Path) -> String {
    pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// The document's file name as shown in logs and errors.
pub fn document_name(pdf_path: &Path) -> String {
    pdf_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf_path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_are_one_based() {
        assert_eq!(page_image_name("inv_001", 0), "inv_001_page_1.jpg");
        assert_eq!(page_image_name("inv_001", 11), "inv_001_page_12.jpg");
    }

    #[test]
    fn stem_drops_extension_only() {
        assert_eq!(document_stem(Path::new("/in/inv 42.pdf")), "inv 42");
        assert_eq!(document_stem(Path::new("scan.2024.pdf")), "scan.2024");
    }

    #[test]
    fn document_name_keeps_extension() {
        assert_eq!(document_name(Path::new("/in/inv_001.pdf")), "inv_001.pdf");
    }
}
