//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events as the driver works through the input directory.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a terminal progress bar, a log aggregator, or a GUI —
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so the same implementation works
//! if a caller drives several runs from different tasks.

use std::sync::Arc;

/// Called by the driver as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Documents are processed strictly sequentially, so
/// events for one run arrive in order.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before any document is processed.
    ///
    /// # Arguments
    /// * `total_documents` — number of PDF files found in the input directory
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document enters the pipeline.
    ///
    /// # Arguments
    /// * `index`    — 1-indexed position in the run
    /// * `total`    — total documents in the run
    /// * `document` — file name of the document
    fn on_document_start(&self, index: usize, total: usize, document: &str) {
        let _ = (index, total, document);
    }

    /// Called when a document's rows have been accumulated.
    ///
    /// # Arguments
    /// * `rows` — number of flattened rows the document contributed
    fn on_document_complete(&self, index: usize, total: usize, document: &str, rows: usize) {
        let _ = (index, total, document, rows);
    }

    /// Called when a document fails at any pipeline stage.
    ///
    /// # Arguments
    /// * `error` — human-readable error description
    fn on_document_error(&self, index: usize, total: usize, document: &str, error: &str) {
        let _ = (index, total, document, error);
    }

    /// Called once after all documents have been attempted.
    ///
    /// # Arguments
    /// * `total_documents` — documents attempted
    /// * `extracted`       — documents that contributed at least one row
    /// * `rows`            — total rows accumulated across the run
    fn on_run_complete(&self, total_documents: usize, extracted: usize, rows: usize) {
        let _ = (total_documents, extracted, rows);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        rows: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_document_start(&self, _index: usize, _total: usize, _document: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _i: usize, _t: usize, _doc: &str, rows: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.rows.fetch_add(rows, Ordering::SeqCst);
        }

        fn on_document_error(&self, _i: usize, _t: usize, _doc: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_document_start(1, 3, "a.pdf");
        cb.on_document_complete(1, 3, "a.pdf", 4);
        cb.on_document_error(2, 3, "b.pdf", "model call failed");
        cb.on_run_complete(3, 2, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            rows: AtomicUsize::new(0),
        };

        tracker.on_document_start(1, 2, "inv_001.pdf");
        tracker.on_document_complete(1, 2, "inv_001.pdf", 3);
        tracker.on_document_start(2, 2, "inv_002.pdf");
        tracker.on_document_error(2, 2, "inv_002.pdf", "invalid JSON");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.rows.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_document_start(1, 10, "x.pdf");
    }
}
