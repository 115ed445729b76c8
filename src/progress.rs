//! Progress-callback trait for per-document export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive
//! events as pass 2 works through the corpus. The CLI renders them as a
//! progress bar; library users can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use blog2md::{ExportConfig, ExportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ExportProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, _index: usize, _total: usize, key: &str, bytes: usize) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{key}: {bytes} bytes");
//!     }
//! }
//!
//! let config = ExportConfig::builder()
//!     .database("corpus")
//!     .base_url("https://example.org/dx/")
//!     .base_dir("/tmp/site")
//!     .progress_callback(Arc::new(CountingCallback { written: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it exports each document.
///
/// Implementations must be `Send + Sync` because the blocking export runs on
/// a tokio blocking thread when started through [`crate::export::export`].
/// All methods default to no-ops.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once after pass 1, before the first document is rendered.
    ///
    /// # Arguments
    /// * `total_documents` : documents that pass 2 will attempt
    fn on_export_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document is rendered.
    ///
    /// # Arguments
    /// * `index` : 1-indexed position in pass 2
    /// * `total` : documents in pass 2
    /// * `key`   : the document key
    fn on_document_start(&self, index: usize, total: usize, key: &str) {
        let _ = (index, total, key);
    }

    /// Called after a document's Markdown file was written.
    ///
    /// `bytes` is the size of the written file (front matter included).
    fn on_document_complete(&self, index: usize, total: usize, key: &str, bytes: usize) {
        let _ = (index, total, key, bytes);
    }

    /// Called when a document failed; the export continues with the next one.
    fn on_document_error(&self, index: usize, total: usize, key: &str, error: &str) {
        let _ = (index, total, key, error);
    }

    /// Called once after every document was attempted.
    ///
    /// # Arguments
    /// * `total_documents` : documents attempted
    /// * `exported`        : documents written without error
    fn on_export_complete(&self, total_documents: usize, exported: usize) {
        let _ = (total_documents, exported);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;
