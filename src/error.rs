//! Error types for the blog2md library.
//!
//! One enum, [`ExportError`], covers every failure, but the variants fall
//! into two scopes:
//!
//! * **Fatal**: the run cannot start or the corpus cannot be indexed
//!   (missing setting, unreadable source). Returned as `Err(ExportError)`
//!   from [`crate::export::export_corpus`] before any document is written.
//!
//! * **Document-scoped**: a single document failed (bad image reference,
//!   download error, write error). The orchestrator records it in the
//!   document's [`crate::output::DocumentResult`] and moves on to the next
//!   document, so one broken post never costs the rest of the corpus.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the blog2md library.
#[derive(Debug, Error)]
pub enum ExportError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A required setting is absent or empty.
    #[error("Missing required setting '{name}'\nSet it via the {name} environment variable or the matching CLI flag.")]
    MissingSetting { name: &'static str },

    /// A setting is present but unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Source errors ─────────────────────────────────────────────────────
    /// The document source (database / collection) could not be opened.
    #[error("Cannot open collection '{collection}' in '{database}': {reason}")]
    SourceUnavailable {
        database: String,
        collection: String,
        reason: String,
    },

    /// A document in the source could not be read or parsed.
    #[error("Invalid document '{path}': {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// An image reference does not have the `<page>/content/<element>` shape.
    #[error("Malformed image reference '{reference}': expected exactly one '/content/'")]
    MalformedReference { reference: String },

    /// The image request failed or returned a non-success status.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The image response carried no usable content type.
    #[error("Cannot pick a file extension for '{url}': content type {content_type:?} is unknown")]
    UnknownContentType {
        url: String,
        content_type: Option<String>,
    },

    /// Could not create, truncate or delete an output file.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The renderer was handed no content.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExportError {
    /// Whether this error aborts the whole run rather than one document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExportError::MissingSetting { .. }
                | ExportError::InvalidConfig(_)
                | ExportError::SourceUnavailable { .. }
                | ExportError::InvalidDocument { .. }
                | ExportError::Internal(_)
        )
    }
}
