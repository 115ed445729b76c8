//! Corpus export entry points: the two-pass orchestrator.
//!
//! Pass 1 ([`Corpus::index`]) maps every document key to its output filename
//! before anything is rendered, so a post can link to one that is enumerated
//! after it. Pass 2 walks the documents in order and, for each one, runs
//! preprocess → render → front matter → write.
//!
//! A failure in pass 2 belongs to the document that raised it: it is logged,
//! recorded in the [`ExportReport`] and reported to the progress callback,
//! and the next document is processed as usual. Only configuration and
//! source errors end the run early.

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::index::{output_filename, slug_for, Corpus};
use crate::output::{DocumentResult, ExportReport, ExportStats};
use crate::pipeline::fetch::{HttpImageFetcher, ImageFetcher};
use crate::pipeline::front_matter::FrontMatter;
use crate::pipeline::preprocess::preprocess_html;
use crate::pipeline::render::MarkdownRenderer;
use crate::pipeline::resolve::CorpusLinkResolver;
use crate::source::{CorpusDocument, DocumentSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Export every document of the configured collection.
///
/// Creates the output directories, then runs both passes with an HTTP image
/// fetcher. Blocking; use [`export`] from async code.
///
/// # Returns
/// `Ok(ExportReport)` once every document was attempted, even if some failed
/// (check `report.stats.failed`).
///
/// # Errors
/// Returns `Err(ExportError)` only for fatal errors:
/// - the output directories cannot be created
/// - the collection cannot be enumerated
pub fn export_corpus(
    source: &dyn DocumentSource,
    config: &ExportConfig,
) -> Result<ExportReport, ExportError> {
    config.ensure_output_dirs()?;
    Exporter::new(config.clone())?.run(source)
}

/// Async wrapper around [`export_corpus`].
///
/// The pipeline does blocking network and file I/O, so it runs on tokio's
/// blocking thread pool.
pub async fn export(
    source: Arc<dyn DocumentSource>,
    config: ExportConfig,
) -> Result<ExportReport, ExportError> {
    tokio::task::spawn_blocking(move || export_corpus(source.as_ref(), &config))
        .await
        .map_err(|e| ExportError::Internal(format!("Export task panicked: {}", e)))?
}

/// Drives one export run.
pub struct Exporter {
    config: ExportConfig,
    fetcher: Box<dyn ImageFetcher>,
}

impl Exporter {
    /// Exporter that downloads images over HTTP.
    pub fn new(config: ExportConfig) -> Result<Self, ExportError> {
        let fetcher = HttpImageFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, Box::new(fetcher)))
    }

    /// Exporter with a caller-supplied image fetcher.
    pub fn with_fetcher(config: ExportConfig, fetcher: Box<dyn ImageFetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Run both passes over `source`. The output directories must exist.
    pub fn run(&self, source: &dyn DocumentSource) -> Result<ExportReport, ExportError> {
        let start = Instant::now();
        info!(
            "Starting export of '{}' from '{}'",
            self.config.collection, self.config.database
        );

        // ── Step 1: Enumerate ────────────────────────────────────────────────
        let documents = source.list(&self.config.collection)?;
        let total_documents = documents.len();

        // ── Step 2: Pass 1, name index ───────────────────────────────────────
        let corpus = Corpus::index(documents);
        let index = corpus.name_index();
        let total = corpus.documents().len();

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_export_start(total);
        }

        // ── Step 3: Pass 2, per document ─────────────────────────────────────
        let posts_dir = self.config.posts_dir();
        let resolver = CorpusLinkResolver::new(index, self.fetcher.as_ref(), posts_dir.clone());
        let renderer = MarkdownRenderer::new(&resolver);

        let mut results = Vec::with_capacity(total);
        for (i, doc) in corpus.documents().iter().enumerate() {
            let position = i + 1;
            let file_name = index
                .get(&doc.key)
                .map(str::to_string)
                .unwrap_or_else(|| output_filename(&doc.key, &doc.effective_created()));

            if let Some(ref cb) = self.config.progress_callback {
                cb.on_document_start(position, total, &doc.key);
            }

            let result = match self.export_document(doc, &posts_dir, &file_name, &renderer) {
                Ok((path, bytes)) => {
                    info!("{}/{} {} → {}", position, total, doc.key, path.display());
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_document_complete(position, total, &doc.key, bytes);
                    }
                    DocumentResult {
                        key: doc.key.clone(),
                        file_name,
                        path: Some(path),
                        bytes,
                        error: None,
                    }
                }
                Err(e) => {
                    error!("{}/{} {} failed: {}", position, total, doc.key, e);
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_document_error(position, total, &doc.key, &e.to_string());
                    }
                    DocumentResult {
                        key: doc.key.clone(),
                        file_name,
                        path: None,
                        bytes: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        // ── Step 4: Stats ────────────────────────────────────────────────────
        let exported = results.iter().filter(|r| r.is_ok()).count();
        let stats = ExportStats {
            total_documents,
            exported,
            failed: results.len() - exported,
            duplicate_keys: corpus.duplicates().len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Export complete: {}/{} documents, {} failed, {}ms",
            stats.exported, total, stats.failed, stats.duration_ms
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_export_complete(total, exported);
        }

        Ok(ExportReport {
            documents: results,
            stats,
        })
    }

    /// Export one document; returns the written path and its size.
    fn export_document(
        &self,
        doc: &CorpusDocument,
        posts_dir: &Path,
        file_name: &str,
        renderer: &MarkdownRenderer<'_>,
    ) -> Result<(PathBuf, usize), ExportError> {
        let target = posts_dir.join(file_name);
        let slug = slug_for(&doc.key);

        // ── Clear previous output ────────────────────────────────────────────
        remove_previous(&target);

        // ── Preprocess + render ──────────────────────────────────────────────
        let html = doc.content.as_deref().map(preprocess_html);
        let body = renderer.render(html.as_deref())?;

        // ── Assemble + write ─────────────────────────────────────────────────
        let front_matter = FrontMatter::for_document(doc, &self.config.author).render();
        let contents = format!("{front_matter}{body}");
        write_atomic(&target, &contents)?;

        // ── Optional debug HTML ──────────────────────────────────────────────
        if self.config.html_output {
            if let Some(ref html) = html {
                let html_path = posts_dir.join(format!("{slug}.html"));
                if let Err(e) = std::fs::write(&html_path, html) {
                    warn!("Could not write debug HTML {}: {}", html_path.display(), e);
                }
            }
        }

        Ok((target, contents.len()))
    }
}

/// Delete an existing output file. Failure is logged and otherwise ignored.
fn remove_previous(path: &Path) {
    if !path.exists() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed previous {}", path.display()),
        Err(e) => warn!("Could not delete existing {}: {}", path.display(), e),
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, contents: &str) -> Result<(), ExportError> {
    let tmp_path = path.with_extension("md.tmp");
    std::fs::write(&tmp_path, contents).map_err(|e| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        ExportError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}
