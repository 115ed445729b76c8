//! # blog2md
//!
//! Migrate a rich-text blog corpus to Markdown files with YAML front matter.
//!
//! Every post becomes `<posts-dir>/YYYY-MM-<slug>.md`. Images embedded in
//! the corpus are downloaded once into the images directory and referenced
//! by relative path; links between posts are rewritten to the new filenames.
//!
//! ## Pipeline Overview
//!
//! ```text
//! DocumentSource
//!  │
//!  ├─ Pass 1  Index     key → output filename for the whole corpus
//!  │
//!  └─ Pass 2  per document, in order
//!       ├─ Preprocess  5 regex repairs of the source HTML
//!       ├─ Render      htmd HTML → Markdown, links through the resolver
//!       │                ├─ internal link → output filename of the target
//!       │                └─ embedded image → fetched once, relative path
//!       ├─ Polish      line trimming, `<!-- more -->` separator
//!       └─ Write       front matter + body
//! ```
//!
//! The index is complete before the first document is rendered, so forward
//! references between posts resolve like any other link.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blog2md::{export, ExportConfig, JsonDirectorySource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExportConfig::builder()
//!         .database("dump/blog")
//!         .base_url("https://www.example.com/blog.nsf/dx/")
//!         .base_dir("site")
//!         .build()?;
//!     let source = Arc::new(JsonDirectorySource::new(&config.database));
//!     let report = export(source, config).await?;
//!     eprintln!("{} exported, {} failed", report.stats.exported, report.stats.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `blog2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! blog2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod index;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportConfig, ExportConfigBuilder};
pub use error::ExportError;
pub use export::{export, export_corpus, Exporter};
pub use index::{output_filename, slug_for, Corpus, NameIndex};
pub use output::{DocumentResult, ExportReport, ExportStats};
pub use pipeline::fetch::{HttpImageFetcher, ImageFetcher};
pub use pipeline::render::{LinkKind, LinkResolver, MarkdownLink, MarkdownRenderer};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use source::{CorpusDocument, DocumentSource, JsonDirectorySource};
