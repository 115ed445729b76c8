//! CLI binary for blog2md.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ExportConfig`, runs the export and prints a summary.

use anyhow::{Context, Result};
use blog2md::{export, ExportConfig, ExportProgressCallback, JsonDirectorySource, ProgressCallback};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-document start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_export_start` tells us how many documents there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Indexing");
        bar.set_message("Reading collection…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} posts  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Exporting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0) as f64
            / 1000.0
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Exporting {total_documents} posts…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, key: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(key.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, key: &str, bytes: usize) {
        let elapsed = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {:<50}  {}  {}",
            green("✓"),
            index,
            total,
            key,
            dim(&format!("{bytes:>6} bytes")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, key: &str, error: &str) {
        let elapsed = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}  {}",
            red("✗"),
            index,
            total,
            key,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_export_complete(&self, total_documents: usize, exported: usize) {
        let failed = total_documents.saturating_sub(exported);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} posts exported successfully",
                green("✔"),
                bold(&exported.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} posts exported  ({} failed)",
                if failed == total_documents {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&exported.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Export a JSON dump of the blog into a site checkout
  blog2md --db dump/blog --base-url https://www.example.com/blog.nsf/dx/ --target ~/site

  # Same, configured through the environment
  DB_NAME=dump/blog BASE_URL=https://www.example.com/blog.nsf/dx/ TARGET_BASE_DIR=~/site blog2md

  # Custom layout and author, keep the preprocessed HTML for inspection
  blog2md --posts-dir content/blog --img-dir static/img --author "Jane Doe" --html-output

  # Machine-readable report
  blog2md --json > report.json

SOURCE LAYOUT:
  <DB_NAME>/<COLLECTION>/*.json, one document per file:

    {
      "key": "hello-world.htm",
      "title": "Hello World",
      "created": "2021-03-15T10:00:00Z",
      "posted": "2021-03-14T09:00:00+01:00",
      "category": "Domino",
      "tags": ["intro"],
      "content": "<p>Hi</p>"
    }

OUTPUT LAYOUT:
  <TARGET_BASE_DIR>/<POSTS_DIR>/YYYY-MM-<slug>.md     one per document
  <TARGET_BASE_DIR>/<IMG_DIR>/<page>-<element>.<ext>   one per embedded image
  <TARGET_BASE_DIR>/<POSTS_DIR>/<slug>.html            with --html-output

ENVIRONMENT VARIABLES:
  DB_NAME           Database (directory holding the collection)   required
  COLLECTION        Collection to export                          vContent2
  BASE_URL          Prefix for relative image references          required
  TARGET_BASE_DIR   Root of the target site                       required
  POSTS_DIR         Posts directory under the target              posts/imported
  IMG_DIR           Images directory under the target             images/imported
  AUTHOR_NAME       Author written into the front matter          Unknown
  HTML_OUTPUT       Also write the preprocessed HTML              false
  DOWNLOAD_TIMEOUT  Per-image HTTP timeout in seconds             60
  RUST_LOG          Log filter, overrides --verbose / --quiet
"#;

/// Export a rich-text blog corpus to Markdown posts with front matter.
#[derive(Parser, Debug)]
#[command(
    name = "blog2md",
    version,
    about = "Export a rich-text blog corpus to Markdown posts with front matter",
    long_about = "Export every document of a blog collection to a Markdown file with YAML \
front matter. Embedded images are downloaded once into the images directory and links \
between posts are rewritten to the new file names.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Database holding the collection (directory of the JSON dump).
    #[arg(long = "db", env = "DB_NAME")]
    database: Option<String>,

    /// Collection to export.
    #[arg(long, env = "COLLECTION", default_value = blog2md::config::DEFAULT_COLLECTION)]
    collection: String,

    /// Prefix for relative image references, e.g. https://host/blog.nsf/dx/.
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Root directory of the target site.
    #[arg(long = "target", env = "TARGET_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Posts directory, relative to the target.
    #[arg(long, env = "POSTS_DIR", default_value = blog2md::config::DEFAULT_POSTS_SUBDIR)]
    posts_dir: PathBuf,

    /// Images directory, relative to the target.
    #[arg(long, env = "IMG_DIR", default_value = blog2md::config::DEFAULT_IMAGES_SUBDIR)]
    img_dir: PathBuf,

    /// Author written into every front matter block.
    #[arg(long, env = "AUTHOR_NAME", default_value = blog2md::config::DEFAULT_AUTHOR)]
    author: String,

    /// Also write each post's preprocessed HTML next to it.
    #[arg(long, env = "HTML_OUTPUT")]
    html_output: bool,

    /// Per-image HTTP timeout in seconds.
    #[arg(long, env = "DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Print the export report as JSON on stdout.
    #[arg(long, env = "BLOG2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "BLOG2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BLOG2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BLOG2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    // Validate before the spinner starts, so errors are not drawn under it.
    let mut config = build_config(&cli)?;
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new_dynamic();
        config.progress_callback = Some(cb);
    }

    if !cli.quiet {
        print_config(&config);
    }

    // ── Run export ───────────────────────────────────────────────────────
    let source = Arc::new(JsonDirectorySource::new(&config.database));
    let report = export(source, config).await.context("Export failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        eprintln!(
            "Exported {}/{} posts in {}ms",
            report.stats.exported,
            report.stats.exported + report.stats.failed,
            report.stats.duration_ms
        );
        for failed in report.failures() {
            eprintln!(
                "  {} {}: {}",
                red("✗"),
                failed.key,
                failed.error.as_deref().unwrap_or_default()
            );
        }
    }

    if !cli.quiet && report.stats.duplicate_keys > 0 {
        eprintln!(
            "   {} duplicate keys skipped",
            dim(&report.stats.duplicate_keys.to_string())
        );
    }

    Ok(())
}

/// Map CLI args to `ExportConfig`.
fn build_config(cli: &Cli) -> Result<ExportConfig> {
    let mut builder = ExportConfig::builder()
        .collection(cli.collection.clone())
        .posts_subdir(cli.posts_dir.clone())
        .images_subdir(cli.img_dir.clone())
        .author(cli.author.clone())
        .html_output(cli.html_output)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref database) = cli.database {
        builder = builder.database(database.clone());
    }
    if let Some(ref base_url) = cli.base_url {
        builder = builder.base_url(base_url.clone());
    }
    if let Some(ref base_dir) = cli.base_dir {
        builder = builder.base_dir(base_dir.clone());
    }

    builder.build().context("Invalid configuration")
}

fn print_config(config: &ExportConfig) {
    eprintln!("{}  {}", dim("Database:        "), config.database);
    eprintln!("{}  {}", dim("Collection:      "), config.collection);
    eprintln!("{}  {}", dim("Base URL:        "), config.base_url);
    eprintln!("{}  {}", dim("Target base dir: "), config.base_dir.display());
    eprintln!("{}  {}", dim("Posts dir:       "), config.posts_dir().display());
    eprintln!("{}  {}", dim("Images dir:      "), config.images_dir().display());
    eprintln!("{}  {}", dim("Author:          "), config.author);
    eprintln!("{}  {}", dim("HTML output:     "), config.html_output);
}
