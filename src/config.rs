//! Configuration for a corpus export.
//!
//! All export behaviour is controlled through [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. The value is constructed once at startup and passed
//! by reference to every component that needs a path, the base URL or the
//! author name; nothing in the library reads the process environment.

use crate::error::ExportError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default collection enumerated from the document source.
pub const DEFAULT_COLLECTION: &str = "vContent2";
/// Default posts directory, relative to the base directory.
pub const DEFAULT_POSTS_SUBDIR: &str = "posts/imported";
/// Default images directory, relative to the base directory.
pub const DEFAULT_IMAGES_SUBDIR: &str = "images/imported";
/// Author written into every front matter block unless overridden.
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// Configuration for one export run.
///
/// # Example
/// ```rust
/// use blog2md::ExportConfig;
///
/// let config = ExportConfig::builder()
///     .database("corpus/blog")
///     .base_url("https://www.example.com/blog.nsf/dx/")
///     .base_dir("/tmp/site")
///     .build()
///     .unwrap();
/// assert!(config.posts_dir().ends_with("posts/imported"));
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Database identifier handed to the document source.
    pub database: String,

    /// Collection enumerated inside the database. Default: `vContent2`.
    pub collection: String,

    /// Prefix for relative image references, e.g. `https://host/blog.nsf/dx/`.
    ///
    /// Image references are concatenated onto this verbatim, so it normally
    /// ends with a slash.
    pub base_url: String,

    /// Root of the target site. Posts and images live underneath.
    pub base_dir: PathBuf,

    /// Posts directory relative to `base_dir`. Default: `posts/imported`.
    pub posts_subdir: PathBuf,

    /// Images directory relative to `base_dir`. Default: `images/imported`.
    pub images_subdir: PathBuf,

    /// Author listed in the front matter. Default: `Unknown`.
    pub author: String,

    /// Also write the preprocessed HTML next to each post. Default: false.
    pub html_output: bool,

    /// Per-image HTTP timeout in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Optional progress sink for per-document events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            collection: DEFAULT_COLLECTION.to_string(),
            base_url: String::new(),
            base_dir: PathBuf::new(),
            posts_subdir: PathBuf::from(DEFAULT_POSTS_SUBDIR),
            images_subdir: PathBuf::from(DEFAULT_IMAGES_SUBDIR),
            author: DEFAULT_AUTHOR.to_string(),
            html_output: false,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("base_url", &self.base_url)
            .field("base_dir", &self.base_dir)
            .field("posts_subdir", &self.posts_subdir)
            .field("images_subdir", &self.images_subdir)
            .field("author", &self.author)
            .field("html_output", &self.html_output)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory the Markdown posts are written to.
    pub fn posts_dir(&self) -> PathBuf {
        self.base_dir.join(&self.posts_subdir)
    }

    /// Directory the downloaded images are written to.
    pub fn images_dir(&self) -> PathBuf {
        self.base_dir.join(&self.images_subdir)
    }

    /// Create the posts and images directories if they are missing.
    pub fn ensure_output_dirs(&self) -> Result<(), ExportError> {
        for dir in [self.posts_dir(), self.images_dir()] {
            create_dir(&dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::WriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Builder for [`ExportConfig`].
///
/// Setters for optional values ignore empty strings so that an unset
/// environment variable and an empty one behave the same.
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = database.into();
        self
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        if !collection.is_empty() {
            self.config.collection = collection;
        }
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = dir.into();
        self
    }

    pub fn posts_subdir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if !dir.as_os_str().is_empty() {
            self.config.posts_subdir = dir;
        }
        self
    }

    pub fn images_subdir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if !dir.as_os_str().is_empty() {
            self.config.images_subdir = dir;
        }
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        let author = author.into();
        if !author.is_empty() {
            self.config.author = author;
        }
        self
    }

    pub fn html_output(mut self, v: bool) -> Self {
        self.config.html_output = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating required settings.
    pub fn build(self) -> Result<ExportConfig, ExportError> {
        let c = &self.config;
        if c.database.trim().is_empty() {
            return Err(ExportError::MissingSetting { name: "DB_NAME" });
        }
        if c.base_url.trim().is_empty() {
            return Err(ExportError::MissingSetting { name: "BASE_URL" });
        }
        if c.base_dir.as_os_str().is_empty() {
            return Err(ExportError::MissingSetting {
                name: "TARGET_BASE_DIR",
            });
        }
        if c.download_timeout_secs == 0 {
            return Err(ExportError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
