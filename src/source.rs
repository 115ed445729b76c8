//! Document source: the corpus the exporter reads from.
//!
//! The exporter only needs a handful of scalar fields and the rich-text body
//! of each document, so the source is a small trait. [`JsonDirectorySource`]
//! is the bundled adapter: one JSON file per document under
//! `<database>/<collection>/`, which is what a dump of the original blog
//! database looks like.

use crate::error::ExportError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One document of the corpus.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorpusDocument {
    /// Stable name of the document, unique within the corpus (e.g. `hello-world.htm`).
    pub key: String,

    /// Post title.
    #[serde(default)]
    pub title: String,

    /// Creation timestamp recorded by the source itself.
    #[serde(deserialize_with = "de_timestamp")]
    pub created: DateTime<FixedOffset>,

    /// Explicit creation time stored on the post; preferred over `created`.
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub posted: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Rich-text body rendered as HTML. `None` when the document has no body item.
    #[serde(default)]
    pub content: Option<String>,
}

impl CorpusDocument {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        created: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            created,
            posted: None,
            category: None,
            tags: Vec::new(),
            content: None,
        }
    }

    pub fn with_content(mut self, html: impl Into<String>) -> Self {
        self.content = Some(html.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_posted(mut self, posted: DateTime<FixedOffset>) -> Self {
        self.posted = Some(posted);
        self
    }

    /// The timestamp used for the filename prefix and the front matter date.
    pub fn effective_created(&self) -> DateTime<FixedOffset> {
        self.posted.unwrap_or(self.created)
    }
}

/// Enumerates the documents of one collection.
pub trait DocumentSource: Send + Sync {
    /// Return every document in `collection`, in the source's enumeration order.
    fn list(&self, collection: &str) -> Result<Vec<CorpusDocument>, ExportError>;
}

/// Reads `<database>/<collection>/*.json`, one document per file, in file-name order.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    database: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
        }
    }

    fn read_document(path: &Path) -> Result<CorpusDocument, ExportError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ExportError::InvalidDocument {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ExportError::InvalidDocument {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl DocumentSource for JsonDirectorySource {
    fn list(&self, collection: &str) -> Result<Vec<CorpusDocument>, ExportError> {
        let dir = self.database.join(collection);
        let unavailable = |reason: String| ExportError::SourceUnavailable {
            database: self.database.display().to_string(),
            collection: collection.to_string(),
            reason,
        };

        let entries = std::fs::read_dir(&dir).map_err(|e| unavailable(e.to_string()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| unavailable(e.to_string()))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let documents = paths
            .iter()
            .map(|p| {
                debug!("Reading document {}", p.display());
                Self::read_document(p)
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("Collection '{}' has {} documents", collection, documents.len());
        Ok(documents)
    }
}

/// Parse an RFC 3339 timestamp, a zone-less `YYYY-MM-DDTHH:MM:SS` (taken as
/// UTC) or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| format!("unrecognised timestamp '{s}'"))
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn de_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
