//! Result types returned by an export run.

use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// One entry per exported or failed document, in corpus order.
    pub documents: Vec<DocumentResult>,
    pub stats: ExportStats,
}

impl ExportReport {
    /// Documents that failed, in corpus order.
    pub fn failures(&self) -> impl Iterator<Item = &DocumentResult> {
        self.documents.iter().filter(|d| d.error.is_some())
    }
}

/// Outcome for a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentResult {
    /// Document key.
    pub key: String,

    /// Output filename from the name index, e.g. `2021-03-hello-world.md`.
    pub file_name: String,

    /// Full path of the written Markdown file. `None` if the document failed.
    pub path: Option<PathBuf>,

    /// Size of the written file in bytes (front matter included).
    pub bytes: usize,

    /// Error message if the document failed.
    pub error: Option<String>,
}

impl DocumentResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Counters for one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    /// Documents enumerated from the source, duplicates included.
    pub total_documents: usize,

    /// Markdown files written.
    pub exported: usize,

    /// Documents that failed.
    pub failed: usize,

    /// Documents skipped because their key was already indexed.
    pub duplicate_keys: usize,

    /// Wall-clock time of the run in milliseconds.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_to_json() {
        let report = ExportReport {
            documents: vec![
                DocumentResult {
                    key: "a.htm".into(),
                    file_name: "2021-03-a.md".into(),
                    path: Some(PathBuf::from("/site/posts/imported/2021-03-a.md")),
                    bytes: 120,
                    error: None,
                },
                DocumentResult {
                    key: "b.htm".into(),
                    file_name: "2021-04-b.md".into(),
                    path: None,
                    bytes: 0,
                    error: Some("Failed to download 'x': HTTP 404 Not Found".into()),
                },
            ],
            stats: ExportStats {
                total_documents: 2,
                exported: 1,
                failed: 1,
                duplicate_keys: 0,
                duration_ms: 5,
            },
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["exported"], 1);
        assert_eq!(json["documents"][0]["file_name"], "2021-03-a.md");
        assert!(json["documents"][1]["path"].is_null());
        assert_eq!(report.failures().count(), 1);
        assert!(report.documents[0].is_ok());
    }
}
