//! Pass 1: the corpus-wide name index.
//!
//! Internal links point at other documents by key, and the target's output
//! filename depends on its own creation date. Rendering any document
//! therefore needs the filenames of every other document, including ones
//! enumerated later. [`Corpus::index`] walks the whole corpus once, before
//! any rendering, and hands pass 2 an immutable [`NameIndex`].

use crate::source::CorpusDocument;
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Extensions stripped from a key to form its slug. Longest first.
const RECOGNIZED_EXTENSIONS: &[&str] = &[".html", ".htm"];

/// Key with one recognized extension removed: `hello-world.htm` → `hello-world`.
pub fn slug_for(key: &str) -> &str {
    RECOGNIZED_EXTENSIONS
        .iter()
        .find_map(|ext| key.strip_suffix(ext))
        .unwrap_or(key)
}

/// `YYYY-MM` prefix of an output filename.
pub fn date_prefix(created: &DateTime<FixedOffset>) -> String {
    created.format("%Y-%m").to_string()
}

/// Output filename of a document: `2021-03-hello-world.md`.
///
/// Pure function of the key and the creation timestamp.
pub fn output_filename(key: &str, created: &DateTime<FixedOffset>) -> String {
    format!("{}-{}.md", date_prefix(created), slug_for(key))
}

/// Write-once mapping from document key to output filename.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: HashMap<String, String>,
}

impl NameIndex {
    /// Insert `key → file_name` unless the key is already present.
    ///
    /// Returns `false` (and leaves the existing entry alone) for a duplicate.
    fn insert(&mut self, key: &str, file_name: String) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), file_name);
        true
    }

    /// Output filename for `key`, if the key belongs to the corpus.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of pass 1: the name index plus the documents pass 2 will export.
#[derive(Debug, Clone)]
pub struct Corpus {
    index: NameIndex,
    documents: Vec<CorpusDocument>,
    duplicates: Vec<CorpusDocument>,
}

impl Corpus {
    /// Build the name index over every document, keeping enumeration order.
    ///
    /// A document whose key was already seen is not indexed and not exported;
    /// it is reported through [`Corpus::duplicates`].
    pub fn index(documents: Vec<CorpusDocument>) -> Self {
        let mut index = NameIndex::default();
        let mut kept = Vec::with_capacity(documents.len());
        let mut duplicates = Vec::new();

        for (i, doc) in documents.into_iter().enumerate() {
            let file_name = output_filename(&doc.key, &doc.effective_created());
            if index.insert(&doc.key, file_name.clone()) {
                debug!("{}. {} → {}", i + 1, doc.key, file_name);
                kept.push(doc);
            } else {
                warn!(
                    "Duplicate key '{}' (document #{}); keeping the first occurrence",
                    doc.key,
                    i + 1
                );
                duplicates.push(doc);
            }
        }

        info!("Indexed {} documents", index.len());
        Self {
            index,
            documents: kept,
            duplicates,
        }
    }

    pub fn name_index(&self) -> &NameIndex {
        &self.index
    }

    /// Documents to export, in enumeration order.
    pub fn documents(&self) -> &[CorpusDocument] {
        &self.documents
    }

    /// Documents skipped because their key was already indexed.
    pub fn duplicates(&self) -> &[CorpusDocument] {
        &self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_timestamp;

    fn doc(key: &str, created: &str) -> CorpusDocument {
        CorpusDocument::new(key, key, parse_timestamp(created).unwrap())
    }

    #[test]
    fn slug_strips_recognized_extension_once() {
        assert_eq!(slug_for("hello-world.htm"), "hello-world");
        assert_eq!(slug_for("hello-world.html"), "hello-world");
        assert_eq!(slug_for("about"), "about");
        assert_eq!(slug_for("notes.htm.htm"), "notes.htm");
        assert_eq!(slug_for("report.pdf"), "report.pdf");
    }

    #[test]
    fn filename_uses_year_and_zero_padded_month() {
        let created = parse_timestamp("2021-03-15").unwrap();
        assert_eq!(output_filename("hello-world.htm", &created), "2021-03-hello-world.md");
        let created = parse_timestamp("2009-11-30T22:00:00Z").unwrap();
        assert_eq!(output_filename("about", &created), "2009-11-about.md");
    }

    #[test]
    fn filename_uses_the_documents_own_offset() {
        // Local date is still October even though UTC has moved to November.
        let created = parse_timestamp("2020-10-31T23:30:00-05:00").unwrap();
        assert_eq!(date_prefix(&created), "2020-10");
    }

    #[test]
    fn every_document_is_indexed() {
        let docs = vec![
            doc("a.htm", "2020-01-05"),
            doc("b.htm", "2020-02-05"),
            doc("c.htm", "2021-12-01"),
        ];
        let expected: Vec<(String, String)> = docs
            .iter()
            .map(|d| (d.key.clone(), output_filename(&d.key, &d.effective_created())))
            .collect();

        let corpus = Corpus::index(docs);
        assert_eq!(corpus.name_index().len(), 3);
        for (key, file_name) in expected {
            assert_eq!(corpus.name_index().get(&key), Some(file_name.as_str()));
        }
        assert!(corpus.duplicates().is_empty());
    }

    #[test]
    fn posted_date_drives_the_filename() {
        let d = doc("a.htm", "2020-01-05").with_posted(parse_timestamp("2018-07-01").unwrap());
        let corpus = Corpus::index(vec![d]);
        assert_eq!(corpus.name_index().get("a.htm"), Some("2018-07-a.md"));
    }

    #[test]
    fn duplicate_keys_keep_first_entry() {
        let corpus = Corpus::index(vec![
            doc("a.htm", "2020-01-05"),
            doc("a.htm", "2022-06-05"),
            doc("b.htm", "2020-02-05"),
        ]);
        assert_eq!(corpus.name_index().get("a.htm"), Some("2020-01-a.md"));
        assert_eq!(corpus.documents().len(), 2);
        assert_eq!(corpus.duplicates().len(), 1);
        assert_eq!(corpus.documents()[0].key, "a.htm");
        assert_eq!(corpus.documents()[1].key, "b.htm");
    }

    #[test]
    fn unknown_key_is_absent() {
        let corpus = Corpus::index(vec![doc("a.htm", "2020-01-05")]);
        assert!(corpus.name_index().get("missing.htm").is_none());
        assert!(!corpus.name_index().contains("missing.htm"));
    }
}
