//! YAML front matter prefixed to every exported post.
//!
//! Written by hand rather than through a YAML serializer: the layout (a blank
//! line between keys, quoted title only, list items indented by two spaces)
//! is what the target site generator's existing posts use.

use crate::index::slug_for;
use crate::source::CorpusDocument;
use chrono::{DateTime, FixedOffset, SecondsFormat};

/// Metadata block of one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub author: String,
    pub title: String,
    pub slug: String,
    pub date: DateTime<FixedOffset>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl FrontMatter {
    pub fn for_document(doc: &CorpusDocument, author: &str) -> Self {
        Self {
            author: author.to_string(),
            title: doc.title.clone(),
            slug: slug_for(&doc.key).to_string(),
            date: doc.effective_created(),
            category: doc.category.clone(),
            tags: doc.tags.clone(),
        }
    }

    /// Render the block, closing `---` and trailing blank line included.
    ///
    /// `categories:` is omitted for an empty category; `tags:` is omitted when
    /// the list is empty or its first entry is empty.
    pub fn render(&self) -> String {
        let mut yaml = String::from("---\n");

        yaml.push_str(&format!("authors:\n  - {}\n\n", self.author));
        yaml.push_str(&format!("title: \"{}\"\n\n", escape_quotes(&self.title)));
        yaml.push_str(&format!("slug: {}\n\n", self.slug));
        yaml.push_str(&format!(
            "date: {}\n\n",
            self.date.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));

        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            yaml.push_str(&format!("categories:\n  - {}\n\n", category));
        }

        if self.tags.first().is_some_and(|t| !t.is_empty()) {
            yaml.push_str("tags:\n");
            for tag in &self.tags {
                yaml.push_str(&format!("  - {}\n", tag));
            }
        }

        yaml.push_str("---\n\n");
        yaml
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}
