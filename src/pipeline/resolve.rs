//! Link resolution against the corpus.
//!
//! - **Images** carrying the embedded-image marker are downloaded through the
//!   [`ImageFetcher`] and re-pointed at the local copy, relative to the posts
//!   directory. Other images are left alone.
//! - **Page links** whose target is a corpus key are re-pointed at that
//!   document's output filename. Anything not in the index is kept byte for
//!   byte.
//! - **Email links** are not rewritten.

use crate::error::ExportError;
use crate::index::NameIndex;
use crate::pipeline::fetch::ImageFetcher;
use crate::pipeline::render::{LinkKind, LinkResolver, MarkdownLink};
use crate::pipeline::sanitize::{has_embedded_image_marker, to_valid_filename};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// [`LinkResolver`] for one export run: reads the name index, writes images
/// through the fetcher.
pub struct CorpusLinkResolver<'a> {
    index: &'a NameIndex,
    fetcher: &'a dyn ImageFetcher,
    posts_dir: PathBuf,
}

impl<'a> CorpusLinkResolver<'a> {
    pub fn new(index: &'a NameIndex, fetcher: &'a dyn ImageFetcher, posts_dir: PathBuf) -> Self {
        Self {
            index,
            fetcher,
            posts_dir,
        }
    }

    fn resolve_image(&self, link: MarkdownLink) -> Result<MarkdownLink, ExportError> {
        if !has_embedded_image_marker(&link.url) {
            debug!("Image '{}' is not embedded, left unchanged", link.url);
            return Ok(link);
        }

        let base_name = to_valid_filename(&link.url)?;
        let local = self.fetcher.fetch(&link.url, &base_name)?;
        let url = relative_path(&self.posts_dir, &local);
        debug!("Image '{}' → {}", link.url, url);

        Ok(MarkdownLink { url, ..link })
    }

    fn resolve_page(&self, link: MarkdownLink) -> MarkdownLink {
        match self.index.get(&link.url) {
            Some(file_name) => {
                debug!("Link '{}' → {}", link.url, file_name);
                MarkdownLink {
                    kind: link.kind,
                    url: file_name.to_string(),
                    title: Some(file_name.to_string()),
                }
            }
            None => {
                debug!("Link '{}' is not a corpus key, left unchanged", link.url);
                link
            }
        }
    }
}

impl LinkResolver for CorpusLinkResolver<'_> {
    fn resolve_link(&self, link: MarkdownLink) -> Result<MarkdownLink, ExportError> {
        match link.kind {
            LinkKind::Image => self.resolve_image(link),
            LinkKind::Link => Ok(self.resolve_page(link)),
            LinkKind::Email => {
                warn!("Unsupported link kind {:?} for '{}', left unchanged", link.kind, link.url);
                Ok(link)
            }
        }
    }
}

/// Path of `target` as seen from directory `from`, `/`-separated.
///
/// Both paths must share a root (both absolute, or both relative to the same
/// directory); `.` components are ignored.
pub fn relative_path(from: &Path, target: &Path) -> String {
    let from: Vec<Component<'_>> = from
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let target: Vec<Component<'_>> = target
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}
