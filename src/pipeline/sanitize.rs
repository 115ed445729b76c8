//! Turn an embedded-image reference into a filesystem-safe base name.
//!
//! Embedded images are addressed as `<page>/content/<element>?OpenElement`,
//! e.g. `celebrating-openntfs-20th-anniversary.htm/content/M3?OpenElement`.
//! The page part identifies the post and the element part (`M3`) the image
//! inside it, so `celebrating-openntfs-20th-anniversary-M3` is unique per
//! image and stable across runs.

use crate::error::ExportError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Query suffix that marks a corpus-hosted embedded image.
pub const EMBEDDED_IMAGE_MARKER: &str = "?OpenElement";

/// Separator between the page part and the element part of a reference.
const CONTENT_DELIMITER: &str = "/content/";

static RE_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^.]+$").unwrap());
static RE_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9-]").unwrap());
static RE_HYPHEN_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Whether `url` carries the embedded-image marker (ASCII case-insensitive).
pub fn has_embedded_image_marker(url: &str) -> bool {
    strip_marker(url).is_some()
}

fn strip_marker(url: &str) -> Option<&str> {
    let cut = url.len().checked_sub(EMBEDDED_IMAGE_MARKER.len())?;
    let tail = url.get(cut..)?;
    tail.eq_ignore_ascii_case(EMBEDDED_IMAGE_MARKER)
        .then(|| &url[..cut])
}

/// Convert `{page}/content/{element}[?OpenElement]` into `{page-slug}-{element}`.
///
/// Both parts are cleaned the same way, so the result never contains a path
/// separator. Fails with [`ExportError::MalformedReference`] unless the
/// delimiter occurs exactly once.
pub fn to_valid_filename(reference: &str) -> Result<String, ExportError> {
    let trimmed = strip_marker(reference).unwrap_or(reference);

    let malformed = || ExportError::MalformedReference {
        reference: reference.to_string(),
    };
    let (page, element) = trimmed.split_once(CONTENT_DELIMITER).ok_or_else(malformed)?;
    if element.contains(CONTENT_DELIMITER) {
        return Err(malformed());
    }

    let page = RE_EXTENSION.replace(page, "");
    Ok(format!("{}-{}", clean_segment(&page), clean_segment(element)))
}

/// Replace disallowed characters with `-`, collapse runs, trim the ends.
fn clean_segment(segment: &str) -> String {
    let s = RE_DISALLOWED.replace_all(segment, "-");
    let s = RE_HYPHEN_RUN.replace_all(&s, "-");
    s.trim_matches('-').to_string()
}
