//! Post-processing: line-level cleanup of rendered Markdown.
//!
//! Rules (applied to every line):
//! 1. Trim surrounding whitespace
//! 2. Replace the blog's "continue reading" marker with the excerpt separator
//!
//! The marker is written in posts as `<$DXContinueReading$>`. Depending on
//! where it sits, the Markdown converter may have backslash-escaped either
//! angle bracket, so both forms are matched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fully escaped form of the continuation marker.
pub const CONTINUE_READING_MARKER: &str = r"\<$DXContinueReading$\>";

/// Excerpt separator understood by static site generators.
pub const EXCERPT_SEPARATOR: &str = "<!-- more -->";

static RE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\?<\$DXContinueReading\$\\?>").unwrap());

/// Trim every line, swap the continuation marker, and end every line
/// (including the last) with `\n`.
pub fn postprocess_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 1);
    for line in input.lines() {
        out.push_str(&RE_MARKER.replace_all(line.trim(), EXCERPT_SEPARATOR));
        out.push('\n');
    }
    if out.is_empty() {
        out.push('\n');
    }
    out
}
