//! Pre-processing: text-level repair of the source HTML before conversion.
//!
//! The blog's rich-text export has a few recurring defects that turn into
//! ugly Markdown if converted as-is: underline tags Markdown cannot express,
//! callout boxes that should be quotes, bold openers that swallow the
//! preceding line breaks, and long runs of `<br />` used as spacing.
//!
//! ## Rule Order
//!
//! The bold repair must see the original `<strong>` / `<br />` adjacency, so
//! it runs before the heading and break rules touch any `<br />`. Break
//! collapsing runs last because the earlier rules can leave new runs behind.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all pre-processing rules to a document body.
///
/// Rules (applied in order):
/// 1. Drop `<u>` / `</u>`, keeping the content
/// 2. `<div class="well">…</div>` → `<blockquote>…</blockquote>`
/// 3. Move a `<strong>` that precedes a run of breaks to after the run
/// 4. Drop a `<br />` directly after a heading close tag
/// 5. Collapse three or more breaks into exactly two
pub fn preprocess_html(input: &str) -> String {
    let s = strip_underline(input);
    let s = wells_to_blockquotes(&s);
    let s = move_bold_past_breaks(&s);
    let s = drop_break_after_heading(&s);
    collapse_breaks(&s)
}

// ── Rule 1: Strip underline tags ─────────────────────────────────────────────

static RE_UNDERLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?u>").unwrap());

fn strip_underline(input: &str) -> String {
    RE_UNDERLINE.replace_all(input, "").into_owned()
}

// ── Rule 2: Callout wells become blockquotes ─────────────────────────────────

static RE_WELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div\s+class="well">(.*?)</div>"#).unwrap());

fn wells_to_blockquotes(input: &str) -> String {
    RE_WELL
        .replace_all(input, "<blockquote>${1}</blockquote>")
        .into_owned()
}

// ── Rule 3: Bold opener stuck before line breaks ─────────────────────────────
//
// The editor emits `<strong><br /><br />Title</strong>`, which renders the
// bold run glued to the previous paragraph. Each break may be preceded by a
// single stray character (usually a space), as in the source markup.

static RE_BOLD_BEFORE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<strong>((?:.?<br\s*/?>)+)").unwrap());

fn move_bold_past_breaks(input: &str) -> String {
    RE_BOLD_BEFORE_BREAKS
        .replace_all(input, "${1}<strong>")
        .into_owned()
}

// ── Rule 4: Break right after a heading ──────────────────────────────────────

static RE_HEADING_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</h([1-6])><br\s*/?>").unwrap());

fn drop_break_after_heading(input: &str) -> String {
    RE_HEADING_BREAK.replace_all(input, "</h${1}>").into_owned()
}

// ── Rule 5: Collapse break runs ──────────────────────────────────────────────

static RE_BREAK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:<br\s*/?>\s*){3,}").unwrap());

fn collapse_breaks(input: &str) -> String {
    RE_BREAK_RUN.replace_all(input, "<br /><br />").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
