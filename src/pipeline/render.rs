//! Markdown rendering on top of `htmd`.
//!
//! `htmd` does the HTML → Markdown conversion. A few elements get custom
//! handlers, picked through the closed [`ElementKind`] set:
//!
//! - **Links.** Every `<a href>` and `<img src>` becomes a [`MarkdownLink`]
//!   that goes through the [`LinkResolver`] before it is written. The resolver
//!   may rewrite the URL and title (internal links, embedded images) or fail,
//!   which aborts the document.
//! - **Verbatim tags.** `<iframe>` and `<script>` have no Markdown
//!   equivalent. Their original markup is written unchanged.
//! - **Paragraphs.** Text that would read as a heading, list item or quote at
//!   the start of a line is escaped.
//! - **Line breaks**, see below.
//!
//! `htmd` handlers cannot fail and must be `'static`, so the link and break
//! handlers leave placeholder characters in the converted text. Links are
//! resolved afterwards, in document order, and the placeholders are filled in.
//!
//! ## Line breaks
//!
//! A single `<br>` is a hard break (`\` + newline). Two in a row end the
//! paragraph. Every break past the second is kept as a literal `<br />` line.
//! Breaks at the start or end of a block are dropped.

use crate::error::ExportError;
use crate::pipeline::html::outer_html;
use crate::pipeline::postprocess::postprocess_markdown;
use htmd::options::{HeadingStyle, Options};
use htmd::{Element, HtmlToMarkdown};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Kind of a link discovered while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `<img src>`.
    Image,
    /// `<a href>` to a page.
    Link,
    /// `<a href="mailto:…">`.
    Email,
}

/// A link as it will be written: `[text](url "title")` / `![alt](url "title")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownLink {
    pub kind: LinkKind,
    pub url: String,
    pub title: Option<String>,
}

impl MarkdownLink {
    pub fn new(kind: LinkKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Rewrites links before they are written. Called once per discovered link.
pub trait LinkResolver {
    fn resolve_link(&self, link: MarkdownLink) -> Result<MarkdownLink, ExportError>;
}

/// Leaves every link as found.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughResolver;

impl LinkResolver for PassThroughResolver {
    fn resolve_link(&self, link: MarkdownLink) -> Result<MarkdownLink, ExportError> {
        Ok(link)
    }
}

// ── Placeholders ─────────────────────────────────────────────────────────────

// Private-use characters: never produced by the source and left alone by htmd.
const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';
const BREAK: char = '\u{E002}';

static RE_SLOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x{E000}(\d+)\x{E001}").unwrap());
static RE_BREAK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*\x{E002}(?:\s*\x{E002})*(\s*)").unwrap());
static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static RE_BLOCK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(^|\x{E002}[ \t]*)(#{1,6}(?:[ \t]|$)|[-+*](?:[ \t]|$)|>)").unwrap()
});
static RE_ORDERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|\x{E002}[ \t]*)(\d{1,9})([.)](?:[ \t]|$))").unwrap());

// ── Element dispatch ─────────────────────────────────────────────────────────

/// Elements the renderer handles itself instead of htmd's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    /// Original markup copied into the output.
    Verbatim,
    /// Dropped with its content.
    Ignored,
    Paragraph,
    Anchor,
    Image,
    LineBreak,
}

impl ElementKind {
    /// Kinds registered as htmd handlers; `Ignored` goes through `skip_tags`.
    const HANDLED: [ElementKind; 5] = [
        ElementKind::Verbatim,
        ElementKind::Paragraph,
        ElementKind::Anchor,
        ElementKind::Image,
        ElementKind::LineBreak,
    ];

    fn tags(self) -> &'static [&'static str] {
        match self {
            ElementKind::Verbatim => &["iframe", "script"],
            ElementKind::Ignored => &["head", "style", "title", "meta", "link", "noscript", "template"],
            ElementKind::Paragraph => &["p"],
            ElementKind::Anchor => &["a"],
            ElementKind::Image => &["img"],
            ElementKind::LineBreak => &["br"],
        }
    }
}

/// A link seen by a handler, waiting for the resolver.
struct PendingLink {
    link: MarkdownLink,
    /// Link text, or the escaped alt text of an image.
    text: String,
}

/// State shared between the htmd handlers of one conversion.
#[derive(Default)]
struct Collected {
    links: Vec<PendingLink>,
    failure: Option<ExportError>,
}

impl Collected {
    fn push_link(&mut self, link: MarkdownLink, text: String) -> String {
        let slot = self.links.len();
        self.links.push(PendingLink { link, text });
        format!("{SLOT_OPEN}{slot}{SLOT_CLOSE}")
    }
}

fn handle_element(kind: ElementKind, element: &Element<'_>, state: &Mutex<Collected>) -> String {
    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    match kind {
        ElementKind::Verbatim => match outer_html(element.node) {
            Ok(html) => html,
            Err(e) => {
                state.failure.get_or_insert(e);
                String::new()
            }
        },
        ElementKind::Paragraph => {
            let content = element.content.trim_matches(|c: char| c.is_ascii_whitespace());
            if content.is_empty() {
                String::new()
            } else {
                format!("\n\n{}\n\n", escape_block_markers(content))
            }
        }
        ElementKind::Anchor => {
            let Some(href) = attribute(element, "href") else {
                return element.content.to_string();
            };
            let kind = if href.trim_start().to_ascii_lowercase().starts_with("mailto:") {
                LinkKind::Email
            } else {
                LinkKind::Link
            };
            let link = MarkdownLink {
                kind,
                url: href,
                title: attribute(element, "title").filter(|t| !t.is_empty()),
            };
            state.push_link(link, single_line(element.content.trim()))
        }
        ElementKind::Image => {
            let Some(src) = attribute(element, "src").filter(|s| !s.trim().is_empty()) else {
                return String::new();
            };
            let alt = attribute(element, "alt").unwrap_or_default();
            let link = MarkdownLink {
                kind: LinkKind::Image,
                url: src,
                title: attribute(element, "title").filter(|t| !t.is_empty()),
            };
            state.push_link(link, escape_alt(&single_line(alt.trim())))
        }
        ElementKind::LineBreak => BREAK.to_string(),
        ElementKind::Ignored => String::new(),
    }
}

fn attribute(element: &Element<'_>, name: &str) -> Option<String> {
    element
        .attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
}

// ── Renderer ─────────────────────────────────────────────────────────────────

/// HTML → Markdown converter bound to one link resolver.
pub struct MarkdownRenderer<'a> {
    resolver: &'a dyn LinkResolver,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(resolver: &'a dyn LinkResolver) -> Self {
        Self { resolver }
    }

    /// Render a document body. The result always ends with a newline.
    ///
    /// `None` (a document without a body) is [`ExportError::InvalidInput`].
    pub fn render(&self, html: Option<&str>) -> Result<String, ExportError> {
        let html = html.ok_or_else(|| ExportError::InvalidInput {
            reason: "document has no content to render".to_string(),
        })?;

        let state = Arc::new(Mutex::new(Collected::default()));
        let converted = convert(html, &state)?;
        let collected = std::mem::take(&mut *state.lock().unwrap_or_else(|e| e.into_inner()));
        if let Some(e) = collected.failure {
            return Err(e);
        }

        // Children are visited before their parent, so an image inside a
        // link always has the lower slot number.
        let mut written: Vec<String> = Vec::with_capacity(collected.links.len());
        for pending in collected.links {
            let kind = pending.link.kind;
            let resolved = self.resolver.resolve_link(pending.link)?;
            let text = fill_slots(&pending.text, &written);
            let destination = link_destination(&resolved);
            written.push(match kind {
                LinkKind::Image => format!("![{text}]({destination})"),
                LinkKind::Link | LinkKind::Email => format!("[{text}]({destination})"),
            });
        }
        debug!("Rendered {} links", written.len());

        let markdown = expand_breaks(&fill_slots(&converted, &written));
        let markdown = RE_BLANK_RUN.replace_all(markdown.trim_matches('\n'), "\n\n");
        Ok(postprocess_markdown(&markdown))
    }
}

/// Run htmd with the custom handlers writing into `state`.
fn convert(html: &str, state: &Arc<Mutex<Collected>>) -> Result<String, ExportError> {
    let mut builder = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            ..Default::default()
        })
        .skip_tags(ElementKind::Ignored.tags().to_vec());

    for kind in ElementKind::HANDLED {
        let state = Arc::clone(state);
        builder = builder.add_handler(kind.tags().to_vec(), move |element: Element| {
            Some(handle_element(kind, &element, &state))
        });
    }

    builder
        .build()
        .convert(html)
        .map_err(|e| ExportError::Internal(format!("Markdown conversion failed: {e}")))
}

// ── Post-conversion passes ───────────────────────────────────────────────────

fn fill_slots(text: &str, written: &[String]) -> String {
    RE_SLOT
        .replace_all(text, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| written.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// Replace each run of break placeholders by its Markdown form.
fn expand_breaks(markdown: &str) -> String {
    RE_BREAK_RUN
        .replace_all(markdown, |caps: &Captures<'_>| {
            let Some(run) = caps.get(0) else {
                return String::new();
            };
            let newlines = caps[1].matches('\n').count();
            let before = &markdown[..run.start()];
            let block_start = before.is_empty() || before.ends_with('\n');
            let block_end = run.end() == markdown.len() || newlines > 0;
            if block_start || block_end {
                return "\n".repeat(newlines);
            }

            match run.as_str().matches(BREAK).count() {
                1 => "\\\n".to_string(),
                2 => "\n\n".to_string(),
                n => format!("\n\n{}\n", "<br />\n".repeat(n - 2)),
            }
        })
        .into_owned()
}

/// Escape paragraph text that would otherwise start a heading, list or quote.
fn escape_block_markers(content: &str) -> String {
    let s = RE_BLOCK_MARKER.replace_all(content, "${1}\\${2}");
    RE_ORDERED_MARKER
        .replace_all(&s, "${1}${2}\\${3}")
        .into_owned()
}

fn escape_alt(alt: &str) -> String {
    let mut out = String::with_capacity(alt.len());
    for c in alt.chars() {
        if matches!(c, '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Link text never spans lines.
fn single_line(text: &str) -> String {
    text.split(|c: char| c == '\n' || c == BREAK)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn link_destination(link: &MarkdownLink) -> String {
    let url = if link.url.contains(' ') {
        format!("<{}>", link.url)
    } else {
        link.url.clone()
    };
    match &link.title {
        Some(title) => format!("{url} \"{}\"", title.replace('"', "\\\"")),
        None => url,
    }
}
