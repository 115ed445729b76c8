//! Per-document stages of the export.
//!
//! Each submodule implements one transformation step and is tested on its
//! own. The orchestrator in [`crate::export`] wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! raw HTML ──▶ preprocess ──▶ render ──────────▶ postprocess ──▶ front_matter + body
//!                              │   ▲
//!                              ▼   │
//!                             resolve ──▶ sanitize ──▶ fetch
//!                            (links)     (file name)   (HTTP)
//! ```
//!
//! 1. [`preprocess`]   regex repairs of known defects in the source HTML
//! 2. [`html`]         raw markup of nodes kept verbatim
//! 3. [`render`]       htmd conversion, with the [`render::LinkResolver`] seam
//! 4. [`resolve`]      rewrites internal links and embedded images
//! 5. [`sanitize`]     image reference → filesystem-safe base name
//! 6. [`fetch`]        downloads each embedded image once; the only stage
//!    with network I/O
//! 7. [`postprocess`]  line trimming and the excerpt separator
//! 8. [`front_matter`] YAML metadata block

pub mod fetch;
pub mod front_matter;
pub mod html;
pub mod postprocess;
pub mod preprocess;
pub mod render;
pub mod resolve;
pub mod sanitize;
