//! Raw markup of elements that are copied into the Markdown unchanged.
//!
//! `htmd` walks an html5ever `RcDom`; its element handlers receive the node
//! handle, and [`outer_html`] turns that handle back into markup.

use crate::error::ExportError;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, SerializableHandle};

/// Serialize a node including its own tag.
pub fn outer_html(handle: &Handle) -> Result<String, ExportError> {
    let mut bytes = Vec::new();
    let serializable: SerializableHandle = handle.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };

    serialize(&mut bytes, &serializable, opts)
        .map_err(|e| ExportError::Internal(format!("HTML serialization failed: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| ExportError::Internal(format!("HTML serialization produced invalid UTF-8: {e}")))
}
