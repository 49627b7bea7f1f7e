//! Block-container serialization shared by every surface implementation.
//!
//! The container is written in exactly the form the markup serializer
//! emits for it, so reading the live root back after an edit yields the
//! same string the host would send for the edited sequence.

use crate::messages::Block;
use livepage_markup::escape_attribute;

/// Attribute carrying a block's id on its container
pub const BLOCK_ID_ATTR: &str = "data-block-id";

/// Class present on every block container
pub const BLOCK_CLASS: &str = "lp-block";

/// Extra class on the selected block's container
pub const ACTIVE_CLASS: &str = "lp-active";

/// Serialize a block sequence into the surface's root content.
///
/// A `selected_id` that names no block marks nothing.
pub fn render_blocks(blocks: &[Block], selected_id: Option<&str>) -> String {
    let capacity = blocks.iter().map(|b| b.markup.len() + 64).sum();
    let mut html = String::with_capacity(capacity);

    for block in blocks {
        let active = selected_id == Some(block.id.as_str());
        html.push_str("<div class=\"");
        html.push_str(BLOCK_CLASS);
        if active {
            html.push(' ');
            html.push_str(ACTIVE_CLASS);
        }
        html.push_str("\" ");
        html.push_str(BLOCK_ID_ATTR);
        html.push_str("=\"");
        html.push_str(&escape_attribute(&block.id));
        html.push_str("\">");
        html.push_str(&block.markup);
        html.push_str("</div>");
    }

    html
}
