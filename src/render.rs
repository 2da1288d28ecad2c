//! Flattening of rich text runs and recursive block-tree rendering.
//!
//! [`render_blocks`] walks a remote content tree top-down and linearizes each
//! block into a line (or fenced block) of markdown-ish text, bounded by
//! [`MAX_RENDER_DEPTH`]. A failed child fetch degrades that subtree to an
//! empty string; it never aborts the rest of the page.

use futures::future::BoxFuture;
use tracing::error;

use crate::contract::{BlockKind, ContentNode, RichTextSpan, WorkspaceSource};

/// Recursion bound for the block tree walk. Nodes nested deeper than this
/// are dropped, which caps work per page and defuses cyclic remote trees.
pub const MAX_RENDER_DEPTH: usize = 5;

/// Concatenate the plain text of an ordered run of inline spans.
///
/// Empty or missing runs flatten to the empty string. All styling is
/// intentionally discarded.
pub fn flatten_rich_text(spans: &[RichTextSpan]) -> String {
    spans.iter().map(|s| s.plain_text.as_str()).collect()
}

/// Recursively render the children of `node_id` into flat text.
///
/// Each emitted part is prefixed with two spaces per depth level (first line
/// only for multi-line parts). Parts appear in source order; a node flagged
/// `has_children` is followed by its subtree rendered at `depth + 1`.
pub async fn render_blocks(source: &dyn WorkspaceSource, node_id: &str, depth: usize) -> String {
    render_inner(source, node_id, depth).await
}

// Boxed so the async recursion has a nameable future type.
fn render_inner<'a>(
    source: &'a dyn WorkspaceSource,
    node_id: &'a str,
    depth: usize,
) -> BoxFuture<'a, String> {
    Box::pin(async move {
        if depth > MAX_RENDER_DEPTH {
            return String::new();
        }

        let children = match source.fetch_children(node_id).await {
            Ok(children) => children,
            Err(e) => {
                error!(node_id, depth, error = ?e, "Failed to fetch child blocks");
                return String::new();
            }
        };

        let indent = "  ".repeat(depth);
        let mut parts: Vec<String> = Vec::new();

        for node in &children {
            if let Some(text) = render_node(node, &indent) {
                parts.push(text);
            }
            if node.has_children {
                parts.push(render_inner(source, &node.id, depth + 1).await);
            }
        }

        parts.concat()
    })
}

/// Render one node's own text, without its children. `None` means the node
/// contributes nothing (empty paragraph, media without a URL, unknown kind).
fn render_node(node: &ContentNode, indent: &str) -> Option<String> {
    match &node.kind {
        BlockKind::Paragraph { rich_text } => {
            let text = flatten_rich_text(rich_text);
            if text.is_empty() {
                None
            } else {
                Some(format!("{indent}{text}\n"))
            }
        }
        BlockKind::Heading { level, rich_text } => {
            let text = flatten_rich_text(rich_text);
            Some(format!(
                "{indent}{} {text}\n\n",
                "#".repeat(*level as usize)
            ))
        }
        BlockKind::BulletedItem { rich_text } => {
            Some(format!("{indent}- {}\n", flatten_rich_text(rich_text)))
        }
        // Every item renders as "1."; the running ordinal is not tracked.
        // Kept as-is to stay byte-compatible with the upstream renderer.
        BlockKind::NumberedItem { rich_text } => {
            Some(format!("{indent}1. {}\n", flatten_rich_text(rich_text)))
        }
        BlockKind::Code {
            rich_text,
            language,
        } => Some(format!(
            "{indent}```{}\n{}\n```\n\n",
            language.as_deref().unwrap_or(""),
            flatten_rich_text(rich_text)
        )),
        BlockKind::Quote { rich_text } => {
            Some(format!("{indent}> {}\n\n", flatten_rich_text(rich_text)))
        }
        BlockKind::Image { caption, url } => url
            .as_ref()
            .map(|url| format!("{indent}![{}]({url})\n\n", flatten_rich_text(caption))),
        BlockKind::File { caption, url } => url.as_ref().map(|url| {
            let caption = flatten_rich_text(caption);
            let label = if caption.is_empty() {
                "Attachment"
            } else {
                caption.as_str()
            };
            format!("{indent}[File: {label}]({url})\n\n")
        }),
        BlockKind::Unknown => None,
    }
}
