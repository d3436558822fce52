//! Text-run collapsing: find the element that owns a piece of text.

use crate::dom::{normalize_text, NodeId, ROOT};
use crate::surface::MeasurableDocument;

/// Upper bound on how far one text run may climb.
pub const MAX_ASCENTS: usize = 10;

/// Climb from `node` to the most senior element that still represents the
/// same text.
///
/// A parent is entered when its normalized text equals the node's, or when it
/// is an `li` (so inline runs inside a list item anchor at the item). Once the
/// climb reaches an `li` it stops there. The fragment container is never
/// entered, and a text node that cannot climb at all anchors at its parent
/// element. Elements without text (images, rules, empty boxes) anchor at
/// themselves.
pub fn collapse(doc: &dyn MeasurableDocument, node: NodeId) -> NodeId {
    let tree = doc.tree();
    let target = normalize_text(&tree.text_content(node));
    if target.is_empty() && tree.is_element(node) {
        return node;
    }
    let mut current = node;

    for _ in 0..MAX_ASCENTS {
        if tree.tag(current) == Some("li") {
            break;
        }
        let Some(parent) = tree.parent(current) else {
            break;
        };
        if parent == ROOT {
            break;
        }
        let climb = tree.tag(parent) == Some("li")
            || normalize_text(&tree.text_content(parent)) == target;
        if !climb {
            break;
        }
        current = parent;
    }

    if tree.is_element(current) {
        return current;
    }
    match tree.parent(current) {
        Some(parent) if parent != ROOT => parent,
        _ => current,
    }
}
