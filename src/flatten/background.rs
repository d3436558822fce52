//! Background detection: elements whose only contribution may be a fill.

use crate::dom::{is_raw_text_element, NodeId};
use crate::style::has_visible_background;
use crate::surface::MeasurableDocument;

/// Every element under `root` (excluding `root` itself and `<style>`/`<script>`
/// subtrees) that paints a visible background, in document order.
pub fn detect(doc: &dyn MeasurableDocument, root: NodeId) -> Vec<NodeId> {
    let tree = doc.tree();
    let mut found = Vec::new();
    let mut stack: Vec<NodeId> = tree.element_children(root).collect();
    stack.reverse();

    while let Some(id) = stack.pop() {
        if tree.tag(id).map(is_raw_text_element).unwrap_or(true) {
            continue;
        }
        if has_visible_background(doc, id) {
            found.push(id);
        }
        let mut children: Vec<NodeId> = tree.element_children(id).collect();
        children.reverse();
        stack.extend(children);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ROOT;
    use crate::rendering::StaticDocument;
    use crate::Viewport;

    #[test]
    fn finds_filled_elements_in_document_order() {
        let doc = StaticDocument::render(
            "<style>.panel { background-color: #eee }</style>\
             <div style=\"background: linear-gradient(red, blue)\">\
               <div class=\"panel\"><p>text</p></div>\
               <span style=\"background: rgba(0,0,0,0)\">clear</span>\
               <i style=\"background-color: yellow\"></i>\
             </div>",
            Viewport::default(),
        );
        let found = detect(&doc, ROOT);
        let tags: Vec<_> = found.iter().map(|id| doc.tree().tag(*id).unwrap()).collect();
        assert_eq!(tags, vec!["div", "div", "i"]);
        assert!(found.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn ignores_the_fragment_container() {
        let doc = StaticDocument::render(
            "<style>body { background: white }</style><p>plain</p>",
            Viewport::default(),
        );
        assert!(detect(&doc, ROOT).is_empty());
    }
}
