//! Styled-box extraction: turn a measured document into visual units.

use super::{background, collapse, zorder};
use crate::dom::{is_raw_text_element, normalize_text, DocumentTree, NodeId, ROOT};
use crate::style::{has_visible_background, read_snapshot};
use crate::surface::MeasurableDocument;
use crate::unit::{ChildStyle, FlatSlide, VisualUnit};
use log::debug;
use std::collections::HashSet;

/// Extract every visual unit of a loaded document, in stacking order.
pub fn extract(doc: &dyn MeasurableDocument) -> FlatSlide {
    let tree = doc.tree();

    let mut text_anchors = HashSet::new();
    let mut anchors = Vec::new();
    for leaf in leaf_candidates(tree) {
        let anchor = collapse::collapse(doc, leaf);
        if !tree.is_element(anchor) {
            continue;
        }
        let from_text = tree.is_text(leaf);
        if from_text {
            text_anchors.insert(anchor);
        }
        anchors.push((anchor, from_text));
    }
    // Textless leaves inside a text anchor already travel in its payload.
    let carried = |id: NodeId| {
        text_anchors
            .iter()
            .any(|a| tree.is_ancestor(*a, id) && !tree.has_raw_text_descendant(*a))
    };
    let anchors: Vec<NodeId> = anchors
        .into_iter()
        .filter(|(id, from_text)| *from_text || !carried(*id))
        .map(|(id, _)| id)
        .collect();
    let backgrounds = background::detect(doc, ROOT);

    let mut seen = HashSet::new();
    let candidates: Vec<NodeId> = anchors
        .into_iter()
        .chain(backgrounds)
        .filter(|id| seen.insert(*id))
        .collect();

    let mut units = Vec::with_capacity(candidates.len());
    for id in candidates {
        match build_unit(doc, id, &text_anchors) {
            Some(unit) => units.push(unit),
            None => debug!("no bounding box for <{}> #{}, skipping", tree.tag(id).unwrap_or("?"), id),
        }
    }

    let slide_box = tree.first_content_element().and_then(|id| doc.bounding_box(id));
    FlatSlide {
        units: zorder::order(zorder::dedup_sources(units)),
        width: slide_box.map(|r| r.width),
        height: slide_box.map(|r| r.height),
    }
}

/// Text nodes with visible text and elements without rendered children, in
/// document order. `<style>`/`<script>` subtrees and line breaks are skipped.
fn leaf_candidates(tree: &DocumentTree) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_leaves(tree, ROOT, &mut out);
    out
}

fn collect_leaves(tree: &DocumentTree, id: NodeId, out: &mut Vec<NodeId>) {
    for &child in tree.children(id) {
        if tree.tag(child).map(is_raw_text_element).unwrap_or(false) {
            continue;
        }
        let before = out.len();
        collect_leaves(tree, child, out);
        if out.len() > before {
            continue;
        }
        match tree.tag(child) {
            Some("br") | Some("wbr") => {}
            Some(_) => out.push(child),
            None if tree.is_text(child) && !tree.text_content(child).trim().is_empty() => {
                out.push(child)
            }
            None => {}
        }
    }
}

/// Build the unit for one candidate; `None` when it cannot be measured.
pub fn build_unit(
    doc: &dyn MeasurableDocument,
    id: NodeId,
    text_anchors: &HashSet<NodeId>,
) -> Option<VisualUnit> {
    let tree = doc.tree();
    let rect = doc.bounding_box(id)?;

    let text = normalize_text(&tree.text_content(id));
    let from_background = has_visible_background(doc, id) && !text_anchors.contains(&id);

    // Text already carried by anchors inside this element does not count as its own.
    let mut inner: Vec<NodeId> = text_anchors
        .iter()
        .copied()
        .filter(|a| tree.is_ancestor(id, *a))
        .collect();
    inner.sort_unstable();
    let mut own_text = text.clone();
    for anchor in inner {
        let anchored = normalize_text(&tree.text_content(anchor));
        own_text = own_text.replacen(&anchored, "", 1).trim().to_string();
    }

    let inner_html = if (from_background && own_text.is_empty()) || tree.has_raw_text_descendant(id) {
        String::new()
    } else {
        tree.inner_html(id)
    };

    Some(VisualUnit {
        tag_name: tree.tag(id).map(str::to_string),
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        style: read_snapshot(doc, id),
        inner_html,
        class_name: tree.attr(id, "class").unwrap_or_default().to_string(),
        id: tree.attr(id, "id").unwrap_or_default().to_string(),
        attributes: tree.attrs(id).to_vec(),
        children_styles: child_styles(doc, id),
        from_background,
        text: if from_background { String::new() } else { text },
        source_ordinal: Some(id),
    })
}

/// Computed styles of every styleable descendant, keyed by ordinal and tag.
pub fn child_styles(doc: &dyn MeasurableDocument, id: NodeId) -> Vec<ChildStyle> {
    let tree = doc.tree();
    tree.styleable_children(id)
        .enumerate()
        .map(|(ordinal, child)| ChildStyle {
            ordinal,
            tag: tree.tag(child).unwrap_or_default().to_string(),
            style: read_snapshot(doc, child),
            children: child_styles(doc, child),
        })
        .collect()
}
