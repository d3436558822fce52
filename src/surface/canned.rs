//! Deterministic surface with caller-supplied geometry
//!
//! Styles are resolved by the same cascade as the static surface, but boxes
//! come from a table keyed by element `id`, so tests can pin exact rectangles
//! without depending on a layout engine.

use super::{MeasurableDocument, Rect, RenderSurface};
use crate::dom::{DocumentTree, NodeId, ROOT};
use crate::rendering::cascade::{self, StyleMap};
use crate::style::StyleProperty;
use crate::{Error, Result};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct CannedSurface {
    boxes: Arc<HashMap<String, Rect>>,
    default_box: Option<Rect>,
    loads: AtomicUsize,
    failing: AtomicBool,
}

impl Default for CannedSurface {
    fn default() -> Self {
        Self {
            boxes: Arc::new(HashMap::new()),
            default_box: Some(Rect::new(0.0, 0.0, 100.0, 20.0)),
            loads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }
}

impl CannedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the box of the element whose `id` attribute is `id`.
    pub fn with_box(mut self, id: &str, rect: Rect) -> Self {
        Arc::make_mut(&mut self.boxes).insert(id.to_string(), rect);
        self
    }

    /// Box for elements without a pinned rectangle; `None` makes them unmeasurable.
    pub fn with_default_box(mut self, rect: Option<Rect>) -> Self {
        self.default_box = rect;
        self
    }

    /// While set, every load fails as if the surface could not be started.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `load` calls that reached the surface.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl RenderSurface for CannedSurface {
    fn load<'a>(&'a self, markup: &'a str) -> BoxFuture<'a, Result<Box<dyn MeasurableDocument>>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::SurfaceUnavailable(
                    "canned surface set to fail".to_string(),
                ));
            }
            let styled = cascade::resolve(markup);
            let doc = CannedDocument {
                tree: styled.tree,
                styles: styled.styles,
                boxes: Arc::clone(&self.boxes),
                default_box: self.default_box,
            };
            Ok(Box::new(doc) as Box<dyn MeasurableDocument>)
        })
    }
}

struct CannedDocument {
    tree: DocumentTree,
    styles: Vec<StyleMap>,
    boxes: Arc<HashMap<String, Rect>>,
    default_box: Option<Rect>,
}

impl MeasurableDocument for CannedDocument {
    fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    fn computed_value(&self, node: NodeId, property: StyleProperty) -> Option<String> {
        self.styles.get(node)?.get(property.css_name()).cloned()
    }

    fn bounding_box(&self, node: NodeId) -> Option<Rect> {
        if node == ROOT || !self.tree.is_element(node) {
            return None;
        }
        if let Some(rect) = self.tree.attr(node, "id").and_then(|id| self.boxes.get(id)) {
            return Some(*rect);
        }
        let hidden = self
            .styles
            .get(node)
            .and_then(|s| s.get("display"))
            .map(|d| d == "none")
            .unwrap_or(true);
        if hidden {
            None
        } else {
            self.default_box
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pinned_boxes_win_over_the_default() {
        let surface = CannedSurface::new().with_box("a", Rect::new(1.0, 2.0, 3.0, 4.0));
        let doc = surface
            .load("<div id=\"a\">x</div><p>y</p><style>p{}</style>")
            .await
            .unwrap();
        let tree = doc.tree();
        let ids: Vec<_> = tree.element_children(ROOT).collect();
        assert_eq!(doc.bounding_box(ids[0]), Some(Rect::new(1.0, 2.0, 3.0, 4.0)));
        assert_eq!(doc.bounding_box(ids[1]), Some(Rect::new(0.0, 0.0, 100.0, 20.0)));
        assert_eq!(doc.bounding_box(ids[2]), None);
        assert_eq!(
            doc.computed_value(ids[1], StyleProperty::Display).as_deref(),
            Some("block")
        );
    }

    #[tokio::test]
    async fn failing_surface_counts_the_attempt() {
        let surface = CannedSurface::new();
        surface.set_failing(true);
        assert!(surface.load("<p>x</p>").await.is_err());
        assert_eq!(surface.load_count(), 1);
    }
}
