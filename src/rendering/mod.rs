//! Built-in render surface
//!
//! Resolves styles with [`cascade`] and geometry with [`layout`], entirely in
//! process. Good enough for generated slides; anything relying on real font
//! metrics should plug a browser-backed [`RenderSurface`] in instead.

pub mod cascade;
pub mod layout;

use crate::dom::{DocumentTree, NodeId};
use crate::style::StyleProperty;
use crate::surface::{MeasurableDocument, Rect, RenderSurface};
use crate::{Error, Result, Viewport};
use cascade::StyleMap;
use futures::future::BoxFuture;
use log::debug;

/// In-process surface with a fixed viewport
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSurface {
    viewport: Viewport,
}

impl StaticSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

impl RenderSurface for StaticSurface {
    fn load<'a>(&'a self, markup: &'a str) -> BoxFuture<'a, Result<Box<dyn MeasurableDocument>>> {
        let markup = markup.to_string();
        let viewport = self.viewport;
        Box::pin(async move {
            // Style resolution and layout are CPU-bound; keep them off the async workers.
            let doc = tokio::task::spawn_blocking(move || StaticDocument::render(&markup, viewport))
                .await
                .map_err(|e| Error::LoadError(format!("render task failed: {}", e)))?;
            Ok(Box::new(doc) as Box<dyn MeasurableDocument>)
        })
    }
}

/// A fragment after style resolution and layout
#[derive(Debug, Clone)]
pub struct StaticDocument {
    tree: DocumentTree,
    styles: Vec<StyleMap>,
    boxes: Vec<Option<Rect>>,
}

impl StaticDocument {
    pub fn render(markup: &str, viewport: Viewport) -> Self {
        let styled = cascade::resolve(markup);
        let boxes = layout::layout_document(&styled.tree, &styled.styles, viewport);
        debug!(
            "rendered {} nodes into a {}x{} viewport",
            styled.tree.len(),
            viewport.width,
            viewport.height
        );
        Self {
            tree: styled.tree,
            styles: styled.styles,
            boxes,
        }
    }
}

impl MeasurableDocument for StaticDocument {
    fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    fn computed_value(&self, node: NodeId, property: StyleProperty) -> Option<String> {
        self.styles.get(node)?.get(property.css_name()).cloned()
    }

    fn bounding_box(&self, node: NodeId) -> Option<Rect> {
        self.boxes.get(node).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ROOT;

    #[test]
    fn render_measures_elements_but_not_text() {
        let doc = StaticDocument::render("<p>Hello</p>", Viewport::default());
        let p = doc.tree().first_content_element().unwrap();
        let text = doc.tree().children(p)[0];
        assert!(doc.bounding_box(p).is_some());
        assert_eq!(doc.bounding_box(text), None);
        assert_eq!(doc.computed_value(text, StyleProperty::Color), None);
        assert_eq!(
            doc.bounding_box(ROOT),
            Some(Rect::new(0.0, 0.0, 1280.0, 720.0))
        );
    }

    #[tokio::test]
    async fn load_returns_independent_documents() {
        let surface = StaticSurface::new(Viewport::new(800, 600));
        let a = surface.load("<p>a</p>").await.unwrap();
        let b = surface.load("<div>b</div><div>c</div>").await.unwrap();
        assert_eq!(a.tree().element_children(ROOT).count(), 1);
        assert_eq!(b.tree().element_children(ROOT).count(), 2);
    }
}
