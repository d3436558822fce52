//! Render surface abstraction
//!
//! Encoding needs something that can lay a fragment out and report computed
//! styles and bounding boxes. That capability lives behind two narrow traits so
//! the extraction logic can run against a browser bridge, the built-in
//! [`StaticSurface`](crate::rendering::StaticSurface), or the deterministic
//! [`CannedSurface`] used by tests.

pub mod canned;

pub use canned::CannedSurface;

use crate::dom::{DocumentTree, NodeId};
use crate::style::StyleProperty;
use crate::Result;
use futures::future::BoxFuture;
use log::debug;
use std::time::Duration;

/// A bounding box in the surface's coordinate space (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A loaded, laid-out document that can be measured.
pub trait MeasurableDocument: Send + Sync {
    /// The document tree, with the fragment's nodes under [`crate::dom::ROOT`].
    fn tree(&self) -> &DocumentTree;

    /// Resolved value of one property, `None` when the surface cannot resolve it
    /// (text nodes, unknown nodes).
    fn computed_value(&self, node: NodeId, property: StyleProperty) -> Option<String>;

    /// Border-box of an element, `None` when it has no box or measurement failed.
    fn bounding_box(&self, node: NodeId) -> Option<Rect>;
}

/// Something that can render a fragment off-screen.
///
/// Every call produces an independent document; the returned future resolves
/// only once the document is ready to be measured.
pub trait RenderSurface: Send + Sync {
    fn load<'a>(&'a self, markup: &'a str) -> BoxFuture<'a, Result<Box<dyn MeasurableDocument>>>;
}

/// What to do after `load` resolves and before measuring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettlePolicy {
    /// Trust the surface's readiness signal
    #[default]
    Ready,
    /// Poll the slide's bounding box until two consecutive readings agree
    PollUntilStable { interval_ms: u64, max_polls: u32 },
}

/// Wait for layout to settle according to `policy`.
pub async fn settle(doc: &dyn MeasurableDocument, policy: SettlePolicy) {
    let SettlePolicy::PollUntilStable {
        interval_ms,
        max_polls,
    } = policy
    else {
        return;
    };

    let probe = doc.tree().first_content_element().unwrap_or(crate::dom::ROOT);
    let mut last = doc.bounding_box(probe);
    for poll in 1..=max_polls {
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        let current = doc.bounding_box(probe);
        if current == last {
            debug!("layout settled after {} poll(s)", poll);
            return;
        }
        last = current;
    }
    debug!("layout still moving after {} polls, measuring anyway", max_polls);
}
