//! Visual units: the flattened representation of a slide

use crate::style::StyleSnapshot;
use crate::Result;
use serde::{Deserialize, Serialize};

/// One absolutely positionable element captured from a rendered fragment.
///
/// Geometry is the border box measured during the original render and is
/// never recomputed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualUnit {
    /// Element to recreate; `None` (or an invalid name) rebuilds as `div`
    pub tag_name: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub style: StyleSnapshot,
    /// Markup payload; empty for fill-only units and for elements that embed
    /// `<style>`/`<script>`
    #[serde(rename = "innerHTML")]
    pub inner_html: String,
    pub class_name: String,
    pub id: String,
    /// Every source attribute, sorted by name
    pub attributes: Vec<(String, String)>,
    pub children_styles: Vec<ChildStyle>,
    /// Found only through its background fill, not anchored to text
    pub from_background: bool,
    /// Normalized text; empty when `from_background`
    pub text: String,
    /// Document-order index of the source node
    pub source_ordinal: Option<usize>,
}

impl VisualUnit {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Computed style of one descendant element, keyed so it can be matched
/// against the rebuilt children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildStyle {
    /// Position among the parent's element children, `<style>`/`<script>` excluded
    pub ordinal: usize,
    /// Lowercase tag name; empty matches any element
    pub tag: String,
    pub style: StyleSnapshot,
    pub children: Vec<ChildStyle>,
}

/// The result of encoding one fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlatSlide {
    /// Units in stacking order, largest first
    pub units: Vec<VisualUnit>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl FlatSlide {
    /// No units and no dimensions: what a failed render degrades to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
