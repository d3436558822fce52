//! Style snapshot reader
//!
//! A unit only keeps the computed values of a fixed set of properties: enough
//! to rebuild the element's appearance without the stylesheet it came from.

use crate::dom::NodeId;
use crate::surface::MeasurableDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The computed properties captured for every unit and child.
///
/// Shorthands are listed before their longhands so that emitting a snapshot
/// in [`StyleProperty::ALL`] order never lets a shorthand clobber a longhand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleProperty {
    // Text
    Color,
    FontSize,
    FontWeight,
    FontFamily,
    TextAlign,
    TextDecoration,
    TextTransform,
    TextOverflow,
    LineHeight,
    LetterSpacing,
    WordSpacing,
    TextShadow,
    TextIndent,
    WhiteSpace,
    WordBreak,
    WordWrap,
    OverflowWrap,
    // Layout
    Position,
    Display,
    FlexDirection,
    JustifyContent,
    AlignItems,
    FlexWrap,
    Gap,
    // Spacing
    Margin,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    Padding,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    // Sizing
    Width,
    Height,
    MinWidth,
    MinHeight,
    MaxWidth,
    MaxHeight,
    // Background
    Background,
    BackgroundColor,
    // Border
    Border,
    BorderRadius,
    BorderWidth,
    BorderStyle,
    BorderColor,
    // Effects
    BoxShadow,
    Opacity,
    Transform,
    // Overflow
    Overflow,
    OverflowX,
    OverflowY,
}

impl StyleProperty {
    pub const ALL: [StyleProperty; 53] = [
        StyleProperty::Color,
        StyleProperty::FontSize,
        StyleProperty::FontWeight,
        StyleProperty::FontFamily,
        StyleProperty::TextAlign,
        StyleProperty::TextDecoration,
        StyleProperty::TextTransform,
        StyleProperty::TextOverflow,
        StyleProperty::LineHeight,
        StyleProperty::LetterSpacing,
        StyleProperty::WordSpacing,
        StyleProperty::TextShadow,
        StyleProperty::TextIndent,
        StyleProperty::WhiteSpace,
        StyleProperty::WordBreak,
        StyleProperty::WordWrap,
        StyleProperty::OverflowWrap,
        StyleProperty::Position,
        StyleProperty::Display,
        StyleProperty::FlexDirection,
        StyleProperty::JustifyContent,
        StyleProperty::AlignItems,
        StyleProperty::FlexWrap,
        StyleProperty::Gap,
        StyleProperty::Margin,
        StyleProperty::MarginTop,
        StyleProperty::MarginRight,
        StyleProperty::MarginBottom,
        StyleProperty::MarginLeft,
        StyleProperty::Padding,
        StyleProperty::PaddingTop,
        StyleProperty::PaddingRight,
        StyleProperty::PaddingBottom,
        StyleProperty::PaddingLeft,
        StyleProperty::Width,
        StyleProperty::Height,
        StyleProperty::MinWidth,
        StyleProperty::MinHeight,
        StyleProperty::MaxWidth,
        StyleProperty::MaxHeight,
        StyleProperty::Background,
        StyleProperty::BackgroundColor,
        StyleProperty::Border,
        StyleProperty::BorderRadius,
        StyleProperty::BorderWidth,
        StyleProperty::BorderStyle,
        StyleProperty::BorderColor,
        StyleProperty::BoxShadow,
        StyleProperty::Opacity,
        StyleProperty::Transform,
        StyleProperty::Overflow,
        StyleProperty::OverflowX,
        StyleProperty::OverflowY,
    ];

    pub fn css_name(self) -> &'static str {
        match self {
            StyleProperty::Color => "color",
            StyleProperty::FontSize => "font-size",
            StyleProperty::FontWeight => "font-weight",
            StyleProperty::FontFamily => "font-family",
            StyleProperty::TextAlign => "text-align",
            StyleProperty::TextDecoration => "text-decoration",
            StyleProperty::TextTransform => "text-transform",
            StyleProperty::TextOverflow => "text-overflow",
            StyleProperty::LineHeight => "line-height",
            StyleProperty::LetterSpacing => "letter-spacing",
            StyleProperty::WordSpacing => "word-spacing",
            StyleProperty::TextShadow => "text-shadow",
            StyleProperty::TextIndent => "text-indent",
            StyleProperty::WhiteSpace => "white-space",
            StyleProperty::WordBreak => "word-break",
            StyleProperty::WordWrap => "word-wrap",
            StyleProperty::OverflowWrap => "overflow-wrap",
            StyleProperty::Position => "position",
            StyleProperty::Display => "display",
            StyleProperty::FlexDirection => "flex-direction",
            StyleProperty::JustifyContent => "justify-content",
            StyleProperty::AlignItems => "align-items",
            StyleProperty::FlexWrap => "flex-wrap",
            StyleProperty::Gap => "gap",
            StyleProperty::Margin => "margin",
            StyleProperty::MarginTop => "margin-top",
            StyleProperty::MarginRight => "margin-right",
            StyleProperty::MarginBottom => "margin-bottom",
            StyleProperty::MarginLeft => "margin-left",
            StyleProperty::Padding => "padding",
            StyleProperty::PaddingTop => "padding-top",
            StyleProperty::PaddingRight => "padding-right",
            StyleProperty::PaddingBottom => "padding-bottom",
            StyleProperty::PaddingLeft => "padding-left",
            StyleProperty::Width => "width",
            StyleProperty::Height => "height",
            StyleProperty::MinWidth => "min-width",
            StyleProperty::MinHeight => "min-height",
            StyleProperty::MaxWidth => "max-width",
            StyleProperty::MaxHeight => "max-height",
            StyleProperty::Background => "background",
            StyleProperty::BackgroundColor => "background-color",
            StyleProperty::Border => "border",
            StyleProperty::BorderRadius => "border-radius",
            StyleProperty::BorderWidth => "border-width",
            StyleProperty::BorderStyle => "border-style",
            StyleProperty::BorderColor => "border-color",
            StyleProperty::BoxShadow => "box-shadow",
            StyleProperty::Opacity => "opacity",
            StyleProperty::Transform => "transform",
            StyleProperty::Overflow => "overflow",
            StyleProperty::OverflowX => "overflow-x",
            StyleProperty::OverflowY => "overflow-y",
        }
    }

    pub fn from_css_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.css_name() == name)
    }

    /// Properties a child takes from its parent when nothing sets them.
    pub fn is_inherited(self) -> bool {
        matches!(
            self,
            StyleProperty::Color
                | StyleProperty::FontSize
                | StyleProperty::FontWeight
                | StyleProperty::FontFamily
                | StyleProperty::TextAlign
                | StyleProperty::TextTransform
                | StyleProperty::LineHeight
                | StyleProperty::LetterSpacing
                | StyleProperty::WordSpacing
                | StyleProperty::TextShadow
                | StyleProperty::TextIndent
                | StyleProperty::WhiteSpace
                | StyleProperty::WordBreak
                | StyleProperty::WordWrap
                | StyleProperty::OverflowWrap
        )
    }

    /// Computed initial value, in the form a browser reports it.
    pub fn initial_value(self) -> &'static str {
        match self {
            StyleProperty::Color => "rgb(0, 0, 0)",
            StyleProperty::FontSize => "16px",
            StyleProperty::FontWeight => "400",
            StyleProperty::FontFamily => "serif",
            StyleProperty::TextAlign => "start",
            StyleProperty::TextDecoration => "none",
            StyleProperty::TextTransform => "none",
            StyleProperty::TextOverflow => "clip",
            StyleProperty::LineHeight => "normal",
            StyleProperty::LetterSpacing => "normal",
            StyleProperty::WordSpacing => "0px",
            StyleProperty::TextShadow => "none",
            StyleProperty::TextIndent => "0px",
            StyleProperty::WhiteSpace => "normal",
            StyleProperty::WordBreak => "normal",
            StyleProperty::WordWrap => "normal",
            StyleProperty::OverflowWrap => "normal",
            StyleProperty::Position => "static",
            StyleProperty::Display => "inline",
            StyleProperty::FlexDirection => "row",
            StyleProperty::JustifyContent => "normal",
            StyleProperty::AlignItems => "normal",
            StyleProperty::FlexWrap => "nowrap",
            StyleProperty::Gap => "normal",
            StyleProperty::Margin
            | StyleProperty::MarginTop
            | StyleProperty::MarginRight
            | StyleProperty::MarginBottom
            | StyleProperty::MarginLeft
            | StyleProperty::Padding
            | StyleProperty::PaddingTop
            | StyleProperty::PaddingRight
            | StyleProperty::PaddingBottom
            | StyleProperty::PaddingLeft => "0px",
            StyleProperty::Width
            | StyleProperty::Height
            | StyleProperty::MinWidth
            | StyleProperty::MinHeight => "auto",
            StyleProperty::MaxWidth | StyleProperty::MaxHeight => "none",
            StyleProperty::Background => "none",
            StyleProperty::BackgroundColor => "rgba(0, 0, 0, 0)",
            StyleProperty::Border => "0px none rgb(0, 0, 0)",
            StyleProperty::BorderRadius | StyleProperty::BorderWidth => "0px",
            StyleProperty::BorderStyle => "none",
            StyleProperty::BorderColor => "currentcolor",
            StyleProperty::BoxShadow => "none",
            StyleProperty::Opacity => "1",
            StyleProperty::Transform => "none",
            StyleProperty::Overflow | StyleProperty::OverflowX | StyleProperty::OverflowY => {
                "visible"
            }
        }
    }
}

/// Computed values of the [`StyleProperty`] set, keyed by CSS property name.
///
/// Keys are plain strings so snapshots from foreign producers deserialize even
/// when they carry properties this crate does not know; those are ignored at
/// reconstruction time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSnapshot(BTreeMap<String, String>);

impl StyleSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: StyleProperty) -> Option<&str> {
        self.0.get(property.css_name()).map(String::as_str)
    }

    pub fn insert(&mut self, property: StyleProperty, value: impl Into<String>) {
        self.0.insert(property.css_name().to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Known properties in emission order.
    pub fn known(&self) -> impl Iterator<Item = (StyleProperty, &str)> + '_ {
        StyleProperty::ALL
            .iter()
            .filter_map(move |p| self.get(*p).map(|v| (*p, v)))
    }

    /// Keys outside the [`StyleProperty`] set.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| StyleProperty::from_css_name(k).is_none())
    }
}

impl FromIterator<(StyleProperty, String)> for StyleSnapshot {
    fn from_iter<T: IntoIterator<Item = (StyleProperty, String)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for (p, v) in iter {
            snapshot.insert(p, v);
        }
        snapshot
    }
}

/// Read the fixed property set for one element. Unresolvable properties are left out.
pub fn read_snapshot(doc: &dyn MeasurableDocument, node: NodeId) -> StyleSnapshot {
    StyleProperty::ALL
        .iter()
        .filter_map(|p| doc.computed_value(node, *p).map(|v| (*p, v)))
        .collect()
}

/// Whether the element paints a fill: a non-transparent background colour, or
/// a background image/gradient.
pub fn has_visible_background(doc: &dyn MeasurableDocument, node: NodeId) -> bool {
    let color = doc
        .computed_value(node, StyleProperty::BackgroundColor)
        .map(|v| is_visible_color(&v))
        .unwrap_or(false);
    if color {
        return true;
    }
    doc.computed_value(node, StyleProperty::Background)
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("gradient(") || v.contains("url(")
        })
        .unwrap_or(false)
}

/// False for empty values, `transparent`, and any colour with zero alpha.
/// Values that do not parse as a colour count as visible.
pub fn is_visible_color(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    if v.is_empty() || v == "transparent" || v == "none" {
        return false;
    }
    match csscolorparser::parse(&v) {
        Ok(c) => c.to_rgba8()[3] > 0,
        Err(_) => true,
    }
}

/// Canonical `rgb()`/`rgba()` form of a colour, `None` if it does not parse.
pub fn normalize_color(value: &str) -> Option<String> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("currentcolor") {
        return None;
    }
    let c = csscolorparser::parse(v).ok()?;
    let [r, g, b, a] = c.to_rgba8();
    if a == 255 {
        Some(format!("rgb({}, {}, {})", r, g, b))
    } else {
        let alpha = (a as f64 / 255.0 * 1000.0).round() / 1000.0;
        Some(format!("rgba({}, {}, {}, {})", r, g, b, alpha))
    }
}

/// A `name: value` pair from a declaration block or `style` attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// Parse a declaration block (`color: red; margin: 0 !important`).
///
/// Semicolons inside parentheses or quotes (data URLs, font names) do not split.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    split_top_level(block, ';')
        .into_iter()
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let mut value = value.trim().to_string();
            let mut important = false;
            if let Some(idx) = value.to_ascii_lowercase().rfind("!important") {
                value.truncate(idx);
                value = value.trim().to_string();
                important = true;
            }
            if !is_valid_property_name(&name) || value.is_empty() {
                return None;
            }
            Some(Declaration {
                name,
                value,
                important,
            })
        })
        .collect()
}

/// Split on `sep` outside parentheses and quotes.
pub fn split_top_level(source: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in source.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&source[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts
}

/// Whitespace-separated tokens of a value, keeping `rgb(0, 0, 0)` in one piece.
pub fn split_tokens(value: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        match c {
            '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&value[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&value[s..]);
    }
    tokens
}

pub fn is_valid_property_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// Values that could escape a declaration or the attribute are rejected.
pub fn is_acceptable_value(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && !v.contains(|c| matches!(c, ';' | '{' | '}' | '<' | '>'))
}

/// `12px`, `12.5px`; non-finite values become `0px`.
pub fn format_px(value: f64) -> String {
    if value.is_finite() {
        format!("{}px", value)
    } else {
        "0px".to_string()
    }
}
