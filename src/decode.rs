//! Flat DOM reconstruction
//!
//! Rebuilds one absolutely positioned element per visual unit. Nothing in
//! here fails: bad tags fall back to `div`, bad declarations and attributes
//! are dropped one at a time, and child styles that no longer line up with
//! the markup are skipped.

use crate::dom::{
    escape_attr, is_void_element, write_start_tag, DocumentTree, NodeId, ROOT,
};
use crate::flatten::zorder::{self, StackedUnit};
use crate::style::{format_px, is_acceptable_value, is_valid_property_name, parse_declarations, StyleSnapshot};
use crate::unit::{ChildStyle, VisualUnit};
use log::debug;

const FALLBACK_TAG: &str = "div";

/// Markup for every unit, in stacking order.
pub fn decode(units: &[VisualUnit]) -> String {
    let mut out = String::new();
    for stacked in zorder::stack(units) {
        write_unit(&mut out, &stacked);
    }
    out
}

fn write_unit(out: &mut String, stacked: &StackedUnit) {
    let unit = &stacked.unit;
    let tag = unit
        .tag_name
        .as_deref()
        .map(str::to_ascii_lowercase)
        .filter(|t| is_valid_tag_name(t))
        .unwrap_or_else(|| FALLBACK_TAG.to_string());

    let mut style = Declarations::default();
    if let Some((_, inline)) = unit.attributes.iter().find(|(k, _)| k.eq_ignore_ascii_case("style")) {
        for decl in parse_declarations(inline) {
            style.set(&decl.name, &decl.value);
        }
    }
    style.extend_from_snapshot(&unit.style);
    style.set("position", "absolute");
    style.set("left", &format_px(unit.x));
    style.set("top", &format_px(unit.y));
    style.set("width", &format_px(unit.width));
    style.set("height", &format_px(unit.height));
    // The recorded box is a border box at the unit's origin.
    style.set("margin", "0px");
    style.set("box-sizing", "border-box");
    style.set("z-index", &stacked.z_index.to_string());

    let mut attrs: Vec<(&str, String)> = Vec::new();
    if !unit.class_name.is_empty() {
        attrs.push(("class", unit.class_name.clone()));
    }
    if !unit.id.is_empty() {
        attrs.push(("id", unit.id.clone()));
    }
    for (name, value) in &unit.attributes {
        if matches!(name.to_ascii_lowercase().as_str(), "style" | "class" | "id") {
            continue;
        }
        if !is_valid_attribute_name(name) {
            debug!("dropping attribute {:?} on <{}>", name, tag);
            continue;
        }
        attrs.push((name.as_str(), value.clone()));
    }
    attrs.push(("style", style.to_css()));

    write_start_tag(out, &tag, attrs.iter().map(|(k, v)| (*k, v.as_str())));
    if is_void_element(&tag) {
        return;
    }
    out.push_str(&rebuild_content(&unit.inner_html, &unit.children_styles));
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}

/// Re-parse a unit's payload and push the recorded child styles into it.
fn rebuild_content(inner_html: &str, children_styles: &[ChildStyle]) -> String {
    if inner_html.is_empty() {
        return String::new();
    }
    let mut tree = DocumentTree::parse_fragment(inner_html);
    apply_child_styles(&mut tree, ROOT, children_styles);
    tree.inner_html(ROOT)
}

fn apply_child_styles(tree: &mut DocumentTree, parent: NodeId, styles: &[ChildStyle]) {
    let children: Vec<NodeId> = tree.styleable_children(parent).collect();
    for child_style in styles {
        let Some(&child) = children.get(child_style.ordinal) else {
            debug!("no child #{} to style", child_style.ordinal);
            continue;
        };
        let tag_matches = child_style.tag.is_empty()
            || tree
                .tag(child)
                .map(|t| t.eq_ignore_ascii_case(&child_style.tag))
                .unwrap_or(false);
        if !tag_matches {
            debug!(
                "child #{} is <{}>, recorded as <{}>; skipping its style",
                child_style.ordinal,
                tree.tag(child).unwrap_or("?"),
                child_style.tag
            );
            continue;
        }

        let mut style = Declarations::default();
        if let Some(existing) = tree.attr(child, "style") {
            for decl in parse_declarations(existing) {
                style.set(&decl.name, &decl.value);
            }
        }
        style.extend_from_snapshot(&child_style.style);
        if !style.is_empty() {
            tree.set_attr(child, "style", &style.to_css());
        }
        apply_child_styles(tree, child, &child_style.children);
    }
}

/// An ordered declaration list where setting a property again moves it to the end.
#[derive(Debug, Default)]
struct Declarations(Vec<(String, String)>);

impl Declarations {
    fn set(&mut self, name: &str, value: &str) {
        if !is_valid_property_name(name) || !is_acceptable_value(value) {
            debug!("rejecting declaration {:?}: {:?}", name, value);
            return;
        }
        self.0.retain(|(n, _)| n != name);
        self.0.push((name.to_string(), value.trim().to_string()));
    }

    fn extend_from_snapshot(&mut self, snapshot: &StyleSnapshot) {
        for (property, value) in snapshot.known() {
            self.set(property.css_name(), value);
        }
        for key in snapshot.unknown_keys() {
            debug!("skipping unknown style property {:?}", key);
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_css(&self) -> String {
        self.0
            .iter()
            .map(|(n, v)| format!("{}: {};", n, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn is_valid_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '<' | '/' | '=')
        })
        && escape_attr(name) == name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleProperty;

    fn unit(tag: Option<&str>, w: f64, h: f64, inner: &str) -> VisualUnit {
        VisualUnit {
            tag_name: tag.map(str::to_string),
            x: 10.0,
            y: 20.0,
            width: w,
            height: h,
            inner_html: inner.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn places_units_absolutely_and_stacks_by_area() {
        let html = decode(&[unit(Some("P"), 10.0, 10.0, "small"), unit(Some("div"), 100.0, 100.0, "")]);
        assert_eq!(
            html,
            "<div style=\"position: absolute; left: 10px; top: 20px; width: 100px; height: 100px; \
             margin: 0px; box-sizing: border-box; z-index: 0;\"></div>\
             <p style=\"position: absolute; left: 10px; top: 20px; width: 10px; height: 10px; \
             margin: 0px; box-sizing: border-box; z-index: 1;\">small</p>"
        );
    }

    #[test]
    fn missing_or_invalid_tags_fall_back_to_div() {
        let html = decode(&[
            unit(None, 5.0, 5.0, "a"),
            unit(Some("x y"), 4.0, 4.0, "b"),
            unit(Some("h2"), 3.0, 3.0, "c"),
        ]);
        assert_eq!(html.matches("<div ").count(), 2);
        assert!(html.contains(">a</div>"));
        assert!(html.contains(">b</div>"));
        assert!(html.contains(">c</h2>"));
    }

    #[test]
    fn snapshot_applies_in_order_and_bad_values_are_skipped() {
        let mut u = unit(Some("span"), 1.0, 1.0, "t");
        u.style.insert(StyleProperty::Color, "red; position: fixed");
        u.style.insert(StyleProperty::FontSize, "24px");
        u.style.insert(StyleProperty::Position, "static");
        u.attributes = vec![("style".to_string(), "color: blue; margin: 4px".to_string())];
        let html = decode(&[u]);
        assert!(html.starts_with("<span style=\"color: blue; font-size: 24px; position: absolute;"));
        assert!(!html.contains("fixed"));
        assert!(!html.contains("margin: 4px"));
    }

    #[test]
    fn identity_and_attributes_are_copied() {
        let mut u = unit(Some("a"), 1.0, 1.0, "link");
        u.class_name = "btn primary".to_string();
        u.id = "cta".to_string();
        u.attributes = vec![
            ("class".to_string(), "ignored".to_string()),
            ("href".to_string(), "/next?a=1&b=\"2\"".to_string()),
            ("on click".to_string(), "x".to_string()),
        ];
        let html = decode(&[u]);
        assert!(html.starts_with(
            "<a class=\"btn primary\" id=\"cta\" href=\"/next?a=1&amp;b=&quot;2&quot;\" style=\""
        ));
        assert!(!html.contains("ignored"));
        assert!(!html.contains("on click"));
    }

    #[test]
    fn void_units_have_no_content() {
        let mut u = unit(Some("img"), 30.0, 30.0, "ignored");
        u.attributes = vec![("src".to_string(), "a.png".to_string())];
        let html = decode(&[u]);
        assert!(html.starts_with("<img src=\"a.png\" style=\""));
        assert!(!html.contains("</img>"));
        assert!(!html.contains("ignored"));
    }

    #[test]
    fn child_styles_follow_recorded_keys() {
        let mut u = unit(Some("div"), 50.0, 50.0, "<style>b{}</style><b>x</b><i style=\"color: red\">y <u>z</u></i>");
        let mut bold = StyleSnapshot::new();
        bold.insert(StyleProperty::FontWeight, "700");
        let mut italic = StyleSnapshot::new();
        italic.insert(StyleProperty::FontSize, "12px");
        let mut under = StyleSnapshot::new();
        under.insert(StyleProperty::TextDecoration, "underline");
        u.children_styles = vec![
            ChildStyle { ordinal: 0, tag: "b".to_string(), style: bold, children: vec![] },
            ChildStyle {
                ordinal: 1,
                tag: "i".to_string(),
                style: italic,
                children: vec![ChildStyle { ordinal: 0, tag: "u".to_string(), style: under, children: vec![] }],
            },
            ChildStyle { ordinal: 2, tag: "p".to_string(), style: StyleSnapshot::new(), children: vec![] },
        ];
        let html = decode(&[u]);
        assert!(html.contains("<b style=\"font-weight: 700;\">x</b>"));
        assert!(html.contains("<i style=\"color: red; font-size: 12px;\">y <u style=\"text-decoration: underline;\">z</u></i>"));
    }

    #[test]
    fn mismatched_child_keys_are_not_applied() {
        let mut u = unit(Some("div"), 50.0, 50.0, "<span>a</span>");
        let mut s = StyleSnapshot::new();
        s.insert(StyleProperty::Color, "rgb(1, 2, 3)");
        u.children_styles = vec![ChildStyle { ordinal: 0, tag: "em".to_string(), style: s, children: vec![] }];
        let html = decode(&[u]);
        assert!(html.contains("<span>a</span>"));
        assert!(!html.contains("rgb(1, 2, 3)"));
    }
}
