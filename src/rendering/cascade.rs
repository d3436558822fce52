//! Style resolution for the static surface
//!
//! Tag defaults, embedded `<style>` rules and inline `style` attributes are
//! cascaded per element, inherited properties flow down from the parent, and
//! values are brought into the computed form a browser would report (colours
//! as `rgb()`, font sizes and `em` lengths in px).

use crate::dom::{DocumentTree, NodeId, ROOT};
use crate::style::{
    format_px, normalize_color, parse_declarations, split_top_level, split_tokens, Declaration,
    StyleProperty,
};
use log::debug;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Resolved values of one element, keyed by CSS property name.
///
/// Holds the [`StyleProperty`] set plus any other declared property (such as
/// `left`, `top` or `box-sizing`) that layout needs. Empty for text nodes.
pub type StyleMap = HashMap<String, String>;

const ROOT_FONT_PX: f64 = 16.0;

/// A parsed fragment with a resolved style map per node
#[derive(Debug, Clone)]
pub struct StyledTree {
    pub tree: DocumentTree,
    pub styles: Vec<StyleMap>,
}

struct Rule {
    selector: Selector,
    specificity: (u32, u32, u32),
    applies_to_root: bool,
    declarations: Vec<Declaration>,
}

/// Parse `markup` and resolve styles for every element.
pub fn resolve(markup: &str) -> StyledTree {
    let html = Html::parse_fragment(markup);
    let mut elements: Vec<(NodeId, ElementRef<'_>)> = Vec::new();
    let tree = DocumentTree::from_html_with(&html, |id, el| elements.push((id, el)));

    let rules = parse_stylesheet(&collect_css(&tree));
    let mut matched: Vec<Vec<usize>> = vec![Vec::new(); tree.len()];
    for (id, el) in &elements {
        for (order, rule) in rules.iter().enumerate() {
            let hit = if *id == ROOT {
                rule.applies_to_root
            } else {
                rule.selector.matches(el)
            };
            if hit {
                matched[*id].push(order);
            }
        }
    }

    let mut styles: Vec<StyleMap> = vec![StyleMap::new(); tree.len()];
    // Ids are in document order, so a parent is always resolved before its children.
    for id in 0..tree.len() {
        let Some(tag) = tree.tag(id) else {
            continue;
        };
        let mut order = matched[id].clone();
        order.sort_by_key(|i| (rules[*i].specificity, *i));

        let mut declared: Vec<(String, String)> = ua_defaults(tag);
        let inline = tree
            .attr(id, "style")
            .map(parse_declarations)
            .unwrap_or_default();
        for important in [false, true] {
            for i in &order {
                for d in rules[*i].declarations.iter().filter(|d| d.important == important) {
                    declared.push((d.name.clone(), d.value.clone()));
                }
            }
            for d in inline.iter().filter(|d| d.important == important) {
                declared.push((d.name.clone(), d.value.clone()));
            }
        }

        let parent = tree.parent(id).map(|p| &styles[p]);
        let computed = compute(parent, &declared);
        styles[id] = computed;
    }

    StyledTree { tree, styles }
}

fn collect_css(tree: &DocumentTree) -> String {
    let mut css = String::new();
    for id in 0..tree.len() {
        if tree.tag(id) == Some("style") {
            css.push_str(&tree.text_content(id));
            css.push('\n');
        }
    }
    css
}

/// Split a stylesheet into rules. At-rule blocks (`@media`, `@keyframes`) are skipped.
fn parse_stylesheet(css: &str) -> Vec<Rule> {
    let css = strip_comments(css);
    let mut rules = Vec::new();
    let mut rest = css.as_str();

    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let Some(close) = matching_brace(rest, open) else {
            break;
        };
        let body = &rest[open + 1..close];
        rest = &rest[close + 1..];

        if prelude.starts_with('@') || prelude.is_empty() {
            continue;
        }
        let declarations = parse_declarations(body);
        for part in split_top_level(prelude, ',') {
            let part = part.trim();
            match Selector::parse(part) {
                Ok(selector) => rules.push(Rule {
                    selector,
                    specificity: specificity(part),
                    applies_to_root: matches!(part, "body" | "html" | ":root" | "*"),
                    declarations: declarations.clone(),
                }),
                Err(_) => debug!("skipping unsupported selector {:?}", part),
            }
        }
    }
    rules
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in source[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// (ids, classes/attributes/pseudo-classes, types) for one compound selector list.
fn specificity(selector: &str) -> (u32, u32, u32) {
    let mut ids = 0;
    let mut classes = 0;
    let mut types = 0;
    let mut prev_boundary = true;
    for c in selector.chars() {
        match c {
            '#' => ids += 1,
            '.' | '[' => classes += 1,
            ':' => classes += 1,
            c if c.is_ascii_alphabetic() && prev_boundary => types += 1,
            _ => {}
        }
        prev_boundary = matches!(c, ' ' | '>' | '+' | '~');
    }
    (ids, classes, types)
}

/// User-agent defaults for the tags slide generators actually use.
fn ua_defaults(tag: &str) -> Vec<(String, String)> {
    let mut out: Vec<(&str, &str)> = Vec::new();
    match tag {
        "div" | "p" | "section" | "article" | "header" | "footer" | "main" | "nav" | "aside"
        | "blockquote" | "figure" | "figcaption" | "form" | "hr" | "pre" | "table" | "dl"
        | "dt" | "dd" | "address" | "details" | "summary" | "ul" | "ol" | "h1" | "h2" | "h3"
        | "h4" | "h5" | "h6" | "body" => out.push(("display", "block")),
        "li" => out.push(("display", "list-item")),
        "style" | "script" | "head" | "title" | "meta" | "link" | "template" | "noscript" => {
            out.push(("display", "none"))
        }
        "button" => out.push(("display", "inline-block")),
        _ => {}
    }
    match tag {
        "h1" => out.extend([("font-size", "2em"), ("margin", "0.67em 0")]),
        "h2" => out.extend([("font-size", "1.5em"), ("margin", "0.83em 0")]),
        "h3" => out.extend([("font-size", "1.17em"), ("margin", "1em 0")]),
        "h4" => out.extend([("margin", "1.33em 0")]),
        "h5" => out.extend([("font-size", "0.83em"), ("margin", "1.67em 0")]),
        "h6" => out.extend([("font-size", "0.67em"), ("margin", "2.33em 0")]),
        "p" | "blockquote" | "figure" | "dl" => out.push(("margin", "1em 0")),
        "ul" | "ol" => out.extend([("margin", "1em 0"), ("padding-left", "40px")]),
        "a" => out.extend([("color", "#0000ee"), ("text-decoration", "underline")]),
        "u" | "ins" => out.push(("text-decoration", "underline")),
        "s" | "del" => out.push(("text-decoration", "line-through")),
        _ => {}
    }
    if matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "b" | "strong" | "th") {
        out.push(("font-weight", "700"));
    }
    out.into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn compute(parent: Option<&StyleMap>, declared: &[(String, String)]) -> StyleMap {
    let mut map = StyleMap::new();
    for p in StyleProperty::ALL {
        let inherited = if p.is_inherited() {
            parent.and_then(|s| s.get(p.css_name())).cloned()
        } else {
            None
        };
        map.insert(
            p.css_name().to_string(),
            inherited.unwrap_or_else(|| p.initial_value().to_string()),
        );
    }

    for (name, value) in declared {
        for (n, v) in expand(name, value) {
            let v = match v.to_ascii_lowercase().as_str() {
                "inherit" => parent
                    .and_then(|s| s.get(&n))
                    .cloned()
                    .unwrap_or_else(|| initial_for(&n)),
                "initial" | "unset" | "revert" => initial_for(&n),
                _ => v,
            };
            map.insert(n, v);
        }
    }

    resolve_values(&mut map, parent);
    map
}

fn initial_for(name: &str) -> String {
    StyleProperty::from_css_name(name)
        .map(|p| p.initial_value().to_string())
        .unwrap_or_default()
}

/// Expand the shorthands whose longhands matter for extraction or layout.
fn expand(name: &str, value: &str) -> Vec<(String, String)> {
    let tokens = split_tokens(value);
    let mut out = vec![(name.to_string(), value.to_string())];
    match name {
        "background" => {
            let color = tokens
                .iter()
                .rev()
                .find(|t| !t.contains("gradient(") && normalize_color(t).is_some())
                .map(|t| t.to_string())
                .unwrap_or_else(|| "rgba(0, 0, 0, 0)".to_string());
            out.push(("background-color".to_string(), color));
        }
        "margin" | "padding" => {
            if let Some([t, r, b, l]) = box_sides(&tokens) {
                for (side, v) in [("top", t), ("right", r), ("bottom", b), ("left", l)] {
                    out.push((format!("{}-{}", name, side), v.to_string()));
                }
            }
        }
        "border" => {
            let mut width = "medium".to_string();
            let mut style = "none".to_string();
            let mut color = "currentcolor".to_string();
            for t in &tokens {
                if is_border_style(t) {
                    style = t.to_string();
                } else if normalize_color(t).is_some() || t.eq_ignore_ascii_case("currentcolor") {
                    color = t.to_string();
                } else {
                    width = t.to_string();
                }
            }
            out.push(("border-width".to_string(), width));
            out.push(("border-style".to_string(), style));
            out.push(("border-color".to_string(), color));
        }
        "overflow" => {
            let x = tokens.first().copied().unwrap_or("visible");
            let y = tokens.get(1).copied().unwrap_or(x);
            out.push(("overflow-x".to_string(), x.to_string()));
            out.push(("overflow-y".to_string(), y.to_string()));
        }
        _ => {}
    }
    out
}

fn box_sides<'a>(tokens: &[&'a str]) -> Option<[&'a str; 4]> {
    match *tokens {
        [a] => Some([a, a, a, a]),
        [a, b] => Some([a, b, a, b]),
        [a, b, c] => Some([a, b, c, b]),
        [a, b, c, d] => Some([a, b, c, d]),
        _ => None,
    }
}

fn is_border_style(token: &str) -> bool {
    matches!(
        token,
        "none" | "hidden" | "dotted" | "dashed" | "solid" | "double" | "groove" | "ridge" | "inset"
            | "outset"
    )
}

/// Bring declared values into computed form.
fn resolve_values(map: &mut StyleMap, parent: Option<&StyleMap>) {
    let parent_font = parent
        .and_then(|s| s.get("font-size"))
        .and_then(|v| px_value(v))
        .unwrap_or(ROOT_FONT_PX);
    let font = map
        .get("font-size")
        .map(|v| font_size_px(v, parent_font))
        .unwrap_or(parent_font);
    map.insert("font-size".to_string(), format_px(font));

    if let Some(w) = map.get("font-weight").cloned() {
        let resolved = match w.as_str() {
            "normal" => "400".to_string(),
            "bold" => "700".to_string(),
            _ => w,
        };
        map.insert("font-weight".to_string(), resolved);
    }

    for name in [
        "margin-top", "margin-right", "margin-bottom", "margin-left", "padding-top",
        "padding-right", "padding-bottom", "padding-left", "gap", "width", "height", "min-width",
        "min-height", "max-width", "max-height", "border-width", "border-radius",
        "letter-spacing", "word-spacing", "text-indent", "left", "top", "right", "bottom",
    ] {
        if let Some(v) = map.get(name) {
            let resolved = resolve_lengths(v, font);
            map.insert(name.to_string(), resolved);
        }
    }

    if let Some(lh) = map.get("line-height").cloned() {
        let resolved = match lh.parse::<f64>() {
            Ok(n) => format_px(n * font),
            Err(_) if lh.ends_with('%') => lh
                .trim_end_matches('%')
                .parse::<f64>()
                .map(|n| format_px(n / 100.0 * font))
                .unwrap_or(lh),
            Err(_) => resolve_lengths(&lh, font),
        };
        map.insert("line-height".to_string(), resolved);
    }

    // Shorthands are reported from their resolved longhands.
    for name in ["margin", "padding"] {
        let sides: Vec<String> = ["top", "right", "bottom", "left"]
            .iter()
            .map(|s| map.get(&format!("{}-{}", name, s)).cloned().unwrap_or_default())
            .collect();
        map.insert(name.to_string(), collapse_sides(&sides));
    }

    let color = map
        .get("color")
        .and_then(|c| normalize_color(c))
        .or_else(|| parent.and_then(|s| s.get("color")).cloned())
        .unwrap_or_else(|| StyleProperty::Color.initial_value().to_string());
    map.insert("color".to_string(), color.clone());

    for name in ["background-color", "border-color"] {
        if let Some(v) = map.get(name).cloned() {
            let resolved = if v.eq_ignore_ascii_case("currentcolor") {
                color.clone()
            } else {
                normalize_color(&v).unwrap_or(v)
            };
            map.insert(name.to_string(), resolved);
        }
    }

    let border_style = map.get("border-style").cloned().unwrap_or_default();
    if border_style == "none" || border_style == "hidden" {
        map.insert("border-width".to_string(), "0px".to_string());
    } else if let Some(w) = map.get("border-width").cloned() {
        let w = match w.as_str() {
            "thin" => "1px".to_string(),
            "medium" => "3px".to_string(),
            "thick" => "5px".to_string(),
            _ => w,
        };
        map.insert("border-width".to_string(), w);
    }
    let border = format!(
        "{} {} {}",
        map.get("border-width").cloned().unwrap_or_default(),
        border_style,
        map.get("border-color").cloned().unwrap_or_default()
    );
    map.insert("border".to_string(), border);
}

fn collapse_sides(sides: &[String]) -> String {
    match sides {
        [t, r, b, l] if t == r && r == b && b == l => t.clone(),
        [t, r, b, l] if t == b && r == l => format!("{} {}", t, r),
        [t, r, b, l] if r == l => format!("{} {} {}", t, r, b),
        _ => sides.join(" "),
    }
}

fn font_size_px(value: &str, parent_px: f64) -> f64 {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "xx-small" => return 9.0,
        "x-small" => return 10.0,
        "small" => return 13.0,
        "medium" => return 16.0,
        "large" => return 18.0,
        "x-large" => return 24.0,
        "xx-large" => return 32.0,
        "smaller" => return parent_px / 1.2,
        "larger" => return parent_px * 1.2,
        _ => {}
    }
    if let Some(n) = v.strip_suffix('%').and_then(|n| n.trim().parse::<f64>().ok()) {
        return n / 100.0 * parent_px;
    }
    length_px(&v, parent_px).unwrap_or(parent_px)
}

/// Absolute length of a single token; `em` is relative to `font_px`.
pub(crate) fn length_px(token: &str, font_px: f64) -> Option<f64> {
    let t = token.trim();
    if t == "0" {
        return Some(0.0);
    }
    let units: [(&str, f64); 6] = [
        ("rem", ROOT_FONT_PX),
        ("em", font_px),
        ("px", 1.0),
        ("pt", 4.0 / 3.0),
        ("pc", 16.0),
        ("in", 96.0),
    ];
    for (unit, factor) in units {
        if let Some(n) = t.strip_suffix(unit) {
            return n.trim().parse::<f64>().ok().map(|n| n * factor);
        }
    }
    None
}

/// Plain `px` value (or bare `0`).
pub(crate) fn px_value(value: &str) -> Option<f64> {
    let t = value.trim();
    if t == "0" {
        return Some(0.0);
    }
    t.strip_suffix("px")?.trim().parse().ok()
}

fn resolve_lengths(value: &str, font_px: f64) -> String {
    split_tokens(value)
        .into_iter()
        .map(|t| {
            if t.ends_with("em") {
                length_px(t, font_px)
                    .map(format_px)
                    .unwrap_or_else(|| t.to_string())
            } else if t == "0" {
                "0px".to_string()
            } else {
                t.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
