//! Box layout for the static surface
//!
//! A deliberately small flow engine: block stacking without margin collapsing,
//! inline runs wrapped word by word with a fixed glyph advance, single-line
//! flex rows, and absolutely positioned boxes resolved against their
//! containing block. It produces the border-box of every rendered element.

use super::cascade::{px_value, StyleMap};
use crate::dom::{is_non_rendered_element, DocumentTree, NodeData, NodeId, ROOT};
use crate::surface::Rect;
use crate::Viewport;
use log::warn;

/// Glyph advance as a fraction of the font size
const GLYPH_ADVANCE: f64 = 0.5;
/// `line-height: normal` as a multiple of the font size
const NORMAL_LINE_HEIGHT: f64 = 1.2;
const REPLACED_WIDTH: f64 = 300.0;
const REPLACED_HEIGHT: f64 = 150.0;
/// Boxes nested deeper than this are left without geometry
pub const MAX_LAYOUT_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxModel {
    pub margin: Edges,
    pub border: Edges,
    pub padding: Edges,
}

impl BoxModel {
    /// Resolve the box edges of one element; percentages refer to `containing_width`.
    pub fn from_style(style: &StyleMap, containing_width: f64) -> Self {
        let side = |prefix: &str, s: &str| {
            style
                .get(&format!("{}-{}", prefix, s))
                .and_then(|v| length(v, containing_width))
                .unwrap_or(0.0)
        };
        let edges = |prefix: &str| Edges {
            top: side(prefix, "top"),
            right: side(prefix, "right"),
            bottom: side(prefix, "bottom"),
            left: side(prefix, "left"),
        };
        let border_width = style
            .get("border-width")
            .and_then(|v| px_value(v))
            .unwrap_or(0.0);
        Self {
            margin: edges("margin"),
            border: Edges {
                top: border_width,
                right: border_width,
                bottom: border_width,
                left: border_width,
            },
            padding: edges("padding"),
        }
    }

    fn inset_horizontal(&self) -> f64 {
        self.border.horizontal() + self.padding.horizontal()
    }

    fn inset_vertical(&self) -> f64 {
        self.border.vertical() + self.padding.vertical()
    }
}

/// `px` or a percentage of `base`; `auto` and anything unresolvable give `None`.
fn length(value: &str, base: f64) -> Option<f64> {
    let v = value.trim();
    if let Some(pct) = v.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|p| p / 100.0 * base);
    }
    px_value(v)
}

/// Compute the border-box of every node. Text nodes, comments and elements
/// that generate no box map to `None`.
pub fn layout_document(tree: &DocumentTree, styles: &[StyleMap], viewport: Viewport) -> Vec<Option<Rect>> {
    let mut ctx = LayoutContext {
        tree,
        styles,
        viewport,
        rects: vec![None; tree.len()],
        out_of_flow: Vec::new(),
        depth: 0,
        truncated: false,
    };
    let vw = viewport.width as f64;
    let vh = viewport.height as f64;

    let content_height = ctx.flow(ROOT, 0.0, 0.0, vw);
    ctx.rects[ROOT] = Some(Rect::new(0.0, 0.0, vw, content_height.max(vh)));

    // Positioned boxes may contain further positioned boxes; the list grows while we walk it.
    let mut i = 0;
    while i < ctx.out_of_flow.len() {
        let id = ctx.out_of_flow[i];
        ctx.place_out_of_flow(id);
        i += 1;
    }
    if ctx.truncated {
        warn!(
            "fragment nests deeper than {} boxes; deeper content was not laid out",
            MAX_LAYOUT_DEPTH
        );
    }
    ctx.rects
}

struct LayoutContext<'a> {
    tree: &'a DocumentTree,
    styles: &'a [StyleMap],
    viewport: Viewport,
    rects: Vec<Option<Rect>>,
    out_of_flow: Vec<NodeId>,
    /// Boxes currently open on the layout stack
    depth: usize,
    truncated: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct AtomicWidth {
    border_width: f64,
    outer_width: f64,
}

struct LineState {
    x0: f64,
    width: f64,
    cursor_x: f64,
    line_y: f64,
    line_height: f64,
}

impl LineState {
    fn new(x0: f64, y: f64, width: f64) -> Self {
        Self {
            x0,
            width,
            cursor_x: x0,
            line_y: y,
            line_height: 0.0,
        }
    }

    /// Reserve `w` x `h` on the current line, wrapping first when it does not fit.
    fn place(&mut self, w: f64, h: f64) -> (f64, f64) {
        if self.cursor_x > self.x0 && self.cursor_x + w > self.x0 + self.width {
            self.break_line();
        }
        let at = (self.cursor_x, self.line_y);
        self.cursor_x += w;
        self.line_height = self.line_height.max(h);
        at
    }

    fn break_line(&mut self) {
        self.line_y += self.line_height;
        self.cursor_x = self.x0;
        self.line_height = 0.0;
    }

    fn bottom(&self) -> f64 {
        self.line_y + self.line_height
    }
}

impl<'a> LayoutContext<'a> {
    fn style(&self, id: NodeId) -> Option<&'a StyleMap> {
        self.styles.get(id)
    }

    fn prop(&self, id: NodeId, name: &str) -> &'a str {
        self.style(id)
            .and_then(|s| s.get(name))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn display(&self, id: NodeId) -> &'a str {
        match self.tree.tag(id) {
            Some(tag) if is_non_rendered_element(tag) => "none",
            Some(_) => self.prop(id, "display"),
            None => "inline",
        }
    }

    fn is_out_of_flow(&self, id: NodeId) -> bool {
        matches!(self.prop(id, "position"), "absolute" | "fixed")
    }

    fn is_block_level(&self, id: NodeId) -> bool {
        matches!(
            self.display(id),
            "block" | "list-item" | "flex" | "grid" | "table" | "flow-root"
        )
    }

    fn is_atomic_inline(&self, id: NodeId) -> bool {
        matches!(
            self.display(id),
            "inline-block" | "inline-flex" | "inline-grid" | "inline-table"
        ) || self
            .tree
            .tag(id)
            .map(|t| matches!(t, "img" | "video" | "canvas" | "svg" | "iframe" | "input" | "textarea" | "select"))
            .unwrap_or(false)
    }

    fn font_size(&self, id: NodeId) -> f64 {
        px_value(self.prop(id, "font-size")).unwrap_or(16.0)
    }

    fn line_height(&self, id: NodeId) -> f64 {
        px_value(self.prop(id, "line-height"))
            .unwrap_or_else(|| self.font_size(id) * NORMAL_LINE_HEIGHT)
    }

    /// Lay out a block-level box whose margin box starts at (`x`, `y`).
    /// Returns the outer (margin-box) height.
    fn layout_block(&mut self, id: NodeId, x: f64, y: f64, containing_width: f64, width_override: Option<f64>) -> f64 {
        let Some(style) = self.style(id) else {
            return 0.0;
        };
        if !self.enter() {
            return 0.0;
        }
        let bm = BoxModel::from_style(style, containing_width);
        let border_box = matches!(style.get("box-sizing").map(String::as_str), Some("border-box"));

        let specified = style.get("width").and_then(|w| length(w, containing_width));
        let mut width = match (width_override, specified) {
            (Some(w), _) => w,
            (None, Some(w)) if border_box => w,
            (None, Some(w)) => w + bm.inset_horizontal(),
            (None, None) => (containing_width - bm.margin.horizontal()).max(0.0),
        };
        if let Some(max) = style.get("max-width").and_then(|w| length(w, containing_width)) {
            let max = if border_box { max } else { max + bm.inset_horizontal() };
            width = width.min(max);
        }
        if let Some(min) = style.get("min-width").and_then(|w| length(w, containing_width)) {
            let min = if border_box { min } else { min + bm.inset_horizontal() };
            width = width.max(min);
        }

        let left = x + bm.margin.left;
        let top = y + bm.margin.top;
        let content_x = left + bm.border.left + bm.padding.left;
        let content_y = top + bm.border.top + bm.padding.top;
        let content_w = (width - bm.inset_horizontal()).max(0.0);

        let content_h = if self.is_replaced(id) {
            self.replaced_size(id, containing_width).1 - bm.inset_vertical()
        } else if matches!(self.display(id), "flex" | "inline-flex") {
            self.flex(id, content_x, content_y, content_w)
        } else {
            self.flow(id, content_x, content_y, content_w)
        };
        self.depth -= 1;

        let mut height = match style.get("height").and_then(|h| px_value(h)) {
            Some(h) if border_box => h,
            Some(h) => h + bm.inset_vertical(),
            None => content_h.max(0.0) + bm.inset_vertical(),
        };
        if let Some(min) = style.get("min-height").and_then(|h| px_value(h)) {
            let min = if border_box { min } else { min + bm.inset_vertical() };
            height = height.max(min);
        }
        if let Some(max) = style.get("max-height").and_then(|h| px_value(h)) {
            let max = if border_box { max } else { max + bm.inset_vertical() };
            height = height.min(max);
        }

        self.rects[id] = Some(Rect::new(left, top, width, height));
        self.apply_relative_offset(id, containing_width);
        bm.margin.top + height + bm.margin.bottom
    }

    /// Open one more nested box; false once the depth bound is reached.
    fn enter(&mut self) -> bool {
        if self.depth >= MAX_LAYOUT_DEPTH {
            self.truncated = true;
            return false;
        }
        self.depth += 1;
        true
    }

    /// Normal flow of `id`'s children inside its content box. Returns the content height.
    fn flow(&mut self, id: NodeId, x: f64, y: f64, width: f64) -> f64 {
        let children = self.tree.children(id).to_vec();
        let mut cursor_y = y;
        let mut line: Option<LineState> = None;

        for child in children {
            if self.tree.is_element(child) {
                if self.display(child) == "none" {
                    continue;
                }
                if self.is_out_of_flow(child) {
                    self.out_of_flow.push(child);
                    continue;
                }
                if self.is_block_level(child) {
                    if let Some(l) = line.take() {
                        cursor_y = l.bottom();
                    }
                    cursor_y += self.layout_block(child, x, cursor_y, width, None);
                    continue;
                }
            } else if !self.tree.is_text(child) {
                continue;
            }
            let mut state = line.take().unwrap_or_else(|| LineState::new(x, cursor_y, width));
            self.inline(child, id, &mut state);
            line = Some(state);
        }

        if let Some(l) = line {
            cursor_y = l.bottom();
        }
        cursor_y - y
    }

    /// Place one inline-level node (text, inline element, atomic inline) on the current lines.
    fn inline(&mut self, id: NodeId, parent: NodeId, line: &mut LineState) {
        match self.tree.node(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => {
                let advance = self.font_size(parent) * GLYPH_ADVANCE;
                let lh = self.line_height(parent);
                for word in text.split_whitespace() {
                    let w = word.chars().count() as f64 * advance;
                    line.place(w, lh);
                    line.cursor_x += advance;
                }
            }
            Some(NodeData::Element { tag, .. }) => {
                if self.display(id) == "none" {
                    return;
                }
                if self.is_out_of_flow(id) {
                    self.out_of_flow.push(id);
                    return;
                }
                if tag == "br" {
                    let lh = self.line_height(parent);
                    line.line_height = line.line_height.max(lh);
                    line.break_line();
                    return;
                }
                if self.is_atomic_inline(id) {
                    // Wrapping depends only on the width, so one layout pass suffices.
                    let size = self.atomic_width(id, line.width);
                    let (ax, ay) = line.place(size.outer_width, 0.0);
                    let outer_h = self.layout_block(id, ax, ay, line.width, Some(size.border_width));
                    line.line_height = line.line_height.max(outer_h);
                    return;
                }
                if !self.enter() {
                    return;
                }

                let start_x = line.cursor_x;
                let start_y = line.line_y;
                let children = self.tree.children(id).to_vec();
                for child in children {
                    self.inline(child, id, line);
                }
                self.depth -= 1;
                let lh = self.line_height(id);
                line.line_height = line.line_height.max(lh);
                let rect = if line.line_y == start_y {
                    Rect::new(start_x, start_y, (line.cursor_x - start_x).max(0.0), line.line_height)
                } else {
                    Rect::new(line.x0, start_y, line.width, line.bottom() - start_y)
                };
                self.rects[id] = Some(rect);
            }
            _ => {}
        }
    }

    fn is_replaced(&self, id: NodeId) -> bool {
        self.tree
            .tag(id)
            .map(|t| matches!(t, "img" | "video" | "canvas" | "svg" | "iframe"))
            .unwrap_or(false)
    }

    /// Border-box size of a replaced element.
    fn replaced_size(&self, id: NodeId, containing_width: f64) -> (f64, f64) {
        let dim = |css: &str, attr: &str, fallback: f64| {
            self.style(id)
                .and_then(|s| s.get(css))
                .and_then(|v| length(v, containing_width))
                .or_else(|| self.tree.attr(id, attr).and_then(|v| v.trim_end_matches("px").parse().ok()))
                .unwrap_or(fallback)
        };
        (dim("width", "width", REPLACED_WIDTH), dim("height", "height", REPLACED_HEIGHT))
    }

    /// Shrink-to-fit width of an inline-block, replaced or absolutely positioned element.
    fn atomic_width(&self, id: NodeId, available: f64) -> AtomicWidth {
        let Some(style) = self.style(id) else {
            return AtomicWidth::default();
        };
        let bm = BoxModel::from_style(style, available);
        let border_box = matches!(style.get("box-sizing").map(String::as_str), Some("border-box"));
        let width = if self.is_replaced(id) {
            self.replaced_size(id, available).0
        } else {
            match style.get("width").and_then(|w| length(w, available)) {
                Some(w) if border_box => w,
                Some(w) => w + bm.inset_horizontal(),
                None => {
                    let text = self.tree.text_content(id);
                    let words: Vec<&str> = text.split_whitespace().collect();
                    let chars = words.iter().map(|w| w.chars().count()).sum::<usize>() + words.len().saturating_sub(1);
                    let intrinsic = chars as f64 * self.font_size(id) * GLYPH_ADVANCE + bm.inset_horizontal();
                    intrinsic.min((available - bm.margin.horizontal()).max(0.0))
                }
            }
        };
        AtomicWidth {
            border_width: width,
            outer_width: width + bm.margin.horizontal(),
        }
    }

    /// Single-line flex container. Returns the content height.
    fn flex(&mut self, id: NodeId, x: f64, y: f64, width: f64) -> f64 {
        let gap = px_value(self.prop(id, "gap")).unwrap_or(0.0);
        let items: Vec<NodeId> = self
            .tree
            .element_children(id)
            .filter(|c| self.display(*c) != "none")
            .collect();
        let (positioned, items): (Vec<NodeId>, Vec<NodeId>) =
            items.into_iter().partition(|c| self.is_out_of_flow(*c));
        self.out_of_flow.extend(positioned);

        if self.prop(id, "flex-direction").starts_with("column") {
            let mut cursor_y = y;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    cursor_y += gap;
                }
                cursor_y += self.layout_block(*item, x, cursor_y, width, None);
            }
            return cursor_y - y;
        }

        let fixed: Vec<Option<f64>> = items
            .iter()
            .map(|c| {
                let style = self.style(*c)?;
                let w = length(style.get("width")?, width)?;
                let border_box = style.get("box-sizing").map(String::as_str) == Some("border-box");
                let bm = BoxModel::from_style(style, width);
                let border_w = if border_box { w } else { w + bm.inset_horizontal() };
                Some(border_w + bm.margin.horizontal())
            })
            .collect();
        let gaps = gap * items.len().saturating_sub(1) as f64;
        let taken: f64 = fixed.iter().flatten().sum();
        let flexible = fixed.iter().filter(|f| f.is_none()).count();
        let share = if flexible > 0 {
            ((width - gaps - taken) / flexible as f64).max(0.0)
        } else {
            0.0
        };

        let mut cursor_x = x;
        let mut height: f64 = 0.0;
        for (item, fixed) in items.iter().zip(fixed) {
            let outer_w = fixed.unwrap_or(share);
            let style = self.style(*item);
            let margins = style
                .map(|s| BoxModel::from_style(s, width).margin.horizontal())
                .unwrap_or(0.0);
            let h = self.layout_block(*item, cursor_x, y, outer_w, Some((outer_w - margins).max(0.0)));
            height = height.max(h);
            cursor_x += outer_w + gap;
        }
        height
    }

    fn place_out_of_flow(&mut self, id: NodeId) {
        let vw = self.viewport.width as f64;
        let vh = self.viewport.height as f64;
        let cb = if self.prop(id, "position") == "fixed" {
            Rect::new(0.0, 0.0, vw, vh)
        } else {
            self.containing_block(id)
        };

        let Some(style) = self.style(id) else {
            return;
        };
        let bm = BoxModel::from_style(style, cb.width);
        let offset = |name: &str, base: f64| style.get(name).and_then(|v| length(v, base));
        let explicit_width = style.get("width").map(|w| w != "auto").unwrap_or(false);
        let measured_w = match (offset("left", cb.width), offset("right", cb.width)) {
            (Some(l), Some(r)) if !explicit_width && !self.is_replaced(id) => {
                (cb.width - l - r - bm.margin.horizontal()).max(0.0)
            }
            _ => self.atomic_width(id, cb.width).border_width,
        };

        let x = match (offset("left", cb.width), offset("right", cb.width)) {
            (Some(l), _) => cb.x + l,
            (None, Some(r)) => cb.x + cb.width - r - measured_w - bm.margin.horizontal(),
            (None, None) => cb.x,
        };
        let top = offset("top", cb.height);
        let bottom = offset("bottom", cb.height);
        let y = top.map(|t| cb.y + t).unwrap_or(cb.y);
        let outer_h = self.layout_block(id, x, y, cb.width, Some(measured_w));
        if let (None, Some(b)) = (top, bottom) {
            let shift = cb.y + cb.height - b - outer_h - y;
            self.shift_subtree(id, 0.0, shift);
        }
    }

    /// Padding box of the nearest positioned ancestor, or the initial containing block.
    fn containing_block(&self, id: NodeId) -> Rect {
        let mut current = self.tree.parent(id);
        while let Some(p) = current {
            if p == ROOT {
                break;
            }
            if self.prop(p, "position") != "static" && !self.prop(p, "position").is_empty() {
                if let (Some(rect), Some(style)) = (self.rects[p], self.style(p)) {
                    let bm = BoxModel::from_style(style, rect.width);
                    return Rect::new(
                        rect.x + bm.border.left,
                        rect.y + bm.border.top,
                        rect.width - bm.border.horizontal(),
                        rect.height - bm.border.vertical(),
                    );
                }
            }
            current = self.tree.parent(p);
        }
        Rect::new(0.0, 0.0, self.viewport.width as f64, self.viewport.height as f64)
    }

    fn apply_relative_offset(&mut self, id: NodeId, containing_width: f64) {
        if self.prop(id, "position") != "relative" {
            return;
        }
        let dx = length(self.prop(id, "left"), containing_width).unwrap_or(0.0);
        let dy = px_value(self.prop(id, "top")).unwrap_or(0.0);
        if dx != 0.0 || dy != 0.0 {
            self.shift_subtree(id, dx, dy);
        }
    }

    fn shift_subtree(&mut self, id: NodeId, dx: f64, dy: f64) {
        // Pre-order ids: a subtree is a contiguous run starting at its root.
        let mut end = id + 1;
        while end < self.tree.len() && self.tree.is_ancestor(id, end) {
            end += 1;
        }
        for rect in self.rects[id..end].iter_mut().flatten() {
            rect.x += dx;
            rect.y += dy;
        }
    }
}
