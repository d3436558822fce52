//! Arena-backed document tree shared by render surfaces and the reconstructor.
//!
//! Fragments are parsed with `scraper` and copied into an owned tree so the
//! result is `Send + Sync` and can be held across await points. Node ids are
//! assigned in document (pre-)order, so a parent always has a lower id than
//! its descendants and the id doubles as a stable per-render identity.

use scraper::{ElementRef, Html, Node};

/// Index of a node inside a [`DocumentTree`]
pub type NodeId = usize;

/// The synthetic container every fragment is parsed into
pub const ROOT: NodeId = 0;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements that never produce a box of their own.
const NON_RENDERED: &[&str] = &["style", "script", "meta", "link", "title", "template", "head"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// `<style>` and `<script>`: skipped by every traversal that looks for visible content.
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "style" | "script")
}

pub fn is_non_rendered_element(tag: &str) -> bool {
    NON_RENDERED.contains(&tag)
}

/// Text with newlines removed and surrounding whitespace trimmed.
pub fn normalize_text(text: &str) -> String {
    text.replace(&['\r', '\n'][..], "").trim().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

/// Owned element/text tree of one parsed fragment
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTree {
    nodes: Vec<DomNode>,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self {
            nodes: vec![DomNode {
                parent: None,
                children: Vec::new(),
                data: NodeData::Element {
                    tag: "body".to_string(),
                    attrs: Vec::new(),
                },
            }],
        }
    }
}

impl DocumentTree {
    /// Parse a markup fragment in a body context.
    pub fn parse_fragment(markup: &str) -> Self {
        let html = Html::parse_fragment(markup);
        Self::from_html_with(&html, |_, _| {})
    }

    /// Copy a parsed `scraper` document into an owned tree.
    ///
    /// `visit` is called once per element with its new id and the source
    /// element, which lets callers run selector matching while the `Html`
    /// is still alive. The fragment container itself is visited as [`ROOT`].
    pub fn from_html_with<'a, F>(html: &'a Html, mut visit: F) -> Self
    where
        F: FnMut(NodeId, ElementRef<'a>),
    {
        let mut tree = Self::default();
        let root = html.root_element();
        visit(ROOT, root);

        // Depth-first traversal preserving document order.
        let mut stack = Vec::new();
        let children: Vec<_> = root.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child, ROOT));
        }

        while let Some((node, parent)) = stack.pop() {
            let data = match node.value() {
                Node::Element(el) => {
                    let mut attrs = el
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<Vec<_>>();
                    attrs.sort();
                    NodeData::Element {
                        tag: el.name().to_ascii_lowercase(),
                        attrs,
                    }
                }
                Node::Text(text) => {
                    let s: &str = text;
                    NodeData::Text(s.to_string())
                }
                Node::Comment(comment) => {
                    let s: &str = comment;
                    NodeData::Comment(s.to_string())
                }
                _ => continue,
            };

            let id = tree.push(parent, data);
            if let Some(el) = ElementRef::wrap(node) {
                visit(id, el);
            }

            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                stack.push((child, id));
            }
        }

        tree
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DomNode {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id)
    }

    /// Lowercase tag name, `None` for text and comment nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id).map(|n| &n.data), Some(NodeData::Text(_)))
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) an attribute on an element. No-op for other nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(DomNode {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(id)
        {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    /// Element children that can carry style: everything except `<style>`/`<script>`.
    pub fn styleable_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.element_children(id)
            .filter(move |c| !self.tag(*c).map(is_raw_text_element).unwrap_or(false))
    }

    /// First top-level element that produces a box.
    pub fn first_content_element(&self) -> Option<NodeId> {
        self.element_children(ROOT)
            .find(|c| !self.tag(*c).map(is_non_rendered_element).unwrap_or(true))
    }

    /// True when `ancestor` is a proper ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// True when any descendant is a `<style>` or `<script>` element.
    pub fn has_raw_text_descendant(&self, id: NodeId) -> bool {
        self.children(id).iter().any(|c| {
            self.tag(*c).map(is_raw_text_element).unwrap_or(false) || self.has_raw_text_descendant(*c)
        })
    }

    /// Concatenated text of all descendant text nodes (DOM `textContent` semantics).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element { .. }) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            _ => {}
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Element { tag, attrs } => {
                write_start_tag(out, tag, attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                if is_void_element(tag) {
                    return;
                }
                for child in &node.children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeData::Text(text) => {
                let raw = node
                    .parent
                    .and_then(|p| self.tag(p))
                    .map(is_raw_text_element)
                    .unwrap_or(false);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeData::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
        }
    }
}

pub(crate) fn write_start_tag<'a, I>(out: &mut String, tag: &str, attrs: I)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}
