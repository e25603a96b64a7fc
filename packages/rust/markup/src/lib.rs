//! Mutable HTML document model.
//!
//! A [`Document`] owns a parsed `scraper::Html` and edits its `ego_tree` in
//! place through [`NodeId`] handles: find elements by tag name, read and write
//! attributes, detach nodes, prepend a child, replace an element's text. Output
//! goes through html5ever's serializer (see [`Document::to_html`] and
//! [`Document::to_pretty_html`]), so namespaced attributes such as `xlink:href`
//! keep their prefix.
//!
//! Detached nodes stay in the tree as orphans, so handles never dangle; they
//! simply stop showing up in queries and serialization.

mod serialize;

use html5ever::driver::ParseOpts;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{LocalName, QualName, namespace_url, ns};
use scraper::node::{Element, Text};
use scraper::{Html, HtmlTreeSink, Node, StrTendril};
use tracing::debug;

/// Opaque handle to a node inside a [`Document`].
pub use ego_tree::NodeId;

/// An HTML document that can be queried, edited and serialized.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse a full HTML document.
    ///
    /// Parsing never fails: html5ever recovers from malformed input the same way
    /// browsers do, synthesizing `<html>`, `<head>` and `<body>` where missing.
    /// Scripting is treated as disabled, so `<noscript>` content is parsed as
    /// markup and its images are visible to queries.
    pub fn parse(source: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let html = html5ever::parse_document(HtmlTreeSink::new(Html::new_document()), opts)
            .one(source);
        if !html.errors.is_empty() {
            debug!(errors = html.errors.len(), "markup parsed with recoverable errors");
        }
        Self { html }
    }

    /// Children of a node in document order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default()
    }

    /// Tag name if the node is an element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All attached elements with the given tag name, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .map(|node| node.id())
            .filter(|&id| {
                self.tag_name(id)
                    .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    /// The `<head>` element, if the document has one.
    pub fn head(&self) -> Option<NodeId> {
        self.elements_by_tag("head").into_iter().next()
    }

    /// Value of an un-namespaced attribute on an element.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// The sole text child of a node, mirroring how a `<style>` or `<title>`
    /// element's content is read. Returns `None` when the node has no children,
    /// several children, or a non-text child.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        let children = self.children(id);
        let [only] = children.as_slice() else {
            return None;
        };
        let text = self.html.tree.get(*only)?.value().as_text()?;
        Some(&text.text[..])
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        self.html.tree.get(id)?.value().as_element()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a detached HTML element with no attributes.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(name.to_ascii_lowercase()));
        self.html
            .tree
            .orphan(Node::Element(Element::new(name, Vec::new())))
            .id()
    }

    /// Set (or add) an un-namespaced attribute. Existing attributes keep their
    /// position. No-op for non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return;
        };
        if let Node::Element(element) = node.value() {
            let name = QualName::new(None, ns!(), LocalName::from(name));
            element.attrs.insert(name, StrTendril::from_slice(value));
        }
    }

    /// Detach a node (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    /// Insert `child` as the first child of `parent`, detaching it from any
    /// previous position first.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.html.tree.get(child).is_none() {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(parent) {
            node.prepend_id(child);
        }
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        for child in self.children(id) {
            self.detach(child);
        }
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.append(Node::Text(Text {
                text: StrTendril::from_slice(text),
            }));
        }
    }
}
