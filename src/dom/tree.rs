use crate::types::{ComputedStyle, ElementRect};
use serde::{Deserialize, Serialize};

/// Box given to elements whose size is not known, e.g. when a page was
/// parsed from static HTML without a layout engine.
pub const NOMINAL_BOX: ElementRect = ElementRect {
    x: 0.0,
    y: 0.0,
    width: 100.0,
    height: 20.0,
};

/// Index of a node inside its owning [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// DOM properties that do not map one-to-one onto attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeProperties {
    pub value: Option<String>,
    pub href: Option<String>,
    pub placeholder: Option<String>,
    pub input_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DomNode {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub text_content: String,
    pub inner_html: String,
    pub properties: NodeProperties,
    pub style: ComputedStyle,
    pub rect: ElementRect,
}

impl DomNode {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
            text_content: String::new(),
            inner_html: String::new(),
            properties: NodeProperties::default(),
            style: ComputedStyle::default(),
            rect: NOMINAL_BOX,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name, value.to_string())),
        }
        self
    }

    pub fn with_text_content(mut self, text: &str) -> Self {
        self.text_content = text.to_string();
        self
    }

    pub fn with_inner_html(mut self, html: &str) -> Self {
        self.inner_html = html.to_string();
        self
    }

    pub fn with_properties(mut self, properties: NodeProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_rect(mut self, rect: ElementRect) -> Self {
        self.rect = rect;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The `id` attribute, if present and non-empty.
    pub fn element_id(&self) -> Option<&str> {
        self.attribute("id").filter(|id| !id.is_empty())
    }
}

/// Arena-backed element tree for one page at one point in time.
///
/// Nodes hold parent and child links by [`NodeId`]. The tree is read-only to
/// everything downstream of its builders (HTML parsing, browser snapshots).
#[derive(Debug, Clone, Default)]
pub struct DomTree {
    url: String,
    title: String,
    nodes: Vec<DomNode>,
    root: Option<NodeId>,
    body: Option<NodeId>,
}

impl DomTree {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id.0)
    }

    /// The document element (`<html>`).
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn body(&self) -> Option<NodeId> {
        self.body
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Install the document element. Replaces any previous root.
    pub fn insert_root(&mut self, mut node: DomNode) -> NodeId {
        node.parent = None;
        let id = self.push(node);
        self.root = Some(id);
        id
    }

    /// Append `node` as the last child of `parent`.
    ///
    /// Panics if `parent` does not belong to this tree.
    pub fn append_child(&mut self, parent: NodeId, mut node: DomNode) -> NodeId {
        assert!(parent.0 < self.nodes.len(), "parent {:?} not in tree", parent);
        node.parent = Some(parent);
        let is_body = node.tag_name == "body";
        let id = self.push(node);
        self.nodes[parent.0].children.push(id);

        if is_body && self.body.is_none() && self.root == Some(parent) {
            self.body = Some(id);
        }
        id
    }

    /// Add a node that is not connected to the document.
    pub fn insert_detached(&mut self, mut node: DomNode) -> NodeId {
        node.parent = None;
        self.push(node)
    }

    fn push(&mut self, node: DomNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Whether the parent chain of `id` reaches the document element.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if Some(node_id) == self.root {
                return true;
            }
            current = self.parent(node_id);
        }
        false
    }

    /// All attached elements in document (pre-)order.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    pub fn elements_by_tag(&self, tag_name: &str) -> Vec<NodeId> {
        let tag_name = tag_name.to_ascii_lowercase();
        self.document_order()
            .into_iter()
            .filter(|id| {
                self.node(*id)
                    .map(|node| node.tag_name == tag_name)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// First attached element whose `id` attribute equals `element_id`.
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.document_order().into_iter().find(|id| {
            self.node(*id)
                .and_then(|node| node.element_id())
                .map(|value| value == element_id)
                .unwrap_or(false)
        })
    }
}
