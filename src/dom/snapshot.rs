use crate::dom::tree::{DomNode, DomTree, NodeId, NodeProperties};
use crate::errors::{InspectorError, Result};
use crate::types::{ComputedStyle, ElementRect};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Serialized page captured in a live tab by the snapshot script.
///
/// Nodes are listed in document order; `parent` indexes an earlier entry of
/// the same list, `None` for the document element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ready_state: String,
    pub nodes: Vec<SnapshotNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    pub tag: String,
    pub parent: Option<usize>,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub inner_html: String,
    pub value: Option<String>,
    pub href: Option<String>,
    pub placeholder: Option<String>,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

fn default_display() -> String {
    "block".to_string()
}

fn default_visibility() -> String {
    "visible".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

impl SnapshotNode {
    fn into_dom_node(self) -> DomNode {
        let mut node = DomNode::new(&self.tag)
            .with_text_content(&self.text)
            .with_inner_html(&self.inner_html)
            .with_properties(NodeProperties {
                value: self.value,
                href: self.href.filter(|href| !href.is_empty()),
                placeholder: self.placeholder.filter(|p| !p.is_empty()),
                input_type: self.input_type.filter(|t| !t.is_empty()),
            })
            .with_style(ComputedStyle {
                display: self.display,
                visibility: self.visibility,
                opacity: self.opacity,
            })
            .with_rect(ElementRect::new(self.x, self.y, self.width, self.height));

        for (name, value) in &self.attributes {
            node = node.with_attribute(name, value);
        }
        node
    }
}

impl DomTree {
    pub fn from_snapshot(snapshot: PageSnapshot) -> Result<Self> {
        if snapshot.nodes.is_empty() {
            return Err(InspectorError::SnapshotFailed(format!(
                "snapshot of {} contains no elements",
                snapshot.url
            )));
        }

        let mut tree = DomTree::new(snapshot.url, snapshot.title);
        let mut ids: Vec<NodeId> = Vec::with_capacity(snapshot.nodes.len());

        for (index, raw) in snapshot.nodes.into_iter().enumerate() {
            let parent = raw.parent;
            let node = raw.into_dom_node();

            let id = match parent {
                Some(parent) if parent < index => tree.append_child(ids[parent], node),
                Some(parent) => {
                    warn!(index, parent, "Snapshot node refers to a later parent; keeping it detached");
                    tree.insert_detached(node)
                }
                None if tree.root().is_none() && node.tag_name == "html" => tree.insert_root(node),
                None => tree.insert_detached(node),
            };
            ids.push(id);
        }

        if tree.root().is_none() {
            return Err(InspectorError::SnapshotFailed(
                "snapshot has no document element".to_string(),
            ));
        }
        Ok(tree)
    }

    pub fn from_snapshot_value(value: serde_json::Value) -> Result<Self> {
        let snapshot: PageSnapshot = serde_json::from_value(value)?;
        Self::from_snapshot(snapshot)
    }
}
