use crate::dom::tree::{DomTree, NodeId};
use crate::dom::visibility::is_node_visible;
use crate::dom::xpath::resolve_xpath;
use crate::errors::{InspectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only snapshot of one element at the time it was inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub tag_name: String,
    pub attributes: HashMap<String, String>,
    pub xpath: String,
    pub is_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
}

impl ElementDescriptor {
    pub fn new(tag_name: &str, xpath: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: HashMap::new(),
            xpath: xpath.to_string(),
            is_visible: true,
            text_content: None,
            value: None,
            href: None,
            placeholder: None,
            input_type: None,
        }
    }

    pub fn with_text_content(mut self, text: &str) -> Self {
        self.text_content = Some(text.to_string());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn set_visible(mut self, visible: bool) -> Self {
        self.is_visible = visible;
        self
    }

    pub fn element_id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }

    pub fn class_name(&self) -> Option<&str> {
        self.attributes.get("class").map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").map(String::as_str)
    }

    /// Compact JSON rendering for log output.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserializable: {}>", e))
    }

    /// One-line human description used in log lines.
    pub fn summary(&self) -> String {
        let mut parts = vec![];

        match self.tag_name.as_str() {
            "input" => match &self.input_type {
                Some(input_type) => parts.push(format!("{} input", input_type)),
                None => parts.push("input".to_string()),
            },
            "a" => parts.push("link".to_string()),
            "select" => parts.push("dropdown".to_string()),
            "textarea" => parts.push("text area".to_string()),
            other => parts.push(other.to_string()),
        }

        if let Some(name) = self.name() {
            parts.push(format!("named '{}'", name));
        }
        if let Some(id) = self.element_id() {
            parts.push(format!("with ID '{}'", id));
        }
        if let Some(placeholder) = &self.placeholder {
            parts.push(format!("placeholder '{}'", placeholder));
        }
        if let Some(text) = &self.text_content {
            if text.chars().count() < 60 {
                parts.push(format!("containing '{}'", text));
            }
        }
        if !self.is_visible {
            parts.push("(hidden)".to_string());
        }

        parts.join(" ")
    }
}

/// Build the descriptor of `node` without touching the tree.
///
/// Fails with [`InspectorError::UnlocatableNode`] when the node has no path
/// identifier; callers skip such nodes.
pub fn build_descriptor(tree: &DomTree, node: NodeId) -> Result<ElementDescriptor> {
    let element = tree
        .node(node)
        .ok_or_else(|| InspectorError::NodeNotFound(format!("{:?}", node)))?;
    let xpath = resolve_xpath(tree, node)
        .ok_or_else(|| InspectorError::UnlocatableNode(element.tag_name.clone()))?;

    let text = element.text_content.trim();

    Ok(ElementDescriptor {
        tag_name: element.tag_name.clone(),
        attributes: element.attributes.iter().cloned().collect(),
        xpath,
        is_visible: is_node_visible(element),
        text_content: (!text.is_empty()).then(|| text.to_string()),
        value: element.properties.value.clone(),
        href: element.properties.href.clone(),
        placeholder: element.properties.placeholder.clone(),
        input_type: element.properties.input_type.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::tree::DomNode;
    use crate::testing::TestHelper;

    #[test]
    fn test_descriptor_for_link() {
        let tree = DomTree::parse_html(
            r#"<nav><a id="home" class="nav" href="/">  Home  </a></nav>"#,
            "https://example.com/page",
        );
        let link = tree.element_by_id("home").unwrap();
        let descriptor = build_descriptor(&tree, link).unwrap();

        assert_eq!(descriptor.tag_name, "a");
        assert_eq!(descriptor.xpath, r#"//*[@id="home"]"#);
        assert_eq!(descriptor.text_content.as_deref(), Some("Home"));
        assert_eq!(descriptor.href.as_deref(), Some("https://example.com/"));
        assert_eq!(descriptor.class_name(), Some("nav"));
        assert_eq!(descriptor.value, None);
        assert_eq!(descriptor.input_type, None);
        assert!(descriptor.is_visible);
    }

    #[test]
    fn test_missing_optional_fields_are_omitted() {
        let tree = TestHelper::parse("<div><span></span></div>");
        let span = tree.elements_by_tag("span")[0];
        let descriptor = build_descriptor(&tree, span).unwrap();
        assert_eq!(descriptor.text_content, None);
        assert_eq!(descriptor.placeholder, None);

        let json = serde_json::to_value(&descriptor).unwrap();
        assert!(json.get("value").is_none());
        assert!(json.get("href").is_none());
        assert!(json.get("type").is_none());
        assert_eq!(json["xpath"], "/html/body/div[1]/span[1]");
    }

    #[test]
    fn test_input_descriptor_serializes_type() {
        let tree = TestHelper::parse(r#"<input name="q" placeholder="Search" value="rust">"#);
        let input = tree.elements_by_tag("input")[0];
        let descriptor = build_descriptor(&tree, input).unwrap();
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["value"], "rust");
        assert_eq!(json["placeholder"], "Search");
        assert_eq!(descriptor.summary(), "text input named 'q' placeholder 'Search'");
    }

    #[test]
    fn test_detached_node_fails_locally() {
        let mut tree = TestHelper::parse("<p>x</p>");
        let orphan = tree.insert_detached(DomNode::new("button"));
        let err = build_descriptor(&tree, orphan).unwrap_err();
        assert!(matches!(err, InspectorError::UnlocatableNode(ref tag) if tag == "button"));
        assert!(err.is_element_local());
    }

    #[test]
    fn test_build_does_not_mutate_tree() {
        let tree = TestHelper::parse(TestHelper::form_page());
        let before = format!("{:?}", tree);
        for id in tree.document_order() {
            let _ = build_descriptor(&tree, id);
        }
        assert_eq!(before, format!("{:?}", tree));
    }

    #[test]
    fn test_summary_marks_hidden() {
        let descriptor = ElementDescriptor::new("BUTTON", "/html/body/button[1]")
            .with_text_content("Save")
            .set_visible(false);
        assert_eq!(descriptor.summary(), "button containing 'Save' (hidden)");
    }
}
