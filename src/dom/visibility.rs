use crate::dom::tree::{DomNode, DomTree, NodeId};

/// Whether `node` is meaningfully visible to a user.
///
/// Evaluated on every call; layout can change between calls.
pub fn is_visible(tree: &DomTree, node: NodeId) -> bool {
    tree.node(node).map(is_node_visible).unwrap_or(false)
}

pub fn is_node_visible(node: &DomNode) -> bool {
    node.style.display != "none"
        && node.style.visibility != "hidden"
        && node.style.opacity > 0.0
        && node.rect.has_area()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHelper;
    use crate::types::{ComputedStyle, ElementRect};

    #[test]
    fn test_each_condition_hides() {
        let base = DomNode::new("button");
        assert!(is_node_visible(&base));

        let mut none = base.clone();
        none.style.display = "none".to_string();
        assert!(!is_node_visible(&none));

        let hidden = base.clone().with_style(ComputedStyle {
            visibility: "hidden".to_string(),
            ..ComputedStyle::default()
        });
        assert!(!is_node_visible(&hidden));

        let transparent = base.clone().with_style(ComputedStyle {
            opacity: 0.0,
            ..ComputedStyle::default()
        });
        assert!(!is_node_visible(&transparent));

        let flat = base.clone().with_rect(ElementRect::new(0.0, 0.0, 120.0, 0.0));
        assert!(!is_node_visible(&flat));

        let narrow = base.with_rect(ElementRect::new(5.0, 5.0, 0.0, 10.0));
        assert!(!is_node_visible(&narrow));
    }

    #[test]
    fn test_parsed_page_visibility() {
        let tree = TestHelper::parse(TestHelper::hidden_elements_page());
        let visible: Vec<_> = tree
            .elements_by_tag("button")
            .into_iter()
            .filter(|id| is_visible(&tree, *id))
            .map(|id| tree.node(id).unwrap().text_content.clone())
            .collect();
        assert_eq!(visible, vec!["Visible"]);
    }

    #[test]
    fn test_missing_node_is_not_visible() {
        let tree = TestHelper::parse("<p>x</p>");
        assert!(!is_visible(&tree, NodeId(10_000)));
    }
}
