use crate::dom::tree::{DomTree, NodeId};

/// Compute the path identifier of `node`.
///
/// Elements with a non-empty `id` resolve to `//*[@id="…"]`, the document
/// element to `/html` and the body to `/html/body`. Anything else is located
/// relative to its parent as `tag[n]`, `n` being the 1-based position among
/// same-tag siblings. Returns `None` for nodes that are not connected to the
/// document and carry no id.
pub fn resolve_xpath(tree: &DomTree, node: NodeId) -> Option<String> {
    let mut steps = Vec::new();
    let mut current = node;

    let base = loop {
        let element = tree.node(current)?;

        if let Some(id) = element.element_id() {
            break format!("//*[@id=\"{}\"]", id);
        }
        if Some(current) == tree.body() {
            break "/html/body".to_string();
        }
        if Some(current) == tree.root() {
            break "/html".to_string();
        }

        let parent = element.parent?;
        let position = sibling_position(tree, parent, current, &element.tag_name)?;
        steps.push(format!("{}[{}]", element.tag_name, position));
        current = parent;
    };

    let mut path = base;
    for step in steps.iter().rev() {
        path.push('/');
        path.push_str(step);
    }
    Some(path)
}

fn sibling_position(tree: &DomTree, parent: NodeId, node: NodeId, tag_name: &str) -> Option<usize> {
    let mut position = 0;
    for sibling in tree.children(parent) {
        let sibling_tag = tree.node(*sibling).map(|n| n.tag_name.as_str());
        if sibling_tag == Some(tag_name) {
            position += 1;
        }
        if *sibling == node {
            return Some(position);
        }
    }
    None
}

fn parse_step(step: &str) -> Option<(&str, usize)> {
    let (tag, rest) = step.split_once('[')?;
    let position: usize = rest.strip_suffix(']')?.parse().ok()?;
    if tag.is_empty() || position == 0 {
        return None;
    }
    Some((tag, position))
}

impl DomTree {
    /// Evaluate a path produced by [`resolve_xpath`] against this tree.
    pub fn locate(&self, xpath: &str) -> Option<NodeId> {
        let is_boundary = |rest: &&str| rest.is_empty() || rest.starts_with('/');

        let (mut current, rest) = if let Some(after) = xpath.strip_prefix("//*[@id=\"") {
            let end = after.find("\"]")?;
            (self.element_by_id(&after[..end])?, &after[end + 2..])
        } else if let Some(rest) = xpath.strip_prefix("/html/body").filter(is_boundary) {
            (self.body()?, rest)
        } else if let Some(rest) = xpath.strip_prefix("/html").filter(is_boundary) {
            (self.root()?, rest)
        } else {
            return None;
        };

        for step in rest.split('/').filter(|step| !step.is_empty()) {
            let (tag, position) = parse_step(step)?;
            current = self
                .children(current)
                .iter()
                .copied()
                .filter(|child| {
                    self.node(*child)
                        .map(|node| node.tag_name == tag)
                        .unwrap_or(false)
                })
                .nth(position - 1)?;
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::tree::DomNode;
    use crate::testing::TestHelper;

    #[test]
    fn test_id_takes_precedence() {
        let tree = TestHelper::parse(
            r#"<html><body id="main"><div><input id="email"></div></body></html>"#,
        );
        let body = tree.body().unwrap();
        let input = tree.element_by_id("email").unwrap();
        assert_eq!(resolve_xpath(&tree, body).unwrap(), r#"//*[@id="main"]"#);
        assert_eq!(resolve_xpath(&tree, input).unwrap(), r#"//*[@id="email"]"#);
    }

    #[test]
    fn test_root_and_body_fixed_locators() {
        let tree = TestHelper::parse("<html><body><p>hi</p></body></html>");
        assert_eq!(resolve_xpath(&tree, tree.root().unwrap()).unwrap(), "/html");
        assert_eq!(resolve_xpath(&tree, tree.body().unwrap()).unwrap(), "/html/body");
        let head = tree.elements_by_tag("head")[0];
        assert_eq!(resolve_xpath(&tree, head).unwrap(), "/html/head[1]");
    }

    #[test]
    fn test_positions_count_same_tag_siblings_only() {
        let tree = TestHelper::parse(
            "<html><body><div><span>a</span><a>x</a><span>b</span><a>y</a></div></body></html>",
        );
        let anchors = tree.elements_by_tag("a");
        assert_eq!(
            resolve_xpath(&tree, anchors[1]).unwrap(),
            "/html/body/div[1]/a[2]"
        );
        let spans = tree.elements_by_tag("span");
        assert_eq!(
            resolve_xpath(&tree, spans[1]).unwrap(),
            "/html/body/div[1]/span[2]"
        );
    }

    #[test]
    fn test_path_below_id_anchor() {
        let tree = TestHelper::parse(
            r#"<html><body><form id="login"><label>A</label><label>B</label></form></body></html>"#,
        );
        let labels = tree.elements_by_tag("label");
        assert_eq!(
            resolve_xpath(&tree, labels[1]).unwrap(),
            r#"//*[@id="login"]/label[2]"#
        );
    }

    #[test]
    fn test_detached_node_is_unlocatable() {
        let mut tree = TestHelper::parse("<html><body></body></html>");
        let orphan = tree.insert_detached(DomNode::new("button"));
        assert_eq!(resolve_xpath(&tree, orphan), None);

        let with_id = tree.insert_detached(DomNode::new("button").with_attribute("id", "x"));
        assert_eq!(resolve_xpath(&tree, with_id).unwrap(), r#"//*[@id="x"]"#);
    }

    #[test]
    fn test_resolution_is_stable() {
        let tree = TestHelper::parse(TestHelper::five_interactive_page());
        for id in tree.document_order() {
            assert_eq!(resolve_xpath(&tree, id), resolve_xpath(&tree, id));
        }
    }

    #[test]
    fn test_round_trip_through_locate() {
        let tree = TestHelper::parse(TestHelper::form_page());
        for id in tree.document_order() {
            let xpath = resolve_xpath(&tree, id).unwrap();
            assert_eq!(tree.locate(&xpath), Some(id), "round trip failed for {}", xpath);
        }
    }

    #[test]
    fn test_locate_rejects_malformed_paths() {
        let tree = TestHelper::parse(TestHelper::form_page());
        assert_eq!(tree.locate("body/div[1]"), None);
        assert_eq!(tree.locate("/html/body/div[0]"), None);
        assert_eq!(tree.locate("/html/body/div[x]"), None);
        assert_eq!(tree.locate("/htmlx"), None);
        assert_eq!(tree.locate(r#"//*[@id="nope"]"#), None);
    }
}
