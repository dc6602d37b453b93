//! Content hashing for "is this the same element as before".
//!
//! The hash is 32 bits wide. Two distinct elements can collide, in which case
//! a newly appeared element is classified as already seen. That false
//! negative is an accepted limitation of the detector, not an error.

use crate::dom::element::ElementDescriptor;
use crate::dom::tree::{DomTree, NodeId};
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityHash(pub u32);

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Canonical form of the identity-relevant fields. Field order is fixed and
/// attributes are sorted by name, so equal inputs serialize identically.
#[derive(Serialize)]
struct IdentityKey<'a> {
    tag: &'a str,
    id: Option<&'a str>,
    class: Option<&'a str>,
    #[serde(rename = "type")]
    input_type: Option<&'a str>,
    name: Option<&'a str>,
    href: Option<&'a str>,
    text: &'a str,
    xpath: &'a str,
    inner_html: &'a str,
    attributes: Vec<(&'a str, &'a str)>,
}

#[derive(Debug, Clone)]
pub struct IdentityHasher {
    inner_html_prefix: usize,
}

impl Default for IdentityHasher {
    fn default() -> Self {
        Self::new(100)
    }
}

impl IdentityHasher {
    pub fn new(inner_html_prefix: usize) -> Self {
        Self { inner_html_prefix }
    }

    pub fn hash_element(
        &self,
        tree: &DomTree,
        node: NodeId,
        descriptor: &ElementDescriptor,
    ) -> Result<IdentityHash> {
        let inner_html = tree
            .node(node)
            .map(|element| element.inner_html.as_str())
            .unwrap_or("");
        self.hash_descriptor(descriptor, inner_html)
    }

    pub fn hash_descriptor(
        &self,
        descriptor: &ElementDescriptor,
        inner_html: &str,
    ) -> Result<IdentityHash> {
        let mut attributes: Vec<(&str, &str)> = descriptor
            .attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        attributes.sort_unstable();

        let key = IdentityKey {
            tag: &descriptor.tag_name,
            id: descriptor.element_id(),
            class: descriptor.class_name(),
            input_type: descriptor.input_type.as_deref(),
            name: descriptor.name(),
            href: descriptor.href.as_deref(),
            text: descriptor.text_content.as_deref().unwrap_or("").trim(),
            xpath: &descriptor.xpath,
            inner_html: markup_prefix(inner_html, self.inner_html_prefix),
            attributes,
        };

        let canonical = serde_json::to_vec(&key)?;
        let digest = Sha1::digest(&canonical);
        Ok(IdentityHash(u32::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3],
        ])))
    }
}

fn markup_prefix(html: &str, chars: usize) -> &str {
    match html.char_indices().nth(chars) {
        Some((end, _)) => &html[..end],
        None => html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::element::build_descriptor;
    use crate::testing::TestHelper;
    use std::collections::HashSet;

    fn hash_of(tree: &DomTree, node: NodeId) -> IdentityHash {
        let descriptor = build_descriptor(tree, node).unwrap();
        IdentityHasher::default()
            .hash_element(tree, node, &descriptor)
            .unwrap()
    }

    #[test]
    fn test_hash_is_idempotent() {
        let tree = TestHelper::parse(TestHelper::form_page());
        for id in tree.document_order() {
            assert_eq!(hash_of(&tree, id), hash_of(&tree, id));
        }
    }

    #[test]
    fn test_equal_fields_give_equal_hashes() {
        let hasher = IdentityHasher::default();
        let a = ElementDescriptor::new("button", "/html/body/button[1]")
            .with_attribute("class", "primary")
            .with_attribute("data-x", "1")
            .with_text_content("Save");
        let b = ElementDescriptor::new("button", "/html/body/button[1]")
            .with_attribute("data-x", "1")
            .with_attribute("class", "primary")
            .with_text_content("Save");
        assert_eq!(
            hasher.hash_descriptor(&a, "Save").unwrap(),
            hasher.hash_descriptor(&b, "Save").unwrap()
        );
    }

    #[test]
    fn test_field_changes_change_the_hash() {
        let hasher = IdentityHasher::default();
        let base = ElementDescriptor::new("a", "/html/body/a[1]").with_text_content("Next");
        let base_hash = hasher.hash_descriptor(&base, "Next").unwrap();

        let moved = ElementDescriptor::new("a", "/html/body/a[2]").with_text_content("Next");
        let renamed = base.clone().with_text_content("Prev");
        let classed = base.clone().with_attribute("class", "active");

        assert_ne!(base_hash, hasher.hash_descriptor(&moved, "Next").unwrap());
        assert_ne!(base_hash, hasher.hash_descriptor(&renamed, "Next").unwrap());
        assert_ne!(base_hash, hasher.hash_descriptor(&classed, "Next").unwrap());
        assert_ne!(base_hash, hasher.hash_descriptor(&base, "<b>Next</b>").unwrap());
    }

    #[test]
    fn test_only_markup_prefix_counts() {
        let hasher = IdentityHasher::new(10);
        let descriptor = ElementDescriptor::new("div", "/html/body/div[1]");
        let short = hasher.hash_descriptor(&descriptor, "<p>abcdef</p>").unwrap();
        let long = hasher
            .hash_descriptor(&descriptor, "<p>abcdef</p><p>tail that differs</p>")
            .unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_markup_prefix_respects_char_boundaries() {
        assert_eq!(markup_prefix("héllo", 2), "hé");
        assert_eq!(markup_prefix("abc", 10), "abc");
        assert_eq!(markup_prefix("", 3), "");
    }

    #[test]
    fn test_distinct_elements_have_distinct_hashes() {
        let tree = TestHelper::parse(&TestHelper::large_page(150));
        let interactive: Vec<NodeId> = ["a", "button", "input"]
            .iter()
            .flat_map(|tag| tree.elements_by_tag(tag))
            .collect();
        assert_eq!(interactive.len(), 450);

        let hashes: HashSet<IdentityHash> = interactive
            .iter()
            .map(|id| hash_of(&tree, *id))
            .collect();
        assert_eq!(hashes.len(), interactive.len());
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(IdentityHash(0xbeef).to_string(), "0000beef");
    }
}
