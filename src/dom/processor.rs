use crate::core::config::InspectorConfig;
use crate::dom::element::{build_descriptor, ElementDescriptor};
use crate::dom::identity::{IdentityHash, IdentityHasher};
use crate::dom::state::PageInventory;
use crate::dom::tree::{DomTree, NodeId};
use crate::dom::visibility::is_visible;
use tracing::{debug, warn};

/// A visible interactive element together with its identity hash.
#[derive(Debug, Clone)]
pub struct ScannedElement {
    pub node: NodeId,
    pub hash: IdentityHash,
    pub descriptor: ElementDescriptor,
}

/// Result of scanning the visible interactive elements of one tree.
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    pub elements: Vec<ScannedElement>,
    /// Elements dropped because their descriptor or hash could not be built.
    pub skipped: usize,
}

/// Enumerates and describes the elements of a [`DomTree`].
#[derive(Debug, Clone)]
pub struct DomProcessor {
    interactive_tags: Vec<String>,
    hasher: IdentityHasher,
}

impl Default for DomProcessor {
    fn default() -> Self {
        Self::new(&InspectorConfig::default())
    }
}

impl DomProcessor {
    pub fn new(config: &InspectorConfig) -> Self {
        Self {
            interactive_tags: config
                .interactive_tags
                .iter()
                .map(|tag| tag.to_ascii_lowercase())
                .collect(),
            hasher: IdentityHasher::new(config.inner_html_prefix),
        }
    }

    pub fn hasher(&self) -> &IdentityHasher {
        &self.hasher
    }

    /// Interactive elements grouped by tag in configured order, document
    /// order within each tag.
    pub fn interactive_nodes(&self, tree: &DomTree) -> Vec<NodeId> {
        self.interactive_tags
            .iter()
            .flat_map(|tag| tree.elements_by_tag(tag))
            .collect()
    }

    pub fn is_interactive_tag(&self, tag_name: &str) -> bool {
        self.interactive_tags.iter().any(|tag| tag == tag_name)
    }

    /// Descriptors of every interactive element, visible or not, in scan order.
    pub fn interactive_inventory(&self, tree: &DomTree) -> Vec<ElementDescriptor> {
        describe_all(tree, &self.interactive_nodes(tree)).0
    }

    /// Descriptors of every attached element in document order.
    pub fn full_inventory(&self, tree: &DomTree) -> Vec<ElementDescriptor> {
        describe_all(tree, &tree.document_order()).0
    }

    /// Collect the page inventory. `include_all` adds every element of the
    /// document on top of the interactive ones.
    pub fn extract_inventory(&self, tree: &DomTree, include_all: bool) -> PageInventory {
        let mut inventory = PageInventory::new(tree.url(), tree.title());

        let (interactive, skipped) = describe_all(tree, &self.interactive_nodes(tree));
        inventory.interactive_elements = interactive;
        inventory.skipped += skipped;

        if include_all {
            let (elements, skipped) = describe_all(tree, &tree.document_order());
            inventory.elements = elements;
            inventory.skipped += skipped;
        }

        inventory
    }

    /// Hash every visible interactive element. Failures are local to the
    /// element: it is logged, counted and left out.
    pub fn scan_visible(&self, tree: &DomTree) -> ScanBatch {
        let mut batch = ScanBatch::default();

        for node in self.interactive_nodes(tree) {
            if !is_visible(tree, node) {
                continue;
            }

            let descriptor = match build_descriptor(tree, node) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!(node = node.0, error = %e, "Skipping element during scan");
                    batch.skipped += 1;
                    continue;
                }
            };

            match self.hasher.hash_element(tree, node, &descriptor) {
                Ok(hash) => batch.elements.push(ScannedElement {
                    node,
                    hash,
                    descriptor,
                }),
                Err(e) => {
                    warn!(xpath = %descriptor.xpath, error = %e, "Skipping element that could not be hashed");
                    batch.skipped += 1;
                }
            }
        }

        debug!(
            scanned = batch.elements.len(),
            skipped = batch.skipped,
            "Interactive scan complete"
        );
        batch
    }
}

fn describe_all(tree: &DomTree, nodes: &[NodeId]) -> (Vec<ElementDescriptor>, usize) {
    let mut descriptors = Vec::with_capacity(nodes.len());
    let mut skipped = 0;

    for node in nodes {
        match build_descriptor(tree, *node) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) => {
                warn!(node = node.0, error = %e, "Error building node data");
                skipped += 1;
            }
        }
    }

    (descriptors, skipped)
}
