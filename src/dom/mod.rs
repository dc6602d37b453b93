pub mod element;
pub mod identity;
pub mod parse;
pub mod processor;
pub mod snapshot;
pub mod state;
pub mod tree;
pub mod visibility;
pub mod xpath;

pub use element::{build_descriptor, ElementDescriptor};
pub use identity::{IdentityHash, IdentityHasher};
pub use processor::{DomProcessor, ScanBatch, ScannedElement};
pub use snapshot::{PageSnapshot, SnapshotNode};
pub use state::PageInventory;
pub use tree::{DomNode, DomTree, NodeId, NodeProperties};
pub use visibility::is_visible;
pub use xpath::resolve_xpath;
