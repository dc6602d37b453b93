pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod inspector;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod utils;

pub use browser::InspectorSession;
pub use crate::core::{BrowserTrait, Config};
pub use dom::{DomProcessor, DomTree, ElementDescriptor, IdentityHash, PageInventory};
pub use errors::{InspectorError, Result};
pub use inspector::{ElementChangeDetector, FormInteractionRecorder, InspectorOutcome, PageEvent, PageInspector};
pub use types::*;
