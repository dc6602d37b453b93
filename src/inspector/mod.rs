pub mod detector;
pub mod events;
pub mod page;
pub mod ready;
pub mod recorder;

pub use detector::{DetectorPhase, ElementChangeDetector, NewElement, ScanReport};
pub use events::{FieldEvent, KeyCombo, PageEvent, PageEventKind};
pub use page::{InspectorOutcome, PageInspector};
pub use ready::{ready_channel, ReadySignal, ReadyWaiter};
pub use recorder::{
    EventMetadata, FieldSnapshot, FormInteractionRecord, FormInteractionRecorder, InteractionKind,
};
