use crate::core::config::InspectorConfig;
use crate::dom::{build_descriptor, DomProcessor, DomTree, NodeId, PageInventory};
use crate::errors::Result;
use crate::inspector::detector::{ElementChangeDetector, ScanReport};
use crate::inspector::events::{FieldEvent, KeyCombo, PageEvent, PageEventKind};
use crate::inspector::recorder::{EventMetadata, FieldSnapshot, FormInteractionRecorder};
use crate::types::PointerPosition;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What handling one event produced.
#[derive(Debug, Clone)]
pub enum InspectorOutcome {
    Ignored,
    Inventory(PageInventory),
    Scan(ScanReport),
    Recorded,
    HistoryDumped(usize),
    /// The location changed; carries the inventory of the new page.
    Reset(PageInventory),
}

/// Per-page inspection state: one detector, one recorder, and the dump key.
#[derive(Debug)]
pub struct PageInspector {
    id: String,
    processor: DomProcessor,
    detector: ElementChangeDetector,
    recorder: FormInteractionRecorder,
    dump_key: KeyCombo,
    log_full_inventory: bool,
    log_descriptors: bool,
    ready: bool,
}

impl PageInspector {
    pub fn new(config: &InspectorConfig) -> Result<Self> {
        let dump_key: KeyCombo = config.dump_key.parse()?;
        let processor = DomProcessor::new(config);

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            detector: ElementChangeDetector::with_processor(processor.clone()),
            processor,
            recorder: FormInteractionRecorder::new(),
            dump_key,
            log_full_inventory: config.log_full_inventory,
            log_descriptors: config.log_descriptors,
            ready: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn detector(&self) -> &ElementChangeDetector {
        &self.detector
    }

    pub fn recorder(&self) -> &FormInteractionRecorder {
        &self.recorder
    }

    pub fn dump_key(&self) -> &KeyCombo {
        &self.dump_key
    }

    pub fn handle_event(&mut self, tree: &DomTree, event: PageEvent) -> InspectorOutcome {
        let PageEvent { kind, timestamp } = event;

        if !self.ready {
            return match kind {
                PageEventKind::Ready => self.on_ready(tree),
                PageEventKind::Mutation { location } => {
                    self.detector.observe_location(&location);
                    InspectorOutcome::Ignored
                }
                other => {
                    debug!(event = other.name(), "Ignoring event before page is ready");
                    InspectorOutcome::Ignored
                }
            };
        }

        match kind {
            PageEventKind::Ready => self.on_ready(tree),
            PageEventKind::Click { target, position } => self.on_click(tree, target, position),
            PageEventKind::Focus(field) => self.on_field(tree, "focus", field, timestamp),
            PageEventKind::Blur(field) => self.on_field(tree, "blur", field, timestamp),
            PageEventKind::Change(field) => self.on_field(tree, "change", field, timestamp),
            PageEventKind::Input(field) => self.on_field(tree, "input", field, timestamp),
            PageEventKind::KeyDown(combo) => {
                if self.dump_key.matches(&combo) {
                    self.recorder.log_history();
                    InspectorOutcome::HistoryDumped(self.recorder.len())
                } else {
                    InspectorOutcome::Ignored
                }
            }
            PageEventKind::Mutation { location } => self.on_mutation(tree, &location),
        }
    }

    /// Build and log the inventory of `tree`.
    pub fn inventory(&self, tree: &DomTree) -> PageInventory {
        let inventory = self
            .processor
            .extract_inventory(tree, self.log_full_inventory);
        inventory.log(self.log_descriptors);
        inventory
    }

    fn on_ready(&mut self, tree: &DomTree) -> InspectorOutcome {
        info!(inspector = %self.id, url = %tree.url(), "NodeData Printer: page ready");
        self.ready = true;
        self.detector.observe_location(tree.url());
        InspectorOutcome::Inventory(self.inventory(tree))
    }

    fn on_click(&mut self, tree: &DomTree, target: Option<NodeId>, position: PointerPosition) -> InspectorOutcome {
        match target.map(|target| (target, build_descriptor(tree, target))) {
            Some((_, Ok(descriptor))) => info!(
                x = position.x,
                y = position.y,
                xpath = %descriptor.xpath,
                node = %descriptor.to_json(),
                "Clicked {}",
                descriptor.summary()
            ),
            Some((target, Err(e))) => warn!(node = target.0, error = %e, "Could not describe clicked element"),
            None => info!(x = position.x, y = position.y, "Clicked an element that is no longer in the document"),
        }

        // The cycle runs whether or not the target survived the click.
        InspectorOutcome::Scan(self.detector.on_click(tree))
    }

    fn on_field(
        &mut self,
        tree: &DomTree,
        event_type: &str,
        field: FieldEvent,
        at: DateTime<Utc>,
    ) -> InspectorOutcome {
        let descriptor = match build_descriptor(tree, field.target) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(node = field.target.0, event = event_type, error = %e, "Skipping form event");
                return InspectorOutcome::Ignored;
            }
        };

        let snapshot = FieldSnapshot::from_descriptor(&descriptor).with_value(field.value.as_deref());
        let metadata = EventMetadata::new(event_type, field.position);

        match event_type {
            "focus" => self.recorder.record_focus(snapshot, metadata, at),
            "blur" => self.recorder.record_blur(snapshot, metadata, at),
            "change" => self.recorder.record_change(snapshot, metadata, at),
            _ => self.recorder.record_input(snapshot, metadata, at),
        }
        InspectorOutcome::Recorded
    }

    fn on_mutation(&mut self, tree: &DomTree, location: &str) -> InspectorOutcome {
        if !self.detector.observe_location(location) {
            return InspectorOutcome::Ignored;
        }

        // A value typed on the previous page belongs to that page.
        self.recorder.flush_pending();
        InspectorOutcome::Reset(self.inventory(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::recorder::InteractionKind;
    use crate::testing::TestHelper;

    fn inspector() -> PageInspector {
        PageInspector::new(&InspectorConfig::default()).unwrap()
    }

    fn ready(tree: &DomTree) -> PageInspector {
        let mut inspector = inspector();
        inspector.handle_event(tree, PageEvent::ready());
        inspector
    }

    #[test]
    fn test_invalid_dump_key_is_rejected() {
        let config = InspectorConfig {
            dump_key: "Ctrl+".to_string(),
            ..InspectorConfig::default()
        };
        assert!(PageInspector::new(&config).is_err());
    }

    #[test]
    fn test_events_before_ready_are_ignored() {
        let tree = TestHelper::parse(TestHelper::form_page());
        let mut inspector = inspector();
        let input = tree.element_by_id("email").unwrap();
        let button = tree.elements_by_tag("button")[0];

        let outcomes = vec![
            inspector.handle_event(&tree, PageEvent::click(button, 1.0, 1.0)),
            inspector.handle_event(&tree, PageEvent::focus(input)),
            inspector.handle_event(&tree, PageEvent::input(input, "a")),
            inspector.handle_event(&tree, PageEvent::key_down(KeyCombo::new("h").with_ctrl().with_shift())),
        ];
        assert!(outcomes.iter().all(|o| matches!(o, InspectorOutcome::Ignored)));
        assert!(inspector.recorder().is_empty());
        assert_eq!(inspector.detector().cycles(), 0);
        assert!(!inspector.is_ready());
    }

    #[test]
    fn test_ready_logs_inventory() {
        let tree = TestHelper::parse(TestHelper::five_interactive_page());
        let mut inspector = inspector();
        match inspector.handle_event(&tree, PageEvent::ready()) {
            InspectorOutcome::Inventory(inventory) => {
                assert_eq!(inventory.interactive_count(), 5);
                assert_eq!(inventory.element_count(), tree.document_order().len());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(inspector.is_ready());
        assert_eq!(inspector.detector().location(), Some(tree.url()));
    }

    #[test]
    fn test_clicks_run_detector_cycles() {
        let tree = TestHelper::parse(TestHelper::five_interactive_page());
        let mut inspector = ready(&tree);
        let target = tree.elements_by_tag("button")[0];

        let first = inspector.handle_event(&tree, PageEvent::click(target, 10.0, 5.0));
        assert!(matches!(first, InspectorOutcome::Scan(ref r) if r.new_elements.len() == 5));
        let second = inspector.handle_event(&tree, PageEvent::click(target, 10.0, 5.0));
        assert!(matches!(second, InspectorOutcome::Scan(ref r) if r.new_elements.is_empty()));
    }

    #[test]
    fn test_click_on_vanished_target_still_scans() {
        let tree = TestHelper::parse(TestHelper::five_interactive_page());
        let mut inspector = ready(&tree);

        let outcome = inspector.handle_event(&tree, PageEvent::click(None, 4.0, 2.0));
        assert!(matches!(outcome, InspectorOutcome::Scan(ref r) if r.new_elements.len() == 5));
        assert_eq!(inspector.detector().cycles(), 1);

        let mut detached = tree.clone();
        let orphan = detached.insert_detached(crate::dom::DomNode::new("button"));
        let outcome = inspector.handle_event(&detached, PageEvent::click(orphan, 4.0, 2.0));
        assert!(matches!(outcome, InspectorOutcome::Scan(ref r) if r.new_elements.is_empty()));
        assert_eq!(inspector.detector().cycles(), 2);
    }

    #[test]
    fn test_form_events_are_coalesced() {
        let tree = TestHelper::parse(TestHelper::form_page());
        let mut inspector = ready(&tree);
        let email = tree.element_by_id("email").unwrap();
        let name = tree.element_by_id("name").unwrap();

        inspector.handle_event(&tree, PageEvent::focus(email));
        for value in ["a", "ab", "abc"] {
            inspector.handle_event(&tree, PageEvent::input(email, value));
        }
        inspector.handle_event(&tree, PageEvent::focus(name));

        let records = inspector.recorder().records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].kind, InteractionKind::InputComplete);
        assert_eq!(records[1].field.value.as_deref(), Some("abc"));
        assert_eq!(records[1].field.id.as_deref(), Some("email"));
        assert_eq!(records[2].field.id.as_deref(), Some("name"));
    }

    #[test]
    fn test_dump_key_logs_history() {
        let tree = TestHelper::parse(TestHelper::form_page());
        let mut inspector = ready(&tree);
        let email = tree.element_by_id("email").unwrap();
        inspector.handle_event(&tree, PageEvent::focus(email));
        inspector.handle_event(&tree, PageEvent::change(email, "x@y.z"));

        let other = inspector.handle_event(&tree, PageEvent::key_down(KeyCombo::new("h").with_ctrl()));
        assert!(matches!(other, InspectorOutcome::Ignored));

        let combo = KeyCombo::new("H").with_ctrl().with_shift();
        let dumped = inspector.handle_event(&tree, PageEvent::key_down(combo));
        assert!(matches!(dumped, InspectorOutcome::HistoryDumped(2)));
        assert_eq!(inspector.recorder().len(), 2);
    }

    #[test]
    fn test_navigation_resets_detector_and_keeps_history() {
        let tree = TestHelper::parse(TestHelper::form_page());
        let mut inspector = ready(&tree);
        let email = tree.element_by_id("email").unwrap();
        let button = tree.elements_by_tag("button")[0];

        inspector.handle_event(&tree, PageEvent::click(button, 0.0, 0.0));
        inspector.handle_event(&tree, PageEvent::input(email, "typed"));
        assert!(!inspector.detector().known_hashes().is_empty());

        let same = inspector.handle_event(&tree, PageEvent::mutation(tree.url()));
        assert!(matches!(same, InspectorOutcome::Ignored));

        let moved = inspector.handle_event(&tree, PageEvent::mutation("https://example.test/next"));
        assert!(matches!(moved, InspectorOutcome::Reset(_)));
        assert!(inspector.detector().known_hashes().is_empty());
        assert!(!inspector.recorder().has_pending_input());
        assert_eq!(inspector.recorder().len(), 1);
        assert_eq!(inspector.recorder().records()[0].kind, InteractionKind::InputComplete);
    }

    #[test]
    fn test_unlocatable_field_event_is_skipped() {
        let mut tree = TestHelper::parse(TestHelper::form_page());
        let mut inspector = ready(&tree);
        let orphan = tree.insert_detached(crate::dom::DomNode::new("input"));
        let outcome = inspector.handle_event(&tree, PageEvent::focus(orphan));
        assert!(matches!(outcome, InspectorOutcome::Ignored));
        assert!(inspector.recorder().is_empty());
    }
}
