use crate::dom::ElementDescriptor;
use crate::types::PointerPosition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Focus,
    Blur,
    Change,
    /// Coalesced value of the input events seen during one field visit.
    InputComplete,
}

/// The subset of a descriptor that identifies a form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub tag_name: String,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub xpath: String,
}

impl FieldSnapshot {
    pub fn from_descriptor(descriptor: &ElementDescriptor) -> Self {
        Self {
            tag_name: descriptor.tag_name.clone(),
            input_type: descriptor.input_type.clone(),
            id: descriptor.element_id().map(str::to_string),
            name: descriptor.name().map(str::to_string),
            placeholder: descriptor.placeholder.clone(),
            value: descriptor.value.clone(),
            xpath: descriptor.xpath.clone(),
        }
    }

    /// Replace the value with one reported by the event itself.
    pub fn with_value(mut self, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.value = Some(value.to_string());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_type: String,
    pub position: Option<PointerPosition>,
}

impl EventMetadata {
    pub fn new(event_type: &str, position: Option<PointerPosition>) -> Self {
        Self {
            event_type: event_type.to_string(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormInteractionRecord {
    pub kind: InteractionKind,
    pub field: FieldSnapshot,
    pub event: EventMetadata,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingInput {
    field: FieldSnapshot,
    event: EventMetadata,
    timestamp: DateTime<Utc>,
}

/// Append-only history of form field interactions.
///
/// Input events are not recorded one by one: the latest value is held back
/// and flushed as a single [`InteractionKind::InputComplete`] record when
/// focus moves to another field or the field blurs.
#[derive(Debug, Default)]
pub struct FormInteractionRecorder {
    records: Vec<FormInteractionRecord>,
    pending: Option<PendingInput>,
}

impl FormInteractionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_focus(&mut self, field: FieldSnapshot, event: EventMetadata, at: DateTime<Utc>) {
        let moved_away = self
            .pending
            .as_ref()
            .map(|pending| pending.field.xpath != field.xpath)
            .unwrap_or(false);
        if moved_away {
            self.flush_pending();
        }
        self.push(InteractionKind::Focus, field, event, at);
    }

    pub fn record_blur(&mut self, field: FieldSnapshot, event: EventMetadata, at: DateTime<Utc>) {
        let same_field = self
            .pending
            .as_ref()
            .map(|pending| pending.field.xpath == field.xpath)
            .unwrap_or(false);
        if same_field {
            self.flush_pending();
        }
        self.push(InteractionKind::Blur, field, event, at);
    }

    pub fn record_change(&mut self, field: FieldSnapshot, event: EventMetadata, at: DateTime<Utc>) {
        self.push(InteractionKind::Change, field, event, at);
    }

    pub fn record_input(&mut self, field: FieldSnapshot, event: EventMetadata, at: DateTime<Utc>) {
        debug!(xpath = %field.xpath, value = ?field.value, "Input held back until the field visit ends");
        // A stale value from another field must not be lost.
        if let Some(pending) = &self.pending {
            if pending.field.xpath != field.xpath {
                self.flush_pending();
            }
        }
        self.pending = Some(PendingInput {
            field,
            event,
            timestamp: at,
        });
    }

    /// Turn a held-back input value into a record. No-op without one.
    pub fn flush_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.push(
                InteractionKind::InputComplete,
                pending.field,
                pending.event,
                pending.timestamp,
            );
        }
    }

    pub fn has_pending_input(&self) -> bool {
        self.pending.is_some()
    }

    pub fn records(&self) -> &[FormInteractionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records with their 1-based display index. Does not clear the log.
    pub fn dump(&self) -> Vec<(usize, &FormInteractionRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (index + 1, record))
            .collect()
    }

    pub fn log_history(&self) {
        info!("=== FORM INTERACTION HISTORY ===");
        info!("Recorded {} interactions", self.len());
        for (index, record) in self.dump() {
            info!(
                index,
                kind = ?record.kind,
                xpath = %record.field.xpath,
                value = ?record.field.value,
                event = %record.event.event_type,
                at = %record.timestamp.to_rfc3339(),
                "Interaction {}",
                index
            );
        }
        info!("=== END FORM INTERACTION HISTORY ===");
    }

    fn push(
        &mut self,
        kind: InteractionKind,
        field: FieldSnapshot,
        event: EventMetadata,
        timestamp: DateTime<Utc>,
    ) {
        self.records.push(FormInteractionRecord {
            kind,
            field,
            event,
            timestamp,
        });
    }
}
