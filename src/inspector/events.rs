use crate::dom::NodeId;
use crate::errors::{InspectorError, Result};
use crate::types::PointerPosition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A key press together with its modifier state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyCombo {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_lowercase(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Same key (case-insensitive) and identical modifiers.
    pub fn matches(&self, other: &KeyCombo) -> bool {
        self.key.to_lowercase() == other.key.to_lowercase()
            && self.ctrl == other.ctrl
            && self.shift == other.shift
            && self.alt == other.alt
            && self.meta == other.meta
    }
}

impl FromStr for KeyCombo {
    type Err = InspectorError;

    /// Parses `"Ctrl+Shift+H"`. The `+` key itself is written as a trailing
    /// `+`, e.g. `"Ctrl++"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || InspectorError::InvalidKeyCombo(s.to_string());
        let mut combo = KeyCombo::new("");
        let mut key: Option<String> = None;

        let trimmed = s.trim();
        let modifiers = match trimmed.strip_suffix('+') {
            Some(rest) => {
                key = Some("+".to_string());
                let rest = rest.trim_end();
                if rest.is_empty() {
                    ""
                } else {
                    rest.strip_suffix('+').ok_or_else(invalid)?
                }
            }
            None => trimmed,
        };

        if modifiers.is_empty() && key.is_some() {
            combo.key = "+".to_string();
            return Ok(combo);
        }

        for part in modifiers.split('+').map(str::trim) {
            match part.to_lowercase().as_str() {
                "" => return Err(invalid()),
                "ctrl" | "control" => combo.ctrl = true,
                "shift" => combo.shift = true,
                "alt" | "option" => combo.alt = true,
                "meta" | "cmd" | "command" | "super" => combo.meta = true,
                other => {
                    if key.replace(other.to_string()).is_some() {
                        return Err(invalid());
                    }
                }
            }
        }

        combo.key = key.ok_or_else(invalid)?;
        Ok(combo)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.shift {
            parts.push("Shift".to_string());
        }
        if self.alt {
            parts.push("Alt".to_string());
        }
        if self.meta {
            parts.push("Meta".to_string());
        }
        if self.key.chars().count() == 1 {
            parts.push(self.key.to_uppercase());
        } else {
            parts.push(self.key.clone());
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// A focus, blur, change or input notification on a form field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEvent {
    pub target: NodeId,
    /// Field value carried by the event itself, when the host reports one.
    pub value: Option<String>,
    pub position: Option<PointerPosition>,
}

impl FieldEvent {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            value: None,
            position: None,
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_position(mut self, position: PointerPosition) -> Self {
        self.position = Some(position);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageEventKind {
    /// The document finished loading.
    Ready,
    /// `target` is `None` when the clicked element left the document before
    /// it could be located, e.g. a button that removes itself.
    Click {
        target: Option<NodeId>,
        position: PointerPosition,
    },
    Focus(FieldEvent),
    Blur(FieldEvent),
    Change(FieldEvent),
    Input(FieldEvent),
    KeyDown(KeyCombo),
    /// The document tree changed; `location` is the page URL afterwards.
    Mutation {
        location: String,
    },
}

impl PageEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            PageEventKind::Ready => "ready",
            PageEventKind::Click { .. } => "click",
            PageEventKind::Focus(_) => "focus",
            PageEventKind::Blur(_) => "blur",
            PageEventKind::Change(_) => "change",
            PageEventKind::Input(_) => "input",
            PageEventKind::KeyDown(_) => "keydown",
            PageEventKind::Mutation { .. } => "mutation",
        }
    }
}

/// Timestamped notification delivered by the host page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    pub kind: PageEventKind,
    pub timestamp: DateTime<Utc>,
}

impl PageEvent {
    pub fn new(kind: PageEventKind) -> Self {
        Self::at(kind, Utc::now())
    }

    pub fn at(kind: PageEventKind, timestamp: DateTime<Utc>) -> Self {
        Self { kind, timestamp }
    }

    pub fn ready() -> Self {
        Self::new(PageEventKind::Ready)
    }

    pub fn click(target: impl Into<Option<NodeId>>, x: f64, y: f64) -> Self {
        Self::new(PageEventKind::Click {
            target: target.into(),
            position: PointerPosition::new(x, y),
        })
    }

    pub fn focus(target: NodeId) -> Self {
        Self::new(PageEventKind::Focus(FieldEvent::new(target)))
    }

    pub fn blur(target: NodeId) -> Self {
        Self::new(PageEventKind::Blur(FieldEvent::new(target)))
    }

    pub fn change(target: NodeId, value: &str) -> Self {
        Self::new(PageEventKind::Change(FieldEvent::new(target).with_value(value)))
    }

    pub fn input(target: NodeId, value: &str) -> Self {
        Self::new(PageEventKind::Input(FieldEvent::new(target).with_value(value)))
    }

    pub fn key_down(combo: KeyCombo) -> Self {
        Self::new(PageEventKind::KeyDown(combo))
    }

    pub fn mutation(location: &str) -> Self {
        Self::new(PageEventKind::Mutation {
            location: location.to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_combo() {
        let combo: KeyCombo = "Ctrl+Shift+H".parse().unwrap();
        assert_eq!(combo, KeyCombo::new("h").with_ctrl().with_shift());
        assert_eq!(combo.to_string(), "Ctrl+Shift+H");

        let combo: KeyCombo = "cmd + alt + F12".parse().unwrap();
        assert!(combo.meta && combo.alt && !combo.ctrl);
        assert_eq!(combo.key, "f12");
        assert_eq!(combo.to_string(), "Alt+Meta+f12");
    }

    #[test]
    fn test_plus_key_is_written_as_trailing_plus() {
        let combo: KeyCombo = "Ctrl++".parse().unwrap();
        assert_eq!(combo, KeyCombo::new("+").with_ctrl());
        assert_eq!(combo.to_string(), "Ctrl++");
        assert_eq!(combo.to_string().parse::<KeyCombo>().unwrap(), combo);

        let combo: KeyCombo = "Ctrl + Shift + +".parse().unwrap();
        assert_eq!(combo, KeyCombo::new("+").with_ctrl().with_shift());

        let bare: KeyCombo = "+".parse().unwrap();
        assert_eq!(bare, KeyCombo::new("+"));
    }

    #[test]
    fn test_invalid_key_combos() {
        for raw in ["", "Ctrl+Shift", "Ctrl++H", "A+B", "Ctrl+Shift+", "H++"] {
            assert!(
                matches!(raw.parse::<KeyCombo>(), Err(InspectorError::InvalidKeyCombo(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_matches_requires_exact_modifiers() {
        let dump: KeyCombo = "Ctrl+Shift+H".parse().unwrap();
        assert!(dump.matches(&KeyCombo::new("H").with_shift().with_ctrl()));
        assert!(!dump.matches(&KeyCombo::new("h").with_ctrl()));
        assert!(!dump.matches(&KeyCombo::new("h").with_ctrl().with_shift().with_alt()));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(PageEvent::ready().name(), "ready");
        assert_eq!(PageEvent::click(NodeId(1), 1.0, 2.0).name(), "click");
        assert!(matches!(
            PageEvent::click(None, 1.0, 2.0).kind,
            PageEventKind::Click { target: None, .. }
        ));
        assert_eq!(PageEvent::input(NodeId(1), "a").name(), "input");
        assert_eq!(PageEvent::mutation("https://a/").name(), "mutation");
    }
}
