use crate::core::BrowserTrait;
use crate::dom::{DomNode, DomTree, NodeId};
use crate::errors::{InspectorError, Result};
use crate::inspector::{FieldEvent, KeyCombo, PageEvent, PageEventKind};
use crate::types::PointerPosition;
use crate::utils::JavaScriptRunner;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Installs listeners that queue page events on `window.__nodeDataPrinter`.
/// Targets are identified by the same path grammar `resolve_xpath` produces.
const INSTALL_SCRIPT: &str = r#"
(function() {
    if (window.__nodeDataPrinter) {
        return JSON.stringify({ installed: false });
    }

    function xpathOf(element) {
        if (!element || element.nodeType !== 1) return null;
        if (element.id !== '') return '//*[@id="' + element.id + '"]';
        if (element === document.body) return '/html/body';
        if (element === document.documentElement) return '/html';
        if (!element.parentNode || element.parentNode.nodeType !== 1) return null;

        const parentPath = xpathOf(element.parentNode);
        if (parentPath === null) return null;

        let ix = 0;
        for (const sibling of element.parentNode.childNodes) {
            if (sibling === element) {
                return parentPath + '/' + element.tagName.toLowerCase() + '[' + (ix + 1) + ']';
            }
            if (sibling.nodeType === 1 && sibling.tagName === element.tagName) ix++;
        }
        return null;
    }

    function identify(element) {
        if (!element || element.nodeType !== 1) return null;
        return {
            tag: element.tagName.toLowerCase(),
            id: element.id || null,
            name: element.getAttribute('name'),
            type: typeof element.type === 'string' && element.type ? element.type : null,
            placeholder: element.placeholder || null
        };
    }

    const state = { queue: [], lastUrl: location.href, listeners: [] };
    window.__nodeDataPrinter = state;

    function push(entry) {
        entry.timestamp = Date.now();
        state.queue.push(entry);
    }

    function listen(type, handler) {
        document.addEventListener(type, handler, true);
        state.listeners.push([type, handler]);
    }

    listen('click', (event) => push({
        type: 'click',
        xpath: xpathOf(event.target),
        target: identify(event.target),
        x: event.clientX,
        y: event.clientY
    }));
    ['focus', 'blur', 'change', 'input'].forEach((type) => listen(type, (event) => push({
        type: type,
        xpath: xpathOf(event.target),
        target: identify(event.target),
        value: event.target && 'value' in event.target ? String(event.target.value) : null
    })));
    listen('keydown', (event) => push({
        type: 'keydown', key: event.key,
        ctrl: event.ctrlKey, shift: event.shiftKey, alt: event.altKey, meta: event.metaKey
    }));

    state.observer = new MutationObserver(() => {
        if (location.href !== state.lastUrl) {
            state.lastUrl = location.href;
            push({ type: 'mutation', location: location.href });
        }
    });
    state.observer.observe(document, { subtree: true, childList: true });

    return JSON.stringify({ installed: true });
})()
"#;

const DRAIN_SCRIPT: &str = r#"
(function() {
    const state = window.__nodeDataPrinter;
    if (!state) return JSON.stringify([]);
    return JSON.stringify(state.queue.splice(0, state.queue.length));
})()
"#;

const REMOVE_SCRIPT: &str = r#"
(function() {
    const state = window.__nodeDataPrinter;
    if (!state) return JSON.stringify({ removed: false });
    state.listeners.forEach(([type, handler]) => document.removeEventListener(type, handler, true));
    state.observer.disconnect();
    delete window.__nodeDataPrinter;
    return JSON.stringify({ removed: true });
})()
"#;

/// Identifying fields of an event target, read when the event fired.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapturedTarget {
    pub tag: String,
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub placeholder: Option<String>,
}

impl CapturedTarget {
    /// Whether `node` is plausibly the element the event fired on.
    pub fn matches(&self, node: &DomNode) -> bool {
        fn same(captured: &Option<String>, current: Option<&str>) -> bool {
            match captured.as_deref().filter(|v| !v.is_empty()) {
                Some(expected) => current == Some(expected),
                None => current.map_or(true, str::is_empty),
            }
        }

        node.tag_name.eq_ignore_ascii_case(&self.tag)
            && same(&self.id, node.element_id())
            && same(&self.name, node.attribute("name"))
            && same(&self.input_type, node.properties.input_type.as_deref())
            && same(&self.placeholder, node.properties.placeholder.as_deref())
    }

    /// The single attached element matching these fields, if the name or id
    /// narrows it down to one.
    fn find_unique(&self, tree: &DomTree) -> Option<NodeId> {
        if self.id.is_none() && self.name.is_none() {
            return None;
        }
        let mut candidates = tree
            .document_order()
            .into_iter()
            .filter(|id| tree.node(*id).map_or(false, |node| self.matches(node)));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// One queued notification as serialized by the capture script.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub xpath: Option<String>,
    pub target: Option<CapturedTarget>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub value: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
    pub location: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<i64>,
}

impl CapturedEvent {
    /// Turn the notification into a [`PageEvent`], locating its target in
    /// `tree`. A click whose target is gone still resolves, with no target.
    pub fn resolve(&self, tree: &DomTree) -> Result<PageEvent> {
        let kind = match self.event_type.as_str() {
            "click" => PageEventKind::Click {
                target: match self.locate(tree) {
                    Ok(target) => Some(target),
                    Err(e) if e.is_element_local() => {
                        debug!(error = %e, "Clicked element is gone from the snapshot");
                        None
                    }
                    Err(e) => return Err(e),
                },
                position: PointerPosition::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0)),
            },
            "focus" => PageEventKind::Focus(self.field_event(tree)?),
            "blur" => PageEventKind::Blur(self.field_event(tree)?),
            "change" => PageEventKind::Change(self.field_event(tree)?),
            "input" => PageEventKind::Input(self.field_event(tree)?),
            "keydown" => PageEventKind::KeyDown(self.key_combo()?),
            "mutation" => PageEventKind::Mutation {
                location: self
                    .location
                    .clone()
                    .ok_or_else(|| InspectorError::InvalidLocation("<missing>".to_string()))?,
            },
            other => {
                return Err(InspectorError::SnapshotFailed(format!(
                    "unknown captured event type '{}'",
                    other
                )))
            }
        };

        Ok(PageEvent::at(kind, self.captured_at()))
    }

    /// Locate the target by its path, checked against the fields captured
    /// at event time. Positional paths go stale when siblings are inserted
    /// before the target; such a match is replaced by the unique element
    /// carrying the captured id or name, or rejected.
    fn locate(&self, tree: &DomTree) -> Result<NodeId> {
        let xpath = self
            .xpath
            .as_deref()
            .ok_or_else(|| InspectorError::UnlocatableNode(self.event_type.clone()))?;
        let located = tree.locate(xpath);

        let Some(expected) = &self.target else {
            return located.ok_or_else(|| InspectorError::NodeNotFound(xpath.to_string()));
        };

        if let Some(id) = located {
            if tree.node(id).map_or(false, |node| expected.matches(node)) {
                return Ok(id);
            }
        }

        match expected.find_unique(tree) {
            Some(id) => {
                debug!(xpath, tag = %expected.tag, "Event path went stale; matched target by its fields");
                Ok(id)
            }
            None => Err(InspectorError::NodeNotFound(format!("<{}> at {}", expected.tag, xpath))),
        }
    }

    fn field_event(&self, tree: &DomTree) -> Result<FieldEvent> {
        let mut field = FieldEvent::new(self.locate(tree)?);
        if let Some(value) = &self.value {
            field = field.with_value(value);
        }
        Ok(field)
    }

    fn key_combo(&self) -> Result<KeyCombo> {
        let key = self
            .key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| InspectorError::InvalidKeyCombo("<missing key>".to_string()))?;

        let mut combo = KeyCombo::new(key);
        if self.ctrl {
            combo = combo.with_ctrl();
        }
        if self.shift {
            combo = combo.with_shift();
        }
        if self.alt {
            combo = combo.with_alt();
        }
        if self.meta {
            combo = combo.with_meta();
        }
        Ok(combo)
    }

    fn captured_at(&self) -> DateTime<Utc> {
        self.timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now)
    }
}

/// Owns the lifecycle of the in-page capture script.
pub struct EventCapture {
    installed: Arc<RwLock<bool>>,
    script_timeout_ms: u64,
}

impl EventCapture {
    pub fn new(script_timeout_ms: u64) -> Self {
        Self {
            installed: Arc::new(RwLock::new(false)),
            script_timeout_ms,
        }
    }

    pub async fn is_installed(&self) -> bool {
        *self.installed.read().await
    }

    /// Install the capture script. Safe to call again after a full page load
    /// replaced the document.
    pub async fn install<B: BrowserTrait>(&self, browser: &B, tab: &B::TabHandle) -> Result<()> {
        let mut installed = self.installed.write().await;

        #[derive(Deserialize)]
        struct Installed {
            installed: bool,
        }

        let result: Installed =
            JavaScriptRunner::execute_json(browser, tab, INSTALL_SCRIPT, self.script_timeout_ms)
                .await?;
        if result.installed {
            info!("NodeData Printer: event capture attached to document");
        } else {
            debug!("Event capture already present in page");
        }

        *installed = true;
        Ok(())
    }

    /// Take every queued notification out of the page.
    pub async fn drain<B: BrowserTrait>(
        &self,
        browser: &B,
        tab: &B::TabHandle,
    ) -> Result<Vec<CapturedEvent>> {
        if !*self.installed.read().await {
            return Ok(Vec::new());
        }

        let events: Vec<CapturedEvent> =
            JavaScriptRunner::execute_json(browser, tab, DRAIN_SCRIPT, self.script_timeout_ms)
                .await?;
        if !events.is_empty() {
            debug!(count = events.len(), "Drained captured events");
        }
        Ok(events)
    }

    pub async fn remove<B: BrowserTrait>(&self, browser: &B, tab: &B::TabHandle) -> Result<()> {
        let mut installed = self.installed.write().await;
        if !*installed {
            return Ok(());
        }

        JavaScriptRunner::execute(browser, tab, REMOVE_SCRIPT).await?;
        *installed = false;

        info!("NodeData Printer: event capture removed");
        Ok(())
    }
}
