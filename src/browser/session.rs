use crate::core::{BrowserTrait, Config};
use crate::dom::{DomTree, PageSnapshot};
use crate::errors::{InspectorError, Result};
use crate::inspector::{ready_channel, InspectorOutcome, PageEvent, PageInspector, ReadySignal, ReadyWaiter};
use crate::utils::JavaScriptRunner;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::event_capture::EventCapture;

const READY_STATE_CONDITION: &str =
    "document.readyState === 'interactive' || document.readyState === 'complete'";

/// Serializes every element of the document in document order. `{prefix}` is
/// the number of inner-markup characters kept per element.
const SNAPSHOT_SCRIPT: &str = r#"
(function() {
    const index = new Map();
    const nodes = [];
    document.querySelectorAll('*').forEach((element) => {
        index.set(element, nodes.length);
        const style = window.getComputedStyle(element);
        const rect = element.getBoundingClientRect();
        const parent = element.parentElement ? index.get(element.parentElement) : undefined;
        nodes.push({
            tag: element.tagName.toLowerCase(),
            parent: parent === undefined ? null : parent,
            attributes: Array.from(element.attributes).map((attr) => [attr.name, attr.value]),
            text: element.textContent || '',
            innerHtml: element.innerHTML.slice(0, {prefix}),
            value: element.value !== undefined ? String(element.value) : null,
            href: element.href ? String(element.href) : null,
            placeholder: element.placeholder || null,
            type: typeof element.type === 'string' && element.type ? element.type : null,
            display: style.display,
            visibility: style.visibility,
            opacity: parseFloat(style.opacity),
            x: rect.x,
            y: rect.y,
            width: element.offsetWidth || rect.width,
            height: element.offsetHeight || rect.height
        });
    });
    return JSON.stringify({
        url: location.href,
        title: document.title,
        readyState: document.readyState,
        nodes: nodes
    });
})()
"#;

/// Drives a [`PageInspector`] from a live browser tab.
pub struct InspectorSession<B: BrowserTrait> {
    browser: B,
    tab: B::TabHandle,
    config: Config,
    inspector: Arc<Mutex<PageInspector>>,
    capture: EventCapture,
    ready: ReadySignal,
    ready_waiter: ReadyWaiter,
    session_id: String,
    polls: u64,
}

impl<B: BrowserTrait> InspectorSession<B> {
    pub async fn new(mut browser: B, config: Config) -> Result<Self> {
        config.validate()?;
        let inspector = PageInspector::new(&config.inspector)?;

        browser.launch(&config).await?;
        let tab = browser.new_tab().await?;
        let (ready, ready_waiter) = ready_channel();
        let session_id = uuid::Uuid::new_v4().to_string();

        info!(session = %session_id, "Inspector session started");

        Ok(Self {
            browser,
            tab,
            capture: EventCapture::new(config.session.script_timeout_ms),
            config,
            inspector: Arc::new(Mutex::new(inspector)),
            ready,
            ready_waiter,
            session_id,
            polls: 0,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn inspector(&self) -> Arc<Mutex<PageInspector>> {
        Arc::clone(&self.inspector)
    }

    /// A waiter released once the attached page has loaded.
    pub fn ready_waiter(&self) -> ReadyWaiter {
        self.ready_waiter.clone()
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Navigate to `url` and start inspecting it.
    pub async fn attach(&mut self, url: &str) -> Result<InspectorOutcome> {
        info!(url, "Attaching inspector");
        self.browser.navigate(&self.tab, url).await?;

        let landed = self.browser.get_url(&self.tab).await?;
        let title = self.browser.get_title(&self.tab).await?;
        info!(url = %landed, title = %title, "Navigation finished");

        self.initialize().await
    }

    /// Install event capture, wait for the document to be ready, then log
    /// the initial inventories.
    pub async fn initialize(&mut self) -> Result<InspectorOutcome> {
        self.capture.install(&self.browser, &self.tab).await?;

        let timeout_ms = self.config.session.ready_timeout_ms;
        let loaded =
            JavaScriptRunner::wait_for_condition(&self.browser, &self.tab, READY_STATE_CONDITION, timeout_ms, 100)
                .await?;
        if loaded {
            self.ready.resolve();
        }

        let mut waiter = self.ready_waiter();
        waiter.wait_timeout(Duration::from_millis(timeout_ms)).await?;

        let tree = self.snapshot().await?;
        let mut inspector = self.inspector.lock().await;
        Ok(inspector.handle_event(&tree, PageEvent::ready()))
    }

    /// Capture the current document as a [`DomTree`].
    pub async fn snapshot(&self) -> Result<DomTree> {
        let script = SNAPSHOT_SCRIPT.replace("{prefix}", &self.config.inspector.inner_html_prefix.to_string());
        let snapshot: PageSnapshot = JavaScriptRunner::execute_json(
            &self.browser,
            &self.tab,
            &script,
            self.config.session.script_timeout_ms,
        )
        .await
        .map_err(|e| match e {
            InspectorError::JavaScriptTimeout => e,
            other => InspectorError::SnapshotFailed(other.to_string()),
        })?;

        debug!(nodes = snapshot.nodes.len(), ready_state = %snapshot.ready_state, "Snapshot taken");
        DomTree::from_snapshot(snapshot)
    }

    /// Drain captured events, snapshot the page and feed the inspector.
    /// Form events whose target cannot be found in the snapshot are dropped;
    /// clicks always run a detector cycle.
    pub async fn poll(&mut self) -> Result<Vec<InspectorOutcome>> {
        let captured = self.capture.drain(&self.browser, &self.tab).await?;
        let tree = self.snapshot().await?;

        let mut outcomes = Vec::with_capacity(captured.len());
        let mut inspector = self.inspector.lock().await;

        for event in captured {
            match event.resolve(&tree) {
                Ok(page_event) => outcomes.push(inspector.handle_event(&tree, page_event)),
                Err(e) => warn!(event = %event.event_type, error = %e, "Dropping captured event"),
            }
        }

        // A full page load replaces the document and our listeners with it.
        let navigated = inspector.is_ready() && !inspector.detector().is_current_location(tree.url());
        if navigated {
            outcomes.push(inspector.handle_event(&tree, PageEvent::mutation(tree.url())));
            drop(inspector);
            self.capture.install(&self.browser, &self.tab).await?;
        }

        self.polls += 1;
        Ok(outcomes)
    }

    /// Poll every `interval` until `max_polls` polls have run, or until
    /// Ctrl+C when `max_polls` is zero.
    pub async fn run(&mut self, interval: Duration, max_polls: u64) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        let mut completed = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping inspector session");
                    break;
                }
            }

            match self.poll().await {
                Ok(outcomes) => debug!(handled = outcomes.len(), "Poll complete"),
                Err(e @ InspectorError::JavaScriptTimeout) | Err(e @ InspectorError::SnapshotFailed(_)) => {
                    warn!(error = %e, "Poll failed, retrying on next tick")
                }
                Err(e) => return Err(e),
            }

            completed += 1;
            if max_polls > 0 && completed >= max_polls {
                break;
            }
        }

        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.capture.remove(&self.browser, &self.tab).await {
            warn!(error = %e, "Could not remove event capture");
        }
        self.browser.close().await?;
        info!(session = %self.session_id, polls = self.polls, "Inspector session closed");
        Ok(())
    }
}

#[cfg(feature = "chrome")]
impl InspectorSession<crate::browser::ChromeBrowser> {
    /// Quick builder with custom config
    pub async fn with_config(config: Config) -> Result<Self> {
        let browser = crate::browser::ChromeBrowser::new();
        Self::new(browser, config).await
    }
}
