use crate::core::{BrowserTrait, Config};
use crate::dom::{DomTree, ElementDescriptor, NodeId, PageInventory};
use crate::errors::Result;
use crate::inspector::PageEvent;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct TestHelper;

impl TestHelper {
    pub const URL: &'static str = "https://example.test/";

    pub fn parse(html: &str) -> DomTree {
        DomTree::parse_html(html, Self::URL)
    }

    /// Exactly five visible interactive elements, one per scanned tag except
    /// `label`.
    pub fn five_interactive_page() -> &'static str {
        r#"<!DOCTYPE html>
<html>
<head><title>Shop</title></head>
<body>
  <h1>Shop</h1>
  <a href="/home">Home</a>
  <button id="buy">Buy</button>
  <input name="q" placeholder="Search">
  <select name="size"><option>S</option><option>M</option></select>
  <textarea name="note"></textarea>
</body>
</html>"#
    }

    /// A sign-up form. Every `id` is unique.
    pub fn form_page() -> &'static str {
        r#"<!DOCTYPE html>
<html>
<head><title>Sign up</title></head>
<body>
  <form id="signup" action="/signup">
    <label for="name">Name</label>
    <input id="name" name="name" placeholder="Full name">
    <label for="email">Email</label>
    <input id="email" name="email" type="email">
    <select id="plan" name="plan">
      <option value="free">Free</option>
      <option value="pro" selected>Pro</option>
    </select>
    <textarea id="bio" name="bio"></textarea>
    <div><input type="checkbox" name="terms"><span>I agree</span></div>
    <input type="hidden" name="csrf" value="t0k3n">
    <button type="submit">Sign up</button>
  </form>
</body>
</html>"#
    }

    /// Seven buttons; only the one labelled "Visible" passes every
    /// visibility rule.
    pub fn hidden_elements_page() -> &'static str {
        r#"<!DOCTYPE html>
<html>
<body>
  <button>Visible</button>
  <button style="display: none">Display none</button>
  <button hidden>Hidden attribute</button>
  <button style="visibility: hidden">Visibility hidden</button>
  <button style="opacity: 0">Transparent</button>
  <button style="width: 0px">Zero width</button>
  <div style="display:none"><button>Inside hidden parent</button></div>
</body>
</html>"#
    }

    /// `count` links, buttons and inputs, all with distinct content.
    pub fn large_page(count: usize) -> String {
        let mut html = String::from("<!DOCTYPE html><html><body>");
        for i in 0..count {
            let _ = write!(
                html,
                r#"<div class="row"><a href="/item/{i}">Item {i}</a><button data-row="{i}">Add {i}</button><input name="qty-{i}" value="{i}"></div>"#,
                i = i
            );
        }
        html.push_str("</body></html>");
        html
    }

    /// A live-page snapshot: a visible submit button and a hidden coupon
    /// input.
    pub fn snapshot_json() -> Value {
        json!({
            "url": "https://shop.example/cart",
            "title": "Cart",
            "readyState": "complete",
            "nodes": [
                {"tag": "html", "parent": null, "width": 1280, "height": 720},
                {"tag": "head", "parent": 0, "display": "none"},
                {"tag": "body", "parent": 0, "width": 1280, "height": 700},
                {
                    "tag": "button", "parent": 2,
                    "attributes": [["class", "buy primary"], ["type", "submit"]],
                    "text": "Buy now", "innerHtml": "Buy now",
                    "value": "", "type": "submit",
                    "display": "inline-block",
                    "x": 10, "y": 20, "width": 80, "height": 30
                },
                {
                    "tag": "input", "parent": 2,
                    "attributes": [["id", "coupon"], ["placeholder", "Coupon"]],
                    "value": "", "placeholder": "Coupon", "type": "text",
                    "display": "none"
                }
            ]
        })
    }

    /// The input events a user produces typing `text` one character at a
    /// time into `target`.
    pub fn typing(target: NodeId, text: &str) -> Vec<PageEvent> {
        text.char_indices()
            .map(|(i, c)| PageEvent::input(target, &text[..i + c.len_utf8()]))
            .collect()
    }

    pub fn count_elements_by_type(inventory: &PageInventory, element_type: &str) -> usize {
        inventory
            .elements
            .iter()
            .filter(|e| e.tag_name == element_type)
            .count()
    }

    pub fn find_elements_with_text<'a>(
        inventory: &'a PageInventory,
        text: &str,
    ) -> Vec<&'a ElementDescriptor> {
        inventory.find_elements_by_text(text)
    }

    pub fn get_form_elements(inventory: &PageInventory) -> Vec<&ElementDescriptor> {
        inventory
            .interactive_elements
            .iter()
            .filter(|e| {
                matches!(
                    e.tag_name.as_str(),
                    "input" | "textarea" | "select" | "button"
                )
            })
            .collect()
    }
}

#[derive(Debug)]
struct ScriptedState {
    snapshot: Value,
    queue: Vec<Value>,
    capture_installed: bool,
    ready: bool,
    running: bool,
    executed: usize,
    installs: usize,
    navigations: Vec<String>,
}

/// In-memory [`BrowserTrait`] that answers the inspector's scripts from a
/// canned snapshot and a queue of captured events. Clones share state.
#[derive(Debug, Clone)]
pub struct ScriptedBrowser {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedBrowser {
    pub fn new(snapshot: Value) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                snapshot,
                queue: Vec::new(),
                capture_installed: false,
                ready: true,
                running: false,
                executed: 0,
                installs: 0,
                navigations: Vec::new(),
            })),
        }
    }

    /// `document.readyState` stays `loading` forever.
    pub fn never_ready(self) -> Self {
        self.state().ready = false;
        self
    }

    pub fn queue_event(&self, event: Value) {
        self.state().queue.push(event);
    }

    pub fn set_snapshot(&self, snapshot: Value) {
        self.state().snapshot = snapshot;
    }

    pub fn executed_count(&self) -> usize {
        self.state().executed
    }

    pub fn install_count(&self) -> usize {
        self.state().installs
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BrowserTrait for ScriptedBrowser {
    type TabHandle = ();

    async fn launch(&mut self, _config: &Config) -> Result<()> {
        self.state().running = true;
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        Ok(())
    }

    async fn navigate(&self, _tab: &Self::TabHandle, url: &str) -> Result<()> {
        self.state().navigations.push(url.to_string());
        Ok(())
    }

    async fn execute_script(&self, _tab: &Self::TabHandle, script: &str) -> Result<Value> {
        let mut state = self.state();
        state.executed += 1;

        let result = if script.contains("splice") {
            let drained: Vec<Value> = if state.capture_installed {
                state.queue.drain(..).collect()
            } else {
                Vec::new()
            };
            Value::String(Value::Array(drained).to_string())
        } else if script.contains("removeEventListener") {
            state.capture_installed = false;
            json!({ "removed": true })
        } else if script.contains("addEventListener") {
            state.installs += 1;
            let fresh = !state.capture_installed;
            state.capture_installed = true;
            Value::String(json!({ "installed": fresh }).to_string())
        } else if script.contains("querySelectorAll('*')") {
            state.snapshot.clone()
        } else if script.contains("document.readyState") {
            Value::Bool(state.ready)
        } else if script.trim() == "document.title" {
            state.snapshot["title"].clone()
        } else {
            Value::Null
        };

        Ok(result)
    }

    async fn get_url(&self, _tab: &Self::TabHandle) -> Result<String> {
        Ok(self.state().snapshot["url"].as_str().unwrap_or("").to_string())
    }

    async fn get_title(&self, tab: &Self::TabHandle) -> Result<String> {
        let title = self.execute_script(tab, "document.title").await?;
        Ok(title.as_str().unwrap_or("").to_string())
    }

    fn is_running(&self) -> bool {
        self.state().running
    }

    async fn close(&mut self) -> Result<()> {
        self.state().running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomProcessor;
    use crate::inspector::PageEventKind;

    #[test]
    fn test_fixture_counts() {
        let processor = DomProcessor::default();

        let tree = TestHelper::parse(TestHelper::form_page());
        let inventory = processor.extract_inventory(&tree, true);
        assert_eq!(TestHelper::count_elements_by_type(&inventory, "input"), 4);
        assert_eq!(TestHelper::get_form_elements(&inventory).len(), 7);
        assert_eq!(TestHelper::find_elements_with_text(&inventory, "sign").len(), 1);

        let large = TestHelper::parse(&TestHelper::large_page(3));
        let inventory = processor.extract_inventory(&large, false);
        assert_eq!(inventory.interactive_count(), 9);
    }

    #[test]
    fn test_typing_builds_growing_values() {
        let values: Vec<String> = TestHelper::typing(NodeId(4), "héy")
            .into_iter()
            .filter_map(|event| match event.kind {
                PageEventKind::Input(field) => field.value,
                _ => None,
            })
            .collect();
        assert_eq!(values, vec!["h", "hé", "héy"]);
    }

    #[tokio::test]
    async fn test_scripted_browser_answers_title_and_url() {
        let mut browser = ScriptedBrowser::new(TestHelper::snapshot_json());
        browser.launch(&Config::default()).await.unwrap();
        browser.navigate(&(), "https://shop.example/cart").await.unwrap();

        assert!(browser.is_running());
        assert_eq!(browser.get_title(&()).await.unwrap(), "Cart");
        assert_eq!(browser.get_url(&()).await.unwrap(), "https://shop.example/cart");
        assert_eq!(browser.navigations(), vec!["https://shop.example/cart"]);
    }
}
