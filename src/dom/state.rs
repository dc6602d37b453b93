use crate::dom::ElementDescriptor;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Element inventories of one page, as logged on load and after navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInventory {
    pub url: String,
    pub title: String,
    pub elements: Vec<ElementDescriptor>,
    pub interactive_elements: Vec<ElementDescriptor>,
    pub skipped: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl PageInventory {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            elements: Vec::new(),
            interactive_elements: Vec::new(),
            skipped: 0,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn interactive_count(&self) -> usize {
        self.interactive_elements.len()
    }

    pub fn find_elements_by_tag(&self, tag_name: &str) -> Vec<&ElementDescriptor> {
        self.interactive_elements
            .iter()
            .chain(self.elements.iter())
            .filter(|e| e.tag_name == tag_name)
            .fold(Vec::new(), |mut found, e| {
                if !found.iter().any(|f: &&ElementDescriptor| f.xpath == e.xpath) {
                    found.push(e);
                }
                found
            })
    }

    pub fn find_elements_by_text(&self, text: &str) -> Vec<&ElementDescriptor> {
        let needle = text.to_lowercase();
        self.interactive_elements
            .iter()
            .filter(|e| {
                e.text_content
                    .as_ref()
                    .map(|t| t.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Write the grouped inventory to the log.
    pub fn log(&self, log_descriptors: bool) {
        info!(url = %self.url, title = %self.title, "=== INTERACTIVE NODEDATA ===");
        info!("Found {} interactive elements", self.interactive_count());
        if log_descriptors {
            for element in &self.interactive_elements {
                info!(
                    xpath = %element.xpath,
                    node = %element.to_json(),
                    "Interactive element ({})",
                    element.tag_name
                );
            }
        }
        info!("=== END INTERACTIVE NODEDATA ===");

        if !self.elements.is_empty() {
            info!("=== ALL NODEDATA ===");
            info!("Found {} total elements", self.element_count());
            info!("=== END ALL NODEDATA ===");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> PageInventory {
        let mut inventory = PageInventory::new("https://example.com/", "Example");
        inventory.interactive_elements = vec![
            ElementDescriptor::new("a", "/html/body/a[1]").with_text_content("Sign In"),
            ElementDescriptor::new("button", "/html/body/button[1]").with_text_content("Search"),
        ];
        inventory.elements = vec![
            ElementDescriptor::new("html", "/html"),
            ElementDescriptor::new("body", "/html/body"),
            ElementDescriptor::new("a", "/html/body/a[1]").with_text_content("Sign In"),
            ElementDescriptor::new("button", "/html/body/button[1]").with_text_content("Search"),
        ];
        inventory
    }

    #[test]
    fn test_counts() {
        let inventory = inventory();
        assert_eq!(inventory.element_count(), 4);
        assert_eq!(inventory.interactive_count(), 2);
    }

    #[test]
    fn test_find_by_tag_deduplicates_across_lists() {
        let inventory = inventory();
        assert_eq!(inventory.find_elements_by_tag("a").len(), 1);
        assert_eq!(inventory.find_elements_by_tag("body").len(), 1);
        assert!(inventory.find_elements_by_tag("input").is_empty());
    }

    #[test]
    fn test_find_by_text_is_case_insensitive() {
        let inventory = inventory();
        let found = inventory.find_elements_by_text("sign");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag_name, "a");
    }
}
