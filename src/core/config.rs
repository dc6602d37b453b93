use crate::errors::{InspectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub inspector: InspectorConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub disable_images: bool,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Tags scanned for interactive elements, in scan order.
    pub interactive_tags: Vec<String>,
    /// Number of characters of inner markup that feed the identity hash.
    pub inner_html_prefix: usize,
    /// Key combination that dumps the form interaction history.
    pub dump_key: String,
    pub log_full_inventory: bool,
    pub log_descriptors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    pub ready_timeout_ms: u64,
    pub script_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Config {
    /// Load a JSON config file. Sections missing from the file keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inspector.interactive_tags.is_empty() {
            return Err(InspectorError::ConfigurationError(
                "inspector.interactive_tags must not be empty".to_string(),
            ));
        }
        if self.session.poll_interval_ms == 0 {
            return Err(InspectorError::ConfigurationError(
                "session.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            disable_images: false,
            args: vec![],
            timeout_ms: 30000,
        }
    }
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            interactive_tags: ["a", "button", "input", "select", "textarea", "label"]
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            inner_html_prefix: 100,
            dump_key: "Ctrl+Shift+H".to_string(),
            log_full_inventory: true,
            log_descriptors: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            ready_timeout_ms: 10000,
            script_timeout_ms: 5000,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_scale_factor: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interactive_tags() {
        let config = Config::default();
        assert_eq!(
            config.inspector.interactive_tags,
            vec!["a", "button", "input", "select", "textarea", "label"]
        );
        assert_eq!(config.inspector.inner_html_prefix, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"inspector": {"dump_key": "Alt+D"}}"#).unwrap();
        assert_eq!(config.inspector.dump_key, "Alt+D");
        assert_eq!(config.inspector.inner_html_prefix, 100);
        assert_eq!(config.session.poll_interval_ms, 500);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_validate_rejects_empty_tags() {
        let mut config = Config::default();
        config.inspector.interactive_tags.clear();
        assert!(matches!(
            config.validate(),
            Err(InspectorError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let result = Config::from_file("/nonexistent/node-data-printer.json");
        assert!(matches!(result, Err(InspectorError::IoError(_))));
    }
}
