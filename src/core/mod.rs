pub mod browser;
pub mod config;

pub use browser::BrowserTrait;
pub use config::{BrowserConfig, Config, InspectorConfig, SessionConfig, Viewport};
