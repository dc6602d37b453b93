use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectorError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("Tab creation failed: {0}")]
    TabCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("JavaScript execution timeout")]
    JavaScriptTimeout,

    #[error("Page snapshot failed: {0}")]
    SnapshotFailed(String),

    #[error("Node cannot be located in the document: <{0}>")]
    UnlocatableNode(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid key combination: {0}")]
    InvalidKeyCombo(String),

    #[error("Page readiness was never signalled")]
    ReadySignalDropped,

    #[error("Timed out waiting for the page to become ready")]
    ReadyTimeout,

    #[error("Invalid page location: {0}")]
    InvalidLocation(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, InspectorError>;

// Convert anyhow::Error to InspectorError
impl From<anyhow::Error> for InspectorError {
    fn from(err: anyhow::Error) -> Self {
        InspectorError::AnyhowError(err.to_string())
    }
}

impl InspectorError {
    /// Errors scoped to a single element. These are logged and skipped,
    /// never allowed to abort a scan.
    pub fn is_element_local(&self) -> bool {
        matches!(
            self,
            InspectorError::UnlocatableNode(_) | InspectorError::NodeNotFound(_)
        )
    }
}
