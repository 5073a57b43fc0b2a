use thiserror::Error;

/// Errors produced by the inspector outside the analysis core.
///
/// The analysis engine itself never surfaces these to callers; the
/// [`Analyzer`](crate::analysis::Analyzer) degrades to an empty report instead.
#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Failed to parse DOM: {0}")]
    DomParseFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No inspection session is active")]
    SessionInactive,

    #[error("An inspection session is already active")]
    SessionAlreadyActive,

    #[error("History store error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Gave up connecting to {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InspectorError {
    pub(crate) fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InspectorError>;
