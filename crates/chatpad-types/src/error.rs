use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A request is already in flight")]
    Busy,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0}ms")]
    Timeout(u32),

    #[error("JS interop error: {0}")]
    JsInterop(String),
}

impl ChatError {
    /// True for failures of the outbound completion request
    pub fn is_network(&self) -> bool {
        matches!(self, ChatError::Network(_) | ChatError::Timeout(_))
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}
