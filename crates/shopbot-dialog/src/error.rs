//! Error types for turn reconciliation.

use shopbot_core::ShopError;
use shopbot_tools::ToolError;

/// Errors from the dialog layer.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("message cannot be empty")]
    EmptyInput,
    #[error("message exceeds maximum length of {0} characters")]
    InputTooLong(usize),
    #[error("invalid turn transition: {0}")]
    InvalidTransition(String),
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("speech error: {0}")]
    Speech(String),
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
    #[error("event channel closed")]
    ChannelClosed,
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for DialogError {
    fn from(err: reqwest::Error) -> Self {
        DialogError::Llm(err.to_string())
    }
}

impl From<DialogError> for ShopError {
    fn from(err: DialogError) -> Self {
        match err {
            DialogError::Llm(msg) => ShopError::Llm(msg),
            DialogError::ChannelClosed => ShopError::Transport(err.to_string()),
            other => ShopError::Session(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_error_display() {
        assert_eq!(DialogError::EmptyInput.to_string(), "message cannot be empty");
        assert_eq!(
            DialogError::InputTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            DialogError::Llm("HTTP 500".to_string()).to_string(),
            "LLM error: HTTP 500"
        );
        assert_eq!(DialogError::ChannelClosed.to_string(), "event channel closed");
    }

    #[test]
    fn test_into_shop_error() {
        let err: ShopError = DialogError::Llm("timeout".to_string()).into();
        assert!(matches!(err, ShopError::Llm(_)));

        let err: ShopError = DialogError::ChannelClosed.into();
        assert!(matches!(err, ShopError::Transport(_)));

        let err: ShopError = DialogError::EmptyInput.into();
        assert!(matches!(err, ShopError::Session(_)));
    }
}
