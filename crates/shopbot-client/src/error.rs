//! Error types for the client library.

/// Errors from the client side of a session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("load rejected ({status}): {message}")]
    Load { status: u16, message: String },
    #[error("websocket error: {0}")]
    WebSocket(String),
    #[error("not connected")]
    NotConnected,
    #[error("audio error: {0}")]
    Audio(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Load {
            status: 400,
            message: "userName is required".to_string(),
        };
        assert_eq!(err.to_string(), "load rejected (400): userName is required");
        assert_eq!(ClientError::NotConnected.to_string(), "not connected");
        assert_eq!(
            ClientError::Audio("bad base64".to_string()).to_string(),
            "audio error: bad base64"
        );
    }
}
