use thiserror::Error;

/// Top-level error type for the ShopBot system.
///
/// Subsystem crates define their own error types and convert into
/// `ShopError` where they cross into the binary or the HTTP surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShopError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for ShopError {
    fn from(err: toml::de::Error) -> Self {
        ShopError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ShopError {
    fn from(err: toml::ser::Error) -> Self {
        ShopError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ShopError::Config("bad port".to_string()).to_string(),
            "Configuration error: bad port"
        );
        assert_eq!(
            ShopError::Session("unknown key".to_string()).to_string(),
            "Session error: unknown key"
        );
        assert_eq!(ShopError::ShuttingDown.to_string(), "Shutdown in progress");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ShopError = io.into();
        assert!(matches!(err, ShopError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_from_toml_error() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("not = [valid");
        let err: ShopError = parse.unwrap_err().into();
        assert!(matches!(err, ShopError::Config(_)));
    }

    #[test]
    fn test_from_json_error() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: ShopError = parse.unwrap_err().into();
        assert!(matches!(err, ShopError::Serialization(_)));
    }
}
