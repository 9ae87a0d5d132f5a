//! Error types for tool dispatch.

use shopbot_cart::CartError;

/// Faults raised while executing a tool call.
///
/// Domain failures such as "product not found" are not faults: handlers
/// return them as structured result payloads. These variants cover what is
/// left, and the dispatcher turns each into an `{error}` result for the one
/// call it belongs to.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("Cart failure: {0}")]
    Cart(#[from] CartError),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        assert_eq!(
            ToolError::UnknownTool("fly_drone".to_string()).to_string(),
            "Unknown tool: fly_drone"
        );
        let err = ToolError::InvalidArguments {
            tool: "add_to_cart".to_string(),
            message: "missing field `product_id`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid arguments for add_to_cart: missing field `product_id`"
        );
    }

    #[test]
    fn test_tool_error_from_cart_error() {
        let err: ToolError = CartError::Storage("poisoned".to_string()).into();
        assert!(matches!(err, ToolError::Cart(_)));
        assert!(err.to_string().contains("poisoned"));
    }
}
