use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopbot_core::SessionKey;

use crate::error::ToolError;

/// The closed set of shopping tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    RecommendProducts,
    GetProductInfo,
    AddToCart,
    UpdateCart,
    ViewCart,
    CheckoutOrder,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::RecommendProducts,
        ToolName::GetProductInfo,
        ToolName::AddToCart,
        ToolName::UpdateCart,
        ToolName::ViewCart,
        ToolName::CheckoutOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::RecommendProducts => "recommend_products",
            ToolName::GetProductInfo => "get_product_info",
            ToolName::AddToCart => "add_to_cart",
            ToolName::UpdateCart => "update_cart",
            ToolName::ViewCart => "view_cart",
            ToolName::CheckoutOrder => "checkout_order",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// One tool invocation requested by the model.
///
/// While streaming, the same type carries a fragment: `args` then holds only
/// the next slice of the JSON argument text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args: args.into(),
        }
    }

    pub fn tool_name(&self) -> Option<ToolName> {
        self.name.parse().ok()
    }
}

/// Per-session facts handed to every handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolContext {
    pub session: SessionKey,
    /// Customer name used when a call does not name one.
    pub user_name: Option<String>,
    /// Persona knowledge text, consulted by checkout as a last resort.
    pub knowledge: Option<String>,
}

impl ToolContext {
    pub fn new(session: SessionKey) -> Self {
        Self {
            session,
            user_name: None,
            knowledge: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutcome {
    /// The handler ran. The value may still be a structured domain failure.
    Completed(Value),
    /// No handler is registered under the requested name.
    UnknownTool(String),
    /// The handler faulted (bad arguments, internal error, panic).
    Failed(String),
}

impl ToolOutcome {
    /// JSON result attached to the call.
    pub fn to_value(&self) -> Value {
        match self {
            ToolOutcome::Completed(value) => value.clone(),
            ToolOutcome::UnknownTool(name) => json!({ "error": format!("Unknown tool: {}", name) }),
            ToolOutcome::Failed(message) => {
                json!({ "error": format!("Tool execution failed: {}", message) })
            }
        }
    }

    /// True unless the result reports a failure of any kind.
    pub fn is_success(&self) -> bool {
        match self {
            ToolOutcome::Completed(value) => {
                value.get("error").is_none()
                    && value.get("success").and_then(Value::as_bool) != Some(false)
            }
            ToolOutcome::UnknownTool(_) | ToolOutcome::Failed(_) => false,
        }
    }
}

/// A call paired with what came of it.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub call: ToolCall,
    pub outcome: ToolOutcome,
}

impl ToolInvocation {
    pub fn tool_name(&self) -> Option<ToolName> {
        self.call.tool_name()
    }

    pub fn result(&self) -> Value {
        self.outcome.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_roundtrip() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>().unwrap(), name);
            assert_eq!(
                serde_json::to_value(name).unwrap(),
                Value::String(name.to_string())
            );
        }
        assert!(matches!(
            "launch_rocket".parse::<ToolName>(),
            Err(ToolError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_outcome_values() {
        let unknown = ToolOutcome::UnknownTool("x".to_string());
        assert_eq!(unknown.to_value(), json!({"error": "Unknown tool: x"}));
        assert!(!unknown.is_success());

        let failed = ToolOutcome::Failed("boom".to_string());
        assert_eq!(
            failed.to_value(),
            json!({"error": "Tool execution failed: boom"})
        );

        let domain_failure = ToolOutcome::Completed(json!({"success": false, "error": "nope"}));
        assert!(!domain_failure.is_success());
        assert!(ToolOutcome::Completed(json!({"items": []})).is_success());
    }
}
