//! Tool handler registry and trait definition.
//!
//! Defines the `ToolHandler` async trait and the registry that maps a tool
//! name to the handler bound to the cart engine.

pub mod add_to_cart;
pub mod checkout;
pub mod product_info;
pub mod recommend;
pub mod update_cart;
pub mod view_cart;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shopbot_cart::{CartEngine, CartError, ErrorKind};

use crate::error::ToolError;
use crate::types::{ToolContext, ToolName};

/// Executes one kind of tool call against the cart engine.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> ToolName;

    /// Run the call. `args` is the raw JSON argument text from the model.
    async fn execute(&self, ctx: &ToolContext, args: &str) -> Result<Value, ToolError>;
}

/// Name to handler table.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<ToolName, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all six shopping tools bound to `engine`.
    pub fn with_defaults(engine: Arc<CartEngine>) -> Self {
        let mut registry = Self::new();
        registry.register_defaults(engine);
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn register_defaults(&mut self, engine: Arc<CartEngine>) {
        self.register(Arc::new(recommend::RecommendHandler::new(Arc::clone(&engine))));
        self.register(Arc::new(product_info::ProductInfoHandler::new(Arc::clone(
            &engine,
        ))));
        self.register(Arc::new(add_to_cart::AddToCartHandler::new(Arc::clone(
            &engine,
        ))));
        self.register(Arc::new(update_cart::UpdateCartHandler::new(Arc::clone(
            &engine,
        ))));
        self.register(Arc::new(view_cart::ViewCartHandler::new(Arc::clone(&engine))));
        self.register(Arc::new(checkout::CheckoutHandler::new(engine)));
    }

    /// Look a handler up by its wire name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        let tool: ToolName = name.parse().ok()?;
        self.handlers.get(&tool).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Parse tool arguments. Blank text counts as an empty object.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: ToolName, args: &str) -> Result<T, ToolError> {
    let raw = if args.trim().is_empty() { "{}" } else { args };
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// The call's own `user_name`, else the session's.
pub(crate) fn user_name(explicit: Option<String>, ctx: &ToolContext) -> Option<String> {
    explicit
        .filter(|n| !n.trim().is_empty())
        .or_else(|| ctx.user_name.clone())
}

/// Domain failures become structured payloads; internal ones stay faults.
pub(crate) fn render<T: Serialize>(result: Result<T, CartError>) -> Result<Value, ToolError> {
    match result {
        Ok(outcome) => Ok(serde_json::to_value(outcome)?),
        Err(err) if err.kind() == ErrorKind::Internal => Err(ToolError::Cart(err)),
        Err(err) => Ok(err.payload()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopbot_cart::{CartSettings, Catalog};

    fn registry() -> ToolRegistry {
        let engine = Arc::new(CartEngine::new(
            Arc::new(Catalog::bundled().unwrap()),
            CartSettings::default(),
        ));
        ToolRegistry::with_defaults(engine)
    }

    #[test]
    fn test_defaults_cover_every_tool() {
        let registry = registry();
        assert_eq!(registry.len(), ToolName::ALL.len());
        for name in ToolName::ALL {
            let handler = registry.get(name.as_str()).unwrap();
            assert_eq!(handler.name(), name);
        }
    }

    #[test]
    fn test_unknown_name_has_no_handler() {
        assert!(registry().get("fly_drone").is_none());
        assert!(ToolRegistry::new().is_empty());
    }

    #[test]
    fn test_parse_args_blank_is_empty_object() {
        let value: Value = parse_args(ToolName::ViewCart, "  ").unwrap();
        assert_eq!(value, serde_json::json!({}));
        let err = parse_args::<Value>(ToolName::ViewCart, "{oops").unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_render_splits_domain_and_internal_failures() {
        let domain: Result<Value, CartError> = Err(CartError::EmptyCartCheckout);
        let value = render(domain).unwrap();
        assert_eq!(value["cart_status"], "empty");

        let internal: Result<Value, CartError> = Err(CartError::Storage("poisoned".to_string()));
        assert!(render(internal).is_err());
    }
}
