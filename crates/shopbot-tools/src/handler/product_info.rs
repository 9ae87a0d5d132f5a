//! `get_product_info` handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shopbot_cart::{CartEngine, ProductInfoRequest};

use crate::error::ToolError;
use crate::handler::{parse_args, render, ToolHandler};
use crate::types::{ToolContext, ToolName};

pub struct ProductInfoHandler {
    engine: Arc<CartEngine>,
}

impl ProductInfoHandler {
    pub fn new(engine: Arc<CartEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ToolHandler for ProductInfoHandler {
    fn name(&self) -> ToolName {
        ToolName::GetProductInfo
    }

    async fn execute(&self, _ctx: &ToolContext, args: &str) -> Result<Value, ToolError> {
        let request: ProductInfoRequest = parse_args(self.name(), args)?;
        render(self.engine.get_product_info(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopbot_cart::{CartSettings, Catalog};
    use shopbot_core::SessionKey;

    fn handler() -> ProductInfoHandler {
        ProductInfoHandler::new(Arc::new(CartEngine::new(
            Arc::new(Catalog::bundled().unwrap()),
            CartSettings::default(),
        )))
    }

    #[tokio::test]
    async fn test_info_by_name_with_reviews() {
        let ctx = ToolContext::new(SessionKey::new("s"));
        let value = handler()
            .execute(
                &ctx,
                r#"{"product_id":"Gaming Headset","include_reviews":true}"#,
            )
            .await
            .unwrap();
        assert_eq!(value["id"], "e015");
        assert_eq!(value["review_count"], 2);
        assert_eq!(value["availability"], "In Stock");
    }

    #[tokio::test]
    async fn test_info_not_found_is_payload() {
        let ctx = ToolContext::new(SessionKey::new("s"));
        let value = handler()
            .execute(&ctx, r#"{"product_id":"p001"}"#)
            .await
            .unwrap();
        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().starts_with("Product not found"));
    }
}
