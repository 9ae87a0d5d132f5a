//! `add_to_cart` handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shopbot_cart::{AddToCartRequest, CartEngine};

use crate::error::ToolError;
use crate::handler::{parse_args, render, user_name, ToolHandler};
use crate::types::{ToolContext, ToolName};

pub struct AddToCartHandler {
    engine: Arc<CartEngine>,
}

impl AddToCartHandler {
    pub fn new(engine: Arc<CartEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ToolHandler for AddToCartHandler {
    fn name(&self) -> ToolName {
        ToolName::AddToCart
    }

    async fn execute(&self, ctx: &ToolContext, args: &str) -> Result<Value, ToolError> {
        let mut request: AddToCartRequest = parse_args(self.name(), args)?;
        request.user_name = user_name(request.user_name.take(), ctx);
        render(self.engine.add_to_cart(&ctx.session, &request))
    }
}
