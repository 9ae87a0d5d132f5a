//! `update_cart` handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shopbot_cart::{CartEngine, UpdateCartRequest};

use crate::error::ToolError;
use crate::handler::{parse_args, render, user_name, ToolHandler};
use crate::types::{ToolContext, ToolName};

pub struct UpdateCartHandler {
    engine: Arc<CartEngine>,
}

impl UpdateCartHandler {
    pub fn new(engine: Arc<CartEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ToolHandler for UpdateCartHandler {
    fn name(&self) -> ToolName {
        ToolName::UpdateCart
    }

    async fn execute(&self, ctx: &ToolContext, args: &str) -> Result<Value, ToolError> {
        let mut request: UpdateCartRequest = parse_args(self.name(), args)?;
        request.user_name = user_name(request.user_name.take(), ctx);
        render(self.engine.update_cart(&ctx.session, &request))
    }
}
