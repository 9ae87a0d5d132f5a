//! `checkout_order` handler.
//!
//! When the call carries no agent context of its own, the session's persona
//! knowledge is offered to the engine as the scraping source.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shopbot_cart::{CartEngine, CheckoutRequest};

use crate::error::ToolError;
use crate::handler::{parse_args, render, user_name, ToolHandler};
use crate::types::{ToolContext, ToolName};

pub struct CheckoutHandler {
    engine: Arc<CartEngine>,
}

impl CheckoutHandler {
    pub fn new(engine: Arc<CartEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ToolHandler for CheckoutHandler {
    fn name(&self) -> ToolName {
        ToolName::CheckoutOrder
    }

    async fn execute(&self, ctx: &ToolContext, args: &str) -> Result<Value, ToolError> {
        let mut request: CheckoutRequest = parse_args(self.name(), args)?;
        request.user_name = user_name(request.user_name.take(), ctx);
        render(
            self.engine
                .checkout_order(&ctx.session, &request, ctx.knowledge.as_deref()),
        )
    }
}
