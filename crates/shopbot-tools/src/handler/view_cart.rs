//! `view_cart` handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shopbot_cart::CartEngine;

use crate::error::ToolError;
use crate::handler::{parse_args, render, user_name, ToolHandler};
use crate::types::{ToolContext, ToolName};

#[derive(Debug, Default, Deserialize)]
struct ViewCartArgs {
    #[serde(default)]
    user_name: Option<String>,
}

pub struct ViewCartHandler {
    engine: Arc<CartEngine>,
}

impl ViewCartHandler {
    pub fn new(engine: Arc<CartEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ToolHandler for ViewCartHandler {
    fn name(&self) -> ToolName {
        ToolName::ViewCart
    }

    async fn execute(&self, ctx: &ToolContext, args: &str) -> Result<Value, ToolError> {
        let args: ViewCartArgs = parse_args(self.name(), args)?;
        let name = user_name(args.user_name, ctx);
        render(self.engine.view_cart(&ctx.session, name.as_deref()))
    }
}
