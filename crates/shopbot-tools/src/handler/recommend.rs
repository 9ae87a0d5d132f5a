//! `recommend_products` handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shopbot_cart::{CartEngine, RecommendRequest};

use crate::error::ToolError;
use crate::handler::{parse_args, render, ToolHandler};
use crate::types::{ToolContext, ToolName};

pub struct RecommendHandler {
    engine: Arc<CartEngine>,
}

impl RecommendHandler {
    pub fn new(engine: Arc<CartEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ToolHandler for RecommendHandler {
    fn name(&self) -> ToolName {
        ToolName::RecommendProducts
    }

    async fn execute(&self, _ctx: &ToolContext, args: &str) -> Result<Value, ToolError> {
        let request: RecommendRequest = parse_args(self.name(), args)?;
        render(self.engine.recommend_products(&request))
    }
}
