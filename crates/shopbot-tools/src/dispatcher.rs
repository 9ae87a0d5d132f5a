//! Sequential tool execution with per-call fault isolation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::handler::ToolRegistry;
use crate::types::{ToolCall, ToolContext, ToolInvocation, ToolOutcome};

/// Runs a turn's tool calls against the registry.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `calls` strictly in order. A fault in one call, including a
    /// panic, becomes that call's outcome and the rest still run.
    pub async fn dispatch(&self, ctx: &ToolContext, calls: Vec<ToolCall>) -> Vec<ToolInvocation> {
        let mut invocations = Vec::with_capacity(calls.len());
        for call in calls {
            let outcome = self.run_one(ctx, &call).await;
            invocations.push(ToolInvocation { call, outcome });
        }
        invocations
    }

    async fn run_one(&self, ctx: &ToolContext, call: &ToolCall) -> ToolOutcome {
        let Some(handler) = self.registry.get(&call.name) else {
            tracing::warn!(session = %ctx.session, tool = %call.name, "Unknown tool requested");
            return ToolOutcome::UnknownTool(call.name.clone());
        };

        let result = AssertUnwindSafe(handler.execute(ctx, &call.args))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(value)) => {
                tracing::info!(session = %ctx.session, tool = %call.name, call_id = %call.id, "Tool executed");
                ToolOutcome::Completed(value)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    session = %ctx.session,
                    tool = %call.name,
                    args = %call.args,
                    error = %e,
                    "Tool execution failed"
                );
                ToolOutcome::Failed(e.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                tracing::error!(session = %ctx.session, tool = %call.name, %message, "Tool handler panicked");
                ToolOutcome::Failed(message)
            }
        }
    }
}
