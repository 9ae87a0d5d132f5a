//! Projection of tool results into the client-facing shopping data.

use serde_json::{json, Value};
use shopbot_core::ShoppingData;

use crate::types::{ToolInvocation, ToolName};

/// Build the shopping data for one turn.
///
/// Slots: recommend -> `recommendations`, get_info -> `product_details`,
/// add/update -> `cart_update`, view -> `cart_contents`, checkout ->
/// `order_result`. Unknown tools project nothing.
pub fn project(invocations: &[ToolInvocation]) -> ShoppingData {
    let mut data = ShoppingData::default();
    for invocation in invocations {
        let Some(tool) = invocation.tool_name() else {
            continue;
        };
        let result = invocation.result();
        match tool {
            ToolName::RecommendProducts => {
                data.recommendations = Some(json!({
                    "products": result.get("recommendations").cloned().unwrap_or_else(|| json!([])),
                    "query": result.get("search_query").cloned().unwrap_or(Value::Null),
                    "category": result.get("category").cloned().unwrap_or(Value::Null),
                }));
            }
            ToolName::GetProductInfo => data.product_details = Some(result),
            ToolName::AddToCart | ToolName::UpdateCart => data.cart_update = Some(result),
            ToolName::ViewCart => data.cart_contents = Some(result),
            ToolName::CheckoutOrder => data.order_result = Some(result),
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ToolCall, ToolOutcome};

    fn invocation(name: &str, outcome: ToolOutcome) -> ToolInvocation {
        ToolInvocation {
            call: ToolCall::new("c", name, "{}"),
            outcome,
        }
    }

    #[test]
    fn test_projection_slots() {
        let data = project(&[
            invocation(
                "recommend_products",
                ToolOutcome::Completed(json!({
                    "recommendations": [{"id": "e001"}],
                    "total_found": 1,
                    "search_query": "headphones",
                })),
            ),
            invocation("view_cart", ToolOutcome::Completed(json!({"items": []}))),
        ]);
        let recs = data.recommendations.unwrap();
        assert_eq!(recs["products"][0]["id"], "e001");
        assert_eq!(recs["query"], "headphones");
        assert!(recs["category"].is_null());
        assert_eq!(data.cart_contents.unwrap()["items"], json!([]));
        assert!(data.cart_update.is_none());
        assert!(data.order_result.is_none());
    }

    #[test]
    fn test_add_and_update_share_slot_last_wins() {
        let data = project(&[
            invocation("add_to_cart", ToolOutcome::Completed(json!({"step": 1}))),
            invocation("update_cart", ToolOutcome::Completed(json!({"step": 2}))),
        ]);
        assert_eq!(data.cart_update.unwrap()["step"], 2);
    }

    #[test]
    fn test_failures_project_their_error_and_unknown_is_skipped() {
        let data = project(&[
            invocation("checkout_order", ToolOutcome::Failed("boom".to_string())),
            invocation("fly_drone", ToolOutcome::UnknownTool("fly_drone".to_string())),
        ]);
        assert_eq!(
            data.order_result.unwrap()["error"],
            "Tool execution failed: boom"
        );
        assert!(data.recommendations.is_none());
        assert!(project(&[]).is_empty());
    }
}
