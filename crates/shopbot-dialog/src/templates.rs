//! Deterministic text derived from tool results.
//!
//! Two renderings per invocation: a system-role summary line kept in the
//! conversation log for later model rounds, and a customer-facing sentence
//! used only when the model produced no prose of its own.

use serde_json::Value;
use shopbot_tools::{ToolInvocation, ToolName};

/// Collapse every whitespace run to a single space and trim.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn succeeded(result: &Value) -> bool {
    result.get("success").and_then(Value::as_bool) == Some(true)
}

fn product_names(items: &[Value]) -> Vec<&str> {
    items
        .iter()
        .map(|p| str_field(p, "name").unwrap_or("item"))
        .collect()
}

/// Cart line facts shared by add and update results.
struct CartChange<'a> {
    product_name: &'a str,
    final_quantity: Option<u64>,
    added_quantity: Option<u64>,
    was_updated: bool,
}

impl<'a> CartChange<'a> {
    fn from_result(result: &'a Value) -> Self {
        let added = result.get("product_added").filter(|v| !v.is_null());
        let updated = result.get("product_updated").filter(|v| !v.is_null());
        let line = added.or(updated);
        Self {
            product_name: line.and_then(|l| str_field(l, "product_name")).unwrap_or("item"),
            final_quantity: line.and_then(|l| l.get("quantity")).and_then(Value::as_u64),
            added_quantity: added.and_then(|a| a.get("added_quantity")).and_then(Value::as_u64),
            was_updated: added
                .and_then(|a| a.get("was_updated"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
                || updated.is_some(),
        }
    }
}

/// Log line describing what one tool call did.
pub fn summary_line(invocation: &ToolInvocation) -> String {
    let result = invocation.result();
    let Some(tool) = invocation.tool_name() else {
        return format!("Tool {} executed", invocation.call.name);
    };

    match tool {
        ToolName::RecommendProducts => {
            let products = result
                .get("recommendations")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            format!(
                "Found {} product recommendations: {}",
                products.len(),
                product_names(products).join(", ")
            )
        }
        ToolName::GetProductInfo => format!(
            "Retrieved product information for {}",
            str_field(&result, "name").unwrap_or("item")
        ),
        ToolName::AddToCart | ToolName::UpdateCart => {
            if !succeeded(&result) {
                return "Failed to update cart".to_string();
            }
            let change = CartChange::from_result(&result);
            if tool == ToolName::UpdateCart && result.get("product_updated").is_none_or(Value::is_null) {
                return str_field(&result, "message")
                    .unwrap_or("Removed item from cart")
                    .to_string();
            }
            let action = if tool == ToolName::AddToCart && !change.was_updated {
                "Added"
            } else {
                "Updated"
            };
            let mut line = format!("{} {} in cart", action, change.product_name);
            if let Some(total) = change.final_quantity {
                line.push_str(&format!(" (total: {})", total));
            }
            if let (Some(added), true) = (change.added_quantity, change.was_updated) {
                line.push_str(&format!(", added {}", added));
            }
            line
        }
        ToolName::ViewCart => {
            let items = result
                .get("items")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if items.is_empty() {
                return "Cart is empty".to_string();
            }
            let lines: Vec<String> = items
                .iter()
                .map(|item| {
                    let name = item
                        .get("product")
                        .and_then(|p| str_field(p, "name"))
                        .or_else(|| str_field(item, "product_name"))
                        .unwrap_or("item");
                    let quantity = item.get("quantity").and_then(Value::as_u64).unwrap_or(0);
                    format!("{} ({})", name, quantity)
                })
                .collect();
            format!("Cart contains: {}", lines.join(", "))
        }
        ToolName::CheckoutOrder => {
            if succeeded(&result) {
                format!(
                    "Order {} processed successfully",
                    str_field(&result, "order_id").unwrap_or_default()
                )
            } else {
                "Order processing failed".to_string()
            }
        }
    }
}

fn response_sentence(invocation: &ToolInvocation) -> Option<String> {
    let result = invocation.result();
    let tool = invocation.tool_name()?;

    match tool {
        ToolName::RecommendProducts => {
            let products = result.get("recommendations").and_then(Value::as_array)?;
            if products.is_empty() {
                return None;
            }
            Some(format!(
                "I found {} product(s) for you: {}.",
                products.len(),
                product_names(products).join(", ")
            ))
        }
        ToolName::GetProductInfo => {
            let name = str_field(&result, "name")?;
            let description = str_field(&result, "description")
                .filter(|d| !d.is_empty())
                .unwrap_or("Product details available.");
            Some(format!("Here's information about {}: {}", name, description))
        }
        ToolName::AddToCart | ToolName::UpdateCart => {
            if !succeeded(&result) {
                let error = str_field(&result, "error").unwrap_or("Unknown error");
                return Some(format!(
                    "Sorry, I couldn't update your cart. {}.",
                    error.trim_end_matches('.')
                ));
            }
            let change = CartChange::from_result(&result);
            let sentence = match (tool, change.was_updated) {
                (ToolName::AddToCart, true) => format!(
                    "Updated {} in your cart. You now have {} total.",
                    change.product_name,
                    change.final_quantity.unwrap_or_default()
                ),
                (ToolName::AddToCart, false) => format!(
                    "Successfully added {} x {} to your cart.",
                    change.added_quantity.or(change.final_quantity).unwrap_or(1),
                    change.product_name
                ),
                _ => match change.final_quantity {
                    Some(q) => format!(
                        "Successfully updated {} in your cart (quantity: {}).",
                        change.product_name, q
                    ),
                    None => format!("Successfully updated {} in your cart.", change.product_name),
                },
            };
            Some(sentence)
        }
        ToolName::ViewCart => {
            let has_items = result
                .get("items")
                .and_then(Value::as_array)
                .is_some_and(|items| !items.is_empty());
            if has_items {
                let total_items = result.get("total_items").and_then(Value::as_u64).unwrap_or(0);
                let total = result.get("total").and_then(Value::as_f64).unwrap_or(0.0);
                Some(format!(
                    "Your cart contains {} items totaling ${:.2}.",
                    total_items, total
                ))
            } else {
                Some("Your cart is currently empty.".to_string())
            }
        }
        ToolName::CheckoutOrder => {
            if succeeded(&result) {
                Some(format!(
                    "Order confirmed! Your order ID is {}.",
                    str_field(&result, "order_id").unwrap_or_default()
                ))
            } else {
                Some("There was an issue processing your order. Please try again.".to_string())
            }
        }
    }
}

/// Customer-facing text for a turn whose model output had no prose.
pub fn response_text(invocations: &[ToolInvocation]) -> Option<String> {
    let sentences: Vec<String> = invocations.iter().filter_map(response_sentence).collect();
    if sentences.is_empty() {
        None
    } else {
        Some(sentences.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopbot_tools::{ToolCall, ToolOutcome};

    fn inv(name: &str, result: Value) -> ToolInvocation {
        ToolInvocation {
            call: ToolCall::new("c1", name, "{}"),
            outcome: ToolOutcome::Completed(result),
        }
    }

    fn add_result(was_updated: bool) -> Value {
        json!({
            "success": true,
            "product_added": {
                "product_id": "e001",
                "product_name": "Wireless Bluetooth Headphones",
                "quantity": 3,
                "added_quantity": 1,
                "was_updated": was_updated
            }
        })
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Sure,\n\n here   you go "), "Sure, here you go");
        assert_eq!(clean_text("\t \n"), "");
    }

    #[test]
    fn test_summary_recommendations() {
        let line = summary_line(&inv(
            "recommend_products",
            json!({"recommendations": [{"name": "A"}, {"name": "B"}]}),
        ));
        assert_eq!(line, "Found 2 product recommendations: A, B");
    }

    #[test]
    fn test_summary_add_fresh_and_merge() {
        assert_eq!(
            summary_line(&inv("add_to_cart", add_result(false))),
            "Added Wireless Bluetooth Headphones in cart (total: 3)"
        );
        assert_eq!(
            summary_line(&inv("add_to_cart", add_result(true))),
            "Updated Wireless Bluetooth Headphones in cart (total: 3), added 1"
        );
        assert_eq!(
            summary_line(&inv("add_to_cart", json!({"success": false, "error": "nope"}))),
            "Failed to update cart"
        );
    }

    #[test]
    fn test_summary_update_and_remove() {
        let updated = json!({
            "success": true,
            "action": "set_quantity",
            "product_updated": {"product_name": "Yoga Mat", "quantity": 2, "previous_quantity": 1}
        });
        assert_eq!(
            summary_line(&inv("update_cart", updated)),
            "Updated Yoga Mat in cart (total: 2)"
        );
        let removed = json!({
            "success": true,
            "action": "remove",
            "message": "Removed Yoga Mat from Ada's cart",
            "product_updated": null
        });
        assert_eq!(
            summary_line(&inv("update_cart", removed)),
            "Removed Yoga Mat from Ada's cart"
        );
    }

    #[test]
    fn test_summary_view_checkout_unknown() {
        let view = json!({"items": [{"product": {"name": "Yoga Mat"}, "quantity": 2}]});
        assert_eq!(summary_line(&inv("view_cart", view)), "Cart contains: Yoga Mat (2)");
        assert_eq!(summary_line(&inv("view_cart", json!({"items": []}))), "Cart is empty");
        assert_eq!(
            summary_line(&inv("checkout_order", json!({"success": true, "order_id": "ORD-1"}))),
            "Order ORD-1 processed successfully"
        );
        assert_eq!(
            summary_line(&inv("checkout_order", json!({"success": false}))),
            "Order processing failed"
        );
        let unknown = ToolInvocation {
            call: ToolCall::new("c9", "fly_drone", "{}"),
            outcome: ToolOutcome::UnknownTool("fly_drone".to_string()),
        };
        assert_eq!(summary_line(&unknown), "Tool fly_drone executed");
    }

    #[test]
    fn test_response_sentences() {
        assert_eq!(
            response_text(&[inv("add_to_cart", add_result(true))]).unwrap(),
            "Updated Wireless Bluetooth Headphones in your cart. You now have 3 total."
        );
        assert_eq!(
            response_text(&[inv("add_to_cart", add_result(false))]).unwrap(),
            "Successfully added 1 x Wireless Bluetooth Headphones to your cart."
        );
        assert_eq!(
            response_text(&[inv(
                "add_to_cart",
                json!({"success": false, "error": "Insufficient stock."})
            )])
            .unwrap(),
            "Sorry, I couldn't update your cart. Insufficient stock."
        );
        assert_eq!(
            response_text(&[inv("view_cart", json!({"items": []}))]).unwrap(),
            "Your cart is currently empty."
        );
        assert_eq!(
            response_text(&[inv(
                "view_cart",
                json!({"items": [{"quantity": 3}], "total_items": 3, "total": 239.97})
            )])
            .unwrap(),
            "Your cart contains 3 items totaling $239.97."
        );
    }

    #[test]
    fn test_response_joins_and_skips() {
        let text = response_text(&[
            inv("recommend_products", json!({"recommendations": [{"name": "A"}]})),
            inv("checkout_order", json!({"success": true, "order_id": "ORD-7"})),
        ])
        .unwrap();
        assert_eq!(
            text,
            "I found 1 product(s) for you: A. Order confirmed! Your order ID is ORD-7."
        );
        assert!(response_text(&[inv("recommend_products", json!({"recommendations": []}))]).is_none());
        assert!(response_text(&[]).is_none());
    }
}
