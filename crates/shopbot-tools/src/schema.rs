//! JSON-schema definitions of the shopping tools offered to the model.

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::ToolName;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: ToolName,
    pub description: &'static str,
    pub parameters: Value,
}

pub fn tool_schemas() -> Vec<ToolSchema> {
    ToolName::ALL.into_iter().map(schema_for).collect()
}

pub fn schema_for(tool: ToolName) -> ToolSchema {
    match tool {
        ToolName::RecommendProducts => ToolSchema {
            name: tool,
            description: "Recommend products based on user preferences and existing product catalog",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user search query or preferences (e.g., \"wireless headphones under $100\")"
                    },
                    "category": {
                        "type": "string",
                        "description": "Product category to search in (optional)"
                    },
                    "price_range": {
                        "type": "object",
                        "properties": {
                            "min": { "type": "number", "description": "Minimum price" },
                            "max": { "type": "number", "description": "Maximum price" }
                        },
                        "description": "Price range filter (optional)"
                    },
                    "limit": {
                        "type": "number",
                        "description": "Maximum number of products to recommend (default: 5)",
                        "default": 5
                    }
                },
                "required": ["query"]
            }),
        },
        ToolName::GetProductInfo => ToolSchema {
            name: tool,
            description: "Get detailed information about a specific product",
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_id": {
                        "type": "string",
                        "description": "The unique identifier or exact name of the product (e.g., \"e001\" or \"Wireless Bluetooth Headphones\")"
                    },
                    "include_reviews": {
                        "type": "boolean",
                        "description": "Whether to include customer reviews (default: false)",
                        "default": false
                    },
                    "include_availability": {
                        "type": "boolean",
                        "description": "Whether to include stock availability (default: true)",
                        "default": true
                    }
                },
                "required": ["product_id"]
            }),
        },
        ToolName::AddToCart => ToolSchema {
            name: tool,
            description: "Add products to the shopping cart",
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_id": {
                        "type": "string",
                        "description": "The unique identifier or exact name of the product to add (e.g., \"e001\" or \"Wireless Bluetooth Headphones\")"
                    },
                    "quantity": {
                        "type": "number",
                        "description": "Number of items to add to cart (default: 1)",
                        "default": 1,
                        "minimum": 1
                    },
                    "user_name": {
                        "type": "string",
                        "description": "Customer name for personalized response"
                    }
                },
                "required": ["product_id"]
            }),
        },
        ToolName::UpdateCart => ToolSchema {
            name: tool,
            description: "Update cart by modifying item quantities or removing items completely",
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_id": {
                        "type": "string",
                        "description": "The unique identifier or exact name of the product to update"
                    },
                    "quantity": {
                        "type": "number",
                        "description": "New quantity for the item. Set to 0 to remove item completely",
                        "minimum": 0
                    },
                    "action": {
                        "type": "string",
                        "enum": ["set_quantity", "remove"],
                        "description": "Action to perform: set_quantity to update quantity, remove to delete item"
                    },
                    "user_name": {
                        "type": "string",
                        "description": "Customer name for personalized response"
                    }
                },
                "required": ["product_id", "action"]
            }),
        },
        ToolName::ViewCart => ToolSchema {
            name: tool,
            description: "View current items in the shopping cart",
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_name": {
                        "type": "string",
                        "description": "Customer name for personalized response"
                    }
                },
                "required": []
            }),
        },
        ToolName::CheckoutOrder => ToolSchema {
            name: tool,
            description: "Process checkout for items currently in the shopping cart",
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_name": {
                        "type": "string",
                        "description": "Customer name for personalized response"
                    },
                    "shipping_address": {
                        "type": "object",
                        "properties": {
                            "street": { "type": "string" },
                            "city": { "type": "string" },
                            "state": { "type": "string" },
                            "zip_code": { "type": "string" },
                            "country": { "type": "string" }
                        },
                        "required": ["street", "city", "state", "zip_code", "country"],
                        "description": "Shipping address for the order"
                    },
                    "payment_method": {
                        "type": "object",
                        "properties": {
                            "type": {
                                "type": "string",
                                "enum": ["credit_card", "debit_card", "paypal", "apple_pay"],
                                "description": "Payment method type"
                            },
                            "card_token": {
                                "type": "string",
                                "description": "Tokenized card information (for card payments)"
                            }
                        },
                        "required": ["type"],
                        "description": "Payment method information"
                    }
                },
                "required": ["shipping_address", "payment_method"]
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_schemas_in_order() {
        let schemas = tool_schemas();
        let names: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "recommend_products",
                "get_product_info",
                "add_to_cart",
                "update_cart",
                "view_cart",
                "checkout_order"
            ]
        );
        assert!(schemas.iter().all(|s| s.parameters["type"] == "object"));
    }

    #[test]
    fn test_schema_serializes_name_as_string() {
        let value = serde_json::to_value(schema_for(ToolName::UpdateCart)).unwrap();
        assert_eq!(value["name"], "update_cart");
        assert_eq!(
            value["parameters"]["required"],
            json!(["product_id", "action"])
        );
    }
}
