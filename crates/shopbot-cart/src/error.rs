//! Error types for the cart engine.
//!
//! Every failure a tool call can hit is a variant here. None of them cross
//! the tool boundary as a Rust error: [`CartError::payload`] renders them into
//! the structured `{success: false, error, error_kind, ...}` object the
//! language model and the client widgets read.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};
use shopbot_core::error::ShopError;

/// Minimal `{id, name}` pair used to enumerate catalog or cart contents in
/// not-found payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductRef {
    pub id: String,
    pub name: String,
}

/// Coarse classification of a cart failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InsufficientStock,
    InvalidRequest,
    MalformedCheckout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::MalformedCheckout => "malformed_checkout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Product not found: {product_id}. Please use product ID or exact product name.")]
    ProductNotFound {
        product_id: String,
        available_products: Vec<ProductRef>,
    },

    #[error("Insufficient stock. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product_id: String,
        available: u32,
        requested: u32,
    },

    #[error("Cannot add {requested} more items. Cart has {in_cart}, stock is {available}")]
    MergedQuantityExceedsStock {
        product_id: String,
        requested: u32,
        in_cart: u32,
        available: u32,
    },

    #[error("Cannot set quantity to {requested}. Only {available} available in stock.")]
    QuantityExceedsStock {
        product_id: String,
        requested: u32,
        available: u32,
        in_cart: u32,
    },

    #[error("Cart is empty. Cannot update items in an empty cart.")]
    EmptyCartUpdate,

    #[error("Product not found in cart: {product_id}. Available items: {}", join_names(.cart_items))]
    NotInCart {
        product_id: String,
        cart_items: Vec<ProductRef>,
    },

    #[error("Invalid action. Use \"set_quantity\" or \"remove\"")]
    InvalidAction { action: String },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Product no longer available: {0}")]
    ProductUnavailable(String),

    #[error("Missing required checkout information. Please provide shipping address and payment method.")]
    MissingCheckoutInfo {
        shipping_address: bool,
        payment_method: bool,
    },

    #[error("Invalid shipping address: {0} is required")]
    InvalidShippingAddress(&'static str),

    #[error("Cannot checkout with an empty cart. Please add items to your cart first.")]
    EmptyCartCheckout,

    #[error("Insufficient stock for {product_name}. Available: {available}, In cart: {requested}")]
    CheckoutStockConflict {
        product_id: String,
        product_name: String,
        available: u32,
        requested: u32,
    },

    #[error("Invalid catalog: {0}")]
    Catalog(String),

    #[error("Cart state unavailable: {0}")]
    Storage(String),
}

fn join_names(items: &[ProductRef]) -> String {
    items
        .iter()
        .map(|i| i.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::ProductNotFound { .. }
            | CartError::NotInCart { .. }
            | CartError::ProductUnavailable(_) => ErrorKind::NotFound,
            CartError::InsufficientStock { .. }
            | CartError::MergedQuantityExceedsStock { .. }
            | CartError::QuantityExceedsStock { .. }
            | CartError::CheckoutStockConflict { .. } => ErrorKind::InsufficientStock,
            CartError::EmptyCartUpdate
            | CartError::EmptyCartCheckout
            | CartError::InvalidAction { .. }
            | CartError::InvalidQuantity(_) => ErrorKind::InvalidRequest,
            CartError::MissingCheckoutInfo { .. } | CartError::InvalidShippingAddress(_) => {
                ErrorKind::MalformedCheckout
            }
            CartError::Catalog(_) | CartError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Render the structured failure object returned to the tool caller.
    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));
        body.insert("error".into(), Value::String(self.to_string()));
        body.insert("error_kind".into(), Value::String(self.kind().as_str().into()));

        match self {
            CartError::ProductNotFound {
                product_id,
                available_products,
            } => {
                body.insert("product_id".into(), json!(product_id));
                body.insert("available_products".into(), json!(available_products));
            }
            CartError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                body.insert("product_id".into(), json!(product_id));
                body.insert("available_stock".into(), json!(available));
                body.insert("requested_quantity".into(), json!(requested));
            }
            CartError::MergedQuantityExceedsStock {
                product_id,
                requested,
                in_cart,
                available,
            } => {
                body.insert("product_id".into(), json!(product_id));
                body.insert("requested_quantity".into(), json!(requested));
                body.insert("current_cart_quantity".into(), json!(in_cart));
                body.insert("available_stock".into(), json!(available));
            }
            CartError::QuantityExceedsStock {
                product_id,
                requested,
                available,
                in_cart,
            } => {
                body.insert("product_id".into(), json!(product_id));
                body.insert("requested_quantity".into(), json!(requested));
                body.insert("available_stock".into(), json!(available));
                body.insert("current_cart_quantity".into(), json!(in_cart));
            }
            CartError::EmptyCartUpdate | CartError::EmptyCartCheckout => {
                body.insert("cart_status".into(), json!("empty"));
            }
            CartError::NotInCart {
                product_id,
                cart_items,
            } => {
                body.insert("product_id".into(), json!(product_id));
                body.insert("cart_items".into(), json!(cart_items));
            }
            CartError::InvalidAction { action } => {
                body.insert("action".into(), json!(action));
            }
            CartError::ProductUnavailable(product_id) => {
                body.insert("product_id".into(), json!(product_id));
            }
            CartError::MissingCheckoutInfo {
                shipping_address,
                payment_method,
            } => {
                body.insert(
                    "missing_info".into(),
                    json!({
                        "shipping_address": shipping_address,
                        "payment_method": payment_method,
                    }),
                );
            }
            CartError::CheckoutStockConflict {
                product_id,
                available,
                requested,
                ..
            } => {
                body.insert("product_id".into(), json!(product_id));
                body.insert("available_stock".into(), json!(available));
                body.insert("requested_quantity".into(), json!(requested));
            }
            CartError::InvalidQuantity(_)
            | CartError::InvalidShippingAddress(_)
            | CartError::Catalog(_)
            | CartError::Storage(_) => {}
        }

        Value::Object(body)
    }
}

impl From<CartError> for ShopError {
    fn from(err: CartError) -> Self {
        ShopError::Catalog(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_payload_lists_catalog() {
        let err = CartError::ProductNotFound {
            product_id: "x999".to_string(),
            available_products: vec![ProductRef {
                id: "e001".to_string(),
                name: "Wireless Bluetooth Headphones".to_string(),
            }],
        };
        let payload = err.payload();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error_kind"], "not_found");
        assert_eq!(payload["product_id"], "x999");
        assert_eq!(payload["available_products"][0]["id"], "e001");
        assert!(payload["error"].as_str().unwrap().contains("x999"));
    }

    #[test]
    fn test_stock_payload_carries_numbers() {
        let err = CartError::MergedQuantityExceedsStock {
            product_id: "e001".to_string(),
            requested: 5,
            in_cart: 22,
            available: 25,
        };
        assert_eq!(
            err.to_string(),
            "Cannot add 5 more items. Cart has 22, stock is 25"
        );
        let payload = err.payload();
        assert_eq!(payload["error_kind"], "insufficient_stock");
        assert_eq!(payload["current_cart_quantity"], 22);
        assert_eq!(payload["available_stock"], 25);
    }

    #[test]
    fn test_empty_cart_payloads() {
        assert_eq!(CartError::EmptyCartCheckout.payload()["cart_status"], "empty");
        assert_eq!(CartError::EmptyCartUpdate.payload()["cart_status"], "empty");
        assert_eq!(
            CartError::EmptyCartCheckout.kind(),
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn test_not_in_cart_message_joins_names() {
        let err = CartError::NotInCart {
            product_id: "s001".to_string(),
            cart_items: vec![
                ProductRef {
                    id: "e001".to_string(),
                    name: "Headphones".to_string(),
                },
                ProductRef {
                    id: "e002".to_string(),
                    name: "Watch".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Product not found in cart: s001. Available items: Headphones, Watch"
        );
    }

    #[test]
    fn test_missing_checkout_info_payload() {
        let err = CartError::MissingCheckoutInfo {
            shipping_address: true,
            payment_method: false,
        };
        let payload = err.payload();
        assert_eq!(payload["error_kind"], "malformed_checkout");
        assert_eq!(payload["missing_info"]["shipping_address"], true);
        assert_eq!(payload["missing_info"]["payment_method"], false);
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(ErrorKind::Internal.to_string(), "internal");
        assert_eq!(
            CartError::Storage("poisoned".to_string()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            CartError::InvalidShippingAddress("zip_code").to_string(),
            "Invalid shipping address: zip_code is required"
        );
    }
}
