//! Request and result shapes for the cart engine.
//!
//! Requests deserialize straight from tool-call arguments; results serialize
//! into the JSON the model and the shopping widgets consume, so field names
//! follow the wire format rather than Rust naming.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, Review};
use crate::error::CartError;

pub const DEFAULT_USER_NAME: &str = "customer";

fn default_quantity() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductInfoRequest {
    pub product_id: String,
    #[serde(default)]
    pub include_reviews: bool,
    #[serde(default = "default_true")]
    pub include_availability: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    pub action: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateAction {
    SetQuantity,
    Remove,
}

impl FromStr for UpdateAction {
    type Err = CartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set_quantity" => Ok(UpdateAction::SetQuantity),
            "remove" => Ok(UpdateAction::Remove),
            other => Err(CartError::InvalidAction {
                action: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateAction::SetQuantity => f.write_str("set_quantity"),
            UpdateAction::Remove => f.write_str("remove"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

impl ShippingAddress {
    /// Every field must be non-blank, whatever the address came from.
    pub fn validate(&self) -> Result<(), CartError> {
        let fields = [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(CartError::InvalidShippingAddress(name));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    CreditCard,
    DebitCard,
    Paypal,
    ApplePay,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub kind: PaymentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_token: Option<String>,
}

/// Payment method as it appears on a receipt: the token never survives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    #[serde(rename = "type")]
    pub kind: PaymentKind,
}

/// What the agent knows about the customer, passed alongside a checkout.
///
/// Typed fields take precedence; `knowledge` is free text that is only
/// scraped when they are absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    #[serde(default)]
    pub knowledge: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub agent_context: Option<AgentContext>,
}

// =============================================================================
// Cart state
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartItem {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub category: String,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
            category: product.category.clone(),
            added_at: Utc::now(),
        }
    }

    /// Computed on read so it can never drift from `quantity`.
    pub fn total_price(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, product_id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.product_id == product_id)
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::total_price).sum()
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            total_items: self.total_items(),
            total_amount: shopbot_core::round_cents(self.total()),
            item_count: self.items.len(),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub rating: f64,
    pub stock: u32,
    pub description: String,
    pub image_url: String,
    pub brand: String,
    pub availability: bool,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            price: p.price,
            category: p.category.clone(),
            rating: p.rating,
            stock: p.stock,
            description: p.description.clone(),
            image_url: p.image_url.clone(),
            brand: p.brand.clone(),
            availability: p.is_available(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub recommendations: Vec<ProductSummary>,
    pub total_found: usize,
    pub search_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    pub rating: f64,
    pub image_url: String,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    /// "In Stock" or "Out of Stock".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub total_items: u32,
    pub total_amount: f64,
    pub item_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductAdded {
    pub product_id: String,
    pub product_name: String,
    /// Final quantity on the line, not the delta.
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    /// Quantity added by this call.
    pub added_quantity: u32,
    pub was_updated: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddToCartOutcome {
    pub success: bool,
    pub message: String,
    pub product_added: ProductAdded,
    pub cart_summary: CartSummary,
    pub cart: CartView,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub previous_quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateCartOutcome {
    pub success: bool,
    pub message: String,
    pub action: String,
    /// Absent when the line was removed.
    pub product_updated: Option<ProductUpdated>,
    pub cart_summary: CartSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartProductView {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub brand: String,
    pub rating: f64,
    pub availability: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLineView {
    pub product: CartProductView,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: f64,
    /// Sum of quantities across lines.
    pub total_items: u32,
    /// Number of distinct lines.
    pub item_count: usize,
    pub estimated_tax: f64,
    pub estimated_total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub category: String,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price(),
            category: item.category.clone(),
        }
    }
}

/// Immutable snapshot produced by a successful checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub success: bool,
    pub order_id: String,
    pub subtotal: f64,
    pub tax: f64,
    pub total_amount: f64,
    pub items: Vec<OrderLine>,
    pub item_count: usize,
    pub total_items: u32,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentSummary,
    pub estimated_delivery: String,
    pub order_status: String,
    pub order_date: DateTime<Utc>,
    pub tracking_number: String,
    pub message: String,
}
