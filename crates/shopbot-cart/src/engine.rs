//! Session-scoped cart and order engine.
//!
//! Owns one cart per session key and mutates catalog stock at checkout.
//! Lock order is always carts then catalog; each operation takes both guards
//! once and works on the borrowed data, so no operation re-enters a lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use shopbot_core::config::CartConfig;
use shopbot_core::{round_cents, SessionKey};

use crate::catalog::{resolve_index, Catalog, Product};
use crate::checkout::{self, OrderIdGenerator};
use crate::error::{CartError, ProductRef};
use crate::types::{
    AddToCartOutcome, AddToCartRequest, Cart, CartItem, CartLineView, CartProductView, CartView,
    CheckoutRequest, OrderLine, OrderReceipt, PaymentSummary, ProductAdded, ProductInfo,
    ProductInfoRequest, ProductSummary, ProductUpdated, RecommendRequest, Recommendations,
    UpdateAction, UpdateCartOutcome, UpdateCartRequest, DEFAULT_USER_NAME,
};

/// Minimum length of a query word that takes part in matching.
const MIN_QUERY_WORD_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct CartSettings {
    pub tax_rate: f64,
    pub default_recommendation_limit: usize,
    pub estimated_delivery: String,
}

impl From<&CartConfig> for CartSettings {
    fn from(config: &CartConfig) -> Self {
        Self {
            tax_rate: config.tax_rate,
            default_recommendation_limit: config.default_recommendation_limit,
            estimated_delivery: config.estimated_delivery.clone(),
        }
    }
}

impl Default for CartSettings {
    fn default() -> Self {
        Self::from(&CartConfig::default())
    }
}

pub struct CartEngine {
    catalog: Arc<Catalog>,
    carts: Mutex<HashMap<SessionKey, Cart>>,
    settings: CartSettings,
    order_ids: OrderIdGenerator,
}

impl CartEngine {
    pub fn new(catalog: Arc<Catalog>, settings: CartSettings) -> Self {
        Self {
            catalog,
            carts: Mutex::new(HashMap::new()),
            settings,
            order_ids: OrderIdGenerator::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &CartSettings {
        &self.settings
    }

    fn lock_carts(&self) -> Result<MutexGuard<'_, HashMap<SessionKey, Cart>>, CartError> {
        self.carts
            .lock()
            .map_err(|e| CartError::Storage(format!("Cart mutex poisoned: {}", e)))
    }

    // =========================================================================
    // Catalog queries
    // =========================================================================

    /// Filter, match, rank and truncate catalog products. Never fails on an
    /// empty result.
    pub fn recommend_products(
        &self,
        request: &RecommendRequest,
    ) -> Result<Recommendations, CartError> {
        let products = self.catalog.lock()?;
        let limit = request
            .limit
            .unwrap_or(self.settings.default_recommendation_limit);

        let category = request
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase);
        let (min, max) = request
            .price_range
            .as_ref()
            .map(|r| (r.min, r.max))
            .unwrap_or((None, None));

        let phrase = request.query.trim().to_lowercase();
        let words: Vec<&str> = phrase
            .split_whitespace()
            .filter(|w| w.chars().count() >= MIN_QUERY_WORD_LEN)
            .collect();

        let mut matches: Vec<&Product> = products
            .iter()
            .filter(|p| match &category {
                Some(c) => p.category.to_lowercase().contains(c.as_str()),
                None => true,
            })
            .filter(|p| min.is_none_or(|m| p.price >= m) && max.is_none_or(|m| p.price <= m))
            .filter(|p| {
                if words.is_empty() {
                    return true;
                }
                let text = p.search_text();
                words.iter().any(|w| text.contains(w)) || text.contains(phrase.as_str())
            })
            .collect();

        matches.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        matches.truncate(limit);

        let recommendations: Vec<ProductSummary> =
            matches.into_iter().map(ProductSummary::from).collect();

        tracing::debug!(
            query = %request.query,
            found = recommendations.len(),
            "Recommendations computed"
        );

        Ok(Recommendations {
            total_found: recommendations.len(),
            recommendations,
            search_query: request.query.clone(),
            category: request.category.clone(),
        })
    }

    pub fn get_product_info(&self, request: &ProductInfoRequest) -> Result<ProductInfo, CartError> {
        let products = self.catalog.lock()?;
        let product = resolve_product(&products, &request.product_id)?;

        let mut info = ProductInfo {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            category: product.category.clone(),
            description: product.description.clone(),
            rating: product.rating,
            image_url: product.image_url.clone(),
            brand: product.brand.clone(),
            stock: None,
            availability: None,
            reviews: None,
            review_count: None,
        };

        if request.include_availability {
            info.stock = Some(product.stock);
            let availability = if product.is_available() {
                "In Stock"
            } else {
                "Out of Stock"
            };
            info.availability = Some(availability.to_string());
        }

        if request.include_reviews {
            info.review_count = Some(product.reviews.len());
            info.reviews = Some(product.reviews.clone());
        }

        Ok(info)
    }

    // =========================================================================
    // Cart mutation
    // =========================================================================

    /// Add a product, merging into an existing line when present.
    ///
    /// On failure nothing is mutated. The returned `product_added.quantity`
    /// is the line's final quantity; `added_quantity` is this call's delta.
    pub fn add_to_cart(
        &self,
        session: &SessionKey,
        request: &AddToCartRequest,
    ) -> Result<AddToCartOutcome, CartError> {
        if request.quantity == 0 {
            return Err(CartError::InvalidQuantity(
                "quantity must be at least 1".to_string(),
            ));
        }

        let user_name = user_name_or_default(request.user_name.as_deref());
        let mut carts = self.lock_carts()?;
        let products = self.catalog.lock()?;

        let product = resolve_product(&products, &request.product_id)?;
        if product.stock < request.quantity {
            return Err(CartError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.stock,
                requested: request.quantity,
            });
        }

        let existing = carts
            .get(session)
            .and_then(|cart| cart.position(&product.id).map(|i| cart.items[i].quantity));

        let (final_quantity, was_updated) = match existing {
            Some(in_cart) => {
                let merged = in_cart.saturating_add(request.quantity);
                if merged > product.stock {
                    return Err(CartError::MergedQuantityExceedsStock {
                        product_id: product.id.clone(),
                        requested: request.quantity,
                        in_cart,
                        available: product.stock,
                    });
                }
                (merged, true)
            }
            None => (request.quantity, false),
        };

        let cart = carts.entry(session.clone()).or_default();
        match cart.position(&product.id) {
            Some(i) => cart.items[i].quantity = final_quantity,
            None => cart.items.push(CartItem::from_product(product, final_quantity)),
        }

        let message = if was_updated {
            format!(
                "Updated {} in cart (now {} total)",
                product.name, final_quantity
            )
        } else {
            format!(
                "Added {} x {} to {}'s cart",
                request.quantity, product.name, user_name
            )
        };

        tracing::info!(
            session = %session,
            product = %product.id,
            quantity = final_quantity,
            was_updated,
            "Cart line added"
        );

        Ok(AddToCartOutcome {
            success: true,
            message,
            product_added: ProductAdded {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: final_quantity,
                unit_price: product.price,
                total_price: round_cents(product.price * f64::from(final_quantity)),
                added_quantity: request.quantity,
                was_updated,
            },
            cart_summary: cart.summary(),
            cart: build_view(Some(&*cart), &products, user_name, self.settings.tax_rate),
        })
    }

    /// Set a line's quantity or remove it. `quantity == 0` removes.
    pub fn update_cart(
        &self,
        session: &SessionKey,
        request: &UpdateCartRequest,
    ) -> Result<UpdateCartOutcome, CartError> {
        let user_name = user_name_or_default(request.user_name.as_deref());
        let mut carts = self.lock_carts()?;
        let products = self.catalog.lock()?;

        let cart = match carts.get_mut(session) {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(CartError::EmptyCartUpdate),
        };

        let canonical_id = resolve_index(&products, &request.product_id)
            .map(|i| products[i].id.clone())
            .unwrap_or_else(|| request.product_id.trim().to_string());
        let Some(index) = cart.position(&canonical_id) else {
            return Err(CartError::NotInCart {
                product_id: request.product_id.clone(),
                cart_items: cart
                    .items
                    .iter()
                    .map(|i| ProductRef {
                        id: i.product_id.clone(),
                        name: i.product_name.clone(),
                    })
                    .collect(),
            });
        };

        let stock = products
            .iter()
            .find(|p| p.id == canonical_id)
            .map(|p| p.stock)
            .ok_or_else(|| CartError::ProductUnavailable(canonical_id.clone()))?;

        let action: UpdateAction = request.action.parse()?;
        let item = &cart.items[index];

        let (message, product_updated) = if action == UpdateAction::Remove
            || request.quantity == Some(0)
        {
            let message = format!("Removed {} from {}'s cart", item.product_name, user_name);
            cart.items.remove(index);
            (message, None)
        } else {
            let quantity = request.quantity.ok_or_else(|| {
                CartError::InvalidQuantity("set_quantity requires a quantity".to_string())
            })?;
            if quantity > stock {
                return Err(CartError::QuantityExceedsStock {
                    product_id: item.product_id.clone(),
                    requested: quantity,
                    available: stock,
                    in_cart: item.quantity,
                });
            }

            let previous = item.quantity;
            let item = &mut cart.items[index];
            item.quantity = quantity;
            let message = format!(
                "Updated {} quantity from {} to {} in {}'s cart",
                item.product_name, previous, quantity, user_name
            );
            let updated = ProductUpdated {
                product_id: item.product_id.clone(),
                product_name: item.product_name.clone(),
                quantity,
                unit_price: item.unit_price,
                total_price: round_cents(item.total_price()),
                previous_quantity: previous,
            };
            (message, Some(updated))
        };

        tracing::info!(session = %session, product = %canonical_id, %action, "Cart line updated");

        Ok(UpdateCartOutcome {
            success: true,
            message,
            action: request.action.clone(),
            product_updated,
            cart_summary: cart.summary(),
        })
    }

    /// Current cart with display totals. Always succeeds for an empty cart.
    pub fn view_cart(
        &self,
        session: &SessionKey,
        user_name: Option<&str>,
    ) -> Result<CartView, CartError> {
        let carts = self.lock_carts()?;
        let products = self.catalog.lock()?;
        Ok(build_view(
            carts.get(session),
            &products,
            user_name_or_default(user_name),
            self.settings.tax_rate,
        ))
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turn the session's cart into an order.
    ///
    /// Every line is validated against live stock before anything changes;
    /// the stock decrements, the cart clear and the receipt then happen with
    /// no fallible step in between.
    pub fn checkout_order(
        &self,
        session: &SessionKey,
        request: &CheckoutRequest,
        session_knowledge: Option<&str>,
    ) -> Result<OrderReceipt, CartError> {
        let user_name = user_name_or_default(request.user_name.as_deref());
        let (shipping_address, payment_method) =
            checkout::resolve_details(request, session_knowledge)?;

        let mut carts = self.lock_carts()?;
        let mut products = self.catalog.lock()?;

        let cart = match carts.get(session) {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(CartError::EmptyCartCheckout),
        };

        // Validate all lines first.
        let mut staged: Vec<(usize, u32)> = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let index = products
                .iter()
                .position(|p| p.id == item.product_id)
                .ok_or_else(|| CartError::ProductUnavailable(item.product_id.clone()))?;
            let product = &products[index];
            if product.stock < item.quantity {
                return Err(CartError::CheckoutStockConflict {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    available: product.stock,
                    requested: item.quantity,
                });
            }
            staged.push((index, item.quantity));
        }

        let items: Vec<OrderLine> = cart.items.iter().map(OrderLine::from).collect();
        let subtotal = cart.total();
        let tax = subtotal * self.settings.tax_rate;
        let total_items = cart.total_items();

        // Apply.
        for (index, quantity) in staged {
            products[index].stock -= quantity;
        }
        carts.remove(session);

        let order_id = self.order_ids.next_id();
        tracing::info!(
            session = %session,
            order_id = %order_id,
            lines = items.len(),
            "Order checked out"
        );

        Ok(OrderReceipt {
            success: true,
            order_id,
            subtotal: round_cents(subtotal),
            tax: round_cents(tax),
            total_amount: round_cents(subtotal + tax),
            item_count: items.len(),
            total_items,
            items,
            shipping_address,
            payment_method: PaymentSummary {
                kind: payment_method.kind,
            },
            estimated_delivery: self.settings.estimated_delivery.clone(),
            order_status: "confirmed".to_string(),
            order_date: Utc::now(),
            tracking_number: checkout::tracking_number(),
            message: format!(
                "Order confirmed for {}! Your items will be delivered in {}.",
                user_name, self.settings.estimated_delivery
            ),
        })
    }

    /// Drop a session's cart. Returns whether one existed.
    pub fn clear_session(&self, session: &SessionKey) -> Result<bool, CartError> {
        Ok(self.lock_carts()?.remove(session).is_some())
    }
}

fn user_name_or_default(name: Option<&str>) -> &str {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_USER_NAME)
}

fn resolve_product<'a>(products: &'a [Product], id_or_name: &str) -> Result<&'a Product, CartError> {
    resolve_index(products, id_or_name)
        .map(|i| &products[i])
        .ok_or_else(|| CartError::ProductNotFound {
            product_id: id_or_name.to_string(),
            available_products: products.iter().map(Product::to_ref).collect(),
        })
}

fn build_view(cart: Option<&Cart>, products: &[Product], user_name: &str, tax_rate: f64) -> CartView {
    let cart = match cart {
        Some(cart) if !cart.is_empty() => cart,
        _ => {
            return CartView {
                items: Vec::new(),
                total: 0.0,
                total_items: 0,
                item_count: 0,
                estimated_tax: 0.0,
                estimated_total: 0.0,
                message: Some(format!("{}'s cart is empty", user_name)),
            }
        }
    };

    let items = cart
        .items
        .iter()
        .map(|item| {
            let product = products.iter().find(|p| p.id == item.product_id);
            CartLineView {
                product: CartProductView {
                    id: item.product_id.clone(),
                    name: item.product_name.clone(),
                    price: item.unit_price,
                    category: item.category.clone(),
                    description: product.map(|p| p.description.clone()).unwrap_or_default(),
                    image_url: product.map(|p| p.image_url.clone()).unwrap_or_default(),
                    brand: product.map(|p| p.brand.clone()).unwrap_or_default(),
                    rating: product.map(|p| p.rating).unwrap_or_default(),
                    availability: product.is_none_or(Product::is_available),
                },
                quantity: item.quantity,
            }
        })
        .collect();

    let total = cart.total();
    CartView {
        items,
        total: round_cents(total),
        total_items: cart.total_items(),
        item_count: cart.items.len(),
        estimated_tax: round_cents(total * tax_rate),
        estimated_total: round_cents(total * (1.0 + tax_rate)),
        message: None,
    }
}
