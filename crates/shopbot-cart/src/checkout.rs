//! Checkout support: detail resolution, order ids and tracking numbers.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::error::CartError;
use crate::knowledge;
use crate::types::{CheckoutRequest, PaymentMethod, ShippingAddress};

const TRACKING_LEN: usize = 12;

/// Issues `ORD-<millis>` ids that never repeat within a process, even when
/// two checkouts land in the same millisecond.
#[derive(Debug, Default)]
pub struct OrderIdGenerator {
    last: AtomicI64,
}

impl OrderIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("ORD-{}", candidate),
                Err(observed) => current = observed,
            }
        }
    }
}

pub fn tracking_number() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TRACKING_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("TRK-{}", suffix)
}

/// Settle the shipping address and payment method for a checkout.
///
/// Precedence per field: explicit request value, then typed agent context,
/// then scraped knowledge text. `session_knowledge` stands in for the agent
/// context's free text when the request carries none.
pub fn resolve_details(
    request: &CheckoutRequest,
    session_knowledge: Option<&str>,
) -> Result<(ShippingAddress, PaymentMethod), CartError> {
    let context = request.agent_context.as_ref();
    let knowledge_text = context
        .and_then(|c| c.knowledge.as_deref())
        .or(session_knowledge)
        .filter(|k| !k.trim().is_empty());

    let shipping = request
        .shipping_address
        .clone()
        .or_else(|| context.and_then(|c| c.shipping_address.clone()))
        .or_else(|| knowledge_text.and_then(knowledge::extract_shipping_address));

    let payment = request
        .payment_method
        .clone()
        .or_else(|| context.and_then(|c| c.payment_method.clone()))
        .or_else(|| knowledge_text.and_then(knowledge::extract_payment_method));

    match (shipping, payment) {
        (Some(shipping), Some(payment)) => {
            shipping.validate()?;
            Ok((shipping, payment))
        }
        (shipping, payment) => Err(CartError::MissingCheckoutInfo {
            shipping_address: shipping.is_none(),
            payment_method: payment.is_none(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentContext, PaymentKind};

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            country: "USA".to_string(),
        }
    }

    fn paypal() -> PaymentMethod {
        PaymentMethod {
            kind: PaymentKind::Paypal,
            card_token: None,
        }
    }

    #[test]
    fn test_order_ids_strictly_increase() {
        let generator = OrderIdGenerator::new();
        let ids: Vec<i64> = (0..50)
            .map(|_| {
                generator
                    .next_id()
                    .trim_start_matches("ORD-")
                    .parse()
                    .unwrap()
            })
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_tracking_number_format() {
        let trk = tracking_number();
        assert!(trk.starts_with("TRK-"));
        let suffix = &trk[4..];
        assert_eq!(suffix.len(), 12);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_explicit_values_win() {
        let request = CheckoutRequest {
            shipping_address: Some(address()),
            payment_method: Some(paypal()),
            agent_context: Some(AgentContext {
                knowledge: Some("payment card ending with 1111".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (shipping, payment) = resolve_details(&request, None).unwrap();
        assert_eq!(shipping.city, "Springfield");
        assert_eq!(payment.kind, PaymentKind::Paypal);
    }

    #[test]
    fn test_typed_context_preferred_over_scraping() {
        let request = CheckoutRequest {
            agent_context: Some(AgentContext {
                knowledge: Some(
                    "shipping address: 9 Elm, Shelbyville, IL 60000\npayment card ending with 1111"
                        .to_string(),
                ),
                shipping_address: Some(address()),
                payment_method: None,
            }),
            ..Default::default()
        };
        let (shipping, payment) = resolve_details(&request, None).unwrap();
        assert_eq!(shipping.city, "Springfield");
        assert_eq!(payment.card_token.as_deref(), Some("****-****-****-1111"));
    }

    #[test]
    fn test_session_knowledge_fallback() {
        let request = CheckoutRequest::default();
        let knowledge = "shipping address: 9 Elm, Shelbyville, IL 60000\npayment card ending with 77";
        let (shipping, payment) = resolve_details(&request, Some(knowledge)).unwrap();
        assert_eq!(shipping.zip_code, "60000");
        assert_eq!(payment.kind, PaymentKind::CreditCard);
    }

    #[test]
    fn test_missing_everything() {
        let err = resolve_details(&CheckoutRequest::default(), None).unwrap_err();
        match err {
            CartError::MissingCheckoutInfo {
                shipping_address,
                payment_method,
            } => {
                assert!(shipping_address);
                assert!(payment_method);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scraped_address_is_revalidated() {
        let request = CheckoutRequest {
            payment_method: Some(paypal()),
            ..Default::default()
        };
        let err =
            resolve_details(&request, Some("shipping address: 1 Main St, Springfield, IL"))
                .unwrap_err();
        assert!(matches!(err, CartError::InvalidShippingAddress("zip_code")));
    }
}
