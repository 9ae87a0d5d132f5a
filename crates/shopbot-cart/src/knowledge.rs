//! Best-effort extraction of checkout details from free-text agent knowledge.
//!
//! Recognizes two literal phrases:
//! - `shipping address: <street>, <city>, <STATE ZIP>[, <country>]`
//! - `payment card ending with <digits>`
//!
//! Output is a suggestion only. Callers validate it exactly like
//! user-supplied input.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{PaymentKind, PaymentMethod, ShippingAddress};

const DEFAULT_COUNTRY: &str = "USA";

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)shipping address:\s*([^\n]+)").expect("Invalid address regex")
});

static CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)payment card ending with (\d+)").expect("Invalid card regex")
});

/// Pull a shipping address out of `knowledge`.
///
/// A missing ZIP stays empty so that validation rejects it.
pub fn extract_shipping_address(knowledge: &str) -> Option<ShippingAddress> {
    let caps = ADDRESS_RE.captures(knowledge)?;
    let line = caps.get(1)?.as_str().trim().trim_end_matches('.');
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }

    let mut state_zip = parts[2].split_whitespace();
    let state = state_zip.next().unwrap_or_default().to_string();
    let zip_code = state_zip.next().unwrap_or_default().to_string();
    let country = parts
        .get(3)
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

    Some(ShippingAddress {
        street: parts[0].to_string(),
        city: parts[1].to_string(),
        state,
        zip_code,
        country,
    })
}

/// Pull a masked card payment method out of `knowledge`.
pub fn extract_payment_method(knowledge: &str) -> Option<PaymentMethod> {
    let caps = CARD_RE.captures(knowledge)?;
    let last_digits = caps.get(1)?.as_str();
    Some(PaymentMethod {
        kind: PaymentKind::CreditCard,
        card_token: Some(format!("****-****-****-{}", last_digits)),
    })
}
