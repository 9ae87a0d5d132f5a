//! Widget actions rendered as user utterances.

use std::fmt;

use shopbot_core::ClientMessage;

/// What a shopping widget can ask for on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShoppingAction {
    AddToCart { product_name: String },
    ViewDetails { product_name: String },
    UpdateQuantity { product_name: String, quantity: u32 },
    Remove { product_name: String },
    ContinueShopping,
}

impl fmt::Display for ShoppingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShoppingAction::AddToCart { product_name } => write!(f, "Add {} to cart", product_name),
            ShoppingAction::ViewDetails { product_name } => {
                write!(f, "Show me details for {}", product_name)
            }
            ShoppingAction::UpdateQuantity {
                product_name,
                quantity,
            } => write!(f, "Update {} quantity to {}", product_name, quantity),
            ShoppingAction::Remove { product_name } => write!(f, "Remove {} from cart", product_name),
            ShoppingAction::ContinueShopping => write!(f, "I want to continue shopping"),
        }
    }
}

impl ShoppingAction {
    pub fn to_message(&self) -> ClientMessage {
        ClientMessage::Text {
            text: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_utterances() {
        let name = "Yoga Mat".to_string();
        assert_eq!(
            ShoppingAction::AddToCart { product_name: name.clone() }.to_string(),
            "Add Yoga Mat to cart"
        );
        assert_eq!(
            ShoppingAction::ViewDetails { product_name: name.clone() }.to_string(),
            "Show me details for Yoga Mat"
        );
        assert_eq!(
            ShoppingAction::UpdateQuantity {
                product_name: name.clone(),
                quantity: 3
            }
            .to_string(),
            "Update Yoga Mat quantity to 3"
        );
        assert_eq!(
            ShoppingAction::Remove { product_name: name }.to_string(),
            "Remove Yoga Mat from cart"
        );
        assert_eq!(
            ShoppingAction::ContinueShopping.to_message(),
            ClientMessage::Text {
                text: "I want to continue shopping".to_string()
            }
        );
    }
}
