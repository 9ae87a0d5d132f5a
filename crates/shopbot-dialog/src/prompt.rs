//! System prompt assembly and request building.

use shopbot_core::SessionProfile;
use shopbot_tools::tool_schemas;

use crate::llm::{ChatMessage, ChatRequest, ToolChoice};

macro_rules! shopping_tools_description {
    () => {
        "
**Shopping Capabilities:**
You can use these shopping tools on the customer's behalf:

1. **Product Recommendations** - Use 'recommend_products' to find products matching the customer's preferences, budget or requirements.

2. **Product Information** - Use 'get_product_info' for details on one product, including reviews and availability.

3. **Cart Management** - Use 'add_to_cart' to add products, 'update_cart' to change quantities or remove items, and 'view_cart' to show the cart and its totals.

4. **Order Processing** - Use 'checkout_order' to place the order once the customer is ready to buy.

**Shopping Flow:**
- Recommend products, add to cart, view cart, then checkout
- Products must be in the cart before checkout
- Offer useful details and comparisons along the way

**Guidelines:**
- Be friendly and accurate
- When recommending products, mention price, rating and availability
- For product questions, use the details returned by the tool
- Call add_to_cart before suggesting checkout
- Checkout needs a shipping address and a payment method
- Answer conversationally while weaving in the tool results"
    };
}

const SHOPPING_TOOLS_DESCRIPTION: &str = shopping_tools_description!();

/// Appended verbatim to a persona system prompt.
pub const SHOPPING_SYSTEM_MESSAGE_ENHANCEMENT: &str = concat!(
    shopping_tools_description!(),
    "

**Tool Usage Notes:**
- Stay in character while using the shopping tools
- Your knowledge may hold the customer's shipping address, payment card and preferences; use it when calling tools
- Address the customer by name and keep replies personal
- Fold known preferences into your recommendations

Use the tools naturally, in your own voice, to give the customer a great shopping experience."
);

/// Used when the session has no persona.
pub const FALLBACK_SHOPPING_SYSTEM_MESSAGE: &str = "You are a helpful AI assistant with shopping capabilities. Use the available shopping tools to help customers find products, manage their cart, and complete purchases.";

/// Standalone prompt for the command-line assistant.
pub fn cli_system_message() -> String {
    format!(
        "You are a helpful shopping assistant. You can help customers:{}\n\nKeep the experience smooth from first question to completed order.",
        SHOPPING_TOOLS_DESCRIPTION
    )
}

/// Persona text for a loaded session, `None` when nothing was supplied.
pub fn persona_prompt(profile: &SessionProfile) -> Option<String> {
    let agent = &profile.agent;
    if agent.is_blank() {
        return None;
    }

    let mut sections = Vec::new();
    let name = agent.name.trim();
    let description = agent.description.trim();
    match (name.is_empty(), description.is_empty()) {
        (false, false) => sections.push(format!("You are {}. {}", name, description)),
        (false, true) => sections.push(format!("You are {}.", name)),
        (true, false) => sections.push(description.to_string()),
        (true, true) => {}
    }
    if !agent.motivation.trim().is_empty() {
        sections.push(format!("Motivation: {}", agent.motivation.trim()));
    }
    if !agent.knowledge.trim().is_empty() {
        sections.push(format!("Knowledge:\n{}", agent.knowledge.trim()));
    }
    if !profile.user_name.trim().is_empty() {
        sections.push(format!("You are talking to {}.", profile.user_name.trim()));
    }
    Some(sections.join("\n\n"))
}

/// Persona plus shopping instructions, or the generic fallback.
pub fn system_prompt(persona: Option<&str>) -> String {
    match persona {
        Some(persona) => format!("{}{}", persona, SHOPPING_SYSTEM_MESSAGE_ENHANCEMENT),
        None => FALLBACK_SHOPPING_SYSTEM_MESSAGE.to_string(),
    }
}

/// Full model request: system prompt first, then the whole log.
pub fn build_request(persona: Option<&str>, log: &[ChatMessage], tool_choice: &ToolChoice) -> ChatRequest {
    let mut messages = Vec::with_capacity(log.len() + 1);
    messages.push(ChatMessage::system(system_prompt(persona)));
    messages.extend(log.iter().cloned());
    ChatRequest {
        messages,
        tools: tool_schemas(),
        tool_choice: tool_choice.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use shopbot_core::AgentProfile;

    fn profile() -> SessionProfile {
        SessionProfile {
            user_name: "Ada".to_string(),
            agent: AgentProfile {
                name: "Maya".to_string(),
                description: "A cheerful shopping guide.".to_string(),
                motivation: "Help people find great gear.".to_string(),
                knowledge: "Ada's shipping address: 1 Main St, Springfield, IL 62701".to_string(),
            },
        }
    }

    #[test]
    fn test_persona_prompt_sections() {
        let prompt = persona_prompt(&profile()).unwrap();
        assert!(prompt.starts_with("You are Maya. A cheerful shopping guide."));
        assert!(prompt.contains("Motivation: Help people find great gear."));
        assert!(prompt.contains("Knowledge:\nAda's shipping address"));
        assert!(prompt.ends_with("You are talking to Ada."));
    }

    #[test]
    fn test_blank_persona_is_none() {
        let profile = SessionProfile {
            user_name: "Ada".to_string(),
            agent: AgentProfile::default(),
        };
        assert!(persona_prompt(&profile).is_none());
    }

    #[test]
    fn test_enhancement_is_appended_verbatim() {
        let prompt = system_prompt(Some("You are Maya."));
        assert_eq!(
            prompt,
            format!("You are Maya.{}", SHOPPING_SYSTEM_MESSAGE_ENHANCEMENT)
        );
        assert!(SHOPPING_SYSTEM_MESSAGE_ENHANCEMENT.starts_with(SHOPPING_TOOLS_DESCRIPTION));
        assert_eq!(system_prompt(None), FALLBACK_SHOPPING_SYSTEM_MESSAGE);
    }

    #[test]
    fn test_build_request_prepends_system() {
        let log = vec![
            ChatMessage::user("hi").with_id("i1"),
            ChatMessage::system("Cart is empty").with_id("tool-c1"),
        ];
        let request = build_request(None, &log, &ToolChoice::Auto);
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, FALLBACK_SHOPPING_SYSTEM_MESSAGE);
        assert_eq!(request.messages[2].content, "Cart is empty");
        assert_eq!(request.tools.len(), 6);
    }

    #[test]
    fn test_cli_message_lists_tools() {
        assert!(cli_system_message().contains("checkout_order"));
    }
}
