use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Newtype Wrappers - Identifiers
// =============================================================================

/// Session key issued by the client on `/load`.
///
/// Accompanies the streaming connection and the `/unload` call; all
/// server-side per-session state (profile, cart, turn log) is keyed by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one user-turn-to-agent-response cycle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionId(pub String);

impl InteractionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one utterance; partial deliveries share it with the final one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(pub String);

impl UtteranceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Participants
// =============================================================================

/// Source of a conversation event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub is_agent: bool,
    #[serde(default)]
    pub is_user: bool,
}

impl Actor {
    pub fn agent(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_agent: true,
            is_user: false,
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_agent: false,
            is_user: true,
        }
    }
}

/// Agent persona supplied on session load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProfile {
    pub name: String,
    pub description: String,
    pub motivation: String,
    /// Free-text facts about the customer (addresses, cards, preferences).
    pub knowledge: String,
}

impl AgentProfile {
    /// True when no persona text at all was supplied.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
            && self.description.trim().is_empty()
            && self.motivation.trim().is_empty()
            && self.knowledge.trim().is_empty()
    }
}

/// Everything the server knows about a loaded session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    pub user_name: String,
    #[serde(default)]
    pub agent: AgentProfile,
}

// =============================================================================
// Money
// =============================================================================

/// Round a currency amount to two decimals.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(79.99 * 3.0), 239.97);
        assert_eq!(round_cents(0.0), 0.0);
        assert_eq!(round_cents(19.196), 19.2);
        assert_eq!(round_cents(239.97 * 0.08), 19.2);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = InteractionId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: UtteranceId = serde_json::from_str("\"u-1\"").unwrap();
        assert_eq!(back.as_str(), "u-1");
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(SessionKey::generate(), SessionKey::generate());
        assert_ne!(InteractionId::generate(), InteractionId::generate());
    }

    #[test]
    fn test_actor_wire_format() {
        let json = serde_json::to_value(Actor::agent("ShopBot")).unwrap();
        assert_eq!(json["isAgent"], true);
        assert_eq!(json["isUser"], false);
        assert_eq!(json["name"], "ShopBot");
    }

    #[test]
    fn test_session_profile_from_load_body() {
        let profile: SessionProfile = serde_json::from_str(
            r#"{"userName":"Jack","agent":{"name":"ShopBot","knowledge":"likes red"}}"#,
        )
        .unwrap();
        assert_eq!(profile.user_name, "Jack");
        assert_eq!(profile.agent.name, "ShopBot");
        assert_eq!(profile.agent.knowledge, "likes red");
        assert!(profile.agent.description.is_empty());
        assert!(!profile.agent.is_blank());
        assert!(AgentProfile::default().is_blank());
    }
}
