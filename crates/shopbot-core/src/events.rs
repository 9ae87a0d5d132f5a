//! Wire protocol between server and client: events pushed over the session
//! stream and the messages a client sends back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Actor, InteractionId, UtteranceId};

/// All events the server pushes over a session connection.
///
/// Serialized with a `type` discriminant (`AUDIO`, `INTERRUPT`, `TEXT`,
/// `SHOPPING_DATA`, `INTERACTION_END`, `ERROR`). Consumers match exhaustively,
/// so adding a kind is a compile-time change on both ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    /// One synthesized speech chunk for the current agent utterance.
    Audio(AudioEvent),
    /// Barge-in: stop playback and drop queued audio.
    Interrupt,
    /// A partial or final utterance from the user or the agent.
    Text(TextEvent),
    /// Projected tool results for one interaction.
    ShoppingData(ShoppingDataEvent),
    /// Marks the end of an interaction.
    InteractionEnd(InteractionEndEvent),
    /// Non-fatal upstream failure surfaced to the user.
    Error(ErrorEvent),
}

impl ServerEvent {
    /// Wire discriminant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Audio(_) => "AUDIO",
            ServerEvent::Interrupt => "INTERRUPT",
            ServerEvent::Text(_) => "TEXT",
            ServerEvent::ShoppingData(_) => "SHOPPING_DATA",
            ServerEvent::InteractionEnd(_) => "INTERACTION_END",
            ServerEvent::Error(_) => "ERROR",
        }
    }

    /// Interaction the event belongs to, when it carries one.
    pub fn interaction_id(&self) -> Option<&InteractionId> {
        match self {
            ServerEvent::Audio(e) => e.packet_id.interaction_id.as_ref(),
            ServerEvent::Text(e) => e.packet_id.interaction_id.as_ref(),
            ServerEvent::ShoppingData(e) => e.packet_id.interaction_id.as_ref(),
            ServerEvent::InteractionEnd(e) => e.packet_id.interaction_id.as_ref(),
            ServerEvent::Interrupt | ServerEvent::Error(_) => None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorEvent {
            error: message.into(),
        })
    }
}

/// Addressing information shared by interaction-scoped events.
///
/// `sequence` increases monotonically within one interaction so a consumer
/// can discard a delivery that is older than what it already holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance_id: Option<UtteranceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<InteractionId>,
    #[serde(default)]
    pub sequence: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    pub source: Actor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    /// Base64-encoded audio bytes.
    pub chunk: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioEvent {
    pub audio: AudioChunk,
    #[serde(rename = "packetId", default)]
    pub packet_id: PacketId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    pub text: String,
    #[serde(rename = "final")]
    pub is_final: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextEvent {
    #[serde(rename = "packetId")]
    pub packet_id: PacketId,
    pub date: DateTime<Utc>,
    pub routing: Routing,
    pub text: TextBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shopping_data: Option<ShoppingData>,
}

impl TextEvent {
    pub fn is_agent(&self) -> bool {
        self.routing.source.is_agent
    }

    pub fn is_final(&self) -> bool {
        self.text.is_final
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShoppingDataEvent {
    #[serde(rename = "packetId")]
    pub packet_id: PacketId,
    pub shopping_data: ShoppingData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionEndEvent {
    #[serde(rename = "packetId")]
    pub packet_id: PacketId,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub routing: Routing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error: String,
}

/// Structured projection of one turn's tool results, keyed by widget.
///
/// Only the slots touched by the turn's tool calls are populated. When two
/// calls target the same slot the later one wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShoppingData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_update: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_contents: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_result: Option<Value>,
}

impl ShoppingData {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_none()
            && self.product_details.is_none()
            && self.cart_update.is_none()
            && self.cart_contents.is_none()
            && self.order_result.is_none()
    }
}

/// Messages the client sends over the session connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Free-form user utterance, including synthesized widget actions.
    Text { text: String },
}
