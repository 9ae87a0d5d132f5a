//! Ordered chat history built from server events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopbot_core::events::{InteractionEndEvent, TextEvent};
use shopbot_core::{Actor, InteractionId, ShoppingData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryKind {
    Actor,
    InteractionEnd,
}

/// One rendered entry of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<InteractionId>,
    #[serde(default)]
    pub source: Actor,
    /// Display name of the speaker, on actor entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub text: String,
    /// True while the utterance is still a partial.
    #[serde(default)]
    pub is_recognizing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shopping_data: Option<ShoppingData>,
    #[serde(default)]
    pub sequence: u64,
}

impl ChatHistoryItem {
    /// Build an actor entry from a TEXT event, keyed by its utterance id.
    pub fn from_text(event: &TextEvent) -> Self {
        let id = event
            .packet_id
            .utterance_id
            .as_ref()
            .map(|u| u.as_str().to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            id,
            kind: HistoryKind::Actor,
            date: event.date,
            interaction_id: event.packet_id.interaction_id.clone(),
            source: event.routing.source.clone(),
            author: event.routing.source.name.clone(),
            text: event.text.text.clone(),
            is_recognizing: !event.text.is_final,
            shopping_data: event.shopping_data.clone(),
            sequence: event.packet_id.sequence,
        }
    }

    pub fn from_interaction_end(event: &InteractionEndEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: HistoryKind::InteractionEnd,
            date: event.date,
            interaction_id: event.packet_id.interaction_id.clone(),
            source: event.routing.source.clone(),
            author: None,
            text: String::new(),
            is_recognizing: false,
            shopping_data: None,
            sequence: event.packet_id.sequence,
        }
    }

    pub fn is_agent_actor(&self) -> bool {
        self.kind == HistoryKind::Actor && self.source.is_agent
    }

    /// A completed agent utterance belonging to `interaction_id`.
    pub fn is_finalized_agent_for(&self, interaction_id: &InteractionId) -> bool {
        self.is_agent_actor()
            && !self.is_recognizing
            && self.interaction_id.as_ref() == Some(interaction_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    /// Ignored because an equal-id entry with a later sequence is held.
    Stale,
}

#[derive(Debug, Default, Clone)]
pub struct ChatHistory {
    items: Vec<ChatHistoryItem>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ChatHistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: &str) -> Option<&ChatHistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Insert or replace by id.
    ///
    /// A replacement without shopping data keeps the data already attached
    /// to the entry it replaces. A replacement older than the held entry is
    /// discarded.
    pub fn upsert(&mut self, mut item: ChatHistoryItem) -> Upsert {
        let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) else {
            self.items.push(item);
            return Upsert::Inserted;
        };
        if item.sequence != 0 && existing.sequence != 0 && item.sequence < existing.sequence {
            tracing::debug!(
                "Ignoring stale update for {} (seq {} < {})",
                item.id,
                item.sequence,
                existing.sequence
            );
            return Upsert::Stale;
        }
        if item.shopping_data.is_none() {
            item.shopping_data = existing.shopping_data.take();
        }
        *existing = item;
        Upsert::Replaced
    }

    pub fn push(&mut self, item: ChatHistoryItem) {
        self.items.push(item);
    }

    /// Attach to the latest finalized agent entry of `interaction_id`.
    pub fn attach_to_interaction(&mut self, interaction_id: &InteractionId, data: &ShoppingData) -> bool {
        match self
            .items
            .iter_mut()
            .rev()
            .find(|item| item.is_finalized_agent_for(interaction_id))
        {
            Some(item) => {
                item.shopping_data = Some(data.clone());
                true
            }
            None => false,
        }
    }

    /// Attach to the most recent agent entry regardless of interaction.
    pub fn attach_to_latest_agent(&mut self, data: &ShoppingData) -> bool {
        match self.items.iter_mut().rev().find(|item| item.is_agent_actor()) {
            Some(item) => {
                item.shopping_data = Some(data.clone());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn actor(id: &str, interaction: &str, agent: bool, recognizing: bool, sequence: u64) -> ChatHistoryItem {
        ChatHistoryItem {
            id: id.to_string(),
            kind: HistoryKind::Actor,
            date: Utc::now(),
            interaction_id: Some(InteractionId::new(interaction)),
            source: if agent { Actor::agent("ShopBot") } else { Actor::user("Ada") },
            author: None,
            text: format!("text {}", sequence),
            is_recognizing: recognizing,
            shopping_data: None,
            sequence,
        }
    }

    fn data() -> ShoppingData {
        ShoppingData {
            cart_contents: Some(json!({"items": []})),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut history = ChatHistory::new();
        assert_eq!(history.upsert(actor("u1", "i1", true, true, 2)), Upsert::Inserted);
        assert_eq!(history.upsert(actor("u1", "i1", true, false, 3)), Upsert::Replaced);
        assert_eq!(history.len(), 1);
        assert!(!history.items()[0].is_recognizing);
    }

    #[test]
    fn test_upsert_preserves_attached_data() {
        let mut history = ChatHistory::new();
        let mut first = actor("u1", "i1", true, false, 2);
        first.shopping_data = Some(data());
        history.upsert(first);
        history.upsert(actor("u1", "i1", true, false, 3));
        assert_eq!(history.get("u1").unwrap().shopping_data, Some(data()));
    }

    #[test]
    fn test_upsert_rejects_stale_sequence() {
        let mut history = ChatHistory::new();
        history.upsert(actor("u1", "i1", true, false, 5));
        assert_eq!(history.upsert(actor("u1", "i1", true, true, 4)), Upsert::Stale);
        assert!(!history.get("u1").unwrap().is_recognizing);
    }

    #[test]
    fn test_attach_requires_finalized_agent() {
        let mut history = ChatHistory::new();
        history.upsert(actor("u0", "i1", false, false, 1));
        history.upsert(actor("u1", "i1", true, true, 2));
        assert!(!history.attach_to_interaction(&InteractionId::new("i1"), &data()));

        history.upsert(actor("u1", "i1", true, false, 3));
        assert!(history.attach_to_interaction(&InteractionId::new("i1"), &data()));
        assert!(history.get("u1").unwrap().shopping_data.is_some());
        assert!(history.get("u0").unwrap().shopping_data.is_none());
        assert!(!history.attach_to_interaction(&InteractionId::new("i2"), &data()));
    }

    #[test]
    fn test_attach_to_latest_agent() {
        let mut history = ChatHistory::new();
        assert!(!history.attach_to_latest_agent(&data()));
        history.upsert(actor("a", "i1", true, false, 2));
        history.upsert(actor("b", "i2", true, true, 2));
        history.upsert(actor("c", "i2", false, false, 1));
        assert!(history.attach_to_latest_agent(&data()));
        assert!(history.get("b").unwrap().shopping_data.is_some());
        assert!(history.get("a").unwrap().shopping_data.is_none());
    }
}
