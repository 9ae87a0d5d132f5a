//! Shopping data waiting for its agent message.

use std::time::{Duration, Instant};

use shopbot_core::{InteractionId, ShoppingData};

#[derive(Debug, Clone, PartialEq)]
pub struct PendingShoppingData {
    pub interaction_id: InteractionId,
    pub shopping_data: ShoppingData,
    pub received_at: Instant,
}

/// At most one record per interaction; a newer delivery replaces the older.
#[derive(Debug, Default, Clone)]
pub struct PendingQueue {
    records: Vec<PendingShoppingData>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn get(&self, interaction_id: &InteractionId) -> Option<&PendingShoppingData> {
        self.records.iter().find(|r| &r.interaction_id == interaction_id)
    }

    pub fn upsert(&mut self, interaction_id: InteractionId, shopping_data: ShoppingData, now: Instant) {
        self.records.retain(|r| r.interaction_id != interaction_id);
        self.records.push(PendingShoppingData {
            interaction_id,
            shopping_data,
            received_at: now,
        });
    }

    pub fn remove(&mut self, interaction_id: &InteractionId) -> Option<PendingShoppingData> {
        let index = self.records.iter().position(|r| &r.interaction_id == interaction_id)?;
        Some(self.records.remove(index))
    }

    /// Keep only the records for which `f` returns false.
    pub fn remove_where(&mut self, mut f: impl FnMut(&PendingShoppingData) -> bool) {
        self.records.retain(|r| !f(r));
    }

    /// Remove and return every record older than `timeout`, oldest first.
    pub fn drain_expired(&mut self, now: Instant, timeout: Duration) -> Vec<PendingShoppingData> {
        let (expired, live): (Vec<_>, Vec<_>) = self
            .records
            .drain(..)
            .partition(|r| now.saturating_duration_since(r.received_at) > timeout);
        self.records = live;
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(tag: &str) -> ShoppingData {
        ShoppingData {
            order_result: Some(json!({ "order_id": tag })),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_replaces_same_interaction() {
        let now = Instant::now();
        let mut queue = PendingQueue::new();
        queue.upsert(InteractionId::new("i1"), data("a"), now);
        queue.upsert(InteractionId::new("i2"), data("b"), now);
        queue.upsert(InteractionId::new("i1"), data("c"), now);
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.get(&InteractionId::new("i1")).unwrap().shopping_data,
            data("c")
        );
    }

    #[test]
    fn test_drain_expired() {
        let start = Instant::now();
        let mut queue = PendingQueue::new();
        queue.upsert(InteractionId::new("old"), data("a"), start);
        queue.upsert(InteractionId::new("new"), data("b"), start + Duration::from_secs(4));

        let expired = queue.drain_expired(start + Duration::from_secs(5), Duration::from_secs(5));
        assert!(expired.is_empty());

        let expired = queue.drain_expired(start + Duration::from_millis(5001), Duration::from_secs(5));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].interaction_id.as_str(), "old");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut queue = PendingQueue::new();
        queue.upsert(InteractionId::new("i1"), data("a"), Instant::now());
        assert!(queue.remove(&InteractionId::new("i2")).is_none());
        assert!(queue.remove(&InteractionId::new("i1")).is_some());
        assert!(queue.is_empty());
    }
}
