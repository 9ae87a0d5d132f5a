//! Per-interaction packet numbering.

use shopbot_core::events::PacketId;
use shopbot_core::{InteractionId, UtteranceId};

/// Stamps every event of one interaction with a strictly increasing sequence.
#[derive(Debug)]
pub struct PacketSequencer {
    interaction_id: InteractionId,
    next: u64,
}

impl PacketSequencer {
    pub fn new(interaction_id: InteractionId) -> Self {
        Self {
            interaction_id,
            next: 1,
        }
    }

    pub fn interaction_id(&self) -> &InteractionId {
        &self.interaction_id
    }

    pub fn next_packet(&mut self, utterance_id: Option<&UtteranceId>) -> PacketId {
        let sequence = self.next;
        self.next += 1;
        PacketId {
            utterance_id: utterance_id.cloned(),
            interaction_id: Some(self.interaction_id.clone()),
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_increases() {
        let mut seq = PacketSequencer::new(InteractionId::new("i1"));
        let utterance = UtteranceId::new("u1");
        let a = seq.next_packet(Some(&utterance));
        let b = seq.next_packet(None);
        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert_eq!(a.utterance_id, Some(utterance));
        assert!(b.utterance_id.is_none());
        assert_eq!(b.interaction_id.unwrap().as_str(), "i1");
    }
}
