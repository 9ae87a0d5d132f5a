//! Presentation grouping of history entries.

use shopbot_core::{Actor, InteractionId};

use crate::history::{ChatHistoryItem, HistoryKind};

/// A contiguous run of actor entries from one source within one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryGroup<'a> {
    pub interaction_id: Option<&'a InteractionId>,
    pub source: &'a Actor,
    pub messages: Vec<&'a ChatHistoryItem>,
}

/// Group consecutive actor entries that share interaction and source.
/// Interaction-end markers separate groups and are not included.
pub fn group_history(items: &[ChatHistoryItem]) -> Vec<HistoryGroup<'_>> {
    let mut groups: Vec<HistoryGroup<'_>> = Vec::new();
    let mut open = false;

    for item in items {
        if item.kind != HistoryKind::Actor {
            open = false;
            continue;
        }
        let joins = open
            && groups.last().is_some_and(|group| {
                group.interaction_id == item.interaction_id.as_ref() && group.source == &item.source
            });
        if joins {
            if let Some(group) = groups.last_mut() {
                group.messages.push(item);
            }
            continue;
        }
        groups.push(HistoryGroup {
            interaction_id: item.interaction_id.as_ref(),
            source: &item.source,
            messages: vec![item],
        });
        open = true;
    }
    groups
}

/// True while the latest interaction with actor output has not ended.
///
/// Returns false for a history with no actor entries at all.
pub fn interaction_ongoing(items: &[ChatHistoryItem]) -> bool {
    let Some(latest) = items
        .iter()
        .rev()
        .find(|item| item.kind == HistoryKind::Actor)
        .map(|item| item.interaction_id.as_ref())
    else {
        return false;
    };
    !items.iter().any(|item| {
        item.kind == HistoryKind::InteractionEnd && item.interaction_id.as_ref() == latest
    })
}
