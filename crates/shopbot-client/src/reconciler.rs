//! Folds server events into chat history, pending shopping data, audio
//! playback, and user notifications.
//!
//! SHOPPING_DATA for an interaction may arrive before or after the agent's
//! final TEXT. Data that finds no finalized agent entry is parked in a
//! pending queue and retried three ways:
//! - shortly after a final agent TEXT for the same interaction (`poll`)
//! - on every sweep tick (`sweep`)
//! - on expiry, where it falls back to the most recent agent entry
//!
//! Time is always passed in, so the whole state machine is driven by the
//! caller and can be stepped deterministically.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use shopbot_core::config::ClientConfig;
use shopbot_core::{Actor, InteractionId, ServerEvent, SessionProfile};

use crate::audio::AudioSequencer;
use crate::grouping::{group_history, interaction_ongoing, HistoryGroup};
use crate::history::{ChatHistory, ChatHistoryItem, Upsert};
use crate::pending::PendingQueue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    pub sweep_interval: Duration,
    pub pending_timeout: Duration,
    pub attach_delay: Duration,
    pub max_notifications: usize,
}

impl ReconcilerSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            sweep_interval: Duration::from_millis(config.sweep_interval_ms),
            pending_timeout: Duration::from_millis(config.pending_timeout_ms),
            attach_delay: Duration::from_millis(config.attach_delay_ms),
            max_notifications: config.max_notifications.max(1),
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// A server-reported error for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ScheduledAttach {
    interaction_id: InteractionId,
    due: Instant,
}

#[derive(Debug)]
pub struct HistoryReconciler {
    history: ChatHistory,
    pending: PendingQueue,
    audio: AudioSequencer,
    scheduled: Vec<ScheduledAttach>,
    notifications: VecDeque<Notification>,
    settings: ReconcilerSettings,
    profile: Option<SessionProfile>,
}

impl HistoryReconciler {
    pub fn new(audio: AudioSequencer, settings: ReconcilerSettings) -> Self {
        Self {
            history: ChatHistory::new(),
            pending: PendingQueue::new(),
            audio,
            scheduled: Vec::new(),
            notifications: VecDeque::new(),
            settings,
            profile: None,
        }
    }

    /// Names used as the author of actor entries. Without a profile the
    /// event's own source name is kept.
    pub fn set_profile(&mut self, profile: Option<SessionProfile>) {
        self.profile = profile;
    }

    pub fn profile(&self) -> Option<&SessionProfile> {
        self.profile.as_ref()
    }

    fn author_for(&self, source: &Actor) -> Option<String> {
        let profile = self.profile.as_ref()?;
        let name = if source.is_agent {
            &profile.agent.name
        } else {
            &profile.user_name
        };
        Some(name.clone()).filter(|n| !n.trim().is_empty())
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    pub fn audio(&self) -> &AudioSequencer {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioSequencer {
        &mut self.audio
    }

    pub fn groups(&self) -> Vec<HistoryGroup<'_>> {
        group_history(self.history.items())
    }

    pub fn is_interaction_ongoing(&self) -> bool {
        interaction_ongoing(self.history.items())
    }

    /// Drain undisplayed notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// Earliest instant at which `poll` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.iter().map(|s| s.due).min()
    }

    pub fn handle_event(&mut self, event: ServerEvent, now: Instant) {
        match event {
            ServerEvent::Audio(audio) => {
                if let Err(e) = self.audio.enqueue(&audio.audio) {
                    tracing::warn!("Dropping audio chunk: {}", e);
                }
            }
            ServerEvent::Interrupt => {
                tracing::debug!("Interrupt received, halting playback");
                self.audio.interrupt();
            }
            ServerEvent::ShoppingData(event) => {
                let Some(interaction_id) = event.packet_id.interaction_id else {
                    tracing::warn!("SHOPPING_DATA without interaction id, ignoring");
                    return;
                };
                if self
                    .history
                    .attach_to_interaction(&interaction_id, &event.shopping_data)
                {
                    tracing::debug!("Attached shopping data to interaction {}", interaction_id);
                } else {
                    tracing::debug!("Parking shopping data for interaction {}", interaction_id);
                    self.pending.upsert(interaction_id, event.shopping_data, now);
                }
            }
            ServerEvent::Text(event) => {
                let finalized_agent = event.is_agent() && event.is_final();
                let interaction_id = event.packet_id.interaction_id.clone();
                let mut item = ChatHistoryItem::from_text(&event);
                if let Some(author) = self.author_for(&item.source) {
                    item.author = Some(author);
                }
                if self.history.upsert(item) == Upsert::Stale {
                    return;
                }
                if finalized_agent {
                    self.audio.resume();
                    if let Some(interaction_id) = interaction_id {
                        self.scheduled.push(ScheduledAttach {
                            interaction_id,
                            due: now + self.settings.attach_delay,
                        });
                    }
                }
            }
            ServerEvent::InteractionEnd(event) => {
                self.history.push(ChatHistoryItem::from_interaction_end(&event));
            }
            ServerEvent::Error(event) => {
                tracing::warn!("Server reported error: {}", event.error);
                self.notify(event.error);
            }
        }
    }

    /// Run every delayed attachment that has come due.
    pub fn poll(&mut self, now: Instant) {
        if self.scheduled.is_empty() {
            return;
        }
        let (due, later): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|s| s.due <= now);
        self.scheduled = later;
        for attach in due {
            self.attach_pending(&attach.interaction_id);
        }
    }

    /// Retry every pending record, then expire the ones past the timeout.
    pub fn sweep(&mut self, now: Instant) {
        let history = &mut self.history;
        self.pending
            .remove_where(|record| history.attach_to_interaction(&record.interaction_id, &record.shopping_data));

        for record in self.pending.drain_expired(now, self.settings.pending_timeout) {
            if self.history.attach_to_latest_agent(&record.shopping_data) {
                tracing::debug!(
                    "Pending shopping data for {} expired, attached to latest agent message",
                    record.interaction_id
                );
            } else {
                tracing::warn!(
                    "Pending shopping data for {} expired with no agent message to hold it",
                    record.interaction_id
                );
            }
        }
    }

    /// Forget everything, including queued audio.
    pub fn reset(&mut self) {
        self.audio.stop();
        self.history.clear();
        self.pending.clear();
        self.scheduled.clear();
        self.notifications.clear();
        self.profile = None;
    }

    fn attach_pending(&mut self, interaction_id: &InteractionId) -> bool {
        let Some(record) = self.pending.get(interaction_id) else {
            return false;
        };
        if self
            .history
            .attach_to_interaction(interaction_id, &record.shopping_data)
        {
            self.pending.remove(interaction_id);
            true
        } else {
            false
        }
    }

    fn notify(&mut self, message: String) {
        self.notifications.push_back(Notification {
            message,
            date: Utc::now(),
        });
        while self.notifications.len() > self.settings.max_notifications {
            self.notifications.pop_front();
        }
    }
}
