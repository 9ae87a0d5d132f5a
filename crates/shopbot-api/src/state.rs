//! Application state shared across all route handlers.
//!
//! AppState holds the loaded sessions, the cart engine, the tool dispatcher
//! and the model handles. It is passed to handlers via axum's State extractor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use shopbot_cart::CartEngine;
use shopbot_core::{ServerEvent, SessionKey, SessionProfile, ShopConfig, ShopError};
use shopbot_dialog::{LanguageModel, SpeechSynthesizer, TurnReconciler, TurnSettings};
use shopbot_tools::{ToolDispatcher, ToolRegistry};
use tokio::sync::mpsc;

use crate::error::ApiError;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
/// Mutable state is protected by `Mutex`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Mutex<ShopConfig>>,
    /// Profiles registered through `/load`, by session key.
    pub sessions: Arc<Mutex<HashMap<SessionKey, SessionProfile>>>,
    pub cart: Arc<CartEngine>,
    pub dispatcher: ToolDispatcher,
    pub model: Arc<dyn LanguageModel>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
    pub turn_settings: TurnSettings,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ShopConfig, cart: Arc<CartEngine>, model: Arc<dyn LanguageModel>) -> Self {
        let registry = Arc::new(ToolRegistry::with_defaults(Arc::clone(&cart)));
        let turn_settings = TurnSettings::from_config(&config);
        Self {
            config: Arc::new(Mutex::new(config)),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            cart,
            dispatcher: ToolDispatcher::new(registry),
            model,
            speech: None,
            turn_settings,
            start_time: Instant::now(),
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn port(&self) -> u16 {
        self.config.lock().map(|c| c.general.port).unwrap_or(4000)
    }

    fn lock_sessions(&self) -> Result<MutexGuard<'_, HashMap<SessionKey, SessionProfile>>, ApiError> {
        self.sessions
            .lock()
            .map_err(|e| ApiError::Internal(format!("sessions lock poisoned: {}", e)))
    }

    /// Register `profile` under `key`. Returns true when an earlier session
    /// with the same key was replaced.
    pub fn register(&self, key: SessionKey, profile: SessionProfile) -> Result<bool, ApiError> {
        let replaced = self.lock_sessions()?.insert(key.clone(), profile).is_some();
        if replaced {
            self.cart.clear_session(&key).map_err(ShopError::from)?;
        }
        Ok(replaced)
    }

    pub fn profile(&self, key: &SessionKey) -> Result<Option<SessionProfile>, ApiError> {
        Ok(self.lock_sessions()?.get(key).cloned())
    }

    /// Forget a session and its cart. Returns the removed profile.
    pub fn unregister(&self, key: &SessionKey) -> Result<Option<SessionProfile>, ApiError> {
        let removed = self.lock_sessions()?.remove(key);
        if removed.is_some() {
            self.cart.clear_session(key).map_err(ShopError::from)?;
        }
        Ok(removed)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Build the turn reconciler for one event stream connection.
    pub fn turn_reconciler(
        &self,
        key: SessionKey,
        profile: SessionProfile,
        events: mpsc::UnboundedSender<ServerEvent>,
    ) -> TurnReconciler {
        let turns = TurnReconciler::new(
            key,
            profile,
            Arc::clone(&self.model),
            self.dispatcher.clone(),
            self.turn_settings.clone(),
            events,
        );
        match &self.speech {
            Some(speech) => turns.with_speech(Arc::clone(speech)),
            None => turns,
        }
    }
}
