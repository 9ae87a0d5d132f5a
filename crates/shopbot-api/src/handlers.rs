//! HTTP route handlers: health, session load and unload.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopbot_core::{AgentProfile, SessionKey, SessionProfile};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct KeyParams {
    pub key: Option<String>,
}

impl KeyParams {
    /// The trimmed key, when one was supplied.
    pub fn session_key(&self) -> Option<SessionKey> {
        self.key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(SessionKey::new)
    }

    pub fn require(&self) -> Result<SessionKey, ApiError> {
        self.session_key()
            .ok_or_else(|| ApiError::Validation(json!([field_error("key", "query", "key is required")])))
    }
}

fn field_error(field: &str, location: &str, message: &str) -> Value {
    json!({ "field": field, "location": location, "message": message })
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub port: u16,
    pub uptime_secs: u64,
    pub sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadResponse {
    pub key: SessionKey,
    pub agent: AgentProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnloadResponse {
    pub key: SessionKey,
    pub unloaded: bool,
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    tracing::debug!("Health check requested");
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        port: state.port(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        sessions: state.session_count(),
    })
}

/// Register a session profile under the client-chosen key.
///
/// Body: `{"userName": "...", "agent": {...}}`. The key must be non-empty,
/// `userName` non-blank and `agent` an object.
pub async fn load(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
    Json(body): Json<Value>,
) -> Result<Json<LoadResponse>, ApiError> {
    let key = params.session_key();
    let user_name = body
        .get("userName")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let agent = body.get("agent").filter(|a| a.is_object());

    let (Some(key), Some(user_name), Some(agent)) = (key, user_name, agent) else {
        let mut errors = Vec::new();
        if params.session_key().is_none() {
            errors.push(field_error("key", "query", "key is required"));
        }
        if user_name.is_none() {
            errors.push(field_error("userName", "body", "userName is required"));
        }
        if agent.is_none() {
            errors.push(field_error("agent", "body", "agent must be an object"));
        }
        tracing::warn!(errors = errors.len(), "Rejected session load");
        return Err(ApiError::Validation(Value::Array(errors)));
    };

    let agent: AgentProfile = serde_json::from_value(agent.clone())
        .map_err(|e| ApiError::BadRequest(format!("invalid agent: {}", e)))?;
    let profile = SessionProfile {
        user_name: user_name.to_string(),
        agent: agent.clone(),
    };
    let replaced = state.register(key.clone(), profile)?;
    tracing::info!(session = %key, user = %user_name, replaced, "Session loaded");

    Ok(Json(LoadResponse { key, agent }))
}

pub async fn unload(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
) -> Result<Json<UnloadResponse>, ApiError> {
    let key = params.require()?;
    match state.unregister(&key)? {
        Some(_) => {
            tracing::info!(session = %key, "Session unloaded");
            Ok(Json(UnloadResponse { key, unloaded: true }))
        }
        None => Err(ApiError::NotFound(format!("Session {} not found", key))),
    }
}
