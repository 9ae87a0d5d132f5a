//! Language model interface.
//!
//! The dialog layer treats the model as a black box that turns a
//! [`ChatRequest`] into a stream of [`ModelChunk`]s: text deltas and
//! tool-call fragments. Fragments for one call share an id and are
//! reassembled by the caller.

pub mod openai;
pub mod scripted;
pub mod sse;

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopbot_tools::{ToolCall, ToolSchema};

use crate::error::DialogError;

pub use openai::OpenAiModel;
pub use scripted::ScriptedModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the conversation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Interaction id for user/assistant turns, `tool-<call id>` for summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// How the model may use the offered tools.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ToolChoice {
    #[default]
    Auto,
    Required,
    None,
    /// Force a call to the named function.
    Function(String),
}

impl ToolChoice {
    /// `auto`, `required` and `none` map to themselves; anything else names a function.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "auto" => ToolChoice::Auto,
            "required" => ToolChoice::Required,
            "none" => ToolChoice::None,
            name => ToolChoice::Function(name.to_string()),
        }
    }

    /// OpenAI `tool_choice` request value.
    pub fn to_openai(&self) -> Value {
        match self {
            ToolChoice::Auto => json!("auto"),
            ToolChoice::Required => json!("required"),
            ToolChoice::None => json!("none"),
            ToolChoice::Function(name) => json!({
                "type": "function",
                "function": { "name": name }
            }),
        }
    }
}

impl fmt::Display for ToolChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolChoice::Auto => write!(f, "auto"),
            ToolChoice::Required => write!(f, "required"),
            ToolChoice::None => write!(f, "none"),
            ToolChoice::Function(name) => write!(f, "{}", name),
        }
    }
}

/// Full request for one model round.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
    pub tool_choice: ToolChoice,
}

/// One streamed piece of a model response.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelChunk {
    Text(String),
    ToolCall(ToolCall),
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ModelChunk, DialogError>> + Send>>;

/// A chat model with tool calling.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, DialogError>;
}
