//! Deterministic model that replays queued responses.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use shopbot_tools::ToolCall;

use super::{ChatRequest, ChunkStream, LanguageModel, ModelChunk};
use crate::error::DialogError;

/// What one scripted round produces.
#[derive(Clone, Debug)]
pub enum ScriptedTurn {
    Chunks(Vec<ModelChunk>),
    /// `stream` itself fails with this message.
    Fail(String),
    /// The stream yields these chunks, then errors mid-way.
    BreakAfter(Vec<ModelChunk>, String),
}

/// Replays one [`ScriptedTurn`] per request, in order, and records every
/// request it receives. Once the script runs out it answers with an
/// empty stream.
#[derive(Default)]
pub struct ScriptedModel {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turns(turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, turn: ScriptedTurn) -> Result<(), DialogError> {
        self.turns
            .lock()
            .map_err(|e| DialogError::Storage(format!("script mutex poisoned: {}", e)))?
            .push_back(turn);
        Ok(())
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

/// Plain text reply.
pub fn text(reply: &str) -> ScriptedTurn {
    ScriptedTurn::Chunks(vec![ModelChunk::Text(reply.to_string())])
}

/// One complete tool call per entry, `(id, name, args)`.
pub fn tool_calls(calls: &[(&str, &str, &str)]) -> ScriptedTurn {
    ScriptedTurn::Chunks(
        calls
            .iter()
            .map(|(id, name, args)| ModelChunk::ToolCall(ToolCall::new(*id, *name, *args)))
            .collect(),
    )
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, DialogError> {
        self.requests
            .lock()
            .map_err(|e| DialogError::Storage(format!("request log mutex poisoned: {}", e)))?
            .push(request.clone());

        let turn = self
            .turns
            .lock()
            .map_err(|e| DialogError::Storage(format!("script mutex poisoned: {}", e)))?
            .pop_front()
            .unwrap_or(ScriptedTurn::Chunks(Vec::new()));

        let items: Vec<Result<ModelChunk, DialogError>> = match turn {
            ScriptedTurn::Chunks(chunks) => chunks.into_iter().map(Ok).collect(),
            ScriptedTurn::Fail(message) => return Err(DialogError::Llm(message)),
            ScriptedTurn::BreakAfter(chunks, message) => chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(DialogError::Llm(message))))
                .collect(),
        };
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}
