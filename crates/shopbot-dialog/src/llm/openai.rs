//! OpenAI-compatible chat completions client.
//!
//! Sends `POST {api_url}/chat/completions` with `stream: true` and turns the
//! SSE delta feed into [`ModelChunk`]s. Tool-call deltas only carry their id
//! on the first fragment; later fragments are matched by `index`, so the
//! parser remembers the id per index and stamps it on every fragment.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use shopbot_core::config::LlmConfig;
use shopbot_tools::ToolCall;

use super::sse::SseLineParser;
use super::{ChatRequest, ChunkStream, LanguageModel, ModelChunk};
use crate::error::DialogError;

pub struct OpenAiModel {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiModel {
    pub fn new(config: LlmConfig) -> Result<Self, DialogError> {
        // Completions can stream for longer than any fixed budget, so the
        // timeout bounds connecting and each gap between reads instead.
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'))
    }

    /// Request body for one streamed completion.
    pub fn build_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "stream": true,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = request.tool_choice.to_openai();
        }
        body
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, DialogError> {
        let body = self.build_body(request);
        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tool_choice = %request.tool_choice,
            "Sending chat completion request"
        );

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DialogError::Llm(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(Box::pin(chunk_stream(bytes)))
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

struct StreamState {
    bytes: ByteStream,
    parser: SseLineParser,
    call_ids: HashMap<u64, String>,
    pending: VecDeque<ModelChunk>,
    done: bool,
}

fn chunk_stream(
    bytes: impl Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = Result<ModelChunk, DialogError>> + Send {
    futures_util::stream::unfold(
        StreamState {
            bytes: Box::pin(bytes),
            parser: SseLineParser::new(),
            call_ids: HashMap::new(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    return Some((Ok(chunk), state));
                }
                if state.done {
                    return None;
                }
                match state.bytes.next().await {
                    Some(Ok(raw)) => {
                        for event in state.parser.push(&raw) {
                            if event.is_done() {
                                state.done = true;
                                break;
                            }
                            let chunks = parse_completion_chunk(&event.data, &mut state.call_ids);
                            state.pending.extend(chunks);
                        }
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((
                            Err(DialogError::Llm(format!("stream read error: {}", e))),
                            state,
                        ));
                    }
                    None => {
                        state.done = true;
                        if let Some(event) = state.parser.flush() {
                            if !event.is_done() {
                                let chunks =
                                    parse_completion_chunk(&event.data, &mut state.call_ids);
                                state.pending.extend(chunks);
                            }
                        }
                    }
                }
            }
        },
    )
}

/// Parse one `chat.completion.chunk` payload. Malformed payloads yield nothing.
pub fn parse_completion_chunk(data: &str, call_ids: &mut HashMap<u64, String>) -> Vec<ModelChunk> {
    let parsed: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed completion chunk");
            return Vec::new();
        }
    };

    let mut chunks = Vec::new();
    let Some(choices) = parsed.get("choices").and_then(|c| c.as_array()) else {
        return chunks;
    };

    for choice in choices {
        let Some(delta) = choice.get("delta") else {
            continue;
        };

        if let Some(text) = delta.get("content").and_then(|c| c.as_str()) {
            if !text.is_empty() {
                chunks.push(ModelChunk::Text(text.to_string()));
            }
        }

        let Some(tool_calls) = delta.get("tool_calls").and_then(|t| t.as_array()) else {
            continue;
        };
        for tc in tool_calls {
            let index = tc.get("index").and_then(|i| i.as_u64()).unwrap_or(0);
            if let Some(id) = tc.get("id").and_then(|i| i.as_str()) {
                call_ids.insert(index, id.to_string());
            }
            let Some(id) = call_ids.get(&index).cloned() else {
                tracing::warn!(index, "Tool call fragment without a known id");
                continue;
            };
            let function = tc.get("function");
            let name = function
                .and_then(|f| f.get("name"))
                .and_then(|n| n.as_str())
                .unwrap_or_default();
            let args = function
                .and_then(|f| f.get("arguments"))
                .and_then(|a| a.as_str())
                .unwrap_or_default();
            chunks.push(ModelChunk::ToolCall(ToolCall::new(id, name, args)));
        }
    }
    chunks
}
