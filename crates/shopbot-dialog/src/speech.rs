//! Text-to-speech interface and an OpenAI-compatible implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use shopbot_core::config::LlmConfig;

use crate::error::DialogError;

/// Bytes per emitted audio chunk.
const CHUNK_BYTES: usize = 16 * 1024;

/// Turns agent text into playable audio chunks.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<Vec<u8>>, DialogError>;
}

/// `POST {api_url}/audio/speech`, response split into fixed-size chunks.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    voice: String,
}

impl OpenAiSpeech {
    pub fn new(llm: &LlmConfig, model: impl Into<String>, voice: impl Into<String>) -> Result<Self, DialogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs.max(1)))
            .build()
            .map_err(|e| DialogError::Speech(e.to_string()))?;
        Ok(Self {
            client,
            api_url: llm.api_url.trim_end_matches('/').to_string(),
            api_key: llm.api_key.clone(),
            model: model.into(),
            voice: voice.into(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<Vec<u8>>, DialogError> {
        let body = json!({
            "model": self.model,
            "voice": self.voice,
            "input": text,
            "response_format": "wav",
        });
        let mut request = self
            .client
            .post(format!("{}/audio/speech", self.api_url))
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DialogError::Speech(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DialogError::Speech(format!("HTTP {}", status.as_u16())));
        }
        let audio = response
            .bytes()
            .await
            .map_err(|e| DialogError::Speech(e.to_string()))?;
        Ok(split_chunks(&audio))
    }
}

pub fn split_chunks(audio: &[u8]) -> Vec<Vec<u8>> {
    audio.chunks(CHUNK_BYTES).map(<[u8]>::to_vec).collect()
}
