//! Server-side dialog orchestration for ShopBot.
//!
//! Turns user utterances into model requests, runs the shopping tools the
//! model asks for, and streams the resulting events back to the client.

pub mod error;
pub mod llm;
pub mod prompt;
pub mod sequence;
pub mod speech;
pub mod state_machine;
pub mod templates;
pub mod turn;

pub use error::DialogError;
pub use llm::{ChatMessage, ChatRequest, LanguageModel, ModelChunk, OpenAiModel, Role, ScriptedModel, ToolChoice};
pub use speech::{OpenAiSpeech, SpeechSynthesizer};
pub use state_machine::{TurnState, TurnStateMachine};
pub use turn::{TurnOutcome, TurnReconciler, TurnSettings};
