//! Per-connection turn reconciliation.
//!
//! A [`TurnReconciler`] owns one connection's conversation log and drives
//! each user input through the model, the tool dispatcher and back out as
//! [`ServerEvent`]s. Turns are processed one at a time (`&mut self`), so
//! tool side effects within and across turns are strictly ordered.
//!
//! Event order for one interaction:
//! 1. `INTERRUPT` if the previous turn produced audio
//! 2. user `TEXT` echo
//! 3. agent `TEXT` partials while the model streams
//! 4. agent `TEXT` final
//! 5. `AUDIO` chunks when speech is configured
//! 6. `SHOPPING_DATA` after the configured delay, when tools ran
//! 7. `INTERACTION_END`
//!
//! Every interaction-scoped event carries a strictly increasing sequence
//! number so consumers can discard stale deliveries.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use futures_util::StreamExt;
use shopbot_core::events::{
    AudioChunk, AudioEvent, InteractionEndEvent, Routing, ShoppingDataEvent, TextBody, TextEvent,
};
use shopbot_core::{Actor, InteractionId, ServerEvent, SessionKey, SessionProfile, ShopConfig, UtteranceId};
use shopbot_tools::{project, ToolCall, ToolCallAggregator, ToolContext, ToolDispatcher, ToolInvocation};
use tokio::sync::mpsc;

use crate::error::DialogError;
use crate::llm::{ChatMessage, ChatRequest, LanguageModel, ModelChunk, ToolChoice};
use crate::prompt;
use crate::sequence::PacketSequencer;
use crate::speech::SpeechSynthesizer;
use crate::state_machine::{TurnState, TurnStateMachine};
use crate::templates::{clean_text, response_text, summary_line};

const DEFAULT_USER_NAME: &str = "User";
const DEFAULT_AGENT_NAME: &str = "Assistant";

#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Gap between the agent text and the shopping data event.
    pub shopping_event_delay: Duration,
    pub max_input_chars: usize,
    pub stream_partials: bool,
    pub tool_choice: ToolChoice,
}

impl TurnSettings {
    pub fn from_config(config: &ShopConfig) -> Self {
        Self {
            shopping_event_delay: Duration::from_millis(config.dialog.shopping_event_delay_ms),
            max_input_chars: config.dialog.max_input_chars,
            stream_partials: config.dialog.stream_partials,
            tool_choice: ToolChoice::parse(&config.llm.tool_choice),
        }
    }
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from_config(&ShopConfig::default())
    }
}

/// What one completed turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub interaction_id: InteractionId,
    /// Final agent text, possibly synthesized from tool results.
    pub text: String,
    pub invocations: Vec<ToolInvocation>,
}

struct ModelResponse {
    raw_text: String,
    calls: Vec<ToolCall>,
    partial_sent: bool,
}

pub struct TurnReconciler {
    session: SessionKey,
    profile: SessionProfile,
    persona: Option<String>,
    model: Arc<dyn LanguageModel>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    dispatcher: ToolDispatcher,
    settings: TurnSettings,
    state: TurnStateMachine,
    log: Vec<ChatMessage>,
    events: mpsc::UnboundedSender<ServerEvent>,
    audio_in_flight: bool,
}

impl TurnReconciler {
    pub fn new(
        session: SessionKey,
        profile: SessionProfile,
        model: Arc<dyn LanguageModel>,
        dispatcher: ToolDispatcher,
        settings: TurnSettings,
        events: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        let persona = prompt::persona_prompt(&profile);
        Self {
            session,
            profile,
            persona,
            model,
            speech: None,
            dispatcher,
            settings,
            state: TurnStateMachine::new(),
            log: Vec::new(),
            events,
            audio_in_flight: false,
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Replace the persona text used to build the system prompt.
    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        self.persona = persona;
        self
    }

    pub fn session(&self) -> &SessionKey {
        &self.session
    }

    pub fn state(&self) -> Result<TurnState, DialogError> {
        self.state.current()
    }

    /// Conversation log without the system prompt.
    pub fn log(&self) -> &[ChatMessage] {
        &self.log
    }

    /// Run one user input to completion.
    ///
    /// Rejected input and model failures are reported to the client as
    /// `ERROR` events and returned; the reconciler is ready for the next
    /// input either way.
    pub async fn handle_input(&mut self, text: &str) -> Result<TurnOutcome, DialogError> {
        let text = text.trim();
        if let Err(e) = self.validate(text) {
            tracing::warn!(session = %self.session, error = %e, "Rejected user input");
            self.emit(ServerEvent::error(e.to_string()))?;
            return Err(e);
        }

        self.state.transition(TurnState::BuildingRequest)?;
        let result = self.run_turn(text).await;
        if result.is_err() {
            self.state.reset();
        }
        result
    }

    fn validate(&self, text: &str) -> Result<(), DialogError> {
        if text.is_empty() {
            return Err(DialogError::EmptyInput);
        }
        if text.chars().count() > self.settings.max_input_chars {
            return Err(DialogError::InputTooLong(self.settings.max_input_chars));
        }
        Ok(())
    }

    async fn run_turn(&mut self, text: &str) -> Result<TurnOutcome, DialogError> {
        let mut seq = PacketSequencer::new(InteractionId::generate());
        let interaction_id = seq.interaction_id().clone();

        if self.audio_in_flight {
            self.audio_in_flight = false;
            self.emit(ServerEvent::Interrupt)?;
        }

        self.log
            .push(ChatMessage::user(text).with_id(interaction_id.as_str()));
        let echo = seq.next_packet(Some(&UtteranceId::generate()));
        self.emit(text_event(echo, self.user_actor(), text, true))?;

        let request = prompt::build_request(
            self.persona.as_deref(),
            &self.log,
            &self.settings.tool_choice,
        );
        self.state.transition(TurnState::AwaitingLlmResponse)?;

        let agent_utterance = UtteranceId::generate();
        let response = match self.collect_response(&request, &mut seq, &agent_utterance).await {
            Ok(response) => response,
            Err(DialogError::ChannelClosed) => return Err(DialogError::ChannelClosed),
            Err(e) => {
                tracing::error!(session = %self.session, model = %self.model.name(), error = %e, "Model request failed");
                self.emit(ServerEvent::error(format!("Failed to get a response: {}", e)))?;
                self.emit_interaction_end(&mut seq)?;
                return Err(e);
            }
        };

        let mut reply = clean_text(&response.raw_text);
        let invocations = if response.calls.is_empty() {
            Vec::new()
        } else {
            self.state.transition(TurnState::DispatchingTools)?;
            let ctx = self.tool_context();
            let invocations = self.dispatcher.dispatch(&ctx, response.calls).await;
            for invocation in &invocations {
                self.log.push(
                    ChatMessage::system(summary_line(invocation))
                        .with_id(format!("tool-{}", invocation.call.id)),
                );
            }
            invocations
        };
        self.state.transition(TurnState::EmittingResponse)?;

        if reply.is_empty() {
            reply = response_text(&invocations).unwrap_or_default();
        }

        if !reply.is_empty() {
            self.log
                .push(ChatMessage::assistant(reply.clone()).with_id(interaction_id.as_str()));
        }
        if !reply.is_empty() || response.partial_sent {
            let packet = seq.next_packet(Some(&agent_utterance));
            self.emit(text_event(packet, self.agent_actor(), &reply, true))?;
        }
        if !reply.is_empty() {
            self.speak(&mut seq, &agent_utterance, &reply).await?;
        }

        if !invocations.is_empty() {
            if !self.settings.shopping_event_delay.is_zero() {
                tokio::time::sleep(self.settings.shopping_event_delay).await;
            }
            let packet = seq.next_packet(None);
            self.emit(ServerEvent::ShoppingData(ShoppingDataEvent {
                packet_id: packet,
                shopping_data: project(&invocations),
            }))?;
        }

        self.emit_interaction_end(&mut seq)?;
        self.state.transition(TurnState::AwaitingUserInput)?;

        tracing::info!(
            session = %self.session,
            interaction = %interaction_id,
            tools = invocations.len(),
            "Turn completed"
        );

        Ok(TurnOutcome {
            interaction_id,
            text: reply,
            invocations,
        })
    }

    async fn collect_response(
        &self,
        request: &ChatRequest,
        seq: &mut PacketSequencer,
        agent_utterance: &UtteranceId,
    ) -> Result<ModelResponse, DialogError> {
        let mut stream = self.model.stream(request).await?;
        let mut raw_text = String::new();
        let mut aggregator = ToolCallAggregator::new();
        let mut partial_sent = false;

        while let Some(chunk) = stream.next().await {
            match chunk? {
                ModelChunk::Text(delta) => {
                    raw_text.push_str(&delta);
                    if self.settings.stream_partials {
                        let partial = clean_text(&raw_text);
                        if !partial.is_empty() {
                            let packet = seq.next_packet(Some(agent_utterance));
                            self.emit(text_event(packet, self.agent_actor(), &partial, false))?;
                            partial_sent = true;
                        }
                    }
                }
                ModelChunk::ToolCall(fragment) => aggregator.push(fragment),
            }
        }

        Ok(ModelResponse {
            raw_text,
            calls: aggregator.finish(),
            partial_sent,
        })
    }

    async fn speak(
        &mut self,
        seq: &mut PacketSequencer,
        agent_utterance: &UtteranceId,
        text: &str,
    ) -> Result<(), DialogError> {
        let Some(speech) = self.speech.clone() else {
            return Ok(());
        };
        match speech.synthesize(text).await {
            Ok(chunks) => {
                for chunk in &chunks {
                    let packet = seq.next_packet(Some(agent_utterance));
                    self.emit(ServerEvent::Audio(AudioEvent {
                        audio: AudioChunk {
                            chunk: STANDARD.encode(chunk),
                        },
                        packet_id: packet,
                    }))?;
                }
                self.audio_in_flight = !chunks.is_empty();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session = %self.session, error = %e, "Speech synthesis failed");
                self.emit(ServerEvent::error(format!("Speech synthesis failed: {}", e)))
            }
        }
    }

    fn emit_interaction_end(&self, seq: &mut PacketSequencer) -> Result<(), DialogError> {
        let packet = seq.next_packet(None);
        self.emit(ServerEvent::InteractionEnd(InteractionEndEvent {
            packet_id: packet,
            date: Utc::now(),
            routing: Routing {
                source: self.agent_actor(),
            },
        }))
    }

    fn emit(&self, event: ServerEvent) -> Result<(), DialogError> {
        self.events
            .send(event)
            .map_err(|_| DialogError::ChannelClosed)
    }

    fn tool_context(&self) -> ToolContext {
        let mut ctx = ToolContext::new(self.session.clone());
        ctx.user_name = non_empty(&self.profile.user_name);
        ctx.knowledge = non_empty(&self.profile.agent.knowledge);
        ctx
    }

    fn user_actor(&self) -> Actor {
        Actor::user(non_empty(&self.profile.user_name).unwrap_or_else(|| DEFAULT_USER_NAME.to_string()))
    }

    fn agent_actor(&self) -> Actor {
        Actor::agent(non_empty(&self.profile.agent.name).unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()))
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn text_event(packet_id: shopbot_core::events::PacketId, source: Actor, text: &str, is_final: bool) -> ServerEvent {
    ServerEvent::Text(TextEvent {
        packet_id,
        date: Utc::now(),
        routing: Routing { source },
        text: TextBody {
            text: text.to_string(),
            is_final,
        },
        shopping_data: None,
    })
}
