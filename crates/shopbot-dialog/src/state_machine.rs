//! Turn state machine with validated transitions.
//!
//! One full turn walks:
//! - AwaitingUserInput -> BuildingRequest (user input accepted)
//! - BuildingRequest -> AwaitingLlmResponse (request sent)
//! - AwaitingLlmResponse -> DispatchingTools (response carried tool calls)
//! - AwaitingLlmResponse -> EmittingResponse (prose only)
//! - DispatchingTools -> EmittingResponse (tools finished)
//! - EmittingResponse -> AwaitingUserInput (interaction ended)
//!
//! Any state may fall back to AwaitingUserInput on failure.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::DialogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnState {
    AwaitingUserInput,
    BuildingRequest,
    AwaitingLlmResponse,
    DispatchingTools,
    EmittingResponse,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::AwaitingUserInput => write!(f, "awaiting_user_input"),
            TurnState::BuildingRequest => write!(f, "building_request"),
            TurnState::AwaitingLlmResponse => write!(f, "awaiting_llm_response"),
            TurnState::DispatchingTools => write!(f, "dispatching_tools"),
            TurnState::EmittingResponse => write!(f, "emitting_response"),
        }
    }
}

impl TurnState {
    pub fn can_transition_to(&self, target: &TurnState) -> bool {
        matches!(
            (self, target),
            (TurnState::AwaitingUserInput, TurnState::BuildingRequest)
                | (TurnState::BuildingRequest, TurnState::AwaitingLlmResponse)
                | (TurnState::AwaitingLlmResponse, TurnState::DispatchingTools)
                | (TurnState::AwaitingLlmResponse, TurnState::EmittingResponse)
                | (TurnState::DispatchingTools, TurnState::EmittingResponse)
                | (TurnState::EmittingResponse, TurnState::AwaitingUserInput)
                // Failure recovery
                | (TurnState::BuildingRequest, TurnState::AwaitingUserInput)
                | (TurnState::AwaitingLlmResponse, TurnState::AwaitingUserInput)
                | (TurnState::DispatchingTools, TurnState::AwaitingUserInput)
        )
    }

    pub fn is_idle(&self) -> bool {
        *self == TurnState::AwaitingUserInput
    }
}

/// Shared, validated turn state for one connection.
#[derive(Debug, Clone)]
pub struct TurnStateMachine {
    state: Arc<Mutex<TurnState>>,
}

impl Default for TurnStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnStateMachine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TurnState::AwaitingUserInput)),
        }
    }

    pub fn current(&self) -> Result<TurnState, DialogError> {
        self.state
            .lock()
            .map(|s| *s)
            .map_err(|e| DialogError::Storage(format!("turn state mutex poisoned: {}", e)))
    }

    pub fn transition(&self, target: TurnState) -> Result<(), DialogError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| DialogError::Storage(format!("turn state mutex poisoned: {}", e)))?;
        if state.can_transition_to(&target) {
            tracing::debug!("Turn state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(DialogError::InvalidTransition(format!("{} -> {}", *state, target)))
        }
    }

    /// Force the machine back to AwaitingUserInput.
    pub fn reset(&self) {
        match self.state.lock() {
            Ok(mut state) => {
                if !state.is_idle() {
                    tracing::warn!("Turn state reset to awaiting_user_input from {}", *state);
                }
                *state = TurnState::AwaitingUserInput;
            }
            Err(poisoned) => {
                *poisoned.into_inner() = TurnState::AwaitingUserInput;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(TurnState::AwaitingUserInput.to_string(), "awaiting_user_input");
        assert_eq!(TurnState::DispatchingTools.to_string(), "dispatching_tools");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(TurnState::AwaitingUserInput.can_transition_to(&TurnState::BuildingRequest));
        assert!(TurnState::BuildingRequest.can_transition_to(&TurnState::AwaitingLlmResponse));
        assert!(TurnState::AwaitingLlmResponse.can_transition_to(&TurnState::DispatchingTools));
        assert!(TurnState::AwaitingLlmResponse.can_transition_to(&TurnState::EmittingResponse));
        assert!(TurnState::DispatchingTools.can_transition_to(&TurnState::EmittingResponse));
        assert!(TurnState::EmittingResponse.can_transition_to(&TurnState::AwaitingUserInput));
        assert!(TurnState::AwaitingLlmResponse.can_transition_to(&TurnState::AwaitingUserInput));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!TurnState::AwaitingUserInput.can_transition_to(&TurnState::DispatchingTools));
        assert!(!TurnState::AwaitingUserInput.can_transition_to(&TurnState::AwaitingUserInput));
        assert!(!TurnState::EmittingResponse.can_transition_to(&TurnState::DispatchingTools));
        assert!(!TurnState::DispatchingTools.can_transition_to(&TurnState::AwaitingLlmResponse));
    }

    #[test]
    fn test_happy_path_with_tools() {
        let sm = TurnStateMachine::new();
        sm.transition(TurnState::BuildingRequest).unwrap();
        sm.transition(TurnState::AwaitingLlmResponse).unwrap();
        sm.transition(TurnState::DispatchingTools).unwrap();
        sm.transition(TurnState::EmittingResponse).unwrap();
        sm.transition(TurnState::AwaitingUserInput).unwrap();
        assert_eq!(sm.current().unwrap(), TurnState::AwaitingUserInput);
    }

    #[test]
    fn test_invalid_transition_reports_both_states() {
        let sm = TurnStateMachine::new();
        match sm.transition(TurnState::EmittingResponse) {
            Err(DialogError::InvalidTransition(msg)) => {
                assert!(msg.contains("awaiting_user_input"));
                assert!(msg.contains("emitting_response"));
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
        assert_eq!(sm.current().unwrap(), TurnState::AwaitingUserInput);
    }

    #[test]
    fn test_reset_and_shared_clone() {
        let sm = TurnStateMachine::new();
        let other = sm.clone();
        sm.transition(TurnState::BuildingRequest).unwrap();
        assert_eq!(other.current().unwrap(), TurnState::BuildingRequest);
        other.reset();
        assert!(sm.current().unwrap().is_idle());
    }
}
