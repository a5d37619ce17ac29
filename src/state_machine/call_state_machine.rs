use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::TransitionEvent,
    states::CallState,
};

/// One applied transition, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub from: CallState,
    pub to: CallState,
    pub event: &'static str,
    pub at: DateTime<Utc>,
}

/// Lifecycle state machine for a single call
#[derive(Debug, Clone)]
pub struct CallStateMachine {
    call_id: Uuid,
    state: CallState,
    history: Vec<TransitionRecord>,
}

impl CallStateMachine {
    /// Create a new state machine in the `Created` state
    pub fn new(call_id: Uuid) -> Self {
        Self {
            call_id,
            state: CallState::default(),
            history: Vec::new(),
        }
    }

    /// Get the current state of the call
    pub fn current_state(&self) -> CallState {
        self.state
    }

    /// Attempt to transition the call state
    pub fn transition(&mut self, event: TransitionEvent) -> StateMachineResult<CallState> {
        let current_state = self.state;
        let target_state = Self::determine_target_state(current_state, &event)?;

        debug!(
            call_id = %self.call_id,
            from = %current_state,
            to = %target_state,
            event = event.event_type(),
            reason = event.error_message(),
            "Call state transition"
        );

        self.history.push(TransitionRecord {
            from: current_state,
            to: target_state,
            event: event.event_type(),
            at: Utc::now(),
        });
        self.state = target_state;
        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    fn determine_target_state(
        current_state: CallState,
        event: &TransitionEvent,
    ) -> StateMachineResult<CallState> {
        let target = match (current_state, event) {
            // Request path
            (CallState::Created, TransitionEvent::Send) => CallState::Sent,
            (CallState::Sent, TransitionEvent::HeadersReceived) => CallState::ReceivingHeaders,

            // Response frames
            (CallState::ReceivingHeaders, TransitionEvent::FrameReceived) => CallState::Streaming,
            (CallState::Streaming, TransitionEvent::FrameReceived) => CallState::Streaming,

            // Completion, including trailers-only responses
            (CallState::ReceivingHeaders, TransitionEvent::TrailerReceived) => {
                CallState::Completed
            }
            (CallState::Streaming, TransitionEvent::TrailerReceived) => CallState::Completed,

            // Cancel and failure from any non-terminal state
            (state, TransitionEvent::Cancel) if !state.is_terminal() => CallState::Cancelled,
            (state, TransitionEvent::Fail(_)) if !state.is_terminal() => CallState::Failed,

            // Invalid transitions
            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    /// Check if the call is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if the call is waiting on the server
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Transitions applied so far, oldest first
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }
}
