use thiserror::Error;

/// Errors raised when the call lifecycle table is violated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
