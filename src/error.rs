//! # Error Types
//!
//! Structured error handling for the gRPC-Web client engine. Every variant is
//! terminal for the call that produced it; the driver turns it into exactly one
//! synthesized [`Status`](crate::status::Status) or a cancellation event.

use thiserror::Error;

use crate::state_machine::StateMachineError;
use crate::status::{Code, Status};

/// Errors raised by the transport layer (connection resets, TLS failures, HTTP client faults).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection(reason.into())
    }
}

/// Engine-level error taxonomy
#[derive(Debug, Error)]
pub enum GrpcWebError {
    /// Malformed or truncated frame
    #[error("Framing error: {0}")]
    Framing(String),

    /// Missing or invalid mandatory trailer field
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Feature present on the wire that this engine does not implement
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Call cancelled")]
    Cancelled,

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Call could not be built (e.g. malformed method path)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),
}

impl GrpcWebError {
    pub fn framing(message: impl Into<String>) -> Self {
        Self::Framing(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata(message.into())
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Status code a failed call reports for this error.
    ///
    /// `Cancelled` never produces a status on the call path; the mapping is
    /// provided for callers that need a uniform view.
    pub fn status_code(&self) -> Code {
        match self {
            Self::Transport(_) => Code::Unavailable,
            Self::DeadlineExceeded => Code::DeadlineExceeded,
            Self::Cancelled => Code::Cancelled,
            Self::Framing(_)
            | Self::Protocol(_)
            | Self::UnsupportedFeature(_)
            | Self::InvalidMetadata(_)
            | Self::Configuration(_)
            | Self::InvalidRequest(_)
            | Self::StateMachine(_) => Code::Internal,
        }
    }

    /// Synthesize the terminal status for a call that failed with this error.
    pub fn to_status(&self) -> Status {
        Status::new(self.status_code(), self.to_string())
    }

    /// Check if error is worth retrying by the caller.
    ///
    /// The engine never retries on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(TransportError::Http(e)) => e.is_timeout() || e.is_connect(),
            Self::Transport(TransportError::Connection(_)) | Self::Transport(TransportError::Io(_)) => true,
            Self::DeadlineExceeded => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GrpcWebError>;
