use serde::{Deserialize, Serialize};

/// Events that can trigger call state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TransitionEvent {
    /// Request handed to the transport
    Send,
    /// HTTP response headers arrived
    HeadersReceived,
    /// A data frame arrived
    FrameReceived,
    /// Terminal status resolved (trailer frame or trailers-only response)
    TrailerReceived,
    /// Caller cancelled the call
    Cancel,
    /// Call failed with a reason
    Fail(String),
}

impl TransitionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::HeadersReceived => "headers_received",
            Self::FrameReceived => "frame_received",
            Self::TrailerReceived => "trailer_received",
            Self::Cancel => "cancel",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TrailerReceived | Self::Cancel | Self::Fail(_))
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
