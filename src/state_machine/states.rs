use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a single call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// Call built by the caller, nothing sent yet
    #[default]
    Created,
    /// Request handed to the transport
    Sent,
    /// Response headers received (initial metadata)
    ReceivingHeaders,
    /// At least one response frame received
    Streaming,
    /// Trailer received and status computed
    Completed,
    /// Caller cancelled the call
    Cancelled,
    /// Transport, framing, protocol or deadline failure
    Failed,
}

impl CallState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Check if the call is waiting on the server
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Sent | Self::ReceivingHeaders | Self::Streaming)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Sent => write!(f, "sent"),
            Self::ReceivingHeaders => write!(f, "receiving_headers"),
            Self::Streaming => write!(f, "streaming"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CallState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "sent" => Ok(Self::Sent),
            "receiving_headers" => Ok(Self::ReceivingHeaders),
            "streaming" => Ok(Self::Streaming),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid call state: {s}")),
        }
    }
}
