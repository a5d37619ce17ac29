//! Call descriptions and the events a call produces.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;

use crate::deadline::Deadline;
use crate::error::{GrpcWebError, Result};
use crate::metadata::Metadata;
use crate::status::Status;

/// Fully qualified method path, `/<service>/<method>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodPath {
    service: String,
    method: String,
}

impl MethodPath {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Result<Self> {
        let service = service.into();
        let method = method.into();
        if service.is_empty() || method.is_empty() {
            return Err(GrpcWebError::invalid_request(
                "service and method names must not be empty",
            ));
        }
        if service.contains('/') || method.contains('/') {
            return Err(GrpcWebError::invalid_request(format!(
                "invalid method path segments: {service:?} / {method:?}"
            )));
        }
        Ok(Self { service, method })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for MethodPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.service, self.method)
    }
}

impl FromStr for MethodPath {
    type Err = GrpcWebError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s.strip_prefix('/').ok_or_else(|| {
            GrpcWebError::invalid_request(format!("method path must start with '/': {s:?}"))
        })?;
        let (service, method) = rest.split_once('/').ok_or_else(|| {
            GrpcWebError::invalid_request(format!("method path must be /service/method: {s:?}"))
        })?;
        Self::new(service, method)
    }
}

/// One RPC as described by the caller
#[derive(Debug, Clone)]
pub struct Call {
    pub method: MethodPath,
    /// Serialized request message, opaque to the engine
    pub payload: Bytes,
    pub deadline: Option<Deadline>,
    /// Request metadata, sent as HTTP headers
    pub metadata: Metadata,
    /// Deliver response messages incrementally
    pub streaming: bool,
}

impl Call {
    pub fn new(method: MethodPath, payload: impl Into<Bytes>) -> Self {
        Self {
            method,
            payload: payload.into(),
            deadline: None,
            metadata: Metadata::new(),
            streaming: false,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Deadline::after(timeout))
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

/// Ordered events of one call.
///
/// `Metadata` arrives at most once and before any `Message`; exactly one
/// terminal event (`Status` or `Cancelled`) ends every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// Initial metadata from the response headers
    Metadata(Metadata),
    /// One response message
    Message(Bytes),
    /// Final status with trailing metadata
    Status(Status),
    /// The caller cancelled the call
    Cancelled,
}

impl CallEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Status(_) | Self::Cancelled)
    }

    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Metadata(_) => "metadata",
            Self::Message(_) => "message",
            Self::Status(_) => "status",
            Self::Cancelled => "cancelled",
        }
    }
}
