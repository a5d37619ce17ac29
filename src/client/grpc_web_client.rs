//! # gRPC-Web Client
//!
//! Entry point for issuing calls. Each call runs on its own tokio task; calls
//! share nothing but the transport (and so its connection pool).

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use super::call::{Call, CallEvent, MethodPath};
use super::driver::{CallDriver, DriverSettings};
use super::handle::CallHandle;
use crate::config::ClientConfig;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::status::{Code, Status};
use crate::transport::{HttpTransport, Transport};

/// Result of a unary call.
///
/// A failed call may still carry the message the server sent before its
/// non-OK status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryResponse {
    pub initial_metadata: Metadata,
    pub message: Option<Bytes>,
    pub status: Status,
}

impl UnaryResponse {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// The response message on success, the status otherwise
    pub fn into_result(self) -> std::result::Result<Bytes, Status> {
        if !self.status.is_ok() {
            return Err(self.status);
        }
        self.message
            .ok_or_else(|| Status::new(Code::Internal, "unary call completed without a message"))
    }
}

/// gRPC-Web client bound to one endpoint
#[derive(Debug, Clone)]
pub struct GrpcWebClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl GrpcWebClient {
    /// Create a client with a pooled HTTP transport
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
        })
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Spawn the driver for `call` and return its handle
    pub fn start_call(&self, mut call: Call) -> CallHandle {
        if call.deadline.is_none() {
            call.deadline = self.config.default_timeout().map(Deadline::after);
        }

        let call_id = Uuid::new_v4();
        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        debug!(
            call_id = %call_id,
            method = %call.method,
            streaming = call.streaming,
            has_deadline = call.deadline.is_some(),
            "Starting call"
        );

        let settings = DriverSettings {
            wire_format: self.config.wire_format,
            max_frame_size: self.config.max_frame_size,
            user_agent: self.config.user_agent.clone(),
        };
        let driver = CallDriver::new(
            call_id,
            call,
            Arc::clone(&self.transport),
            settings,
            event_tx,
            cancel_rx,
        );
        tokio::spawn(driver.run());

        CallHandle::new(call_id, event_rx, cancel_tx)
    }

    /// Run a unary call to completion.
    ///
    /// An OK status with zero or several messages is reported as `INTERNAL`.
    pub async fn unary_call(&self, call: Call) -> UnaryResponse {
        let mut handle = self.start_call(call.streaming(false));
        let mut initial_metadata = Metadata::new();
        let mut messages = Vec::new();
        let mut status = None;

        while let Some(event) = handle.next_event().await {
            match event {
                CallEvent::Metadata(metadata) => initial_metadata = metadata,
                CallEvent::Message(message) => messages.push(message),
                CallEvent::Status(s) => status = Some(s),
                CallEvent::Cancelled => {
                    status = Some(Status::new(Code::Cancelled, "Call cancelled"));
                }
            }
        }

        let mut status = status
            .unwrap_or_else(|| Status::new(Code::Internal, "call ended without a status"));
        if status.is_ok() && messages.len() != 1 {
            warn!(
                call_id = %handle.call_id(),
                messages = messages.len(),
                "Unary call did not receive exactly one message"
            );
            status = Status::new(
                Code::Internal,
                format!("unary call received {} messages", messages.len()),
            )
            .with_metadata(status.metadata().clone());
        }

        UnaryResponse {
            initial_metadata,
            message: messages.into_iter().next(),
            status,
        }
    }

    /// Start a server-streaming call
    pub fn server_streaming_call(&self, call: Call) -> CallHandle {
        self.start_call(call.streaming(true))
    }

    /// Unary call by method path
    pub async fn unary(
        &self,
        method: &str,
        request: impl Into<Bytes>,
        metadata: Metadata,
        deadline: Option<Deadline>,
    ) -> Result<UnaryResponse> {
        let call = Self::build_call(method, request, metadata, deadline)?;
        Ok(self.unary_call(call).await)
    }

    /// Server-streaming call by method path
    pub fn streaming(
        &self,
        method: &str,
        request: impl Into<Bytes>,
        metadata: Metadata,
        deadline: Option<Deadline>,
    ) -> Result<CallHandle> {
        let call = Self::build_call(method, request, metadata, deadline)?;
        Ok(self.server_streaming_call(call))
    }

    fn build_call(
        method: &str,
        request: impl Into<Bytes>,
        metadata: Metadata,
        deadline: Option<Deadline>,
    ) -> Result<Call> {
        let method: MethodPath = method.parse()?;
        let mut call = Call::new(method, request).with_metadata(metadata);
        call.deadline = deadline;
        Ok(call)
    }
}
