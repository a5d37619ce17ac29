//! Per-call driver task.
//!
//! Owns one call from request encoding to its terminal event: sends through
//! the transport, demultiplexes the response body, advances the call state
//! machine and publishes [`CallEvent`]s in order. Deadline, cancellation and
//! body progress are raced with `tokio::select!`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::call::{Call, CallEvent};
use crate::constants::headers::{
    ACCEPT, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, GRPC_MESSAGE, GRPC_STATUS, GRPC_TIMEOUT,
    TRANSFER_ENCODING, X_GRPC_WEB, X_USER_AGENT,
};
use crate::deadline::Deadline;
use crate::error::{GrpcWebError, Result};
use crate::logging::log_call_operation;
use crate::metadata::Metadata;
use crate::protocol::{encode_data, Frame, FrameStream, WireFormat};
use crate::state_machine::{CallStateMachine, TransitionEvent};
use crate::status::Status;
use crate::transport::{BodyStream, ResponseHandle, Transport, TransportRequest};

/// Headers the driver owns; caller metadata may not override them
const RESERVED_HEADERS: [&str; 5] = [CONTENT_TYPE, ACCEPT, X_GRPC_WEB, X_USER_AGENT, GRPC_TIMEOUT];

/// Response headers describing the HTTP exchange rather than the call
const TRANSPORT_HEADERS: [&str; 4] = [CONTENT_TYPE, CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION];

/// Per-call settings copied from the client configuration
#[derive(Debug, Clone)]
pub(crate) struct DriverSettings {
    pub wire_format: WireFormat,
    pub max_frame_size: usize,
    pub user_agent: String,
}

/// How a call ended, short of a failure
enum Outcome {
    Finished(Status),
    Cancelled,
    /// The caller dropped its handle; nobody is listening
    Detached,
}

enum Step<T> {
    Cancel,
    Deadline,
    Ready(T),
}

pub(crate) struct CallDriver {
    call_id: Uuid,
    call: Call,
    transport: Arc<dyn Transport>,
    settings: DriverSettings,
    events: mpsc::Sender<CallEvent>,
    cancel: oneshot::Receiver<()>,
    machine: CallStateMachine,
    messages: usize,
}

impl CallDriver {
    pub(crate) fn new(
        call_id: Uuid,
        call: Call,
        transport: Arc<dyn Transport>,
        settings: DriverSettings,
        events: mpsc::Sender<CallEvent>,
        cancel: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            call_id,
            call,
            transport,
            settings,
            events,
            cancel,
            machine: CallStateMachine::new(call_id),
            messages: 0,
        }
    }

    /// Drive the call to completion and publish its terminal event
    pub(crate) async fn run(mut self) {
        let method = self.call.method.to_string();

        let outcome = match self.drive().await {
            Ok(outcome) => outcome,
            Err(failure) => {
                if let Err(e) = self
                    .machine
                    .transition(TransitionEvent::fail_with_error(failure.to_string()))
                {
                    debug!(call_id = %self.call_id, error = %e, "Failure after terminal state");
                }
                match &failure {
                    GrpcWebError::Transport(e) => {
                        error!(call_id = %self.call_id, method = %method, error = %e, "Transport failure");
                    }
                    other => {
                        warn!(
                            call_id = %self.call_id,
                            method = %method,
                            code = %other.status_code(),
                            error = %other,
                            "Call failed, synthesizing status"
                        );
                    }
                }
                Outcome::Finished(failure.to_status())
            }
        };

        match outcome {
            Outcome::Finished(status) => {
                log_call_operation(
                    self.call_id,
                    &method,
                    "completed",
                    Some(status.code()),
                    self.messages,
                    (!status.message().is_empty()).then_some(status.message()),
                );
                let _ = self.events.send(CallEvent::Status(status)).await;
            }
            Outcome::Cancelled => {
                self.mark_cancelled();
                info!(call_id = %self.call_id, method = %method, "Call cancelled");
                let _ = self.events.send(CallEvent::Cancelled).await;
            }
            Outcome::Detached => {
                self.mark_cancelled();
                debug!(call_id = %self.call_id, method = %method, "Caller went away");
            }
        }
    }

    async fn drive(&mut self) -> Result<Outcome> {
        if let Some(deadline) = self.call.deadline {
            if deadline.is_expired() {
                debug!(call_id = %self.call_id, "Deadline passed before send");
                return Err(GrpcWebError::DeadlineExceeded);
            }
        }

        let timer = deadline_timer(self.call.deadline);
        tokio::pin!(timer);

        let request = self.build_request()?;
        self.advance(TransitionEvent::Send)?;
        debug!(
            call_id = %self.call_id,
            path = %request.path,
            transport = self.transport.name(),
            "Sending call"
        );

        let step = tokio::select! {
            biased;
            _ = &mut self.cancel => Step::Cancel,
            _ = &mut timer => Step::Deadline,
            response = self.transport.send(request) => Step::Ready(response),
        };
        let response = match step {
            Step::Cancel => return Ok(Outcome::Cancelled),
            Step::Deadline => return Err(GrpcWebError::DeadlineExceeded),
            Step::Ready(response) => response?,
        };

        self.advance(TransitionEvent::HeadersReceived)?;
        let ResponseHandle {
            http_status,
            headers,
            body,
        } = response;
        debug!(call_id = %self.call_id, http_status, "Response headers received");

        let header_status = headers.has(GRPC_STATUS);
        if http_status != 200 && !header_status {
            self.abort(http_status, headers, body);
            self.advance(TransitionEvent::TrailerReceived)?;
            return Ok(Outcome::Finished(Status::from_http_status(http_status)));
        }

        let mut initial = headers.clone();
        initial.remove(GRPC_STATUS);
        initial.remove(GRPC_MESSAGE);
        if let Some(stop) = self
            .emit(CallEvent::Metadata(initial), timer.as_mut())
            .await
        {
            self.abort(http_status, headers, body);
            return stop;
        }

        let mut frames = FrameStream::new(
            body,
            self.settings.wire_format,
            self.settings.max_frame_size,
        );
        loop {
            let step = tokio::select! {
                biased;
                _ = &mut self.cancel => Step::Cancel,
                _ = &mut timer => Step::Deadline,
                frame = frames.next() => Step::Ready(frame),
            };

            match step {
                Step::Cancel => {
                    self.abort(http_status, headers, frames.into_inner());
                    return Ok(Outcome::Cancelled);
                }
                Step::Deadline => {
                    debug!(call_id = %self.call_id, "Deadline expired mid-call");
                    self.abort(http_status, headers, frames.into_inner());
                    return Err(GrpcWebError::DeadlineExceeded);
                }
                Step::Ready(Some(Ok(Frame::Data(message)))) => {
                    self.advance(TransitionEvent::FrameReceived)?;
                    self.messages += 1;
                    debug!(call_id = %self.call_id, len = message.len(), "Message frame");
                    if let Some(stop) = self
                        .emit(CallEvent::Message(message), timer.as_mut())
                        .await
                    {
                        self.abort(http_status, headers, frames.into_inner());
                        return stop;
                    }
                }
                Step::Ready(Some(Ok(Frame::Trailer(trailers)))) => {
                    let status = Status::from_trailers(&trailers, self.messages > 0)?;
                    self.advance(TransitionEvent::TrailerReceived)?;
                    return Ok(Outcome::Finished(status));
                }
                Step::Ready(Some(Err(e))) => {
                    self.abort(http_status, headers, frames.into_inner());
                    return Err(e);
                }
                Step::Ready(None) => {
                    // Body ended without a trailer frame: trailers-only response
                    let trailers = if header_status {
                        trailers_from_headers(headers)
                    } else {
                        Metadata::new()
                    };
                    let status = Status::from_trailers(&trailers, self.messages > 0)?;
                    self.advance(TransitionEvent::TrailerReceived)?;
                    return Ok(Outcome::Finished(status));
                }
            }
        }
    }

    fn build_request(&self) -> Result<TransportRequest> {
        let content_type = self.settings.wire_format.content_type();
        let mut headers = vec![
            (CONTENT_TYPE.to_string(), content_type.to_string()),
            (ACCEPT.to_string(), content_type.to_string()),
            (X_GRPC_WEB.to_string(), "1".to_string()),
            (X_USER_AGENT.to_string(), self.settings.user_agent.clone()),
        ];
        if let Some(deadline) = self.call.deadline {
            headers.push((GRPC_TIMEOUT.to_string(), deadline.to_header_value()));
        }
        for (key, value) in self.call.metadata.to_header_pairs() {
            if RESERVED_HEADERS.contains(&key.as_str()) {
                debug!(call_id = %self.call_id, header = %key, "Ignoring reserved request header");
                continue;
            }
            headers.push((key, value));
        }

        let mut framed = BytesMut::new();
        encode_data(&self.call.payload, &mut framed)?;
        let body: Bytes = self.settings.wire_format.encode_body(framed.freeze());

        Ok(TransportRequest {
            path: self.call.method.to_string(),
            headers,
            body,
            streaming: self.call.streaming,
        })
    }

    fn advance(&mut self, event: TransitionEvent) -> Result<()> {
        self.machine.transition(event)?;
        Ok(())
    }

    fn mark_cancelled(&mut self) {
        if !self.machine.is_terminal() {
            let _ = self.machine.transition(TransitionEvent::Cancel);
        }
    }

    /// Publish a non-terminal event. While the channel is full the caller may
    /// cancel, drop the handle or run out of time; `Some` carries how the call
    /// ends in that case.
    async fn emit<F>(&mut self, event: CallEvent, timer: Pin<&mut F>) -> Option<Result<Outcome>>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = &mut self.cancel => Some(Ok(Outcome::Cancelled)),
            _ = timer => {
                debug!(call_id = %self.call_id, "Deadline expired while the caller was not reading");
                Some(Err(GrpcWebError::DeadlineExceeded))
            }
            sent = self.events.send(event) => sent.err().map(|_| Ok(Outcome::Detached)),
        }
    }

    fn abort(&self, http_status: u16, headers: Metadata, body: BodyStream) {
        debug!(call_id = %self.call_id, "Aborting transport response");
        self.transport
            .abort(ResponseHandle::new(http_status, headers, body));
    }
}

/// Trailing metadata of a trailers-only response
fn trailers_from_headers(mut headers: Metadata) -> Metadata {
    for name in TRANSPORT_HEADERS {
        headers.remove(name);
    }
    headers
}

async fn deadline_timer(deadline: Option<Deadline>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.instant()).await,
        None => std::future::pending::<()>().await,
    }
}
