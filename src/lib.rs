#![allow(clippy::doc_markdown)] // Allow technical terms like gRPC-Web, HTTP/2 in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # gRPC-Web Core
//!
//! Client-side protocol engine for gRPC-Web.
//!
//! ## Overview
//!
//! The engine turns a method path, an opaque serialized request and request
//! metadata into a gRPC-Web HTTP request, then demultiplexes the response
//! body into initial metadata, response messages, trailing metadata and a
//! final status. Message schemas are out of scope: payloads are bytes.
//!
//! ## Architecture
//!
//! ```text
//!   caller ──► GrpcWebClient ──► CallDriver (one tokio task per call)
//!                                   │  encode request (protocol::frame)
//!                                   ▼
//!                               Transport (HttpTransport | InMemoryTransport)
//!                                   │  body byte chunks
//!                                   ▼
//!                               FrameStream (protocol::demux) ──► Metadata / Status
//!                                   │
//!   caller ◄── CallHandle ◄── ordered CallEvents (mpsc)
//! ```
//!
//! ## Module Organization
//!
//! - [`protocol`] - Frame codec, text (base64) variant, frame demultiplexer
//! - [`metadata`] - Case-insensitive header/trailer multimap
//! - [`status`] - Status codes and trailer-to-status mapping
//! - [`deadline`] - Deadlines and `grpc-timeout` encoding
//! - [`state_machine`] - Call lifecycle transitions
//! - [`transport`] - HTTP and in-memory transports
//! - [`client`] - Call API, driver, handles and observers
//! - [`config`] - Layered client configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grpc_web_core::{CallEvent, ClientConfig, GrpcWebClient, Metadata};
//! use std::time::Duration;
//!
//! # async fn example() -> grpc_web_core::Result<()> {
//! grpc_web_core::logging::init_structured_logging();
//!
//! let client = GrpcWebClient::new(ClientConfig::default().with_base_url("http://localhost:8080"))?;
//!
//! let mut metadata = Metadata::new();
//! metadata.set("x-request-id", "abc123")?;
//!
//! let deadline = grpc_web_core::Deadline::after(Duration::from_secs(5));
//! let mut call = client.streaming(
//!     "/grpc.testing.TestService/StreamingOutputCall",
//!     Vec::<u8>::new(),
//!     metadata,
//!     Some(deadline),
//! )?;
//!
//! while let Some(event) = call.next_event().await {
//!     match event {
//!         CallEvent::Metadata(headers) => println!("headers: {headers:?}"),
//!         CallEvent::Message(bytes) => println!("message of {} bytes", bytes.len()),
//!         CallEvent::Status(status) => println!("status: {status}"),
//!         CallEvent::Cancelled => println!("cancelled"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod deadline;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod protocol;
pub mod state_machine;
pub mod status;
pub mod transport;

pub use client::{Call, CallEvent, CallHandle, CallObserver, GrpcWebClient, MethodPath, UnaryResponse};
pub use config::ClientConfig;
pub use deadline::Deadline;
pub use error::{GrpcWebError, Result, TransportError};
pub use metadata::Metadata;
pub use protocol::{Frame, FrameDecoder, WireFormat};
pub use state_machine::{CallState, CallStateMachine, StateMachineError};
pub use status::{Code, Status};
pub use transport::{HttpTransport, InMemoryTransport, ResponseHandle, Transport, TransportRequest};
