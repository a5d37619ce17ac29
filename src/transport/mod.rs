//! # Transport Abstraction
//!
//! Transport-agnostic interface between the call driver and whatever carries
//! HTTP requests. The driver only ever sees a [`ResponseHandle`]: status,
//! header metadata, and an ordered body byte stream.
//!
//! - [`HttpTransport`] - pooled `reqwest` client for real servers
//! - [`InMemoryTransport`] - scripted in-process responses for tests

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::TransportError;
use crate::metadata::Metadata;

pub mod http;
pub mod memory;

pub use http::HttpTransport;
pub use memory::InMemoryTransport;

/// Response body as an ordered stream of byte chunks
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// An encoded request ready to be put on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Method path, `/<service>/<method>`
    pub path: String,
    /// Header pairs, protocol headers first
    pub headers: Vec<(String, String)>,
    /// Framed (and for text mode, base64) request body
    pub body: Bytes,
    /// Whether the body should be delivered incrementally
    pub streaming: bool,
}

impl TransportRequest {
    /// First header value with the given name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The response side of an in-flight request
pub struct ResponseHandle {
    pub http_status: u16,
    pub headers: Metadata,
    pub body: BodyStream,
}

impl ResponseHandle {
    pub fn new(http_status: u16, headers: Metadata, body: BodyStream) -> Self {
        Self {
            http_status,
            headers,
            body,
        }
    }

    /// Response whose body is delivered as the given chunks, in order
    pub fn from_chunks(http_status: u16, headers: Metadata, chunks: Vec<Bytes>) -> Self {
        let body = stream::iter(chunks.into_iter().map(Ok)).boxed();
        Self::new(http_status, headers, body)
    }
}

impl fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("http_status", &self.http_status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Common interface for request carriers.
///
/// Implementations never retry; every failure is reported to the driver,
/// which turns it into the call's terminal status.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Get the transport name for debugging/logging.
    fn name(&self) -> &'static str;

    /// Issue the request and resolve once response headers are available.
    async fn send(&self, request: TransportRequest) -> Result<ResponseHandle, TransportError>;

    /// Abandon an in-flight response. Dropping the body stream releases
    /// the underlying connection.
    fn abort(&self, response: ResponseHandle) {
        drop(response);
    }
}
