//! # In-Memory Transport
//!
//! Scripted transport for tests and local harnesses. A handler closure
//! produces each response; every request and abort is recorded.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::debug;

use super::{ResponseHandle, Transport, TransportRequest};
use crate::error::TransportError;

type Handler = Arc<
    dyn Fn(TransportRequest) -> BoxFuture<'static, Result<ResponseHandle, TransportError>>
        + Send
        + Sync,
>;

/// Transport answering requests from an async handler
#[derive(Clone)]
pub struct InMemoryTransport {
    handler: Handler,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
    aborts: Arc<AtomicUsize>,
}

impl InMemoryTransport {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseHandle, TransportError>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |request| handler(request).boxed()),
            requests: Arc::new(Mutex::new(Vec::new())),
            aborts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of responses the driver abandoned
    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("requests", &self.request_count())
            .field("aborts", &self.abort_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    async fn send(&self, request: TransportRequest) -> Result<ResponseHandle, TransportError> {
        debug!(path = %request.path, "In-memory transport received request");
        self.requests.lock().push(request.clone());
        (self.handler)(request).await
    }

    fn abort(&self, response: ResponseHandle) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        drop(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use bytes::Bytes;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_records_requests_and_aborts() {
        let transport = InMemoryTransport::new(|request: TransportRequest| async move {
            Ok(ResponseHandle::from_chunks(
                200,
                Metadata::from_pairs(vec![("content-type", "application/grpc-web+proto")]),
                vec![request.body],
            ))
        });

        let request = TransportRequest {
            path: "/svc/Echo".to_string(),
            headers: vec![("X-Grpc-Web".to_string(), "1".to_string())],
            body: Bytes::from_static(b"ping"),
            streaming: false,
        };
        let mut response = transport.send(request).await.unwrap();
        assert_eq!(response.http_status, 200);
        assert_eq!(
            response.body.next().await.unwrap().unwrap(),
            Bytes::from_static(b"ping")
        );

        transport.abort(response);
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.abort_count(), 1);
        assert_eq!(transport.requests()[0].header("x-grpc-web"), Some("1"));
    }

    #[tokio::test]
    async fn test_handler_errors_propagate() {
        let transport = InMemoryTransport::new(|_request: TransportRequest| async move {
            Err(TransportError::connection("refused"))
        });
        let request = TransportRequest {
            path: "/svc/Echo".to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
            streaming: true,
        };
        assert!(matches!(
            transport.send(request).await,
            Err(TransportError::Connection(_))
        ));
    }
}
