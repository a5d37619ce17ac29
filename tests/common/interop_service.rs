//! In-process stand-in for the interop `grpc.testing.TestService`.
//!
//! Messages are JSON-encoded rather than protobuf; the engine treats them as
//! opaque bytes either way. Responses are framed the way a gRPC-Web proxy
//! frames them and then cut into fixed-size chunks, optionally delayed, so
//! every call crosses chunk boundaries.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use grpc_web_core::constants::content_types::{GRPC_WEB_PROTO, GRPC_WEB_TEXT_PROTO};
use grpc_web_core::protocol::{
    decode_frame, encode_data, encode_text, encode_trailer, Frame, TextDecoder,
};
use grpc_web_core::status::encode_message;
use grpc_web_core::{
    ClientConfig, GrpcWebClient, InMemoryTransport, Metadata, ResponseHandle, TransportRequest,
    WireFormat,
};

pub const SERVICE: &str = "grpc.testing.TestService";
pub const ECHO_INITIAL_KEY: &str = "x-grpc-test-echo-initial";
pub const ECHO_TRAILING_KEY: &str = "x-grpc-test-echo-trailing-bin";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EchoStatus {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleRequest {
    pub response_size: usize,
    pub payload: Vec<u8>,
    pub response_status: Option<EchoStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleResponse {
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingOutputCallRequest {
    pub response_sizes: Vec<usize>,
    pub response_status: Option<EchoStatus>,
}

pub fn method(name: &str) -> String {
    format!("/{SERVICE}/{name}")
}

pub fn encode<T: Serialize>(message: &T) -> Bytes {
    Bytes::from(serde_json::to_vec(message).unwrap())
}

pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

/// Scripted interop server
#[derive(Debug, Clone)]
pub struct InteropService {
    pub chunk_size: usize,
    pub chunk_delay: Option<Duration>,
}

impl Default for InteropService {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            chunk_delay: None,
        }
    }
}

impl InteropService {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn transport(self) -> InMemoryTransport {
        let service = Arc::new(self);
        InMemoryTransport::new(move |request: TransportRequest| {
            let service = Arc::clone(&service);
            async move { Ok(service.respond(request)) }
        })
    }

    /// Client and transport wired together
    pub fn client(self, format: WireFormat) -> (GrpcWebClient, InMemoryTransport) {
        let transport = self.transport();
        let client = GrpcWebClient::with_transport(
            ClientConfig::default().with_wire_format(format),
            Arc::new(transport.clone()),
        )
        .unwrap();
        (client, transport)
    }

    fn respond(&self, request: TransportRequest) -> ResponseHandle {
        let text = request.header("content-type") == Some(GRPC_WEB_TEXT_PROTO);
        let content_type = if text { GRPC_WEB_TEXT_PROTO } else { GRPC_WEB_PROTO };

        let mut headers = vec![("Content-Type".to_string(), content_type.to_string())];
        if let Some(value) = request.header(ECHO_INITIAL_KEY) {
            headers.push(("X-Grpc-Test-Echo-Initial".to_string(), value.to_string()));
        }
        let mut trailers = Metadata::new();
        if let Some(value) = request.header(ECHO_TRAILING_KEY) {
            trailers.set(ECHO_TRAILING_KEY, value).unwrap();
        }

        let Some(name) = request.path.strip_prefix(&format!("/{SERVICE}/")) else {
            // Unknown service: status carried in a trailer frame
            set_status(&mut trailers, 12, &format!("unknown service for {}", request.path));
            return self.framed(200, headers, Vec::new(), trailers, text);
        };

        let payload = read_request(&request, text);
        let mut messages = Vec::new();
        match name {
            "EmptyCall" => {
                messages.push(Bytes::new());
                set_status(&mut trailers, 0, "");
            }
            "UnaryCall" => {
                let req: SimpleRequest = decode(&payload);
                match req.response_status {
                    Some(status) if status.code != 0 => {
                        set_status(&mut trailers, status.code, &status.message);
                    }
                    _ => {
                        messages.push(encode(&SimpleResponse {
                            payload: vec![0; req.response_size],
                        }));
                        set_status(&mut trailers, 0, "");
                    }
                }
            }
            "StreamingOutputCall" => {
                let req: StreamingOutputCallRequest = decode(&payload);
                for size in req.response_sizes {
                    messages.push(encode(&SimpleResponse {
                        payload: vec![0; size],
                    }));
                }
                let status = req.response_status.unwrap_or_default();
                set_status(&mut trailers, status.code, &status.message);
            }
            _ => {
                // Unknown method: trailers-only response
                headers.push(("grpc-status".to_string(), "12".to_string()));
                headers.push((
                    "grpc-message".to_string(),
                    encode_message(&format!("Method not found: {}", request.path)),
                ));
                return ResponseHandle::from_chunks(200, Metadata::from_pairs(headers), Vec::new());
            }
        }
        self.framed(200, headers, messages, trailers, text)
    }

    fn framed(
        &self,
        http_status: u16,
        headers: Vec<(String, String)>,
        messages: Vec<Bytes>,
        trailers: Metadata,
        text: bool,
    ) -> ResponseHandle {
        // Each frame is flushed on its own, so text bodies are a run of
        // independently padded base64 segments.
        let mut body = BytesMut::new();
        let mut frames = Vec::new();
        for message in &messages {
            let mut frame = BytesMut::new();
            encode_data(message, &mut frame).unwrap();
            frames.push(frame);
        }
        let mut frame = BytesMut::new();
        encode_trailer(&trailers, &mut frame).unwrap();
        frames.push(frame);
        for frame in frames {
            if text {
                body.extend_from_slice(encode_text(&frame).as_bytes());
            } else {
                body.extend_from_slice(&frame);
            }
        }

        let chunks: Vec<Bytes> = body
            .chunks(self.chunk_size)
            .map(Bytes::copy_from_slice)
            .collect();
        let delay = self.chunk_delay;
        let body = stream::iter(chunks)
            .then(move |chunk| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            })
            .boxed();
        ResponseHandle::new(http_status, Metadata::from_pairs(headers), body)
    }
}

fn set_status(trailers: &mut Metadata, code: i32, message: &str) {
    trailers.set("grpc-status", code.to_string()).unwrap();
    if !message.is_empty() {
        trailers.set("grpc-message", encode_message(message)).unwrap();
    }
}

fn read_request(request: &TransportRequest, text: bool) -> Vec<u8> {
    let framed = if text {
        let mut decoder = TextDecoder::new();
        let framed = decoder.push(&request.body).unwrap();
        decoder.finish().unwrap();
        framed
    } else {
        request.body.to_vec()
    };
    match decode_frame(&framed).unwrap() {
        Frame::Data(payload) => payload.to_vec(),
        Frame::Trailer(_) => panic!("request body must be a data frame"),
    }
}
