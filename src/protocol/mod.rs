//! # gRPC-Web Wire Protocol
//!
//! Length-delimited framing, the trailer header block, the base64 text
//! variant, and the resumable frame demultiplexer that turns an arbitrarily
//! chunked response body into typed frames.
//!
//! ```text
//!   [flags:1][length:4 BE][payload:length]
//!
//!   flags 0x00  data frame, opaque message bytes
//!   flags 0x80  trailer frame, "key: value\r\n" header block
//!   flags 0x01  compressed (rejected)
//! ```

pub mod demux;
pub mod frame;
pub mod text;

pub use demux::{FrameDecoder, FrameStream};
pub use frame::{decode_frame, encode_data, encode_trailer, try_decode_frame, DecodeResult, Frame};
pub use text::{encode_text, TextDecoder};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::content_types::{GRPC_WEB_PROTO, GRPC_WEB_TEXT_PROTO};

/// Body encoding negotiated through the content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `application/grpc-web+proto`: frames sent as raw bytes
    #[default]
    Binary,
    /// `application/grpc-web-text+proto`: frames sent as base64 text
    Text,
}

impl WireFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Binary => GRPC_WEB_PROTO,
            Self::Text => GRPC_WEB_TEXT_PROTO,
        }
    }

    /// Encode already-framed bytes for the request body.
    pub fn encode_body(&self, framed: Bytes) -> Bytes {
        match self {
            Self::Binary => framed,
            Self::Text => Bytes::from(encode_text(&framed)),
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Self::Binary),
            "text" => Ok(Self::Text),
            _ => Err(format!("Invalid wire format: {s}")),
        }
    }
}
