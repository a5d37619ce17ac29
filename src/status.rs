//! # Status Mapper
//!
//! Status codes and the translation of trailer metadata (`grpc-status`,
//! `grpc-message`) or a bare HTTP status into a structured [`Status`].

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::constants::headers::{GRPC_MESSAGE, GRPC_STATUS};
use crate::error::{GrpcWebError, Result};
use crate::metadata::Metadata;

/// Bytes percent-encoded in `grpc-message`: controls (including CR/LF/TAB),
/// `%` itself, and every non-ASCII byte.
const GRPC_MESSAGE_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'%');

/// Standard gRPC status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    /// Named code for a raw value; `None` for vendor-specific codes.
    pub fn from_i32(value: i32) -> Option<Self> {
        let code = match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => return None,
        };
        Some(code)
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a call.
///
/// The raw integer code is preserved so vendor-specific codes survive; use
/// [`Status::named_code`] for the standard view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: i32,
    message: String,
    metadata: Metadata,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self::from_raw(code.as_i32(), message)
    }

    pub fn from_raw(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Code::Ok, "")
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Map a trailer block to a status.
    ///
    /// A missing `grpc-status` means OK only when a message was already
    /// received; otherwise it is a protocol error. `grpc-status` and
    /// `grpc-message` are stripped from the status's trailing metadata.
    pub fn from_trailers(trailers: &Metadata, received_message: bool) -> Result<Self> {
        let code = match trailers.get(GRPC_STATUS) {
            Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
                GrpcWebError::protocol(format!("non-numeric grpc-status: {raw:?}"))
            })?,
            None if received_message => Code::Ok.as_i32(),
            None => return Err(GrpcWebError::protocol("missing grpc-status")),
        };

        let message = trailers
            .get(GRPC_MESSAGE)
            .map(decode_message)
            .unwrap_or_default();

        let mut metadata = trailers.clone();
        metadata.remove(GRPC_STATUS);
        metadata.remove(GRPC_MESSAGE);

        Ok(Self {
            code,
            message,
            metadata,
        })
    }

    /// Status for a non-200 HTTP response that carried no `grpc-status`.
    pub fn from_http_status(http_status: u16) -> Self {
        let code = match http_status {
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            429 | 502 | 503 | 504 => Code::Unavailable,
            _ => Code::Unknown,
        };
        Self::new(code, format!("HTTP status {http_status}"))
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn named_code(&self) -> Option<Code> {
        Code::from_i32(self.code)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Trailing metadata delivered with this status.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok.as_i32()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.named_code() {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => write!(f, "code {}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for Status {}

/// Percent-decode a `grpc-message` value.
///
/// Malformed escapes are kept literally and invalid UTF-8 is replaced rather
/// than failing the call.
pub fn decode_message(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Percent-encode a status message for the wire.
pub fn encode_message(message: &str) -> String {
    utf8_percent_encode(message, GRPC_MESSAGE_ENCODE_SET).to_string()
}
