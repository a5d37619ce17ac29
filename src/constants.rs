//! # Protocol Constants
//!
//! Header names, content types and frame flags shared by the codec, the
//! transports and the call driver.

/// Frame flag bits (first byte of every envelope)
pub mod flags {
    /// Uncompressed data frame
    pub const DATA: u8 = 0x00;
    /// Compressed payload; reserved, rejected on input
    pub const COMPRESSED: u8 = 0x01;
    /// Trailer frame carrying the terminal header block
    pub const TRAILER: u8 = 0x80;
}

/// Envelope header size: 1 flag byte + 4-byte big-endian length
pub const FRAME_HEADER_LEN: usize = 5;

/// Default upper bound for a single frame payload (4 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Header names used on the wire
pub mod headers {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const ACCEPT: &str = "accept";
    pub const X_GRPC_WEB: &str = "x-grpc-web";
    pub const X_USER_AGENT: &str = "x-user-agent";
    pub const GRPC_TIMEOUT: &str = "grpc-timeout";
    pub const GRPC_STATUS: &str = "grpc-status";
    pub const GRPC_MESSAGE: &str = "grpc-message";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const TRANSFER_ENCODING: &str = "transfer-encoding";
    pub const CONNECTION: &str = "connection";

    /// Suffix marking base64-carried binary metadata
    pub const BINARY_SUFFIX: &str = "-bin";
}

/// Content types negotiated with the server
pub mod content_types {
    pub const GRPC_WEB_PROTO: &str = "application/grpc-web+proto";
    pub const GRPC_WEB_TEXT_PROTO: &str = "application/grpc-web-text+proto";
}

/// Value sent in `x-user-agent`
pub const USER_AGENT: &str = concat!("grpc-web-core-rs/", env!("CARGO_PKG_VERSION"));
