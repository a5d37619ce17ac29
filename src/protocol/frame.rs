//! Wire codec for single gRPC-Web frames.

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{flags, FRAME_HEADER_LEN};
use crate::error::{GrpcWebError, Result};
use crate::metadata::Metadata;

/// One length-delimited unit of a gRPC-Web body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Serialized message bytes, opaque to the engine
    Data(Bytes),
    /// Terminal header block carrying `grpc-status` and trailing metadata
    Trailer(Metadata),
}

impl Frame {
    pub fn is_trailer(&self) -> bool {
        matches!(self, Self::Trailer(_))
    }

    /// Append the encoded frame to `out`.
    pub fn encode(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            Self::Data(payload) => encode_data(payload, out),
            Self::Trailer(trailers) => encode_trailer(trailers, out),
        }
    }

    /// Build a frame from its flag byte and payload.
    pub(crate) fn from_parts(flag: u8, payload: Bytes) -> Result<Self> {
        if flag & flags::COMPRESSED != 0 {
            return Err(GrpcWebError::UnsupportedFeature(
                "compressed frames are not supported".to_string(),
            ));
        }
        if flag & flags::TRAILER != 0 {
            Ok(Self::Trailer(parse_trailer_block(&payload)?))
        } else {
            Ok(Self::Data(payload))
        }
    }
}

/// Result of attempting to decode one frame from the front of a buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete frame and the number of bytes it occupied.
    Complete { frame: Frame, consumed: usize },
    /// Not enough data yet; need at least this many more bytes.
    Incomplete(usize),
}

/// Encode a data frame: flag `0x00`, 4-byte big-endian length, payload.
pub fn encode_data(payload: &[u8], out: &mut BytesMut) -> Result<()> {
    put_frame(flags::DATA, payload, out)
}

/// Encode a trailer frame: flag `0x80`, length, `key: value\r\n` lines.
pub fn encode_trailer(trailers: &Metadata, out: &mut BytesMut) -> Result<()> {
    put_frame(flags::TRAILER, trailers.to_string().as_bytes(), out)
}

fn put_frame(flag: u8, payload: &[u8], out: &mut BytesMut) -> Result<()> {
    let length = frame_length(payload.len())?;
    out.reserve(FRAME_HEADER_LEN + payload.len());
    out.put_u8(flag);
    out.put_u32(length);
    out.extend_from_slice(payload);
    Ok(())
}

/// Length prefix for a payload of `len` bytes; the prefix is 32 bits wide.
fn frame_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        GrpcWebError::framing(format!("payload of {len} bytes does not fit a frame length"))
    })
}

/// Read the flag byte and declared length, if the header is complete.
///
/// Fails when the declared length exceeds `max_frame_size`.
pub(crate) fn parse_header(buf: &[u8], max_frame_size: usize) -> Result<Option<(u8, usize)>> {
    if buf.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }
    let flag = buf[0];
    let length = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if length > max_frame_size {
        return Err(GrpcWebError::framing(format!(
            "frame length {length} exceeds limit of {max_frame_size} bytes"
        )));
    }
    Ok(Some((flag, length)))
}

/// Try to decode one frame from the front of `buf`.
pub fn try_decode_frame(buf: &[u8], max_frame_size: usize) -> Result<DecodeResult> {
    let Some((flag, length)) = parse_header(buf, max_frame_size)? else {
        return Ok(DecodeResult::Incomplete(FRAME_HEADER_LEN - buf.len()));
    };

    let total = FRAME_HEADER_LEN + length;
    if buf.len() < total {
        return Ok(DecodeResult::Incomplete(total - buf.len()));
    }

    let payload = Bytes::copy_from_slice(&buf[FRAME_HEADER_LEN..total]);
    Ok(DecodeResult::Complete {
        frame: Frame::from_parts(flag, payload)?,
        consumed: total,
    })
}

/// Decode a buffer holding exactly one complete frame.
pub fn decode_frame(buf: &[u8]) -> Result<Frame> {
    match try_decode_frame(buf, u32::MAX as usize)? {
        DecodeResult::Complete { frame, consumed } if consumed == buf.len() => Ok(frame),
        DecodeResult::Complete { consumed, .. } => Err(GrpcWebError::framing(format!(
            "{} bytes after end of frame",
            buf.len() - consumed
        ))),
        DecodeResult::Incomplete(needed) => Err(GrpcWebError::framing(format!(
            "truncated frame: {needed} more bytes declared than available"
        ))),
    }
}

/// Parse a trailer payload: `key: value` lines separated by CRLF.
///
/// Bare LF separators are tolerated; blank lines are skipped.
pub fn parse_trailer_block(payload: &[u8]) -> Result<Metadata> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| GrpcWebError::framing(format!("trailer block is not UTF-8: {e}")))?;

    let mut pairs = Vec::new();
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| GrpcWebError::framing(format!("malformed trailer line: {line:?}")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(GrpcWebError::framing(format!(
                "trailer line without a name: {line:?}"
            )));
        }
        pairs.push((key.to_string(), value.trim().to_string()));
    }
    Ok(Metadata::from_pairs(pairs))
}
