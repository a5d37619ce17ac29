//! Frame demultiplexer.
//!
//! [`FrameDecoder`] is the resumable core: it holds partial-frame state across
//! chunk boundaries and yields every complete frame as soon as its last byte
//! arrives. [`FrameStream`] adapts a transport byte stream into a lazy,
//! forward-only stream of frames on top of it.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tracing::debug;

use super::frame::{parse_header, Frame};
use super::text::TextDecoder;
use super::WireFormat;
use crate::constants::{DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_LEN};
use crate::error::{GrpcWebError, Result, TransportError};

/// Resumable decoder from body bytes to frames.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    max_frame_size: usize,
    trailer_seen: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_size,
            trailer_seen: false,
        }
    }

    /// Append a chunk and extract every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        if self.trailer_seen {
            return Err(GrpcWebError::framing("data received after trailer frame"));
        }
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((flag, length)) = parse_header(&self.buffer, self.max_frame_size)? {
            let total = FRAME_HEADER_LEN + length;
            if self.buffer.len() < total {
                break;
            }
            let payload = self.buffer.split_to(total).freeze().slice(FRAME_HEADER_LEN..);
            let frame = Frame::from_parts(flag, payload)?;
            if frame.is_trailer() {
                self.trailer_seen = true;
                if !self.buffer.is_empty() {
                    return Err(GrpcWebError::framing(format!(
                        "{} bytes after trailer frame",
                        self.buffer.len()
                    )));
                }
            }
            frames.push(frame);
            if self.trailer_seen {
                break;
            }
        }
        Ok(frames)
    }

    /// Signal end of input; fails if a frame was cut off.
    pub fn finish(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(GrpcWebError::framing(format!(
                "stream ended mid-frame with {} bytes buffered",
                self.buffer.len()
            )))
        }
    }

    /// Whether a trailer frame has terminated the stream.
    pub fn is_terminated(&self) -> bool {
        self.trailer_seen
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Stream of frames decoded from a transport byte stream.
pub struct FrameStream<S> {
    body: S,
    text: Option<TextDecoder>,
    decoder: FrameDecoder,
    pending: VecDeque<Frame>,
    done: bool,
}

impl<S> FrameStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, TransportError>> + Unpin,
{
    pub fn new(body: S, format: WireFormat, max_frame_size: usize) -> Self {
        Self {
            body,
            text: matches!(format, WireFormat::Text).then(TextDecoder::new),
            decoder: FrameDecoder::new(max_frame_size),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn ingest(&mut self, chunk: &[u8]) -> Result<()> {
        let frames = match self.text.as_mut() {
            Some(text) => {
                let decoded = text.push(chunk)?;
                self.decoder.push(&decoded)?
            }
            None => self.decoder.push(chunk)?,
        };
        if self.decoder.is_terminated() {
            self.done = true;
        }
        self.pending.extend(frames);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.done = true;
        if let Some(text) = self.text.as_mut() {
            text.finish()?;
        }
        self.decoder.finish()
    }

    /// Release the underlying body stream.
    pub fn into_inner(self) -> S {
        self.body
    }
}

impl<S> Stream for FrameStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, TransportError>> + Unpin,
{
    type Item = Result<Frame>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if this.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.body).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    debug!(chunk_len = chunk.len(), "Received body chunk");
                    if let Err(e) = this.ingest(&chunk) {
                        this.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                Poll::Ready(None) => {
                    if let Err(e) = this.finish() {
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
