//! Framed codec for worker communication.
//!
//! Uses LinesCodec for framing + [`WireLine`] for typed parsing.
//! Works over any AsyncRead/AsyncWrite (pipes, duplex streams, etc).

use std::io;
use std::marker::PhantomData;

use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use super::protocol::ProtocolError;

/// Longest line accepted from a peer before the stream is treated as broken.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A message that travels as exactly one line of text (without the newline).
pub trait WireLine: Sized {
    fn to_line(&self) -> String;
    fn from_line(line: &str) -> Result<Self, ProtocolError>;
}

/// Codec that frames messages as newline-terminated lines.
///
/// Wraps LinesCodec and adds typed parsing. Blank lines are skipped.
pub struct LineCodec<T> {
    inner: LinesCodec,
    _phantom: PhantomData<T>,
}

impl<T> Default for LineCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LineCodec<T> {
    pub fn new() -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(MAX_LINE_BYTES),
            _phantom: PhantomData,
        }
    }
}

fn lines_error(e: LinesCodecError) -> io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        LinesCodecError::MaxLineLengthExceeded => io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {MAX_LINE_BYTES} bytes"),
        ),
    }
}

fn parse_line<T: WireLine>(line: &str) -> io::Result<T> {
    T::from_line(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

impl<T: WireLine> Decoder for LineCodec<T> {
    type Item = T;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(line) = self.inner.decode(src).map_err(lines_error)? {
            if line.trim().is_empty() {
                continue;
            }
            return parse_line(&line).map(Some);
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // LinesCodec yields an unterminated trailing line at EOF.
        while let Some(line) = self.inner.decode_eof(src).map_err(lines_error)? {
            if line.trim().is_empty() {
                continue;
            }
            return parse_line(&line).map(Some);
        }
        Ok(None)
    }
}

impl<T: WireLine> Encoder<T> for LineCodec<T> {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.to_line();
        tracing::trace!(line_bytes = line.len(), "Encoding line");
        self.inner.encode(line, dst).map_err(lines_error)
    }
}
