//! Newline framing for the stdio transport.
//!
//! Lines are handed over as raw bytes so that bad input (invalid UTF-8,
//! oversized lines) can be answered in-band instead of ending the stream.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Longest stdio line accepted; longer lines are skipped and reported.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// One line without its terminator.
    Line(BytesMut),
    /// A line longer than the limit; its bytes were discarded.
    Oversized,
}

#[derive(Debug)]
pub struct LineFramer {
    max_length: usize,
    /// Bytes before this offset hold no newline.
    next_index: usize,
    discarding: bool,
}

impl LineFramer {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(MAX_LINE_BYTES)
    }
}

impl Decoder for LineFramer {
    type Item = Frame;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        let newline = buf[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(end) => {
                self.next_index = 0;
                if self.discarding || end > self.max_length {
                    self.discarding = false;
                    buf.advance(end + 1);
                    return Ok(Some(Frame::Oversized));
                }
                let mut line = buf.split_to(end + 1);
                line.truncate(end);
                if line.last() == Some(&b'\r') {
                    line.truncate(end - 1);
                }
                Ok(Some(Frame::Line(line)))
            }
            None if self.discarding || buf.len() > self.max_length => {
                self.discarding = true;
                self.next_index = 0;
                buf.clear();
                Ok(None)
            }
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        self.next_index = 0;
        if self.discarding {
            self.discarding = false;
            return Ok(Some(Frame::Oversized));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        // Last line without a trailing newline
        Ok(Some(Frame::Line(buf.split_to(buf.len()))))
    }
}
