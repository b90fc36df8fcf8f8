//! NDJSON frame decoding for the chat response body
//!
//! The backend streams one JSON object per line. Chunks from the transport can
//! split a line (and a multibyte character) anywhere, so the decoder keeps the
//! unfinished tail in a byte buffer and only decodes a line once its newline
//! has arrived. `\n` never appears inside a UTF-8 multibyte sequence, which is
//! what makes splitting on the raw byte safe.

use super::error::ChatError;
use super::transport::ByteStream;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;

/// One decoded line from the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamFrame {
    pub step: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StreamFrame {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// `"message": null` is read as an empty message
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a single line. Blank lines yield `None`.
pub fn parse_line(line: &[u8]) -> Result<Option<StreamFrame>, ChatError> {
    let text = std::str::from_utf8(line)
        .map_err(|e| ChatError::MalformedFrame(format!("invalid UTF-8: {}", e)))?;
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<StreamFrame>(text)
        .map(Some)
        .map_err(|e| ChatError::MalformedFrame(format!("{} - Line: {}", e, text)))
}

/// Incremental line splitter with a carry-over buffer
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    dropped: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every frame completed by it.
    ///
    /// Only the new bytes are searched for newlines; the carried-over tail is
    /// known to contain none.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        let scan_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let mut line_ends = Vec::new();
        for (offset, byte) in self.buffer[scan_from..].iter().enumerate() {
            if *byte == b'\n' {
                line_ends.push(scan_from + offset);
            }
        }
        let Some(&last_end) = line_ends.last() else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_end + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        let mut frames = Vec::new();
        let mut start = 0;
        for end in line_ends {
            if let Some(frame) = self.accept(&complete[start..end]) {
                frames.push(frame);
            }
            start = end + 1;
        }
        frames
    }

    /// Flush whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<StreamFrame> {
        let rest = std::mem::take(&mut self.buffer);
        self.accept(&rest)
    }

    /// Bytes currently held back waiting for a newline
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Number of lines dropped because they failed to parse
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn accept(&mut self, line: &[u8]) -> Option<StreamFrame> {
        match parse_line(line) {
            Ok(frame) => frame,
            Err(e) => {
                self.dropped += 1;
                tracing::warn!("Dropping stream line: {}", e);
                None
            }
        }
    }
}

struct DecodeState {
    body: ByteStream,
    decoder: FrameDecoder,
    pending: VecDeque<StreamFrame>,
    done: bool,
}

/// Lazily decode a response body into frames.
///
/// A transport error is yielded once and ends the stream. Dropping the returned
/// stream drops the body, which stops any further reads.
pub fn decode_frames(body: ByteStream) -> impl Stream<Item = Result<StreamFrame, ChatError>> + Send {
    let state = DecodeState {
        body,
        decoder: FrameDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.push(&chunk);
                    state.pending.extend(frames);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    if let Some(frame) = state.decoder.finish() {
                        state.pending.push_back(frame);
                    }
                }
            }
        }
    })
}
