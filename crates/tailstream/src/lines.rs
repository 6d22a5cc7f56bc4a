//! Chunk-to-line decoding
//!
//! Decodes the cursor's byte chunks with a stateful `encoding_rs`
//! decoder (a chunk boundary may fall mid-character-sequence) and
//! splits the decoded text on `\n`. A line spanning several chunks is
//! reassembled before emission; a trailing unterminated fragment is
//! held back until the stream ends explicitly.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use encoding_rs::{Decoder, Encoding};
use futures::stream::Stream;
use futures::StreamExt;

use crate::error::TailError;

/// Carries decode state across chunk boundaries and assembles lines.
struct LineAssembler {
    decoder: Decoder,
    /// Decoded text still waiting for its terminator.
    carry: String,
}

impl LineAssembler {
    fn new(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            carry: String::new(),
        }
    }

    /// Decode one chunk and return the complete lines it finished.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk, false);
        self.drain_lines()
    }

    /// Flush decoder state at end of stream. The trailing fragment, if
    /// any, is emitted as a final line.
    fn finish(&mut self) -> Vec<String> {
        self.decode(&[], true);
        let mut lines = self.drain_lines();
        if !self.carry.is_empty() {
            lines.push(std::mem::take(&mut self.carry));
        }
        lines
    }

    fn decode(&mut self, chunk: &[u8], last: bool) {
        let needed = self
            .decoder
            .max_utf8_buffer_length(chunk.len())
            .unwrap_or(chunk.len() + 16);
        let mut out = String::with_capacity(needed);
        let (_, read, _) = self.decoder.decode_to_string(chunk, &mut out, last);
        debug_assert_eq!(read, chunk.len());
        self.carry.push_str(&out);
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(idx) = self.carry.find('\n') {
            lines.push(self.carry[..idx].to_string());
            self.carry.drain(..=idx);
        }
        lines
    }
}

struct DecodeState<S> {
    chunks: Pin<Box<S>>,
    assembler: LineAssembler,
    ready: VecDeque<String>,
    done: bool,
}

/// Adapt a chunk stream into a line stream under `encoding`.
pub(crate) fn decode_lines<S>(
    chunks: S,
    encoding: &'static Encoding,
) -> impl Stream<Item = Result<String, TailError>> + Send
where
    S: Stream<Item = Result<Bytes, TailError>> + Send + 'static,
{
    let state = DecodeState {
        chunks: Box::pin(chunks),
        assembler: LineAssembler::new(encoding),
        ready: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.done {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.assembler.push(&chunk)),
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.done = true;
                    state.ready.extend(state.assembler.finish());
                }
            }
        }
    })
}
