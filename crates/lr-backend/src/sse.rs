//! Server-Sent Events frame parser for the Letta stream.
//!
//! Letta's streaming endpoint uses a reduced SSE dialect: frames carry
//! only `data:` lines (no `event:` field), separated by blank lines, and
//! the stream is closed by a literal `data: [DONE]` frame. The parser is
//! incremental and tolerates data split across arbitrary chunk
//! boundaries as well as CRLF line endings.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Sentinel data payload marking end of stream.
pub const DONE_MARKER: &str = "[DONE]";

/// One complete SSE frame: the joined `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub data: String,
}

impl SseFrame {
    /// True if this frame is the `[DONE]` terminator.
    pub fn is_done(&self) -> bool {
        self.data == DONE_MARKER
    }
}

/// Incremental parser state.
#[derive(Default)]
struct FrameParserState {
    /// Buffer for an incomplete line. Kept as raw bytes and decoded only
    /// once the newline arrives, so a multi-byte character split across
    /// chunk boundaries is reassembled intact.
    line_buf: Vec<u8>,
    /// Data lines accumulated for the current frame.
    current_data: Vec<String>,
}

impl FrameParserState {
    /// Process a complete line. Returns a frame if one is complete.
    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        // Blank line terminates the frame.
        if line.is_empty() {
            if self.current_data.is_empty() {
                return None;
            }
            return Some(SseFrame {
                data: std::mem::take(&mut self.current_data).join("\n"),
            });
        }

        if let Some(colon_pos) = line.find(':') {
            let field = &line[..colon_pos];
            // Value starts after the colon, skipping one optional space.
            let value_start = colon_pos + 1;
            let value = if line.len() > value_start && line.as_bytes()[value_start] == b' ' {
                &line[value_start + 1..]
            } else {
                &line[value_start..]
            };

            if field == "data" {
                self.current_data.push(value.to_string());
            }
            // Other fields (id, retry, event) and comments are ignored;
            // Letta does not send them.
        }
        // Lines without a colon are invalid, ignore them.

        None
    }

    /// Flush whatever is buffered at stream end.
    fn flush(&mut self) -> Option<SseFrame> {
        if !self.line_buf.is_empty() {
            let line = std::mem::take(&mut self.line_buf);
            let line = String::from_utf8_lossy(&line).into_owned();
            if let Some(frame) = self.process_line(&line) {
                return Some(frame);
            }
        }
        if !self.current_data.is_empty() {
            return Some(SseFrame {
                data: std::mem::take(&mut self.current_data).join("\n"),
            });
        }
        None
    }
}

/// Stream wrapper that parses SSE frames from a byte stream.
pub struct SseFrameStream<S> {
    inner: S,
    state: FrameParserState,
    pending: Vec<SseFrame>,
}

impl<S> SseFrameStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: FrameParserState::default(),
            pending: Vec::new(),
        }
    }
}

impl<S, E> Stream for SseFrameStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<SseFrame, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if !this.pending.is_empty() {
            return Poll::Ready(Some(Ok(this.pending.remove(0))));
        }

        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    for &b in bytes.iter() {
                        if b == b'\n' {
                            let mut line = std::mem::take(&mut this.state.line_buf);
                            if line.last() == Some(&b'\r') {
                                line.pop();
                            }
                            let line = String::from_utf8_lossy(&line);
                            if let Some(frame) = this.state.process_line(&line) {
                                this.pending.push(frame);
                            }
                        } else {
                            this.state.line_buf.push(b);
                        }
                    }

                    if !this.pending.is_empty() {
                        return Poll::Ready(Some(Ok(this.pending.remove(0))));
                    }
                    // Keep polling for more bytes.
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    if let Some(frame) = this.state.flush() {
                        return Poll::Ready(Some(Ok(frame)));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}

/// Create an SSE frame stream from a byte stream.
pub fn sse_frames<S, E>(stream: S) -> SseFrameStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    SseFrameStream::new(stream)
}
