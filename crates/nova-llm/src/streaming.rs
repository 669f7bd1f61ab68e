use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;

/// Incremental parser for server-sent event byte streams.
/// Events arrive as `data: <payload>` lines terminated by a blank line.
#[derive(Default)]
pub struct SseParser {
    buffer: String,
}

/// One decoded SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a text chunk into the parser and drain any complete events.
    /// Partial events stay buffered until the terminating blank line arrives.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        while let Some((block_end, sep_len)) = find_boundary(&self.buffer) {
            let rest = self.buffer.split_off(block_end + sep_len);
            let block = std::mem::replace(&mut self.buffer, rest);

            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }

        events
    }
}

/// Find the earliest event boundary, either `\n\n` or `\r\n\r\n`.
fn find_boundary(buffer: &str) -> Option<(usize, usize)> {
    let lf = buffer.find("\n\n").map(|p| (p, 2));
    let crlf = buffer.find("\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event_type = None;
    let mut data_lines = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            // SSE comment / keep-alive line
            continue;
        }
        if let Some(val) = line.strip_prefix("event:") {
            event_type = Some(val.trim_start().to_string());
        } else if let Some(val) = line.strip_prefix("data:") {
            data_lines.push(val.strip_prefix(' ').unwrap_or(val).to_string());
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event_type,
        data: data_lines.join("\n"),
    })
}

/// Adapts a raw byte stream into a stream of SSE events.
pub struct SseStream<S> {
    inner: S,
    parser: SseParser,
    pending: VecDeque<SseEvent>,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<S> Stream for SseStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin,
{
    type Item = SseEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    // Invalid UTF-8 mid-chunk is dropped rather than aborting the stream
                    if let Ok(text) = std::str::from_utf8(&bytes) {
                        this.pending.extend(this.parser.feed(text));
                    }
                    // Loop back: either emit a pending event or poll for more bytes
                }
                Poll::Ready(Some(Err(_))) => return Poll::Ready(None),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_single_event() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: {\"ok\":true}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"ok\":true}");
        assert!(events[0].event_type.is_none());
    }

    #[test]
    fn test_parser_event_type() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: delta\ndata: {\"ok\":true}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type.as_deref(), Some("delta"));
    }

    #[test]
    fn test_parser_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed("data: {\"ok\":").is_empty());
        let events = parser.feed("true}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"ok\":true}");
    }

    #[test]
    fn test_parser_multiple_events_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: a\n\ndata: b\n\ndata: c");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "a");
        assert_eq!(events[1].data, "b");
        // "c" stays buffered until its blank line arrives
        let events = parser.feed("\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "c");
    }

    #[test]
    fn test_parser_crlf_boundaries() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: hello\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_parser_ignores_comment_lines() {
        let mut parser = SseParser::new();
        let events = parser.feed(": keep-alive\n\ndata: real\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
    }

    #[test]
    fn test_parser_data_without_space() {
        let mut parser = SseParser::new();
        let events = parser.feed("data:[DONE]\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "[DONE]");
    }
}
