//! Line-oriented decoding of streamed HTTP bodies.
//!
//! Backends stream either bare newline-delimited JSON or SSE frames
//! (`data: {...}`, terminated by `data: [DONE]`). Both are handled here:
//! chunks are split into lines, each line parsed as JSON, and a per-provider
//! extractor pulls the text fragment out. Unparsable lines are logged and skipped.

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::LlmError;
use crate::traits::TextStream;

/// Pulls the text fragment (if any) out of one decoded JSON event.
pub type FragmentExtractor = fn(&Value) -> Option<String>;

/// What a single body line turned out to be.
#[derive(Debug, PartialEq)]
enum LineEvent {
    Json(Value),
    Done,
}

/// Accumulates raw bytes and hands back complete lines.
#[derive(Debug, Default)]
struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

fn parse_line(provider: &str, raw: &str) -> Option<LineEvent> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    if ["event:", "id:", "retry:"].iter().any(|p| line.starts_with(p)) {
        return None;
    }

    let payload = line.strip_prefix("data:").map_or(line, str::trim_start);
    if payload == "[DONE]" {
        return Some(LineEvent::Done);
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(LineEvent::Json(value)),
        Err(e) => {
            warn!(provider, line = %payload, error = %e, "Skipping malformed stream line");
            None
        }
    }
}

struct FragmentState<B> {
    body: Pin<Box<B>>,
    decoder: LineDecoder,
    pending: VecDeque<String>,
    extract: FragmentExtractor,
    provider: &'static str,
    done: bool,
}

impl<B> FragmentState<B> {
    fn handle_line(&mut self, line: &str) {
        if self.done {
            return;
        }
        match parse_line(self.provider, line) {
            Some(LineEvent::Done) => self.done = true,
            Some(LineEvent::Json(value)) => {
                if let Some(text) = (self.extract)(&value).filter(|t| !t.is_empty()) {
                    trace!(provider = self.provider, chars = text.len(), "Stream fragment");
                    self.pending.push_back(text);
                }
            }
            None => {}
        }
    }
}

/// Turn a streamed response body into a stream of text fragments.
///
/// Fragments come out in arrival order; a transport error ends the stream
/// after being yielded once.
pub fn fragment_stream<B, C, E>(
    body: B,
    extract: FragmentExtractor,
    provider: &'static str,
) -> TextStream
where
    B: Stream<Item = Result<C, E>> + Send + 'static,
    C: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    let state = FragmentState {
        body: Box::pin(body),
        decoder: LineDecoder::default(),
        pending: VecDeque::new(),
        extract,
        provider,
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(fragment) = st.pending.pop_front() {
                return Some((Ok(fragment), st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => {
                    for line in st.decoder.push(chunk.as_ref()) {
                        st.handle_line(&line);
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    st.pending.clear();
                    return Some((Err(e.into()), st));
                }
                None => {
                    if let Some(line) = st.decoder.finish() {
                        st.handle_line(&line);
                    }
                    st.done = true;
                }
            }
        }
    })
    .boxed()
}

// ─────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────

/// `candidates[0].content.parts[0].text` (Gemini).
pub fn gemini_fragment(value: &Value) -> Option<String> {
    value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(String::from)
}

/// `choices[0].delta.content` (OpenAI-compatible chunk).
pub fn openai_delta_fragment(value: &Value) -> Option<String> {
    value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .map(String::from)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn body(chunks: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], LlmError>> + Send {
        let items: Vec<Result<&'static [u8], LlmError>> =
            chunks.iter().copied().map(|c| Ok(c.as_bytes())).collect();
        stream::iter(items)
    }

    async fn collect(stream: TextStream) -> Vec<String> {
        stream.map(|r| r.unwrap()).collect().await
    }

    #[test]
    fn test_line_decoder_split_chunks() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(b"{\"a\":").is_empty());
        let lines = decoder.push(b"1}\n{\"b\":2}\n{\"c\"");
        assert_eq!(lines, vec!["{\"a\":1}\n", "{\"b\":2}\n"]);
        assert_eq!(decoder.finish().as_deref(), Some("{\"c\""));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_parse_line_variants() {
        assert!(parse_line("t", "   ").is_none());
        assert!(parse_line("t", ": keep-alive").is_none());
        assert!(parse_line("t", "event: message").is_none());
        assert_eq!(parse_line("t", "data: [DONE]"), Some(LineEvent::Done));
        assert_eq!(
            parse_line("t", "data:{\"x\":1}"),
            Some(LineEvent::Json(serde_json::json!({"x": 1})))
        );
        assert!(parse_line("t", "not json").is_none());
    }

    #[tokio::test]
    async fn test_gemini_lines_with_malformed_skipped() {
        let chunks = [
            "{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n",
            "garbage line\n",
            "{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n",
            "{\"candidates\":[]}\n",
            "{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" world\"}]}}]}",
        ];
        let fragments = collect(fragment_stream(body(&chunks), gemini_fragment, "test")).await;
        assert_eq!(fragments, vec!["Hel", "lo", " world"]);
    }

    #[tokio::test]
    async fn test_sse_frames_split_across_chunks() {
        let chunks = [
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Bon\"}}]}\n\ndata: {\"choi",
            "ces\":[{\"delta\":{\"content\":\"jour\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ];
        let stream = fragment_stream(body(&chunks), openai_delta_fragment, "test");
        let fragments = collect(stream).await;
        assert_eq!(fragments, vec!["Bon", "jour"]);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let items: Vec<Result<&'static [u8], LlmError>> = vec![
            Ok(b"{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]}\n".as_slice()),
            Err(LlmError::api("connection reset")),
            Ok(b"{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"b\"}]}}]}\n".as_slice()),
        ];
        let results: Vec<Result<String, LlmError>> =
            fragment_stream(stream::iter(items), gemini_fragment, "test")
                .collect()
                .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_deref().unwrap(), "a");
        assert!(results[1].is_err());
    }

    #[test]
    fn test_extractors() {
        let v = serde_json::json!({"choices": [{"delta": {"content": "x"}}]});
        assert_eq!(openai_delta_fragment(&v).as_deref(), Some("x"));
        assert!(gemini_fragment(&v).is_none());
    }
}
