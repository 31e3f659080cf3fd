//! Incremental decoding for streamed chat completions.
//!
//! [`SseDecoder`] turns raw body chunks into content tokens; [`MarkerFilter`] holds back
//! `[VIZ:key]` markers so only speakable text reaches the subtitle display.

use serde::Deserialize;
use tracing::debug;

/// Streaming chunk from an OpenAI-compatible API (SSE `data:` payload).
#[derive(Deserialize, Debug)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Debug)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// What a single SSE line carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Token(String),
    Done,
}

/// Line-buffered SSE decoder. Chunks may split lines anywhere, including inside UTF-8 sequences.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `data: [DONE]` has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed raw bytes; returns the events completed by this chunk.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if self.finished {
                continue;
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = decode_line(line.trim()) {
                if event == SseEvent::Done {
                    self.finished = true;
                }
                events.push(event);
            }
        }
        events
    }
}

fn decode_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|c| !c.is_empty())
            .map(SseEvent::Token),
        Err(e) => {
            debug!(target: "biosketch::chat", "failed to parse SSE chunk: {} - data: {}", e, data);
            None
        }
    }
}

const MARKER_OPEN: &str = "[VIZ:";

/// Removes `[VIZ:key]` markers from a token stream, emitting the rest as soon as it is safe.
#[derive(Debug, Default)]
pub struct MarkerFilter {
    held: String,
}

impl MarkerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a token; returns text that can be shown now (possibly empty).
    pub fn push(&mut self, token: &str) -> String {
        self.held.push_str(token);
        let mut out = String::new();
        loop {
            let Some(open) = self.held.find('[') else {
                out.push_str(&self.held);
                self.held.clear();
                break;
            };
            out.push_str(&self.held[..open]);
            self.held.drain(..open);

            if self.held.len() < MARKER_OPEN.len() {
                if MARKER_OPEN.starts_with(self.held.as_str()) {
                    break;
                }
                out.push('[');
                self.held.drain(..1);
                continue;
            }
            if !self.held.starts_with(MARKER_OPEN) {
                out.push('[');
                self.held.drain(..1);
                continue;
            }
            match self.held.find(']') {
                Some(close) => {
                    self.held.drain(..=close);
                }
                None => break,
            }
        }
        out
    }

    /// Flush whatever is still held when the stream ends (an unterminated marker is dropped).
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.held);
        if rest.starts_with(MARKER_OPEN) {
            String::new()
        } else {
            rest
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn decodes_tokens_across_split_chunks() {
        let body = format!("{}{}data: [DONE]\n\n", chunk("Hola"), chunk(" mundo"));
        let bytes = body.as_bytes();
        let mut decoder = SseDecoder::new();
        let mut events = decoder.feed(&bytes[..7]);
        events.extend(decoder.feed(&bytes[7..30]));
        events.extend(decoder.feed(&bytes[30..]));
        assert_eq!(
            events,
            vec![
                SseEvent::Token("Hola".to_string()),
                SseEvent::Token(" mundo".to_string()),
                SseEvent::Done
            ]
        );
        assert!(decoder.is_finished());
    }

    #[test]
    fn ignores_comments_and_bad_json() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\ndata: {oops}\ndata: {\"choices\":[]}\n");
        assert!(events.is_empty());
    }

    #[test]
    fn split_utf8_is_reassembled() {
        let body = chunk("digestión");
        let bytes = body.as_bytes();
        let cut = body.find('ó').unwrap() + 1;
        let mut decoder = SseDecoder::new();
        let mut events = decoder.feed(&bytes[..cut]);
        events.extend(decoder.feed(&bytes[cut..]));
        assert_eq!(events, vec![SseEvent::Token("digestión".to_string())]);
    }

    #[test]
    fn marker_filter_strips_split_markers() {
        let mut f = MarkerFilter::new();
        let mut shown = String::new();
        for token in ["Tu flora ", "mejora. [V", "IZ:bac", "terias] Listo", " [nota]"] {
            shown.push_str(&f.push(token));
        }
        shown.push_str(&f.finish());
        assert_eq!(shown, "Tu flora mejora.  Listo [nota]");
    }

    #[test]
    fn marker_filter_drops_unterminated_marker() {
        let mut f = MarkerFilter::new();
        assert_eq!(f.push("Hola [VIZ:alivio"), "Hola ");
        assert_eq!(f.finish(), "");
    }
}
