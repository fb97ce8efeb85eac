//! Server-Sent Events (SSE) decoding.
//!
//! Turns a raw byte stream into `event:`/`data:` frames. Bytes are buffered
//! until a full line is available, so multi-byte characters split across
//! network chunks decode correctly.

use crate::core::errors::{Result, TranslationError};
use crate::core::models::StreamEvent;

/// Event name used when a frame carries no `event:` field.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// One dispatched SSE frame: its event name and the joined `data:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

impl SseFrame {
    /// Decode the frame's data as JSON.
    pub fn into_event(self) -> Result<StreamEvent> {
        let payload = serde_json::from_str(&self.data).map_err(|e| TranslationError::ParseError {
            message: format!("event '{}': {}", self.event, e),
        })?;
        Ok(StreamEvent {
            event_type: self.event,
            payload,
        })
    }
}

/// Incremental SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a network chunk, returning every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(frame) = self.process_line(line.trim_end_matches(|c| c == '\n' || c == '\r')) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush whatever is pending once the stream has ended.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw).into_owned();
            if let Some(frame) = self.process_line(line.trim_end_matches('\r')) {
                return Some(frame);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id and retry carry nothing we use
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(SseFrame {
            event: event.unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: reply\ndata: {\"a\":1}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "reply".to_string(),
                data: "{\"a\":1}".to_string(),
            }]
        );
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: re").is_empty());
        assert!(decoder.push(b"ply\r\ndata: {\"t\":").is_empty());
        let frames = decoder.push(b"\"hi\"}\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "reply");
        assert_eq!(frames[0].data, "{\"t\":\"hi\"}");
    }

    #[test]
    fn test_multibyte_split() {
        let bytes = "data: 你好\n\n".as_bytes();
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&bytes[..8]).is_empty());
        let frames = decoder.push(&bytes[8..]);
        assert_eq!(frames[0].data, "你好");
        assert_eq!(frames[0].event, DEFAULT_EVENT_TYPE);
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keepalive\nid: 7\ndata: line one\ndata: line two\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "line one\nline two");
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: reply\ndata: {}").is_empty());
        let frame = decoder.finish().unwrap();
        assert_eq!(frame.data, "{}");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_into_event() {
        let frame = SseFrame {
            event: "reply".to_string(),
            data: r#"{"payload":{"content":"x"}}"#.to_string(),
        };
        let event = frame.into_event().unwrap();
        assert_eq!(event.payload["payload"]["content"], "x");

        let bad = SseFrame {
            event: "reply".to_string(),
            data: "not json".to_string(),
        };
        assert!(matches!(
            bad.into_event(),
            Err(TranslationError::ParseError { .. })
        ));
    }
}
