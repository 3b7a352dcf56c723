//! Framed turn events and their newline-delimited JSON encoding.
//!
//! Each record decodes on its own, so a client can render any prefix of a
//! turn's stream.
//!
//! ```rust
//! use pchat::{FrameDecoder, FramedEvent, encode_ndjson};
//!
//! let bytes = encode_ndjson(&[
//!     FramedEvent::UserMessageId("m1".into()),
//!     FramedEvent::TextDelta("Hel".into()),
//!     FramedEvent::finish(),
//! ]);
//!
//! let mut decoder = FrameDecoder::new();
//! let (head, tail) = bytes.split_at(10);
//! let mut events = decoder.push(head).expect("head");
//! events.extend(decoder.push(tail).expect("tail"));
//! assert_eq!(events.len(), 3);
//! assert_eq!(events[2], FramedEvent::finish());
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::ChatError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultFrame {
    pub tool_name: String,
    pub tool_call_id: String,
    pub args: Value,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "kebab-case")]
pub enum FramedEvent {
    UserMessageId(String),
    TextDelta(String),
    ToolResult(ToolResultFrame),
    Finish(String),
}

impl FramedEvent {
    pub fn finish() -> Self {
        Self::Finish(String::new())
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish(_))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(record: &str) -> Result<Self, ChatError> {
        serde_json::from_str(record)
            .map_err(|err| ChatError::invalid_request(format!("malformed frame: {err}")))
    }
}

/// One record per line.
pub fn encode_ndjson(events: &[FramedEvent]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        out.extend_from_slice(event.to_json().as_bytes());
        out.push(b'\n');
    }
    out
}

/// Incremental decoder for newline-delimited frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every record it completed. Partial records
    /// stay buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<FramedEvent>, ChatError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let record = std::str::from_utf8(&line[..newline])
                .map_err(|err| ChatError::invalid_request(format!("frame is not utf-8: {err}")))?
                .trim();
            if record.is_empty() {
                continue;
            }
            events.push(FramedEvent::from_json(record)?);
        }

        Ok(events)
    }

    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

/// Receiving half of a turn. `Ok` items are in-band frames, `Err` items are
/// the out-of-band error channel.
#[derive(Debug)]
pub struct TurnStream {
    receiver: mpsc::Receiver<Result<FramedEvent, ChatError>>,
}

impl TurnStream {
    pub(crate) fn new(receiver: mpsc::Receiver<Result<FramedEvent, ChatError>>) -> Self {
        Self { receiver }
    }
}

impl Stream for TurnStream {
    type Item = Result<FramedEvent, ChatError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn frames_serialize_with_type_and_content() {
        assert_eq!(
            FramedEvent::UserMessageId("m1".into()).to_json(),
            r#"{"type":"user-message-id","content":"m1"}"#
        );
        assert_eq!(
            FramedEvent::finish().to_json(),
            r#"{"type":"finish","content":""}"#
        );

        let frame = FramedEvent::ToolResult(ToolResultFrame {
            tool_name: "getWeather".into(),
            tool_call_id: "call_1".into(),
            args: json!({"latitude": 31.5, "longitude": 74.3}),
            result: json!({"current": {"temperature_2m": 30.1}}),
        });
        let value: Value = serde_json::from_str(&frame.to_json()).expect("json");
        assert_eq!(value["type"], "tool-result");
        assert_eq!(value["content"]["toolCallId"], "call_1");
    }

    #[test]
    fn decoder_handles_records_split_inside_multibyte_text() {
        let bytes = encode_ndjson(&[FramedEvent::TextDelta("héllo ☀".into())]);
        let mut decoder = FrameDecoder::new();

        let mut events = Vec::new();
        for byte in &bytes {
            events.extend(decoder.push(std::slice::from_ref(byte)).expect("chunk"));
        }
        assert_eq!(events, vec![FramedEvent::TextDelta("héllo ☀".into())]);
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn decoder_rejects_malformed_records() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"{\"type\":\"nope\"}\n").is_err());
    }
}
