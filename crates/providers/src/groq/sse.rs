//! Line-level decoding of the chat-completions event stream.

use bytes::BytesMut;
use serde_json::Value;
use tutor_core::llm::{ChatError, StreamFragment, Usage};

pub(crate) const DONE_SENTINEL: &str = "[DONE]";

/// Splits raw body bytes into lines. Bytes are buffered until a newline
/// arrives, so multi-byte characters cut across network chunks stay intact.
#[derive(Default)]
pub(crate) struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub(crate) fn next_line(&mut self) -> Option<String> {
        let pos = twoway::find_bytes(&self.buf, b"\n")?;
        let raw = self.buf.split_to(pos + 1);
        Some(decode(&raw[..pos]))
    }

    /// Whatever is left once the body has ended without a final newline.
    pub(crate) fn take_rest(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let raw = self.buf.split();
        Some(decode(&raw))
    }
}

fn decode(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\r')
        .to_string()
}

#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    Fragment(StreamFragment),
    Done,
}

/// `Ok(None)` for lines that carry nothing: blanks, comments, `event:` and
/// other fields. A `data:` payload that is not JSON is `MalformedChunk`; one
/// carrying an `error` object is `Api`.
pub(crate) fn parse_line(line: &str) -> Result<Option<SseEvent>, ChatError> {
    let Some(data) = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
    else {
        return Ok(None);
    };
    let data = data.trim();
    if data == DONE_SENTINEL {
        return Ok(Some(SseEvent::Done));
    }
    if data.is_empty() {
        return Ok(None);
    }
    let v: Value = serde_json::from_str(data).map_err(|e| ChatError::MalformedChunk {
        line: data.to_string(),
        reason: e.to_string(),
    })?;
    if let Some(err) = v.get("error").filter(|e| e.is_object()) {
        let detail = err["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(ChatError::Api {
            status: None,
            detail,
        });
    }
    Ok(Some(SseEvent::Fragment(fragment_from_chunk(&v))))
}

fn fragment_from_chunk(v: &Value) -> StreamFragment {
    let choice = &v["choices"][0];
    let delta_text = choice["delta"]["content"].as_str().map(str::to_string);
    let finish_reason = choice["finish_reason"].as_str().map(str::to_string);
    // Groq reports streamed usage under `x_groq`; plain OpenAI under `usage`.
    let usage = v["usage"]["total_tokens"]
        .as_u64()
        .or_else(|| v["x_groq"]["usage"]["total_tokens"].as_u64())
        .map(|t| Usage {
            tokens_used: u32::try_from(t).unwrap_or(u32::MAX),
        });
    StreamFragment {
        delta_text,
        usage,
        finish_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_across_chunks() {
        let mut lb = LineBuffer::default();
        lb.push(b"data: {\"a\"");
        assert_eq!(lb.next_line(), None);
        lb.push(b":1}\r\ndata: [DO");
        assert_eq!(lb.next_line().as_deref(), Some("data: {\"a\":1}"));
        assert_eq!(lb.next_line(), None);
        lb.push(b"NE]\n\n");
        assert_eq!(lb.next_line().as_deref(), Some("data: [DONE]"));
        assert_eq!(lb.next_line().as_deref(), Some(""));
        assert_eq!(lb.take_rest(), None);
    }

    #[test]
    fn keeps_multibyte_chars_split_between_chunks() {
        let text = "data: é\n".as_bytes();
        let mut lb = LineBuffer::default();
        lb.push(&text[..7]);
        lb.push(&text[7..]);
        assert_eq!(lb.next_line().as_deref(), Some("data: é"));
    }

    #[test]
    fn rest_without_newline() {
        let mut lb = LineBuffer::default();
        lb.push(b"data: [DONE]");
        assert_eq!(lb.next_line(), None);
        assert_eq!(lb.take_rest().as_deref(), Some("data: [DONE]"));
        assert_eq!(lb.take_rest(), None);
    }

    #[test]
    fn sentinel_and_non_data_lines() {
        assert_eq!(parse_line("data: [DONE]").unwrap(), Some(SseEvent::Done));
        assert_eq!(parse_line("data:  [DONE]  ").unwrap(), Some(SseEvent::Done));
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_line("event: message").unwrap(), None);
        assert!(matches!(
            parse_line("data: DONE"),
            Err(ChatError::MalformedChunk { ref line, .. }) if line == "DONE"
        ));
    }

    #[test]
    fn delta_content_becomes_text() {
        let line = r#"data: {"id":"x","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let Some(SseEvent::Fragment(f)) = parse_line(line).unwrap() else {
            panic!("expected fragment");
        };
        assert_eq!(f.delta_text.as_deref(), Some("Hel"));
        assert_eq!(f.usage, None);
        assert_eq!(f.finish_reason, None);
    }

    #[test]
    fn chunk_without_content_still_yields_fragment() {
        let Some(SseEvent::Fragment(f)) = parse_line(r#"data: {"chunk":1}"#).unwrap() else {
            panic!("expected fragment");
        };
        assert_eq!(f, StreamFragment::default());
    }

    #[test]
    fn usage_from_either_envelope() {
        let plain = r#"data: {"choices":[],"usage":{"total_tokens":31}}"#;
        let groq = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}],"x_groq":{"usage":{"total_tokens":57}}}"#;
        let Some(SseEvent::Fragment(a)) = parse_line(plain).unwrap() else {
            panic!()
        };
        let Some(SseEvent::Fragment(b)) = parse_line(groq).unwrap() else {
            panic!()
        };
        assert_eq!(a.usage, Some(Usage { tokens_used: 31 }));
        assert_eq!(b.usage, Some(Usage { tokens_used: 57 }));
        assert_eq!(b.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn error_object_in_stream() {
        let err = parse_line(r#"data: {"error":{"message":"model overloaded"}}"#).unwrap_err();
        assert_eq!(
            err,
            ChatError::Api {
                status: None,
                detail: "model overloaded".into()
            }
        );
    }
}
