//! ==============================================================================
//! store/sse.rs - server-sent events framing
//! ==============================================================================
//!
//! purpose:
//!     firebase streams changes as `text/event-stream`. this is the minimal
//!     incremental parser for it: feed raw body chunks in, get whole events out.
//!
//! framing:
//!     event: put
//!     data: {"path":"/","data":{...}}
//!     <blank line dispatches>
//!
//!     - chunks may split lines (or utf-8 sequences) anywhere
//!     - several data lines join with '\n'
//!     - lines starting with ':' are comments; id/retry are ignored
//!
//! ==============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

#[derive(Default)]
pub struct SseParser {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// feed a chunk, returning every event it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
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
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if event.is_none() && self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut p = SseParser::new();
        let events = p.feed(b"event: put\ndata: {\"path\":\"/\",\"data\":null}\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: "put".into(),
                data: r#"{"path":"/","data":null}"#.into()
            }]
        );
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut p = SseParser::new();
        assert!(p.feed(b"event: pa").is_empty());
        assert!(p.feed(b"tch\r\ndata: {\"a\"").is_empty());
        let events = p.feed(b":1}\r\n\r\nevent: keep-alive\ndata: null\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "patch");
        assert_eq!(events[0].data, r#"{"a":1}"#);
        assert_eq!(events[1].event, "keep-alive");
        assert_eq!(events[1].data, "null");
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut p = SseParser::new();
        let events = p.feed(b": hello\nid: 7\ndata: one\ndata: two\n\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "one\ntwo");
    }

    #[test]
    fn test_utf8_split_inside_codepoint() {
        let mut p = SseParser::new();
        let bytes = "event: put\ndata: \"é\"\n\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xc3).unwrap() + 1;
        assert!(p.feed(&bytes[..split]).is_empty());
        let events = p.feed(&bytes[split..]);
        assert_eq!(events[0].data, "\"é\"");
    }
}
