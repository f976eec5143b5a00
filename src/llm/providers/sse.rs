//! Incremental Server-Sent Events decoder for streamed chat completions.
//!
//! Bytes arrive in arbitrary chunks; lines (and UTF-8 sequences) may be split
//! across them. The decoder buffers raw bytes and yields one [`SseEvent`] per
//! complete `data:` line. `event:`, `id:` and `:` comment lines are ignored;
//! chat-completion streams carry everything in `data:`.

/// A decoded stream item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// JSON payload of one `data:` line.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk and return the events it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(ev) = parse_line(&line) {
                events.push(ev);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buf.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        parse_line(&line)
    }
}

fn parse_line(raw: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);

    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(payload.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_complete_lines() {
        let mut d = SseDecoder::new();
        let evs = d.push(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(evs, vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]);
    }

    #[test]
    fn joins_lines_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: {\"con").is_empty());
        let evs = d.push(b"tent\":\"hi\"}\r\n");
        assert_eq!(evs, vec![SseEvent::Data("{\"content\":\"hi\"}".into())]);
    }

    #[test]
    fn keeps_multibyte_chars_split_across_chunks() {
        let bytes = "data: \"café\"\n".as_bytes();
        let split = bytes.len() - 3; // inside the two-byte 'é'
        let mut d = SseDecoder::new();
        assert!(d.push(&bytes[..split]).is_empty());
        assert_eq!(d.push(&bytes[split..]), vec![SseEvent::Data("\"café\"".into())]);
    }

    #[test]
    fn ignores_comments_and_other_fields() {
        let mut d = SseDecoder::new();
        let evs = d.push(b": keep-alive\nevent: message\nid: 7\ndata:\n\n");
        assert!(evs.is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: [DONE]").is_empty());
        assert_eq!(d.finish(), Some(SseEvent::Done));
        assert_eq!(d.finish(), None);
    }
}
