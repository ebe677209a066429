//! SSE wire-format parsing: byte chunks to framed events.

/// One server-sent event frame: optional event name plus joined data lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental frame assembler. Feed lines; a blank line terminates a frame.
#[derive(Debug, Default)]
pub struct FrameParser {
    event: Option<String>,
    data: Vec<String>,
}

impl FrameParser {
    pub fn new() -> Self {
        FrameParser::default()
    }

    /// Feed one line (without its trailing newline). Returns a complete
    /// frame when the line terminates one.
    pub fn push_line(&mut self, line: &str) -> Option<SseFrame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.flush();
        }
        // Comment / keepalive line.
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
            // id/retry are not used by the backend.
            _ => {}
        }
        None
    }

    fn flush(&mut self) -> Option<SseFrame> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Buffers partial lines across transport chunks and emits whole frames.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: String,
    frames: FrameParser,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        ChunkDecoder::default()
    }

    /// Feed one chunk of bytes from the transport.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut out = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches('\n');
            if let Some(frame) = self.frames.push_line(line) {
                out.push(frame);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut FrameParser, lines: &[&str]) -> Vec<SseFrame> {
        lines
            .iter()
            .filter_map(|line| parser.push_line(line))
            .collect()
    }

    #[test]
    fn named_event_with_data() {
        let mut parser = FrameParser::new();
        let frames = feed(&mut parser, &["event: log", "data: {\"agent\":\"x\"}", ""]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("log"));
        assert_eq!(frames[0].data, "{\"agent\":\"x\"}");
    }

    #[test]
    fn unnamed_message_event() {
        let mut parser = FrameParser::new();
        let frames = feed(&mut parser, &["data: {\"type\":\"log\"}", ""]);
        assert_eq!(frames[0].event, None);
        assert_eq!(frames[0].data, "{\"type\":\"log\"}");
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut parser = FrameParser::new();
        let frames = feed(&mut parser, &["data: first", "data: second", ""]);
        assert_eq!(frames[0].data, "first\nsecond");
    }

    #[test]
    fn comments_and_blank_runs_are_ignored() {
        let mut parser = FrameParser::new();
        let frames = feed(&mut parser, &[": keepalive", "", "", "data: x", ""]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn crlf_lines_are_stripped() {
        let mut parser = FrameParser::new();
        let frames = feed(&mut parser, &["event: status\r", "data: {}\r", "\r"]);
        assert_eq!(frames[0].event.as_deref(), Some("status"));
        assert_eq!(frames[0].data, "{}");
    }

    #[test]
    fn decoder_handles_split_chunks() {
        let mut decoder = ChunkDecoder::new();
        let mut frames = decoder.push_chunk(b"data: hel");
        assert!(frames.is_empty());
        frames.extend(decoder.push_chunk(b"lo\n\ndata: again\n"));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "hello");
        // The second frame completes on its blank line.
        frames.extend(decoder.push_chunk(b"\n"));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].data, "again");
    }

    #[test]
    fn decoder_emits_multiple_frames_from_one_chunk() {
        let mut decoder = ChunkDecoder::new();
        let frames = decoder.push_chunk(b"event: a\ndata: 1\n\nevent: b\ndata: 2\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event.as_deref(), Some("a"));
        assert_eq!(frames[1].event.as_deref(), Some("b"));
    }
}
