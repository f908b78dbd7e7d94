//! Minimal SSE decoding for provider byte streams.

/// Reassembles `data:` payloads from arbitrarily chunked SSE bytes. Multi-line
/// data blocks are joined with newlines; comment and event-name lines are
/// dropped.
pub(crate) struct SseAccumulator {
    buffer: String,
    data_lines: Vec<String>,
}

impl SseAccumulator {
    pub(crate) fn new() -> Self {
        Self {
            buffer: String::new(),
            data_lines: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let mut line = self.buffer[..pos].to_string();
            self.buffer.drain(..=pos);
            if line.ends_with('\r') {
                line.pop();
            }
            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    payloads.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
                continue;
            }
            if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.trim_start().to_string());
            }
        }
        payloads
    }

    /// Flushes a trailing data block that was not newline-terminated.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if let Some(data) = self.buffer.strip_prefix("data:") {
            self.data_lines.push(data.trim_start().to_string());
        }
        self.buffer.clear();
        if self.data_lines.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data_lines).join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_split_events() {
        let mut acc = SseAccumulator::new();
        assert!(acc.push("data: {\"a\"").is_empty());
        assert!(acc.push(":1}\n").is_empty());
        assert_eq!(acc.push("\n"), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn ignores_comments_and_event_names() {
        let mut acc = SseAccumulator::new();
        let payloads = acc.push(": keepalive\nevent: message\ndata: one\n\ndata: two\n\n");
        assert_eq!(payloads, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn finish_flushes_unterminated_payload() {
        let mut acc = SseAccumulator::new();
        assert!(acc.push("data: tail").is_empty());
        assert_eq!(acc.finish(), Some("tail".to_string()));
        assert_eq!(acc.finish(), None);
    }
}
