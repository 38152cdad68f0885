//! SSE stream parsing logic
//!
//! Contains the stateful [`FrameParser`] that accumulates lines and emits
//! complete frames, and the typed interpretation of tailoring frames.

mod tailor;

use crate::sse::events::{Frame, SseLine, DEFAULT_EVENT};

pub use tailor::parse_tailor_frame;

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        // A single space after the colon is part of the field syntax, not the value
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        return SseLine::Data(value.to_string());
    }

    // id:, retry: and unknown fields are not used by this client
    SseLine::Comment(line.to_string())
}

/// Stateful SSE parser that accumulates lines and emits complete frames
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Current event type being accumulated
    current_event_type: Option<String>,
    /// Accumulated data lines (SSE allows multiple data: lines)
    data_buffer: Vec<String>,
}

impl FrameParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line (without its trailing newline) to the parser.
    ///
    /// Returns `Some(frame)` when the line completes a record.
    pub fn feed_line(&mut self, line: &str) -> Option<Frame> {
        match parse_sse_line(line.trim_end_matches('\r')) {
            SseLine::Event(event_type) => {
                self.current_event_type = Some(event_type);
                None
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                None
            }
            SseLine::Empty => self.flush(),
            SseLine::Comment(_) => None,
        }
    }

    /// Emit whatever record has been accumulated, if any.
    ///
    /// Called on a blank line, and once more when the byte stream ends so a
    /// final record without a terminating blank line is not lost.
    pub fn flush(&mut self) -> Option<Frame> {
        if self.current_event_type.is_none() && self.data_buffer.is_empty() {
            return None;
        }

        let event = self
            .current_event_type
            .take()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT.to_string());
        let data = self.data_buffer.join("\n");
        self.data_buffer.clear();

        Some(Frame { event, data })
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.current_event_type = None;
        self.data_buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
    }

    #[test]
    fn test_parse_comment_line() {
        assert_eq!(
            parse_sse_line(": keep-alive"),
            SseLine::Comment("keep-alive".to_string())
        );
    }

    #[test]
    fn test_parse_event_line() {
        assert_eq!(
            parse_sse_line("event: block"),
            SseLine::Event("block".to_string())
        );
        assert_eq!(
            parse_sse_line("event:meta"),
            SseLine::Event("meta".to_string())
        );
    }

    #[test]
    fn test_parse_data_line_keeps_value_verbatim() {
        assert_eq!(
            parse_sse_line(r#"data: {"x":1}"#),
            SseLine::Data(r#"{"x":1}"#.to_string())
        );
        assert_eq!(
            parse_sse_line("data:whoops"),
            SseLine::Data("whoops".to_string())
        );
        assert_eq!(
            parse_sse_line("data:   indented"),
            SseLine::Data("  indented".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_field() {
        assert_eq!(
            parse_sse_line("id: 7"),
            SseLine::Comment("id: 7".to_string())
        );
    }

    #[test]
    fn test_parser_simple_frame() {
        let mut parser = FrameParser::new();
        assert!(parser.feed_line("event: status").is_none());
        assert!(parser.feed_line(r#"data: {"message":"Reading manuals"}"#).is_none());
        assert_eq!(
            parser.feed_line(""),
            Some(Frame::new("status", r#"{"message":"Reading manuals"}"#))
        );
    }

    #[test]
    fn test_parser_default_event_name() {
        let mut parser = FrameParser::new();
        parser.feed_line("data: hello");
        assert_eq!(parser.feed_line(""), Some(Frame::new("message", "hello")));
    }

    #[test]
    fn test_parser_event_without_data() {
        let mut parser = FrameParser::new();
        parser.feed_line("event: complete");
        assert_eq!(parser.feed_line(""), Some(Frame::new("complete", "")));
    }

    #[test]
    fn test_parser_multiple_data_lines_joined() {
        let mut parser = FrameParser::new();
        parser.feed_line("event: status");
        parser.feed_line("data: line1");
        parser.feed_line("data: line2");
        assert_eq!(
            parser.feed_line(""),
            Some(Frame::new("status", "line1\nline2"))
        );
    }

    #[test]
    fn test_parser_crlf_lines() {
        let mut parser = FrameParser::new();
        parser.feed_line("event: meta\r");
        parser.feed_line("data: {}\r");
        assert_eq!(parser.feed_line("\r"), Some(Frame::new("meta", "{}")));
    }

    #[test]
    fn test_parser_ignores_comments_and_blank_runs() {
        let mut parser = FrameParser::new();
        assert!(parser.feed_line(": connected").is_none());
        assert!(parser.feed_line("").is_none());
        assert!(parser.feed_line("").is_none());
        parser.feed_line("event: block");
        parser.feed_line(": interleaved comment");
        parser.feed_line(r#"data: {"id":"b1","order":1}"#);
        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.event, "block");
    }

    #[test]
    fn test_flush_emits_trailing_record() {
        let mut parser = FrameParser::new();
        parser.feed_line("event: complete");
        parser.feed_line("data: {}");
        assert_eq!(parser.flush(), Some(Frame::new("complete", "{}")));
        assert_eq!(parser.flush(), None);
    }

    #[test]
    fn test_reset() {
        let mut parser = FrameParser::new();
        parser.feed_line("event: block");
        parser.feed_line("data: {}");
        parser.reset();
        assert!(parser.feed_line("").is_none());
    }

    #[test]
    fn test_realistic_stream() {
        let mut parser = FrameParser::new();
        let lines = [
            ": connected",
            "",
            "event: status",
            r#"data: {"message":"Matching appliances"}"#,
            "",
            "event: meta",
            r#"data: {"summary":"S","recommendedAppliances":["Steam oven"]}"#,
            "",
            "event: block",
            r#"data: {"id":"b1","order":1,"title":"Prep"}"#,
            "",
            "event: complete",
            r#"data: {"message":"Tailoring complete"}"#,
            "",
        ];

        let frames: Vec<Frame> = lines.iter().filter_map(|l| parser.feed_line(l)).collect();
        let names: Vec<&str> = frames.iter().map(|f| f.event.as_str()).collect();
        assert_eq!(names, vec!["status", "meta", "block", "complete"]);
    }
}
