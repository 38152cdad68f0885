//! SSE (Server-Sent Events) frame parsing
//!
//! Parses the `text/event-stream` format sent by the tailoring endpoint:
//! - `event: <type>` - event type line (defaults to `message`)
//! - `data: <chunk>` - one or more data lines, joined with `\n`
//! - Empty line - signals end of record
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `events` - Frame types (Frame, TailorFrame, SseLine, FrameParseError)
//! - `payloads` - Internal payload deserialization structs
//! - `parser` - Parsing logic (FrameParser, parse_sse_line, parse_tailor_frame)

mod events;
mod parser;
mod payloads;

pub use events::{Frame, FrameParseError, SseLine, TailorFrame, DEFAULT_EVENT};
pub use parser::{parse_sse_line, parse_tailor_frame, FrameParser};
