//! Request transport: streaming requests, SSE frame extraction and
//! cooperative cancellation.
//!
//! - [`stream_request`] - POST a body and read the response as SSE frames
//! - [`frame_stream`] - frame an already-open response body
//! - [`CancellationToken`] - shared flag that ends a frame stream early

mod cancel;
mod frames;

pub use cancel::CancellationToken;
pub use frames::{frame_stream, stream_request, FrameStream};
