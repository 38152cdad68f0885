//! Byte stream to SSE frame conversion.

use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;

use super::CancellationToken;
use crate::error::TransportError;
use crate::sse::{Frame, FrameParser};
use crate::traits::{ByteStream, Headers, HttpClient};

/// Lazy, single-pass sequence of frames read from one response body.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// Reader state carried between frames.
///
/// `body` is set to `None` on every exit path (end of body, read error,
/// cancellation) so the connection is released as soon as reading stops,
/// not when the consumer gets around to dropping the stream.
struct FrameReader {
    body: Option<ByteStream>,
    parser: FrameParser,
    buffer: Vec<u8>,
    token: CancellationToken,
    done: bool,
}

impl FrameReader {
    fn new(body: ByteStream, token: CancellationToken) -> Self {
        Self {
            body: Some(body),
            parser: FrameParser::new(),
            buffer: Vec::new(),
            token,
            done: false,
        }
    }

    /// Pop one complete line off the buffer.
    ///
    /// Splitting on the `\n` byte never cuts a multi-byte UTF-8 sequence, so
    /// chunks may end mid-character.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line[..pos]).into_owned())
    }

    fn close(&mut self, err: TransportError) -> Option<Result<Frame, TransportError>> {
        self.body = None;
        self.done = true;
        self.buffer.clear();
        self.parser.reset();
        Some(Err(err))
    }

    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            if self.done {
                return None;
            }
            if self.token.is_cancelled() {
                tracing::debug!("frame stream cancelled");
                return self.close(TransportError::Cancelled);
            }

            while let Some(line) = self.take_line() {
                if let Some(frame) = self.parser.feed_line(&line) {
                    return Some(Ok(frame));
                }
            }

            let Some(body) = self.body.as_mut() else {
                // End of body: a trailing unterminated line and record still count
                self.done = true;
                let rest = std::mem::take(&mut self.buffer);
                let frame = if rest.is_empty() {
                    None
                } else {
                    self.parser.feed_line(&String::from_utf8_lossy(&rest))
                };
                return frame.or_else(|| self.parser.flush()).map(Ok);
            };

            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => None,
                chunk = body.next() => Some(chunk),
            };

            match next {
                None => {
                    tracing::debug!("frame stream cancelled while waiting for data");
                    return self.close(TransportError::Cancelled);
                }
                Some(Some(Ok(chunk))) => self.buffer.extend_from_slice(&chunk),
                Some(Some(Err(err))) => {
                    tracing::warn!("frame stream read failed: {}", err);
                    return self.close(err);
                }
                Some(None) => self.body = None,
            }
        }
    }
}

/// Parse a response body into SSE frames.
///
/// Frames carry the raw `event` name and joined `data` text; payload
/// interpretation is left to the consumer. The token is checked between
/// frames and raced against every read, so cancelling ends the stream with a
/// single [`TransportError::Cancelled`] at the next suspension point. Any
/// error ends the stream.
pub fn frame_stream(body: ByteStream, token: CancellationToken) -> FrameStream {
    let reader = FrameReader::new(body, token);
    Box::pin(stream::unfold(reader, |mut reader| async move {
        let item = reader.next_frame().await?;
        Some((item, reader))
    }))
}

/// Issue a streaming POST and return its frames.
///
/// A non-2xx answer fails with [`TransportError::Status`] and a bodyless
/// answer with [`TransportError::MissingBody`]. Cancelling before the server
/// answers fails with [`TransportError::Cancelled`].
pub async fn stream_request(
    client: &dyn HttpClient,
    url: &str,
    body: &str,
    token: CancellationToken,
) -> Result<FrameStream, TransportError> {
    let mut headers = Headers::new();
    headers.insert("Accept".to_string(), "text/event-stream".to_string());
    headers.insert("Cache-Control".to_string(), "no-store".to_string());
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    if token.is_cancelled() {
        return Err(TransportError::Cancelled);
    }

    tracing::debug!("opening event stream: {}", url);
    let bytes = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(TransportError::Cancelled),
        result = client.post_stream(url, body, &headers) => result?,
    };

    Ok(frame_stream(bytes, token))
}
