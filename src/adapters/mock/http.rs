//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that returns predefined
//! responses, response sequences, or byte streams, and records every request.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::TransportError;
use crate::traits::{ByteStream, Headers, HttpClient, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET, POST or DELETE)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a complete response
    Success(Response),
    /// Fail the request
    Error(TransportError),
    /// Stream these chunks, then end the body
    Stream(Vec<Bytes>),
    /// Stream these chunks, then fail the body read
    StreamThenError(Vec<Bytes>, TransportError),
    /// Stream these chunks, then keep the connection open without sending more
    OpenStream(Vec<Bytes>),
}

impl MockResponse {
    /// Convenience constructor for a JSON response.
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        MockResponse::Success(Response::new(status, Bytes::from(value.to_string())))
    }

    /// Convenience constructor for an SSE body delivered as a single chunk.
    pub fn sse(body: &str) -> Self {
        MockResponse::Stream(vec![Bytes::from(body.to_string())])
    }
}

/// Mock HTTP client for testing.
///
/// Responses are keyed by method and exact URL. Several responses queued for
/// the same key are returned in order; the last one repeats once the queue
/// is down to a single entry.
///
/// # Example
///
/// ```ignore
/// let client = MockHttpClient::new();
/// client.push_response("GET", "http://hub/api/kitchen/appliances/a1", MockResponse::json(200, queued));
/// client.push_response("GET", "http://hub/api/kitchen/appliances/a1", MockResponse::json(200, ready));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Queued responses by (method, url)
    responses: Arc<Mutex<HashMap<(String, String), VecDeque<MockResponse>>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any queued responses for `method url` with a single response.
    pub fn set_response(&self, method: &str, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        let mut queue = VecDeque::new();
        queue.push_back(response);
        responses.insert((method.to_string(), url.to_string()), queue);
    }

    /// Append a response to the queue for `method url`.
    pub fn push_response(&self, method: &str, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses
            .entry((method.to_string(), url.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Set a default response for requests without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of recorded requests with the given method and URL.
    pub fn request_count(&self, method: &str, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn next_response(&self, method: &str, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock().unwrap();
        if let Some(queue) = responses.get_mut(&(method.to_string(), url.to_string())) {
            if queue.len() > 1 {
                return queue.pop_front();
            }
            if let Some(last) = queue.front() {
                return Some(last.clone());
            }
        }
        drop(responses);

        self.default_response.lock().unwrap().clone()
    }

    fn respond(&self, method: &str, url: &str) -> Result<Response, TransportError> {
        match self.next_response(method, url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(_) => Err(TransportError::Network(
                "stream response on non-stream request".to_string(),
            )),
            None => Err(TransportError::ConnectionFailed(format!(
                "no mock response for {} {}",
                method, url
            ))),
        }
    }
}

fn chunk_stream(chunks: Vec<Bytes>) -> impl futures::Stream<Item = Result<Bytes, TransportError>> {
    stream::iter(chunks.into_iter().map(Ok))
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, TransportError> {
        self.record_request("GET", url, headers, None);
        self.respond("GET", url)
    }

    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, TransportError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.respond("POST", url)
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, TransportError> {
        self.record_request("DELETE", url, headers, None);
        self.respond("DELETE", url)
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, TransportError> {
        self.record_request("POST", url, headers, Some(body.to_string()));

        match self.next_response("POST", url) {
            Some(MockResponse::Stream(chunks)) => Ok(Box::pin(chunk_stream(chunks))),
            Some(MockResponse::StreamThenError(chunks, err)) => Ok(Box::pin(
                chunk_stream(chunks).chain(stream::once(async move { Err(err) })),
            )),
            Some(MockResponse::OpenStream(chunks)) => {
                Ok(Box::pin(chunk_stream(chunks).chain(stream::pending())))
            }
            Some(MockResponse::Success(response)) => {
                let response = response.error_for_status(url)?;
                if response.status == 204 {
                    return Err(TransportError::MissingBody {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                Ok(Box::pin(chunk_stream(vec![response.body])))
            }
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(TransportError::ConnectionFailed(format!(
                "no mock response for POST {}",
                url
            ))),
        }
    }
}
