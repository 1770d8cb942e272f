/// Outbound HTTP mock
///
/// [`MockHttpClient`] answers every request with the same canned response and records the
/// request, so tests can exercise code that calls out over HTTP without a network:
///
/// - status `200`
/// - `json()` yields `{"mock_key": "mock_response"}`
/// - `bytes_stream()` yields `Some file`, one byte per chunk

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Mutex;

use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse};

/// Body streamed by every mock response
pub const MOCK_FILE: &[u8] = b"Some file";

/// JSON body of every mock response
pub fn mock_json() -> serde_json::Value {
    serde_json::json!({"mock_key": "mock_response"})
}

/// The canned response
#[derive(Debug, Clone, Copy, Default)]
pub struct MockResponse;

#[async_trait]
impl HttpResponse for MockResponse {
    fn status(&self) -> u16 {
        200
    }

    async fn json(self: Box<Self>) -> Result<serde_json::Value, HttpError> {
        Ok(mock_json())
    }

    fn bytes_stream(self: Box<Self>) -> BoxStream<'static, Result<Bytes, HttpError>> {
        stream::iter(MOCK_FILE.chunks(1).map(|chunk| Ok(Bytes::copy_from_slice(chunk)))).boxed()
    }
}

/// Records requests and returns [`MockResponse`]
#[derive(Debug, Default)]
pub struct MockHttpClient {
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<Box<dyn HttpResponse>, HttpError> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request);

        Ok(Box::new(MockResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_every_verb_gets_the_canned_response() {
        let client = MockHttpClient::new();

        let responses = vec![
            client.get("https://example.com/a").await.unwrap(),
            client.post("https://example.com/b", Bytes::from_static(b"{}")).await.unwrap(),
            client.patch("https://example.com/c", Bytes::new()).await.unwrap(),
            client.delete("https://example.com/d").await.unwrap(),
        ];

        for response in responses {
            assert_eq!(response.status(), 200);
            assert_eq!(response.json().await.unwrap(), mock_json());
        }

        let methods: Vec<Method> = client.calls().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, vec![Method::GET, Method::POST, Method::PATCH, Method::DELETE]);
    }

    #[tokio::test]
    async fn test_stream_yields_file_bytewise() {
        let client = MockHttpClient::new();
        let response = client.get("https://example.com/file").await.unwrap();

        let chunks: Vec<Bytes> = response.bytes_stream().try_collect().await.unwrap();

        assert_eq!(chunks.len(), MOCK_FILE.len());
        assert!(chunks.iter().all(|c| c.len() == 1));
        assert_eq!(chunks.concat(), b"Some file");
    }

    #[tokio::test]
    async fn test_calls_record_request_details() {
        let client = MockHttpClient::new();
        client
            .request(
                HttpRequest::new(Method::POST, "https://example.com/hook")
                    .header("X-Hook-Signature", "sha256=00"),
            )
            .await
            .unwrap();

        let calls = client.calls();
        assert_eq!(calls[0].url, "https://example.com/hook");
        assert_eq!(calls[0].headers[0].1, "sha256=00");

        client.reset();
        assert!(client.calls().is_empty());
    }
}
