/// Outbound HTTP
///
/// Code that talks to other servers (webhook delivery, for now) goes through the
/// [`HttpClient`] trait instead of calling `reqwest` directly. The server uses
/// [`ReqwestHttpClient`]; tests swap in the mock from `testing::http_mock`, which never
/// touches the network.
///
/// # Example
///
/// ```no_run
/// use witness_shared::http::{HttpClient, ReqwestHttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ReqwestHttpClient::new()?;
/// let response = client.get("https://example.com/status.json").await?;
/// if response.status() == 200 {
///     let body = response.json().await?;
///     println!("{}", body);
/// }
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;

pub use reqwest::Method;

/// Timeout applied to every outbound request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            HttpError::InvalidRequest(err.to_string())
        } else if err.is_decode() {
            HttpError::Decode(err.to_string())
        } else {
            HttpError::Transport(err.to_string())
        }
    }
}

/// An outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the body and sets the JSON content type
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_vec(value).map_err(|e| HttpError::InvalidRequest(e.to_string()))?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }
}

/// A response whose body has not been read yet
#[async_trait]
pub trait HttpResponse: Send {
    /// HTTP status code
    fn status(&self) -> u16;

    /// Reads the whole body as JSON
    async fn json(self: Box<Self>) -> Result<serde_json::Value, HttpError>;

    /// Streams the body in chunks
    fn bytes_stream(self: Box<Self>) -> BoxStream<'static, Result<Bytes, HttpError>>;
}

/// Sends HTTP requests
///
/// Implementors only provide [`request`](HttpClient::request); the verb helpers build on it.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<Box<dyn HttpResponse>, HttpError>;

    async fn get(&self, url: &str) -> Result<Box<dyn HttpResponse>, HttpError> {
        self.request(HttpRequest::new(Method::GET, url)).await
    }

    async fn post(&self, url: &str, body: Bytes) -> Result<Box<dyn HttpResponse>, HttpError> {
        self.request(HttpRequest::new(Method::POST, url).body(body)).await
    }

    async fn patch(&self, url: &str, body: Bytes) -> Result<Box<dyn HttpResponse>, HttpError> {
        self.request(HttpRequest::new(Method::PATCH, url).body(body)).await
    }

    async fn delete(&self, url: &str) -> Result<Box<dyn HttpResponse>, HttpError> {
        self.request(HttpRequest::new(Method::DELETE, url)).await
    }
}

/// [`HttpClient`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("witness/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

struct ReqwestResponse(reqwest::Response);

#[async_trait]
impl HttpResponse for ReqwestResponse {
    fn status(&self) -> u16 {
        self.0.status().as_u16()
    }

    async fn json(self: Box<Self>) -> Result<serde_json::Value, HttpError> {
        Ok(self.0.json().await?)
    }

    fn bytes_stream(self: Box<Self>) -> BoxStream<'static, Result<Bytes, HttpError>> {
        self.0.bytes_stream().map(|chunk| chunk.map_err(HttpError::from)).boxed()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<Box<dyn HttpResponse>, HttpError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        tracing::debug!(method = %request.method, url = %request.url, "Sending outbound request");
        let response = builder.send().await?;

        Ok(Box::new(ReqwestResponse(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new(Method::POST, "https://example.com/hook")
            .header("X-Hook-Signature", "sha256=abc")
            .json(&serde_json::json!({"a": 1}))
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.headers[1], ("Content-Type".to_string(), "application/json".to_string()));
        assert_eq!(request.body.as_deref(), Some(&b"{\"a\":1}"[..]));
    }

    #[tokio::test]
    async fn test_invalid_url_is_an_error() {
        let client = ReqwestHttpClient::new().unwrap();
        assert!(client.get("not a url").await.is_err());
    }
}
