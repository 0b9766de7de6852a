//! HTTP transport layer for the OneDrive API.
//!
//! The transport only moves requests and responses. Status checking and
//! authentication live in the client executor, so tests can swap the transport
//! for a fake without reimplementing either.

use crate::config::PoolConfig;
use crate::errors::TransportError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use pin_project::pin_project;
use reqwest::redirect::Policy;
use reqwest::{header::HeaderMap, Client, Method, RequestBuilder, StatusCode};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use url::Url;

/// HTTP transport abstraction for testability.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request and buffer the whole response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Send a request and return the response body as a stream.
    ///
    /// The status is not checked; the caller decides what is acceptable.
    async fn send_streaming(&self, request: HttpRequest)
        -> Result<StreamingResponse, TransportError>;
}

/// HTTP request representation.
#[derive(Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: RequestBody,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Whether 3xx responses are followed by the transport.
    pub follow_redirects: bool,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout: None,
            follow_redirects: true,
        }
    }
}

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET method.
    Get,
    /// HEAD method.
    Head,
    /// POST method.
    Post,
    /// PUT method.
    Put,
    /// PATCH method.
    Patch,
    /// DELETE method.
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Request body variants.
#[derive(Clone)]
pub enum RequestBody {
    /// Empty body.
    Empty,
    /// Fixed-size bytes.
    Bytes(Bytes),
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

/// HTTP response representation.
#[derive(Debug)]
pub struct HttpResponse {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a new HTTP response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the body as lossy UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Response whose body has not been read yet.
pub struct StreamingResponse {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Declared body length, if known.
    pub content_length: Option<u64>,
    /// Response body.
    pub body: ByteStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Byte stream for streaming responses.
#[pin_project]
pub struct ByteStream {
    #[pin]
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>,
}

impl ByteStream {
    /// Creates a new byte stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Reads the remaining stream into one buffer.
    pub async fn collect_bytes(mut self) -> Result<Bytes, TransportError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        this.inner.poll_next(cx)
    }
}

/// Reqwest-based HTTP transport implementation.
///
/// Holds two clients because reqwest fixes the redirect policy per client.
pub struct ReqwestTransport {
    client: Client,
    no_redirect_client: Client,
}

impl ReqwestTransport {
    /// Creates a transport from a redirect-following client and a client with
    /// redirects disabled.
    pub fn from_clients(client: Client, no_redirect_client: Client) -> Self {
        Self {
            client,
            no_redirect_client,
        }
    }

    /// Creates a transport with default clients.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_settings(Duration::from_secs(30), &PoolConfig::default())
    }

    /// Creates a transport with the given connection settings.
    pub fn with_settings(
        connect_timeout: Duration,
        pool: &PoolConfig,
    ) -> Result<Self, TransportError> {
        let builder = || {
            let mut builder = Client::builder()
                .connect_timeout(connect_timeout)
                .pool_max_idle_per_host(pool.max_idle_per_host);
            if let Some(idle) = pool.idle_timeout {
                builder = builder.pool_idle_timeout(idle);
            }
            builder
        };

        let client = builder()
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create client: {}", e)))?;
        let no_redirect_client = builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create client: {}", e)))?;
        Ok(Self::from_clients(client, no_redirect_client))
    }

    fn build(&self, request: HttpRequest) -> RequestBuilder {
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let method: Method = request.method.into();
        let mut req = client.request(method, request.url).headers(request.headers);

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        match request.body {
            RequestBody::Empty => req,
            RequestBody::Bytes(bytes) => req.body(bytes),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.build(request).send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse::new(status, headers, body))
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> Result<StreamingResponse, TransportError> {
        let response = self.build(request).send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let content_length = response.content_length();

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| TransportError::Network(format!("Stream error: {}", e)))
        });

        Ok(StreamingResponse {
            status,
            headers,
            content_length,
            body: ByteStream::new(stream),
        })
    }
}
