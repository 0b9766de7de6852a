//! Request executor with auth, status checking and error classification.

use crate::address::Address;
use crate::auth::AuthProvider;
use crate::config::OneDriveConfig;
use crate::dialect::Dialect;
use crate::errors::{
    classify, AuthenticationError, OneDriveError, OneDriveResult, RequestError, TransportError,
};
use crate::transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody, StreamingResponse,
};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, LOCATION, USER_AGENT,
};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Characters escaped in rendered item paths. `/` and `:` stay literal because
/// they delimit path-addressed items.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Where a request goes.
#[derive(Debug, Clone)]
pub enum RequestTarget {
    /// A rendered path, appended to the configured base URL.
    Path(String),
    /// An absolute URL handed out by the service, used verbatim.
    Url(String),
}

/// Description of a single API call.
#[derive(Debug)]
pub struct ApiRequest {
    method: HttpMethod,
    target: RequestTarget,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: RequestBody,
    expected: Vec<StatusCode>,
    authenticated: bool,
    follow_redirects: bool,
}

impl ApiRequest {
    /// Creates a request expecting `200 OK`.
    pub fn new(method: HttpMethod, target: RequestTarget) -> Self {
        Self {
            method,
            target,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            expected: vec![StatusCode::OK],
            authenticated: true,
            follow_redirects: true,
        }
    }

    /// Request against a rendered path.
    pub fn path(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::new(method, RequestTarget::Path(path.into()))
    }

    /// Request against an absolute URL.
    pub fn url(method: HttpMethod, url: impl Into<String>) -> Self {
        Self::new(method, RequestTarget::Url(url.into()))
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> OneDriveResult<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| {
            OneDriveError::Request(RequestError::Serialization(format!(
                "Failed to serialize request body: {}",
                e
            )))
        })?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = RequestBody::Bytes(Bytes::from(bytes));
        Ok(self)
    }

    /// Sets a raw body.
    pub fn bytes(mut self, bytes: Bytes) -> Self {
        self.body = RequestBody::Bytes(bytes);
        self
    }

    /// Sets the statuses treated as success.
    pub fn expect(mut self, statuses: &[StatusCode]) -> Self {
        self.expected = statuses.to_vec();
        self
    }

    /// Sends the request without an `Authorization` header.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Returns 3xx responses instead of following them.
    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }
}

/// Request executor that handles HTTP requests with authentication and error mapping.
///
/// Every call goes through one place that:
/// - Renders the target against the base URL
/// - Adds the bearer token, unless the request is anonymous
/// - Checks the status against the request's accepted set
/// - Classifies failures into domain errors
pub struct RequestExecutor {
    /// Configuration
    config: OneDriveConfig,
    /// HTTP transport
    transport: Arc<dyn HttpTransport>,
    /// Authentication provider
    auth: Arc<dyn AuthProvider>,
}

impl RequestExecutor {
    /// Creates a new request executor.
    pub fn new(
        config: OneDriveConfig,
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            config,
            transport,
            auth,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &OneDriveConfig {
        &self.config
    }

    /// API surface.
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Renders an address for the configured dialect and drive.
    pub fn render(&self, address: &Address) -> String {
        address.render(self.config.dialect, &self.config.drive_id)
    }

    /// Executes a request and deserializes the JSON response.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> OneDriveResult<T> {
        let response = self.send(request).await?;
        decode(&response.body)
    }

    /// Executes a request and returns the buffered response.
    pub async fn send(&self, request: ApiRequest) -> OneDriveResult<HttpResponse> {
        let expected = request.expected.clone();
        let http_request = self.prepare(request).await?;
        let method = http_request.method;
        let path = http_request.url.path().to_string();

        debug!(method = ?method, path = %path, "Sending request");

        let response = self.transport.send(http_request).await.map_err(classify)?;

        if !expected.contains(&response.status) {
            let err = classify(TransportError::UnexpectedStatus {
                status: response.status,
                expected,
                body: response.text(),
                headers: response.headers,
            });
            log_failure(method, &path, &err);
            return Err(err);
        }

        Ok(response)
    }

    /// Executes a request and returns the response with an unread body.
    pub async fn send_streaming(&self, request: ApiRequest) -> OneDriveResult<StreamingResponse> {
        let expected = request.expected.clone();
        let http_request = self.prepare(request).await?;
        let method = http_request.method;
        let path = http_request.url.path().to_string();

        debug!(method = ?method, path = %path, "Sending streaming request");

        let response = self
            .transport
            .send_streaming(http_request)
            .await
            .map_err(classify)?;

        if !expected.contains(&response.status) {
            let body = match response.body.collect_bytes().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(path = %path, error = %e, "Failed to read error body");
                    Bytes::new()
                }
            };
            let err = classify(TransportError::UnexpectedStatus {
                status: response.status,
                expected,
                headers: response.headers,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
            log_failure(method, &path, &err);
            return Err(err);
        }

        Ok(response)
    }

    /// Builds a full URL from a target and query parameters.
    pub fn build_url(
        &self,
        target: &RequestTarget,
        query: &[(String, String)],
    ) -> OneDriveResult<Url> {
        let raw = match target {
            RequestTarget::Path(path) => format!(
                "{}{}",
                self.config.base_url.as_str().trim_end_matches('/'),
                utf8_percent_encode(path, PATH_ENCODE_SET)
            ),
            RequestTarget::Url(url) => url.clone(),
        };

        let mut url = Url::parse(&raw).map_err(|e| {
            OneDriveError::Request(RequestError::InvalidUrl(format!("{}: {}", raw, e)))
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Adds authentication header to a header map.
    pub async fn add_auth_header(&self, headers: &mut HeaderMap) -> OneDriveResult<()> {
        let token = self.auth.valid_token().await?;

        let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| {
                OneDriveError::Authentication(AuthenticationError::InvalidToken(format!(
                    "Invalid auth header: {}",
                    e
                )))
            })?;
        headers.insert(AUTHORIZATION, value);

        Ok(())
    }

    async fn prepare(&self, request: ApiRequest) -> OneDriveResult<HttpRequest> {
        let url = self.build_url(&request.target, &request.query)?;

        let mut headers = request.headers;
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.config.user_agent).map_err(|e| {
                OneDriveError::Request(RequestError::InvalidHeader(format!(
                    "Invalid user agent: {}",
                    e
                )))
            })?,
        );
        if request.authenticated {
            self.add_auth_header(&mut headers).await?;
        }

        Ok(HttpRequest {
            method: request.method,
            url,
            headers,
            body: request.body,
            timeout: Some(self.config.timeout),
            follow_redirects: request.follow_redirects,
        })
    }
}

/// Deserializes a JSON response body.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> OneDriveResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        OneDriveError::deserialization(format!("Failed to deserialize response: {}", e))
    })
}

/// Reads the `Location` header of a response.
pub(crate) fn location(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn log_failure(method: HttpMethod, path: &str, err: &OneDriveError) {
    warn!(
        method = ?method,
        path = %path,
        status = ?err.status_code(),
        code = err.code().unwrap_or_default(),
        "Request failed"
    );
}
