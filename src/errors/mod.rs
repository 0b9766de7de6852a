//! Error types for the OneDrive integration.
//!
//! Failures flow through two layers. The transport reports what happened on the
//! wire ([`TransportError`]); [`classify`] turns an unexpected-status failure into
//! an [`ApiError`] carrying the service's `{code, message}` pair, keeping the
//! transport error as its source.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Error code reported when an item does not exist.
pub const ERROR_CODE_ITEM_NOT_FOUND: &str = "itemNotFound";

/// Error code reported when a name is already taken in the target folder.
pub const ERROR_CODE_NAME_ALREADY_EXISTS: &str = "nameAlreadyExists";

/// Error code returned by the token endpoint for a revoked or expired grant.
pub const ERROR_CODE_INVALID_GRANT: &str = "invalid_grant";

/// Error code used when the response body is not a recognized error document.
pub const ERROR_CODE_UNKNOWN: &str = "unknown";

/// Codes telling the caller that a delta cursor is no longer usable.
const RESYNC_CODES: &[&str] = &[
    "resyncRequired",
    "ResyncChangesApplyDifferences",
    "ResyncChangesUploadDifferences",
    "resyncChangesApplyDifferences",
    "resyncChangesUploadDifferences",
    "resyncApplyDifferences",
    "resyncUploadDifferences",
];

/// Result type for OneDrive operations.
pub type OneDriveResult<T> = Result<T, OneDriveError>;

/// Top-level error type for the OneDrive integration.
#[derive(Debug, Error)]
pub enum OneDriveError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    /// Error reported by the service.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Transport failure without a response (connection, timeout).
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),

    /// Request could not be built.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Response could not be understood.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// Upload error.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Asynchronous copy error.
    #[error("Copy error: {0}")]
    Copy(#[from] CopyError),
}

impl OneDriveError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        OneDriveError::Configuration(ConfigurationError::InvalidConfiguration(msg.into()))
    }

    /// Creates a request validation error.
    pub fn request(msg: impl Into<String>) -> Self {
        OneDriveError::Request(RequestError::ValidationError(msg.into()))
    }

    /// Creates a deserialization error.
    pub fn deserialization(msg: impl Into<String>) -> Self {
        OneDriveError::Response(ResponseError::DeserializationError(msg.into()))
    }

    /// Creates an upload invalid-state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        OneDriveError::Upload(UploadError::InvalidState(msg.into()))
    }

    /// Returns the service error, looking through a failed token refresh.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            OneDriveError::Api(err) => Some(err),
            OneDriveError::Authentication(AuthenticationError::RefreshFailed(inner)) => {
                inner.api_error()
            }
            _ => None,
        }
    }

    /// Returns the service error code, if this error carries one.
    ///
    /// A local name conflict detected before uploading reports
    /// [`ERROR_CODE_NAME_ALREADY_EXISTS`], the same code the service uses.
    pub fn code(&self) -> Option<&str> {
        match self {
            OneDriveError::Upload(UploadError::NameConflict(_)) => {
                Some(ERROR_CODE_NAME_ALREADY_EXISTS)
            }
            _ => self.api_error().map(|e| e.code.as_str()),
        }
    }

    /// Returns the HTTP status code of the failed response, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.api_error().and_then(ApiError::status)
    }

    /// Returns true if the item addressed by the request does not exist.
    ///
    /// A 404 without a recognizable error body counts as not found too.
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ERROR_CODE_ITEM_NOT_FOUND)
            || self.status_code() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns true if the target name is already taken.
    pub fn is_name_already_exists(&self) -> bool {
        self.code() == Some(ERROR_CODE_NAME_ALREADY_EXISTS)
    }

    /// Returns true if the refresh token was rejected by the token endpoint.
    pub fn is_invalid_grant(&self) -> bool {
        self.code() == Some(ERROR_CODE_INVALID_GRANT)
    }

    /// Returns true if a delta cursor must be dropped and the sync restarted
    /// from an empty token.
    pub fn is_resync_required(&self) -> bool {
        self.api_error()
            .map(ApiError::is_resync_required)
            .unwrap_or(false)
    }
}

impl From<TransportError> for OneDriveError {
    fn from(err: TransportError) -> Self {
        classify(err)
    }
}

/// Maps a transport failure into a domain error.
///
/// Unexpected-status failures become [`OneDriveError::Api`]; everything else
/// stays a [`OneDriveError::Transport`].
pub fn classify(err: TransportError) -> OneDriveError {
    match err {
        TransportError::UnexpectedStatus { .. } => OneDriveError::Api(ApiError::from_transport(err)),
        other => OneDriveError::Transport(other),
    }
}

/// Error reported by the OneDrive service.
#[derive(Debug, Error)]
#[error("{message} (code: {code})")]
pub struct ApiError {
    /// Service error code (`itemNotFound`, `nameAlreadyExists`, ...).
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// The transport failure this error was derived from.
    #[source]
    pub source: TransportError,
}

impl ApiError {
    /// Builds a domain error from a transport failure.
    ///
    /// JSON bodies shaped like `{"error": {"code", "message"}}` provide the code
    /// and message. Anything else yields code `unknown` with the raw body as the
    /// message. An empty message falls back to the transport error's text.
    pub fn from_transport(source: TransportError) -> Self {
        let (code, message) = match &source {
            TransportError::UnexpectedStatus { headers, body, .. } => parse_error_body(headers, body),
            _ => (ERROR_CODE_UNKNOWN.to_string(), String::new()),
        };

        let message = if message.is_empty() {
            source.to_string()
        } else {
            message
        };

        Self {
            code,
            message,
            source,
        }
    }

    /// Returns the HTTP status of the failed response.
    pub fn status(&self) -> Option<StatusCode> {
        self.source.status()
    }

    /// Returns true if the delta cursor that produced this error is stale.
    pub fn is_resync_required(&self) -> bool {
        RESYNC_CODES.contains(&self.code.as_str())
            || self.code == ERROR_CODE_ITEM_NOT_FOUND
            || self.status() == Some(StatusCode::GONE)
    }
}

fn parse_error_body(headers: &HeaderMap, body: &str) -> (String, String) {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
    }

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
            return (parsed.error.code, parsed.error.message);
        }
    }

    (ERROR_CODE_UNKNOWN.to_string(), body.to_string())
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Missing credentials.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The token endpoint was unreachable or rejected the refresh grant.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[source] Box<OneDriveError>),

    /// The token endpoint answered with an unreadable document.
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    /// The access token cannot be used as a header value.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Request errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid header value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Body serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Response errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// A header the protocol requires was absent.
    #[error("Missing header: {0}")]
    MissingHeader(String),
}

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The name exists and the conflict policy is `fail`.
    #[error("Item already exists: {0}")]
    NameConflict(String),

    /// No free name was found within the retry budget.
    #[error("Max autorename attempts reached for {name} after {attempts} attempts")]
    RenameExhausted {
        /// Requested name.
        name: String,
        /// Number of candidates probed.
        attempts: u32,
    },

    /// Operation not supported for this address kind.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Fragment sequencing went out of step with the content stream.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Reading the content stream failed.
    #[error("Content read failed: {0}")]
    Io(String),
}

/// Asynchronous copy errors.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The service reported the copy as failed.
    #[error("copy failed: {0}")]
    Failed(String),

    /// The copy completed but the monitor never returned the new item.
    ///
    /// The copy did happen; the caller has to locate the item itself, for
    /// example by listing the destination folder.
    #[error("Async task completed but no item")]
    CompletedNoItem {
        /// Resource id reported by the monitor, when present.
        resource_id: Option<String>,
    },

    /// The monitor kept reporting progress past the attempt ceiling.
    #[error("copy progress too long: gave up after {attempts} polls")]
    Timeout {
        /// Number of polls issued.
        attempts: u32,
    },

    /// Polling was cancelled by the caller.
    #[error("copy polling cancelled")]
    Cancelled,

    /// The copy request was accepted without a monitor URL.
    #[error("copy accepted without a Location header")]
    MissingMonitorUrl,
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response status was not one the request expected.
    #[error("Invalid response status: got {status}, expected {expected:?}")]
    UnexpectedStatus {
        /// Received status.
        status: StatusCode,
        /// Statuses the request accepted.
        expected: Vec<StatusCode>,
        /// Response headers.
        headers: HeaderMap,
        /// Raw response body text.
        body: String,
    },
}

impl TransportError {
    /// Returns the response status for unexpected-status failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Network(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}
