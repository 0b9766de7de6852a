//! Authentication for the OneDrive API.
//!
//! [`OneDriveAuth`] keeps the OAuth2 token state of one user and refreshes it
//! with the refresh-token grant shortly before the access token expires.
//!
//! # Examples
//!
//! ```no_run
//! use integrations_onedrive::auth::{AuthProvider, OAuthCredentials, OneDriveAuth, TokenState};
//! use integrations_onedrive::Dialect;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = OneDriveAuth::new(
//!     OAuthCredentials::new("client_id", "client_secret", "https://localhost/callback"),
//!     TokenState::new("access", "refresh", chrono::Utc::now()),
//!     Dialect::Graph,
//! )?
//! .on_token_refresh(|tokens| {
//!     // persist tokens.refresh_token() somewhere safe
//!     let _ = tokens.expires_at();
//! });
//!
//! let token = auth.valid_token().await?;
//! # Ok(())
//! # }
//! ```

use crate::dialect::Dialect;
use crate::errors::{classify, AuthenticationError, OneDriveError, OneDriveResult, TransportError};
use crate::transport::{HttpMethod, HttpRequest, HttpTransport, ReqwestTransport, RequestBody};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Token expiry buffer (5 minutes) - refresh tokens proactively before expiry.
pub const TOKEN_EXPIRY_BUFFER_SECONDS: i64 = 300;

const TOKEN_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Authentication provider abstraction.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns an access token that is valid for at least the expiry buffer,
    /// refreshing it first if needed.
    async fn valid_token(&self) -> OneDriveResult<SecretString>;

    /// Refreshes the access token unconditionally.
    async fn refresh(&self) -> OneDriveResult<()>;
}

/// OAuth2 application credentials.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
}

impl OAuthCredentials {
    /// Creates credentials. Public clients pass an empty secret.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Application (client) id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// Token state of one user.
#[derive(Debug, Clone)]
pub struct TokenState {
    access_token: SecretString,
    refresh_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl TokenState {
    /// Creates a token state.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            expires_at,
        }
    }

    /// Access token.
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Refresh token.
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    /// Access token expiry.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Checks if the access token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Checks if the token needs proactive refresh (within 5 minutes of expiry).
    pub fn needs_refresh(&self) -> bool {
        let threshold = self.expires_at - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECONDS);
        Utc::now() > threshold
    }
}

/// Callback invoked with the new token state after every successful refresh.
pub type TokenRefreshCallback = Arc<dyn Fn(&TokenState) + Send + Sync>;

/// OAuth2 authentication provider for OneDrive.
///
/// # Thread Safety
///
/// The token state sits behind a single async mutex that is held across the
/// expiry check and the refresh. Concurrent callers that find the token stale
/// wait for the first refresh instead of starting their own.
pub struct OneDriveAuth {
    credentials: OAuthCredentials,
    token_url: String,
    state: Mutex<TokenState>,
    transport: Arc<dyn HttpTransport>,
    on_token_refresh: Option<TokenRefreshCallback>,
}

impl OneDriveAuth {
    /// Creates a provider using the dialect's token endpoint.
    pub fn new(
        credentials: OAuthCredentials,
        tokens: TokenState,
        dialect: Dialect,
    ) -> OneDriveResult<Self> {
        let transport = ReqwestTransport::new().map_err(|e| {
            OneDriveError::configuration(format!("Failed to create transport: {}", e))
        })?;

        Ok(Self {
            credentials,
            token_url: dialect.token_url().to_string(),
            state: Mutex::new(tokens),
            transport: Arc::new(transport),
            on_token_refresh: None,
        })
    }

    /// Sets a custom token URL (for testing or national clouds).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Sets the transport used to reach the token endpoint.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Registers a callback receiving the token state after each refresh.
    pub fn on_token_refresh<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TokenState) + Send + Sync + 'static,
    {
        self.on_token_refresh = Some(Arc::new(callback));
        self
    }

    /// Returns a copy of the current token state.
    pub async fn snapshot(&self) -> TokenState {
        self.state.lock().await.clone()
    }

    async fn refresh_locked(&self, state: &mut TokenState) -> OneDriveResult<()> {
        debug!(token_url = %self.token_url, "Refreshing access token");

        let refreshed = self
            .request_token(state)
            .await
            .map_err(|e| {
                warn!(error = %e, "Token refresh failed");
                OneDriveError::Authentication(AuthenticationError::RefreshFailed(Box::new(e)))
            })?;

        state.access_token = SecretString::new(refreshed.access_token);
        if let Some(refresh_token) = refreshed.refresh_token {
            state.refresh_token = SecretString::new(refresh_token);
        }
        state.expires_at = Utc::now() + Duration::seconds(refreshed.expires_in);

        info!(expires_at = %state.expires_at, "Access token refreshed");

        if let Some(callback) = &self.on_token_refresh {
            callback(&*state);
        }

        Ok(())
    }

    async fn request_token(&self, state: &TokenState) -> OneDriveResult<RefreshResponse> {
        let form = RefreshRequest {
            grant_type: "refresh_token",
            client_id: &self.credentials.client_id,
            client_secret: self.credentials.client_secret.expose_secret(),
            redirect_uri: &self.credentials.redirect_uri,
            refresh_token: state.refresh_token.expose_secret(),
        };
        let body = serde_urlencoded::to_string(&form).map_err(|e| {
            OneDriveError::request(format!("Failed to encode token request: {}", e))
        })?;

        let url = Url::parse(&self.token_url)
            .map_err(|e| OneDriveError::configuration(format!("Invalid token URL: {}", e)))?;

        let mut request = HttpRequest::new(HttpMethod::Post, url);
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        request.body = RequestBody::Bytes(Bytes::from(body));
        request.timeout = Some(TOKEN_REQUEST_TIMEOUT);

        let response = self.transport.send(request).await.map_err(classify)?;

        if response.status != StatusCode::OK {
            let err = classify(TransportError::UnexpectedStatus {
                status: response.status,
                expected: vec![StatusCode::OK],
                body: response.text(),
                headers: response.headers,
            });
            return Err(remap_token_error(err));
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            OneDriveError::Authentication(AuthenticationError::InvalidTokenResponse(e.to_string()))
        })
    }
}

#[async_trait]
impl AuthProvider for OneDriveAuth {
    async fn valid_token(&self) -> OneDriveResult<SecretString> {
        let mut state = self.state.lock().await;
        if state.needs_refresh() {
            self.refresh_locked(&mut state).await?;
        }
        Ok(state.access_token.clone())
    }

    async fn refresh(&self) -> OneDriveResult<()> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    client_secret: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    redirect_uri: &'a str,
    refresh_token: &'a str,
}

fn is_blank(value: &&str) -> bool {
    value.is_empty()
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Token endpoints report failures as `{"error", "error_description"}`, which
/// the generic classifier does not recognize. Lift them into the code and
/// message so callers can match on `invalid_grant`.
fn remap_token_error(mut err: OneDriveError) -> OneDriveError {
    #[derive(Deserialize)]
    struct TokenErrorResponse {
        error: String,
        #[serde(default)]
        error_description: String,
    }

    if let OneDriveError::Api(api) = &mut err {
        if let Ok(parsed) = serde_json::from_str::<TokenErrorResponse>(&api.message) {
            api.code = parsed.error;
            if !parsed.error_description.is_empty() {
                api.message = parsed.error_description;
            }
        }
    }
    err
}
