//! OneDrive API client implementation.

use crate::auth::AuthProvider;
use crate::config::{OneDriveConfig, OneDriveConfigBuilder};
use crate::dialect::Dialect;
use crate::errors::{OneDriveError, OneDriveResult};
use crate::services::*;
use crate::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;
use std::time::Duration;

mod executor;
pub use executor::{ApiRequest, RequestExecutor, RequestTarget};
pub(crate) use executor::{decode, location};

/// OneDrive API client.
///
/// This is the main entry point for interacting with a drive. It hands out
/// service handles that share one request executor, so cloning services is
/// cheap and they all use the same token state.
pub struct OneDriveClient {
    /// Configuration.
    config: OneDriveConfig,
    /// Request executor (handles auth, status checks, error mapping).
    executor: Arc<RequestExecutor>,
}

impl OneDriveClient {
    /// Creates a new OneDrive client with the given configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use integrations_onedrive::{OAuthCredentials, OneDriveAuth, OneDriveClient, OneDriveConfig, TokenState};
    /// use integrations_onedrive::Dialect;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let auth = OneDriveAuth::new(
    ///     OAuthCredentials::new("client_id", "client_secret", "https://localhost/callback"),
    ///     TokenState::new("access", "refresh", chrono::Utc::now()),
    ///     Dialect::Graph,
    /// )?;
    ///
    /// let config = OneDriveConfig::builder()
    ///     .auth_provider(auth)
    ///     .dialect(Dialect::Graph)
    ///     .build()?;
    ///
    /// let client = OneDriveClient::new(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: OneDriveConfig) -> OneDriveResult<Self> {
        let transport = ReqwestTransport::with_settings(config.connect_timeout, &config.pool)
            .map_err(|e| {
                OneDriveError::configuration(format!("Failed to create transport: {}", e))
            })?;

        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client on top of a custom transport.
    pub fn with_transport(
        config: OneDriveConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> OneDriveResult<Self> {
        config.validate()?;

        let auth = config.auth_provider.clone();
        let executor = Arc::new(RequestExecutor::new(config.clone(), transport, auth));

        Ok(Self { config, executor })
    }

    /// Creates a new client builder.
    pub fn builder() -> OneDriveClientBuilder {
        OneDriveClientBuilder::new()
    }

    // Service accessors

    /// Access the drives service for drive metadata.
    pub fn drives(&self) -> DrivesService {
        DrivesService::new(self.executor.clone())
    }

    /// Access the items service for metadata and content operations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use integrations_onedrive::{Address, OneDriveClient};
    /// # async fn example(client: OneDriveClient) -> Result<(), Box<dyn std::error::Error>> {
    /// let children = client.items().list_all_children(&Address::by_path("/Documents")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn items(&self) -> ItemsService {
        ItemsService::new(self.executor.clone())
    }

    /// Access the copy service for server-side copies.
    pub fn copies(&self) -> CopyService {
        CopyService::new(self.executor.clone())
    }

    /// Access the delta service for change enumeration.
    pub fn delta(&self) -> DeltaService {
        DeltaService::new(self.executor.clone())
    }

    /// Access the upload service.
    pub fn uploads(&self) -> UploadService {
        UploadService::new(self.executor.clone())
    }

    /// Gets the base URL for the API.
    pub fn base_url(&self) -> &str {
        self.config.base_url.as_str()
    }

    /// Gets the configured API surface.
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Gets the configuration.
    pub fn config(&self) -> &OneDriveConfig {
        &self.config
    }

    /// Gets the request executor (for advanced use cases).
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }
}

/// Builder for OneDriveClient.
///
/// Provides a fluent API for constructing a client with custom configuration.
pub struct OneDriveClientBuilder {
    config_builder: OneDriveConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl OneDriveClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: OneDriveConfig::builder(),
            transport: None,
        }
    }

    /// Sets the authentication provider.
    pub fn auth_provider<A: AuthProvider + 'static>(mut self, provider: A) -> Self {
        self.config_builder = self.config_builder.auth_provider(provider);
        self
    }

    /// Sets the authentication provider from an Arc.
    pub fn auth_provider_arc(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.config_builder = self.config_builder.auth_provider_arc(provider);
        self
    }

    /// Sets the API surface.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config_builder = self.config_builder.dialect(dialect);
        self
    }

    /// Scopes Graph requests to a specific drive.
    pub fn drive_id(mut self, drive_id: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.drive_id(drive_id);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the user agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the upload fragment size.
    pub fn max_fragment_size(mut self, size: u64) -> Self {
        self.config_builder = self.config_builder.max_fragment_size(size);
        self
    }

    /// Sets how many candidate names the rename policy probes.
    pub fn unused_filename_max_retries(mut self, retries: u32) -> Self {
        self.config_builder = self.config_builder.unused_filename_max_retries(retries);
        self
    }

    /// Sets the delay before each copy monitor poll.
    pub fn copy_poll_interval(mut self, interval: Duration) -> Self {
        self.config_builder = self.config_builder.copy_poll_interval(interval);
        self
    }

    /// Sets the copy monitor poll ceiling.
    pub fn copy_poll_max_attempts(mut self, attempts: u32) -> Self {
        self.config_builder = self.config_builder.copy_poll_max_attempts(attempts);
        self
    }

    /// Uses a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    pub fn build(self) -> OneDriveResult<OneDriveClient> {
        let config = self.config_builder.build()?;
        match self.transport {
            Some(transport) => OneDriveClient::with_transport(config, transport),
            None => OneDriveClient::new(config),
        }
    }
}

impl Default for OneDriveClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
