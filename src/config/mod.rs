//! Configuration for the OneDrive client.

use crate::auth::AuthProvider;
use crate::dialect::Dialect;
use crate::errors::{ConfigurationError, OneDriveError, OneDriveResult};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default upload fragment size (60 MiB).
pub const DEFAULT_MAX_FRAGMENT_SIZE: u64 = 60 * 1024 * 1024;

/// Default number of candidate names probed by the rename policy.
pub const DEFAULT_UNUSED_FILENAME_MAX_RETRIES: u32 = 100;

/// Default delay before each copy monitor poll.
pub const DEFAULT_COPY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of copy monitor polls before giving up.
pub const DEFAULT_COPY_POLL_MAX_ATTEMPTS: u32 = 100;

/// Configuration for the OneDrive client.
#[derive(Clone)]
pub struct OneDriveConfig {
    /// Authentication provider.
    pub auth_provider: Arc<dyn AuthProvider>,

    /// API surface.
    pub dialect: Dialect,

    /// Drive scope for Graph. Empty means the signed-in user's drive.
    pub drive_id: String,

    /// Base URL for the API.
    pub base_url: Url,

    /// Default timeout for requests.
    pub timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Largest fragment sent in one upload session request.
    pub max_fragment_size: u64,

    /// Candidate names probed by the rename conflict policy.
    pub unused_filename_max_retries: u32,

    /// Delay before each copy monitor poll.
    pub copy_poll_interval: Duration,

    /// Copy monitor polls before giving up.
    pub copy_poll_max_attempts: u32,

    /// Pool configuration.
    pub pool: PoolConfig,
}

/// Connection pool configuration.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Maximum idle connections per host.
    pub max_idle_per_host: usize,

    /// Idle timeout.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Some(Duration::from_secs(90)),
        }
    }
}

impl std::fmt::Debug for OneDriveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneDriveConfig")
            .field("dialect", &self.dialect)
            .field("drive_id", &self.drive_id)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("max_fragment_size", &self.max_fragment_size)
            .finish_non_exhaustive()
    }
}

impl OneDriveConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> OneDriveConfigBuilder {
        OneDriveConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> OneDriveResult<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(OneDriveError::configuration(
                "Base URL must use HTTP or HTTPS",
            ));
        }

        if self.max_fragment_size == 0 {
            return Err(OneDriveError::configuration(
                "Max fragment size must be positive",
            ));
        }

        if self.copy_poll_max_attempts == 0 {
            return Err(OneDriveError::configuration(
                "Copy poll attempts must be positive",
            ));
        }

        if self.unused_filename_max_retries == 0 {
            return Err(OneDriveError::configuration(
                "Unused filename retries must be positive",
            ));
        }

        Ok(())
    }
}

/// Builder for OneDriveConfig.
pub struct OneDriveConfigBuilder {
    auth_provider: Option<Arc<dyn AuthProvider>>,
    dialect: Dialect,
    drive_id: String,
    base_url: Option<String>,
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: Option<String>,
    max_fragment_size: u64,
    unused_filename_max_retries: u32,
    copy_poll_interval: Duration,
    copy_poll_max_attempts: u32,
    pool: PoolConfig,
}

impl OneDriveConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            auth_provider: None,
            dialect: Dialect::Legacy,
            drive_id: String::new(),
            base_url: None,
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            user_agent: None,
            max_fragment_size: DEFAULT_MAX_FRAGMENT_SIZE,
            unused_filename_max_retries: DEFAULT_UNUSED_FILENAME_MAX_RETRIES,
            copy_poll_interval: DEFAULT_COPY_POLL_INTERVAL,
            copy_poll_max_attempts: DEFAULT_COPY_POLL_MAX_ATTEMPTS,
            pool: PoolConfig::default(),
        }
    }

    /// Sets the authentication provider.
    pub fn auth_provider<A: AuthProvider + 'static>(mut self, provider: A) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self
    }

    /// Sets the authentication provider from an Arc.
    pub fn auth_provider_arc(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth_provider = Some(provider);
        self
    }

    /// Sets the API surface.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Scopes Graph requests to a specific drive.
    pub fn drive_id(mut self, drive_id: impl Into<String>) -> Self {
        self.drive_id = drive_id.into();
        self
    }

    /// Overrides the dialect's default base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the upload fragment size.
    pub fn max_fragment_size(mut self, size: u64) -> Self {
        self.max_fragment_size = size;
        self
    }

    /// Sets how many candidate names the rename policy probes.
    pub fn unused_filename_max_retries(mut self, retries: u32) -> Self {
        self.unused_filename_max_retries = retries;
        self
    }

    /// Sets the delay before each copy monitor poll.
    pub fn copy_poll_interval(mut self, interval: Duration) -> Self {
        self.copy_poll_interval = interval;
        self
    }

    /// Sets the copy monitor poll ceiling.
    pub fn copy_poll_max_attempts(mut self, attempts: u32) -> Self {
        self.copy_poll_max_attempts = attempts;
        self
    }

    /// Sets the pool configuration.
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> OneDriveResult<OneDriveConfig> {
        let auth_provider = self.auth_provider.ok_or_else(|| {
            OneDriveError::Configuration(ConfigurationError::MissingCredentials(
                "Authentication provider is required".to_string(),
            ))
        })?;

        let base_url = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.dialect.default_base_url());
        let base_url = Url::parse(base_url)
            .map_err(|e| OneDriveError::configuration(format!("Invalid base URL: {}", e)))?;

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("integrations-onedrive/{}", env!("CARGO_PKG_VERSION")));

        let config = OneDriveConfig {
            auth_provider,
            dialect: self.dialect,
            drive_id: self.drive_id,
            base_url,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            user_agent,
            max_fragment_size: self.max_fragment_size,
            unused_filename_max_retries: self.unused_filename_max_retries,
            copy_poll_interval: self.copy_poll_interval,
            copy_poll_max_attempts: self.copy_poll_max_attempts,
            pool: self.pool,
        };

        config.validate()?;

        Ok(config)
    }
}

impl Default for OneDriveConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
