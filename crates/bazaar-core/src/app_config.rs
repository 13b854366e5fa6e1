use uuid::Uuid;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Only commands that open a pool need it; see [`AppConfig::require_database_url`].
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Root of the fulfillment provider's REST API, e.g. `https://api.example-fulfillment.com/v1`.
    pub fulfillment_base_url: String,
    pub fulfillment_api_key: Option<String>,
    pub fulfillment_timeout_secs: u64,
    pub fulfillment_user_agent: String,
    /// Total attempts per request, including the first one.
    pub fulfillment_max_attempts: u32,
    pub fulfillment_backoff_base_secs: u64,
    /// Delay between page requests when walking every page of a listing.
    pub fulfillment_page_delay_ms: u64,
    pub cache_ttl_secs: u64,
    pub import_chunk_size: usize,
    /// Vendor that owns products created by imports. `None` leaves them unassigned.
    pub import_vendor_id: Option<Uuid>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fulfillment_base_url", &self.fulfillment_base_url)
            .field(
                "fulfillment_api_key",
                &self.fulfillment_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("fulfillment_timeout_secs", &self.fulfillment_timeout_secs)
            .field("fulfillment_user_agent", &self.fulfillment_user_agent)
            .field("fulfillment_max_attempts", &self.fulfillment_max_attempts)
            .field(
                "fulfillment_backoff_base_secs",
                &self.fulfillment_backoff_base_secs,
            )
            .field("fulfillment_page_delay_ms", &self.fulfillment_page_delay_ms)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("import_chunk_size", &self.import_chunk_size)
            .field("import_vendor_id", &self.import_vendor_id)
            .finish()
    }
}

impl AppConfig {
    /// The database URL, for commands that open a connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was unset or blank.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}
