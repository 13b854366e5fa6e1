pub mod app_config;
pub mod catalog;
pub mod config;
pub mod jobs;
pub mod notify;
pub mod products;
pub mod slug;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use catalog::{ImportStatus, RemoteCatalogItem, RemoteVariant, StoredCatalogItem, StoredVariant};
pub use config::{load_app_config, load_app_config_from_env};
pub use jobs::{ImportJob, JobStatus};
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use products::{LocalProduct, NewLocalProduct, ProductImage, ProductStatus};
pub use slug::slugify;
pub use store::{CatalogStore, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// A status string read back from storage did not match any known variant.
#[derive(Debug, Error)]
#[error("unknown {kind} status: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}
