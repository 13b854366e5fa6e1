pub mod cache;
pub mod client;
pub mod error;
pub mod filters;
pub mod normalize;
pub mod rate_limit;
pub mod types;

pub use cache::{Clock, ManualClock, ResponseCache, SystemClock};
pub use client::{ClientConfig, FulfillmentClient};
pub use error::ApiError;
pub use filters::CatalogFilters;
pub use normalize::normalize_item;
pub use rate_limit::RetryPolicy;
pub use types::{Page, WireItem, WireVariant};
