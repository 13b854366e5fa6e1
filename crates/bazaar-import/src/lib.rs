//! Catalog import pipeline: turns fulfillment-provider items into
//! marketplace products, one at a time or in tracked batches.

pub mod batch;
pub mod error;
pub mod importer;

pub use batch::{BatchReport, ItemFailure};
pub use error::ImportError;
pub use importer::{product_slug, ImportSettings, Importer};
