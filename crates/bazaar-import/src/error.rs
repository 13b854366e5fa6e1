use bazaar_core::StoreError;
use bazaar_fulfillment::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("batch import requires at least one item")]
    EmptyBatch,

    #[error("batch of {len} items exceeds the maximum job size")]
    BatchTooLarge { len: usize },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
