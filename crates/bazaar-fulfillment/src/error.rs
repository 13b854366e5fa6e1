use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response whose body carried no readable error message.
    #[error("network error: unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("rate limited by fulfillment API (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Non-2xx response with a parseable error body; the provider's message is kept verbatim.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("normalization error for item {external_id}: {reason}")]
    Normalization { external_id: String, reason: String },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("pagination limit reached: exceeded {max_pages} pages")]
    PaginationLimit { max_pages: usize },
}

impl ApiError {
    /// HTTP status carried by the error, when the failure came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } | ApiError::Upstream { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            ApiError::RateLimited { .. } => Some(429),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the failure is transient and worth another attempt:
    /// transport errors, 429, and 5xx responses with or without a readable
    /// body. Every other 4xx is final.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Http(_) | ApiError::RateLimited { .. } => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Upstream { status, .. } => *status >= 500,
            ApiError::NotFound { .. }
            | ApiError::Deserialize { .. }
            | ApiError::Normalization { .. }
            | ApiError::InvalidBaseUrl { .. }
            | ApiError::PaginationLimit { .. } => false,
        }
    }

    /// `true` for 4xx-class failures other than rate limiting.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ApiError::RateLimited { .. })
            && self.status().is_some_and(|s| (400..500).contains(&s))
    }
}
