//! Error handling for catalog API operations.

use http::StatusCode;
use thiserror::Error;

/// Common error type for catalog API operations.
///
/// Downstream the taxonomy matters more than the payload: `NotFound` and
/// `Malformed` degrade to placeholder records in the hydration layer, while
/// transport errors surface on the retryable pagination path.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    /// The catalog has no entry for the requested resource (HTTP 404).
    #[error("catalog resource not found: {0}")]
    NotFound(String),
    /// The catalog answered with a shape we could not interpret.
    #[error("malformed catalog response: {0}")]
    Malformed(String),
    /// Transport-level failure, including timeouts and connection resets.
    #[error("catalog request failed")]
    Request(#[from] reqwest::Error),
    /// The catalog answered with a status the contract does not enumerate.
    #[error("unexpected status {status} from catalog")]
    UnexpectedStatus { status: StatusCode },
    /// The request could not be constructed from the given parameters.
    #[error("invalid catalog request: {0}")]
    InvalidRequest(String),
}

impl CatalogClientError {
    /// Permanent miss: the hydrator synthesizes a placeholder for these
    /// instead of propagating.
    pub fn is_permanent_miss(&self) -> bool {
        matches!(
            self,
            CatalogClientError::NotFound(_) | CatalogClientError::Malformed(_)
        )
    }
}
