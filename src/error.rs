//! Error types for the rotating-proxy-pool crate.

use thiserror::Error;

/// Errors produced by the proxy pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No live proxy could be handed out.
    #[error("No proxy available in pool")]
    NoAvailableProxy,

    /// Neither a source nor a supplier is configured.
    #[error("No proxy source or supplier configured")]
    SupplierUnconfigured,

    /// The supplier returned an error.
    #[error("Proxy supplier failed: {0}")]
    SupplierFailure(#[source] anyhow::Error),
}

/// Result alias used by pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors produced while resolving a route through the [`ProxyRouter`](crate::ProxyRouter).
#[derive(Debug, Error)]
pub enum RouterError {
    /// The pool-backed retry budget was spent without getting a proxy.
    #[error("Failed to get a proxy from the pool after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Non-retryable error from the pool.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Pool mode selected but the router has no pool.
    #[error("Pool mode selected but no proxy pool is configured")]
    PoolUnconfigured,

    /// Credentialed mode selected but no endpoint is configured.
    #[error("Credentialed mode selected but no endpoint is configured")]
    CredentialsUnconfigured,
}

impl RouterError {
    /// Whether this error ends the retry loop for good.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RouterError::Pool(PoolError::NoAvailableProxy))
    }
}
