//! Error types for pool operations

/// Errors from account pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no active accounts available")]
    NoActiveAccounts,

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("account store error: {0}")]
    Store(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
