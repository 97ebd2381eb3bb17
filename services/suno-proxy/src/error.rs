//! Service-specific error types
//!
//! Every relay failure renders as one JSON shape:
//! `{"error":{"type":"...","message":"...","request_id":"req_..."}}`.
//! The request_id is minted when the error becomes a response and appears
//! in the matching log line, so operators can line the two up.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

/// Relay request errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Pool(#[from] suno_pool::Error),

    #[error("all accounts exhausted after {attempts} attempts")]
    AllAccountsExhausted { attempts: usize },

    #[error("session token not available yet")]
    TokenUnavailable,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable machine-readable label for the JSON error body.
    fn error_type(&self) -> &'static str {
        match self {
            Error::Pool(suno_pool::Error::NoActiveAccounts) => "no_active_accounts",
            Error::Pool(suno_pool::Error::RefreshFailed(_)) => "refresh_failed",
            Error::Pool(suno_pool::Error::Store(_)) => "account_store",
            Error::AllAccountsExhausted { .. } => "all_accounts_exhausted",
            Error::TokenUnavailable => "token_unavailable",
            Error::Upstream(_) => "upstream_error",
            Error::InvalidRequest(_) => "invalid_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            // Retriable for the caller once accounts are added back
            Error::Pool(suno_pool::Error::NoActiveAccounts) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Pool(suno_pool::Error::RefreshFailed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Pool(suno_pool::Error::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::AllAccountsExhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::TokenUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());

        if status.is_server_error() {
            error!(request_id, error_type = self.error_type(), error = %self, "request failed");
        } else {
            warn!(request_id, error_type = self.error_type(), error = %self, "request rejected");
        }

        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
                "request_id": request_id,
            }
        });
        (status, Json(body)).into_response()
    }
}
