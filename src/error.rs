//! Error taxonomy shared by the auth controllers and the proxy layer.
//!
//! Auth controllers never surface these to the user agent directly; they map
//! each variant to a redirect code. Proxy handlers return them as JSON bodies
//! through the `IntoResponse` impl below.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Server misconfiguration: provider credentials absent.
    #[error("{0} credentials not configured")]
    MissingConfig(&'static str),

    /// Callback arrived without the parameters the handshake needs.
    #[error("Missing callback parameters")]
    MissingParams,

    /// OAuth 2.0 `state` did not match the stored nonce.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Temporary request-token secret is gone (expired or never set).
    #[error("Session expired")]
    SessionExpired,

    /// Provider answered non-2xx or could not be reached.
    #[error("{0}")]
    Upstream(String),

    /// Required session cookie absent on an API call.
    #[error("{0}")]
    Unauthenticated(String),

    /// Provider answered 2xx but without the fields we need.
    #[error("{0}")]
    InvalidResponse(String),

    /// Client sent a request missing required input.
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid {flow} handshake transition: {from} -> {to}")]
    InvalidTransition {
        flow: &'static str,
        from: String,
        to: String,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Non-2xx answer from a provider, kept typed so handlers can inspect the
/// status after it has travelled through `anyhow`.
#[derive(Debug, Error)]
#[error("{service} API error: {status}")]
pub struct UpstreamStatus {
    pub service: &'static str,
    pub status: u16,
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::Upstream(format!("{:#}", other)),
        }
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
