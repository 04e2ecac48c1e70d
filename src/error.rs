// src/error.rs

//! Failure taxonomy shared by every relay.
//!
//! Each variant maps to exactly one HTTP status and one `{"error": ...}` body:
//! - `NotConfigured`: credential missing, detected before any network I/O
//! - `Upstream`: the remote service answered with a non-success status
//! - `Timeout`: the outbound call exceeded its deadline
//! - `Internal`: transport failure, malformed JSON, unexpected shape
//! - `BadRequest`: the inbound request itself cannot be relayed
//!
//! Nothing here is retried. The end user is the retry mechanism.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub const NOT_CONFIGURED_MESSAGE: &str = "API key not configured on server";
pub const TIMEOUT_MESSAGE: &str = "Upstream service timed out, please try again later";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("{}", NOT_CONFIGURED_MESSAGE)]
    NotConfigured,

    /// `context` distinguishes which upstream step failed, e.g.
    /// "API error" for submission creation, "Result fetch error" for lookup.
    #[error("{context}: {body}")]
    Upstream {
        status: u16,
        context: &'static str,
        body: String,
    },

    #[error("No token received from Judge0 API")]
    MissingToken,

    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    #[error("Server error: {0}")]
    Internal(String),

    #[error("{0}")]
    BadRequest(String),
}

impl RelayError {
    pub fn upstream(status: u16, context: &'static str, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            context,
            body: body.into(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured | Self::MissingToken | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // An upstream status outside the valid range still has to be
            // reported as a failure.
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
