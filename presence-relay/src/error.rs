//! Error types for the relay path and the allow-list API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Why a presence event did not produce a Slack update.
///
/// Every variant is terminal for the event; nothing is retried.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("presence_status is not available")]
    MissingPresence,

    #[error("verification token does not match any configured workspace")]
    UnknownWorkspace,

    #[error("workspace {workspace} was not updated because email does not match")]
    EmailNotAllowed { workspace: String },

    #[error("allow-list lookup failed: {0:#}")]
    AllowList(#[source] anyhow::Error),

    #[error("slack {method} failed: {error}")]
    Slack { method: &'static str, error: String },

    #[error("slack {method} request failed: {source}")]
    Http {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Body returned with a 400 when the store rejects a query.
#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Errors surfaced by the allow-list endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong bearer credential
    #[error("unauthorized")]
    Unauthorized,

    /// Request did not carry a usable `email`
    #[error("email is required")]
    MissingEmail,

    /// The store failed to run the query
    #[error("{0}")]
    Query(String),
}

impl ApiError {
    pub fn query(err: anyhow::Error) -> Self {
        ApiError::Query(format!("{:#}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::MissingEmail => StatusCode::BAD_REQUEST.into_response(),
            ApiError::Query(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorMessage { message })).into_response()
            }
        }
    }
}

/// Result type alias for allow-list handlers
pub type ApiResult<T> = Result<T, ApiError>;
