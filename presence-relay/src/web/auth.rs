//! Bearer credential guard for the allow-list endpoints.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::error::ApiError;
use crate::web::signature::constant_time_compare;
use crate::web::AppState;

/// Proof that the request carried `Authorization: Bearer <api key>`.
///
/// Extracted from the request head, so it rejects before any body extractor
/// gets a chance to run.
#[derive(Debug)]
pub struct ApiKey;

#[async_trait]
impl FromRequestParts<AppState> for ApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if is_authorized(provided, state.config.api_key.as_deref()) {
            Ok(ApiKey)
        } else {
            warn!(
                path = %parts.uri.path(),
                has_credential = provided.is_some(),
                "api_key_rejected"
            );
            Err(ApiError::Unauthorized)
        }
    }
}

/// An unset or blank key rejects every request.
fn is_authorized(provided: Option<&str>, expected: Option<&str>) -> bool {
    match (provided, expected) {
        (Some(provided), Some(expected)) if !expected.is_empty() => {
            constant_time_compare(provided, expected)
        }
        _ => false,
    }
}
