//! HTTP endpoint handlers.
//!
//! The webhook handler is the fail-soft boundary: anything that goes wrong
//! while relaying is logged and Zoom still gets a 200, so it never disables
//! the subscription or redelivers. Only a bad signature is refused.

use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::allow_list::AllowListStore;
use crate::error::{ApiError, ApiResult, RelayError};
use crate::presence::{PresenceEvent, ZoomWebhook};
use crate::relay::StatusRelay;
use crate::web::auth::ApiKey;
use crate::web::signature::{
    encrypt_plain_token, verify_zoom_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: Arc<StatusRelay>,
    pub allow_list: Arc<dyn AllowListStore>,
}

impl AppState {
    pub fn new(config: Config, relay: StatusRelay, allow_list: Arc<dyn AllowListStore>) -> Self {
        Self {
            config: Arc::new(config),
            relay: Arc::new(relay),
            allow_list,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Zoom Presence Webhook
// =============================================================================

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to Zoom's `endpoint.url_validation` challenge.
#[derive(Debug, Serialize)]
pub struct UrlValidationResponse {
    #[serde(rename = "plainToken")]
    pub plain_token: String,
    #[serde(rename = "encryptedToken")]
    pub encrypted_token: String,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn webhook_reply(status: &'static str, error: Option<String>) -> Response {
    (StatusCode::OK, Json(WebhookResponse { status, error })).into_response()
}

/// Zoom "presence status updated" webhook.
///
/// This endpoint:
/// 1. Verifies the Zoom signature (if a secret token is configured)
/// 2. Answers URL validation challenges
/// 3. Relays the presence change to Slack
/// 4. Returns 200 whatever the relay outcome
pub async fn presence_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let verification_token = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_verification_token = verification_token.is_some(),
        "webhook_received"
    );

    if let Some(secret) = state.config.zoom_secret_token.as_deref() {
        if !verify_zoom_signature(
            secret,
            header_str(&headers, TIMESTAMP_HEADER),
            &body,
            header_str(&headers, SIGNATURE_HEADER),
            state.config.zoom_signature_max_age,
        ) {
            warn!("webhook_signature_invalid");
            return (
                StatusCode::UNAUTHORIZED,
                Json(WebhookResponse {
                    status: "unauthorized",
                    error: None,
                }),
            )
                .into_response();
        }
    }

    let webhook: ZoomWebhook = match serde_json::from_slice(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            error!(error = %e, "webhook_body_invalid");
            return webhook_reply("ignored", Some(format!("invalid body: {}", e)));
        }
    };

    if webhook.is_url_validation() {
        return url_validation(&state, &webhook);
    }

    let event = match PresenceEvent::from_webhook(&webhook, verification_token) {
        Some(event) => event,
        None => {
            let err = RelayError::MissingPresence;
            error!(error = %err, "webhook_relay_failed");
            return webhook_reply("ignored", Some(err.to_string()));
        }
    };

    match state.relay.relay(&event).await {
        Ok(outcome) => {
            info!(
                workspace = %outcome.workspace,
                in_meeting = outcome.in_meeting,
                dnd = ?outcome.dnd,
                "webhook_relay_complete"
            );
            webhook_reply("updated", None)
        }
        Err(e) => {
            error!(
                error = %e,
                presence_status = %event.presence_status,
                "webhook_relay_failed"
            );
            webhook_reply("ignored", None)
        }
    }
}

fn url_validation(state: &AppState, webhook: &ZoomWebhook) -> Response {
    let secret = state.config.zoom_secret_token.as_deref();

    match (secret, webhook.plain_token()) {
        (Some(secret), Some(plain_token)) => match encrypt_plain_token(secret, plain_token) {
            Some(encrypted_token) => {
                info!("webhook_url_validated");
                Json(UrlValidationResponse {
                    plain_token: plain_token.to_string(),
                    encrypted_token,
                })
                .into_response()
            }
            None => webhook_reply("ignored", Some("invalid secret token".to_string())),
        },
        (None, _) => {
            warn!("webhook_url_validation_without_secret");
            webhook_reply("ignored", Some("no secret token configured".to_string()))
        }
        (Some(_), None) => {
            warn!("webhook_url_validation_missing_plain_token");
            webhook_reply("ignored", Some("plainToken is not available".to_string()))
        }
    }
}

// =============================================================================
// Allow-list API
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    #[serde(default)]
    pub email: Option<String>,
}

/// The `email` field of an allow-list request, read as a form when the
/// request says `application/x-www-form-urlencoded` and as JSON otherwise.
///
/// Stored exactly as sent; only a missing or empty value is refused.
#[derive(Debug)]
pub struct EmailParam(pub String);

fn is_form(headers: &HeaderMap) -> bool {
    header_str(headers, CONTENT_TYPE.as_str())
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

#[async_trait]
impl FromRequest<AppState> for EmailParam {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let path = req.uri().path().to_string();
        let form = is_form(req.headers());

        let body = if form {
            Form::<EmailBody>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .ok()
        } else {
            Json::<EmailBody>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .ok()
        };

        match body.and_then(|b| b.email).filter(|e| !e.is_empty()) {
            Some(email) => Ok(EmailParam(email)),
            None => {
                warn!(path = %path, form, "users_missing_email");
                Err(ApiError::MissingEmail)
            }
        }
    }
}

/// `GET /api/v1/users` - every allowed email.
pub async fn list_users(_key: ApiKey, State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let emails = state.allow_list.emails().await.map_err(|e| {
        error!(error = %e, "users_list_failed");
        ApiError::query(e)
    })?;

    Ok(Json(emails))
}

/// `POST /api/v1/users` - allow an email.
pub async fn create_user(
    _key: ApiKey,
    State(state): State<AppState>,
    EmailParam(email): EmailParam,
) -> ApiResult<StatusCode> {
    info!(email = %email, "users_create_request");

    state.allow_list.add(&email).await.map_err(|e| {
        error!(email = %email, error = %e, "users_create_failed");
        ApiError::query(e)
    })?;

    Ok(StatusCode::CREATED)
}

/// `DELETE /api/v1/users` - revoke an email.
pub async fn delete_user(
    _key: ApiKey,
    State(state): State<AppState>,
    EmailParam(email): EmailParam,
) -> ApiResult<StatusCode> {
    info!(email = %email, "users_delete_request");

    state.allow_list.remove(&email).await.map_err(|e| {
        error!(email = %email, error = %e, "users_delete_failed");
        ApiError::query(e)
    })?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_form() {
        let mut headers = HeaderMap::new();
        assert!(!is_form(&headers));

        for (value, expected) in [
            ("application/x-www-form-urlencoded", true),
            ("application/x-www-form-urlencoded; charset=UTF-8", true),
            ("Application/X-WWW-Form-Urlencoded", true),
            ("application/json", false),
            ("text/plain", false),
        ] {
            headers.insert(CONTENT_TYPE, value.parse().unwrap());
            assert_eq!(is_form(&headers), expected, "{}", value);
        }
    }

    #[test]
    fn test_url_validation_response_shape() {
        let value = serde_json::to_value(UrlValidationResponse {
            plain_token: "plain".to_string(),
            encrypted_token: "abc".to_string(),
        })
        .unwrap();

        assert_eq!(
            value,
            serde_json::json!({"plainToken": "plain", "encryptedToken": "abc"})
        );
    }
}
