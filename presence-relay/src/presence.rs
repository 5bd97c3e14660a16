//! Zoom webhook payloads.
//!
//! Zoom posts JSON shaped like:
//!
//! ```text
//! { "event": "user.presence_status_updated",
//!   "payload": { "object": { "email": "...", "presence_status": "In_Meeting" } } }
//! ```
//!
//! Every field is optional here; the relay decides what a missing field means.

use serde::Deserialize;

/// Event Zoom sends when validating the endpoint URL.
pub const URL_VALIDATION_EVENT: &str = "endpoint.url_validation";

/// Raw webhook body.
#[derive(Debug, Default, Deserialize)]
pub struct ZoomWebhook {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub payload: Option<ZoomPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ZoomPayload {
    /// Present only on `endpoint.url_validation`
    #[serde(default, rename = "plainToken")]
    pub plain_token: Option<String>,
    #[serde(default)]
    pub object: Option<ZoomPresenceObject>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ZoomPresenceObject {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub presence_status: Option<String>,
}

impl ZoomWebhook {
    pub fn is_url_validation(&self) -> bool {
        self.event.as_deref() == Some(URL_VALIDATION_EVENT)
    }

    pub fn plain_token(&self) -> Option<&str> {
        self.payload.as_ref()?.plain_token.as_deref()
    }

    fn object(&self) -> Option<&ZoomPresenceObject> {
        self.payload.as_ref()?.object.as_ref()
    }

    pub fn presence_status(&self) -> Option<&str> {
        self.object()?
            .presence_status
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.object()?.email.as_deref()
    }
}

/// One presence change, as handed to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    pub presence_status: String,
    pub email: String,
    pub verification_token: Option<String>,
}

impl PresenceEvent {
    /// Build an event from a webhook body and the `Authorization` header.
    ///
    /// Returns `None` when the body carries no presence status. A missing
    /// email becomes an empty string, which never matches the allow-list.
    pub fn from_webhook(webhook: &ZoomWebhook, verification_token: Option<&str>) -> Option<Self> {
        let presence_status = webhook.presence_status()?;

        Some(Self {
            presence_status: presence_status.to_string(),
            email: webhook.email().unwrap_or_default().to_string(),
            verification_token: verification_token.map(str::to_string),
        })
    }
}
