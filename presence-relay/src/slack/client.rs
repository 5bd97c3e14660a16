//! Slack Web API client for status and do-not-disturb updates.

use reqwest::{Client, RequestBuilder};
use tracing::{info, warn};
use url::Url;

use super::types::{
    Profile, ProfileSetRequest, SlackResponse, DND_END_SNOOZE, DND_SET_SNOOZE, LOOKUP_BY_EMAIL,
    PROFILE_SET, SNOOZE_NOT_ACTIVE,
};
use crate::error::RelayError;
use crate::workspace::StatusTemplate;

/// Thin client over the handful of Web API methods the relay needs.
///
/// Cheap to clone; clones share the underlying connection pool. No timeout
/// is configured beyond reqwest's defaults.
#[derive(Clone)]
pub struct SlackClient {
    http: Client,
    base_url: Url,
}

impl SlackClient {
    /// `base_url` must end with `/` so method names join under it.
    pub fn new(http: Client, base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    fn method_url(&self, method: &'static str) -> Result<Url, RelayError> {
        self.base_url.join(method).map_err(|e| RelayError::Slack {
            method,
            error: format!("invalid api url: {}", e),
        })
    }

    /// Send a request and turn `{"ok": false}` replies into errors.
    async fn send(
        &self,
        method: &'static str,
        request: RequestBuilder,
    ) -> Result<SlackResponse, RelayError> {
        let response = request
            .send()
            .await
            .map_err(|source| RelayError::Http { method, source })?;

        let status = response.status().as_u16();

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|source| RelayError::Http { method, source })?;

        if !body.ok {
            let error = body.error.unwrap_or_else(|| format!("http_{}", status));
            return Err(RelayError::Slack { method, error });
        }

        Ok(body)
    }

    /// Resolve an email to a Slack user id.
    pub async fn lookup_user_id(&self, token: &str, email: &str) -> Result<String, RelayError> {
        let url = self.method_url(LOOKUP_BY_EMAIL)?;
        let request = self.http.get(url).bearer_auth(token).query(&[("email", email)]);

        let body = self.send(LOOKUP_BY_EMAIL, request).await?;

        body.user.map(|u| u.id).ok_or_else(|| RelayError::Slack {
            method: LOOKUP_BY_EMAIL,
            error: "user missing from response".to_string(),
        })
    }

    /// Set the profile status text and emoji.
    pub async fn set_profile_status(
        &self,
        workspace: &str,
        token: &str,
        user_id: &str,
        status: &StatusTemplate,
    ) -> Result<(), RelayError> {
        let url = self.method_url(PROFILE_SET)?;
        let body = ProfileSetRequest {
            user: user_id,
            profile: Profile {
                status_text: &status.text,
                status_emoji: &status.emoji,
                status_expiration: 0,
            },
        };

        self.send(PROFILE_SET, self.http.post(url).bearer_auth(token).json(&body))
            .await?;

        info!(
            workspace = workspace,
            status_text = %status.text,
            status_emoji = %status.emoji,
            "slack_status_updated"
        );

        Ok(())
    }

    /// Turn on do-not-disturb for `num_minutes` from now.
    pub async fn set_snooze(
        &self,
        workspace: &str,
        token: &str,
        num_minutes: i64,
    ) -> Result<(), RelayError> {
        let url = self.method_url(DND_SET_SNOOZE)?;
        let minutes = num_minutes.to_string();
        let request = self
            .http
            .post(url)
            .bearer_auth(token)
            .form(&[("num_minutes", minutes.as_str())]);

        self.send(DND_SET_SNOOZE, request).await?;

        info!(workspace = workspace, num_minutes = num_minutes, "slack_dnd_snoozed");

        Ok(())
    }

    /// End the current snooze. Having no active snooze is not a failure.
    pub async fn end_snooze(&self, workspace: &str, token: &str) -> Result<(), RelayError> {
        let url = self.method_url(DND_END_SNOOZE)?;
        let request = self
            .http
            .post(url)
            .bearer_auth(token)
            .form(&[] as &[(&str, &str)]);

        match self.send(DND_END_SNOOZE, request).await {
            Ok(_) => {
                info!(workspace = workspace, "slack_dnd_snooze_ended");
                Ok(())
            }
            Err(RelayError::Slack { error, .. }) if error == SNOOZE_NOT_ACTIVE => {
                warn!(workspace = workspace, "slack_dnd_snooze_not_active");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
