//! Slack Web API request and response bodies.

use serde::{Deserialize, Serialize};

pub const PROFILE_SET: &str = "users.profile.set";
pub const LOOKUP_BY_EMAIL: &str = "users.lookupByEmail";
pub const DND_SET_SNOOZE: &str = "dnd.setSnooze";
pub const DND_END_SNOOZE: &str = "dnd.endSnooze";

/// Error Slack returns from `dnd.endSnooze` when nothing is snoozed.
pub const SNOOZE_NOT_ACTIVE: &str = "snooze_not_active";

/// Envelope shared by every Web API method.
#[derive(Debug, Default, Deserialize)]
pub struct SlackResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user: Option<SlackUser>,
}

#[derive(Debug, Deserialize)]
pub struct SlackUser {
    pub id: String,
}

/// `users.profile.set` body.
#[derive(Debug, Serialize)]
pub struct ProfileSetRequest<'a> {
    pub user: &'a str,
    pub profile: Profile<'a>,
}

#[derive(Debug, Serialize)]
pub struct Profile<'a> {
    pub status_text: &'a str,
    pub status_emoji: &'a str,
    /// 0 keeps the status until the next update
    pub status_expiration: i64,
}
