//! Presence relay - the path from one Zoom presence event to Slack.
//!
//! ## Processing Flow
//!
//! ```text
//! PresenceEvent → resolve workspace → allow-list check → Slack user lookup
//!               → map presence → profile update ∥ DND toggle
//! ```
//!
//! Each event is handled start to finish with no retries and no shared
//! state besides the read-only workspace list.

use std::sync::Arc;

use futures::future::join;
use tracing::info;

use crate::allow_list::AllowListStore;
use crate::error::RelayError;
use crate::presence::PresenceEvent;
use crate::slack::SlackClient;
use crate::status::{map_presence, DndAction, StatusChange};
use crate::workspace::{Workspace, WorkspaceRegistry};

/// Summary of a successful relay, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub workspace: String,
    pub in_meeting: bool,
    pub dnd: Option<DndAction>,
}

pub struct StatusRelay {
    workspaces: WorkspaceRegistry,
    allow_list: Arc<dyn AllowListStore>,
    slack: SlackClient,
    meeting_presence: String,
}

impl StatusRelay {
    pub fn new(
        workspaces: WorkspaceRegistry,
        allow_list: Arc<dyn AllowListStore>,
        slack: SlackClient,
        meeting_presence: impl Into<String>,
    ) -> Self {
        Self {
            workspaces,
            allow_list,
            slack,
            meeting_presence: meeting_presence.into(),
        }
    }

    /// Relay one presence event to the matching Slack workspace.
    pub async fn relay(&self, event: &PresenceEvent) -> Result<RelayOutcome, RelayError> {
        let workspace = self
            .workspaces
            .resolve(event.verification_token.as_deref())?;

        let allowed = self
            .allow_list
            .contains(&event.email)
            .await
            .map_err(RelayError::AllowList)?;

        if !allowed {
            info!(workspace = %workspace.name, "relay_email_not_allowed");
            return Err(RelayError::EmailNotAllowed {
                workspace: workspace.name.clone(),
            });
        }

        let user_id = self
            .slack
            .lookup_user_id(&workspace.slack_token, &event.email)
            .await?;

        let change = map_presence(&event.presence_status, &self.meeting_presence, workspace);

        info!(
            workspace = %workspace.name,
            presence_status = %event.presence_status,
            in_meeting = change.in_meeting,
            dnd = ?change.dnd,
            "relay_dispatch_start"
        );

        self.dispatch(workspace, &user_id, &change).await?;

        Ok(RelayOutcome {
            workspace: workspace.name.clone(),
            in_meeting: change.in_meeting,
            dnd: change.dnd,
        })
    }

    /// Run the profile update and the optional DND call side by side.
    ///
    /// Both calls always run to completion. The profile error wins when both
    /// fail.
    async fn dispatch(
        &self,
        workspace: &Workspace,
        user_id: &str,
        change: &StatusChange<'_>,
    ) -> Result<(), RelayError> {
        let profile = self.slack.set_profile_status(
            &workspace.name,
            &workspace.slack_token,
            user_id,
            change.status,
        );

        let dnd = async {
            match change.dnd {
                Some(DndAction::Snooze { minutes }) => {
                    self.slack
                        .set_snooze(&workspace.name, &workspace.slack_token, minutes)
                        .await
                }
                Some(DndAction::EndSnooze) => {
                    self.slack
                        .end_snooze(&workspace.name, &workspace.slack_token)
                        .await
                }
                None => Ok(()),
            }
        };

        let (profile, dnd) = join(profile, dnd).await;
        profile?;
        dnd?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allow_list::memory::MemoryAllowList;
    use crate::workspace::tests::workspace;
    use mockito::{Matcher, Mock, ServerGuard};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn relay_with(
        server: &ServerGuard,
        allow_list: Arc<MemoryAllowList>,
        workspaces: Vec<Workspace>,
    ) -> StatusRelay {
        let slack = SlackClient::new(reqwest::Client::new(), &format!("{}/", server.url())).unwrap();
        StatusRelay::new(
            WorkspaceRegistry::new(workspaces),
            allow_list,
            slack,
            "In_Meeting",
        )
    }

    fn event(presence: &str, email: &str, token: &str) -> PresenceEvent {
        PresenceEvent {
            presence_status: presence.to_string(),
            email: email.to_string(),
            verification_token: Some(token.to_string()),
        }
    }

    async fn mock_lookup(server: &mut ServerGuard, expect: usize) -> Mock {
        server
            .mock("GET", "/users.lookupByEmail")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": true, "user": {"id": "U42"}}"#)
            .expect(expect)
            .create_async()
            .await
    }

    async fn mock_method(server: &mut ServerGuard, path: &str, expect: usize) -> Mock {
        server
            .mock("POST", path)
            .with_body(r#"{"ok": true}"#)
            .expect(expect)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_meeting_event_updates_status_and_snoozes() {
        let mut server = mockito::Server::new_async().await;
        let lookup = server
            .mock("GET", "/users.lookupByEmail")
            .match_query(Matcher::UrlEncoded("email".into(), "a@x.com".into()))
            .match_header("authorization", "Bearer xoxp-W")
            .with_body(r#"{"ok": true, "user": {"id": "U42"}}"#)
            .create_async()
            .await;
        let profile = server
            .mock("POST", "/users.profile.set")
            .match_header("authorization", "Bearer xoxp-W")
            .match_body(Matcher::Json(json!({
                "user": "U42",
                "profile": {
                    "status_text": "On a Zoom Call",
                    "status_emoji": ":slack_call:",
                    "status_expiration": 0
                }
            })))
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;
        let snooze = server
            .mock("POST", "/dnd.setSnooze")
            .match_body(Matcher::UrlEncoded("num_minutes".into(), "60".into()))
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;
        let end = mock_method(&mut server, "/dnd.endSnooze", 0).await;

        let relay = relay_with(
            &server,
            Arc::new(MemoryAllowList::with(&["a@x.com"])),
            vec![workspace("W", "tok1", 60)],
        );

        let outcome = relay
            .relay(&event("In_Meeting", "a@x.com", "tok1"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RelayOutcome {
                workspace: "W".to_string(),
                in_meeting: true,
                dnd: Some(DndAction::Snooze { minutes: 60 }),
            }
        );
        lookup.assert_async().await;
        profile.assert_async().await;
        snooze.assert_async().await;
        end.assert_async().await;
    }

    #[tokio::test]
    async fn test_leaving_meeting_clears_status_and_ends_snooze() {
        let mut server = mockito::Server::new_async().await;
        let lookup = mock_lookup(&mut server, 1).await;
        let profile = server
            .mock("POST", "/users.profile.set")
            .match_body(Matcher::PartialJson(json!({
                "profile": {"status_text": "", "status_emoji": ""}
            })))
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;
        let snooze = mock_method(&mut server, "/dnd.setSnooze", 0).await;
        let end = mock_method(&mut server, "/dnd.endSnooze", 1).await;

        let relay = relay_with(
            &server,
            Arc::new(MemoryAllowList::with(&["a@x.com"])),
            vec![workspace("W", "tok1", 60)],
        );

        let outcome = relay
            .relay(&event("Available", "a@x.com", "tok1"))
            .await
            .unwrap();

        assert!(!outcome.in_meeting);
        assert_eq!(outcome.dnd, Some(DndAction::EndSnooze));
        lookup.assert_async().await;
        profile.assert_async().await;
        snooze.assert_async().await;
        end.assert_async().await;
    }

    #[tokio::test]
    async fn test_zero_dnd_minutes_skips_dnd_calls() {
        let mut server = mockito::Server::new_async().await;
        let _lookup = mock_lookup(&mut server, 2).await;
        let profile = mock_method(&mut server, "/users.profile.set", 2).await;
        let snooze = mock_method(&mut server, "/dnd.setSnooze", 0).await;
        let end = mock_method(&mut server, "/dnd.endSnooze", 0).await;

        let relay = relay_with(
            &server,
            Arc::new(MemoryAllowList::with(&["a@x.com"])),
            vec![workspace("W", "tok1", 0)],
        );

        relay.relay(&event("In_Meeting", "a@x.com", "tok1")).await.unwrap();
        relay.relay(&event("Available", "a@x.com", "tok1")).await.unwrap();

        profile.assert_async().await;
        snooze.assert_async().await;
        end.assert_async().await;
    }

    #[tokio::test]
    async fn test_email_not_allowed_issues_no_calls() {
        let mut server = mockito::Server::new_async().await;
        let lookup = mock_lookup(&mut server, 0).await;
        let profile = mock_method(&mut server, "/users.profile.set", 0).await;

        let relay = relay_with(
            &server,
            Arc::new(MemoryAllowList::with(&["someone@x.com"])),
            vec![workspace("W", "tok1", 60)],
        );

        for email in ["a@x.com", ""] {
            let err = relay
                .relay(&event("In_Meeting", email, "tok1"))
                .await
                .unwrap_err();
            assert!(matches!(err, RelayError::EmailNotAllowed { .. }));
        }

        lookup.assert_async().await;
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_token_skips_allow_list() {
        let mut server = mockito::Server::new_async().await;
        let profile = mock_method(&mut server, "/users.profile.set", 0).await;
        let allow_list = Arc::new(MemoryAllowList::with(&["a@x.com"]));

        let relay = relay_with(&server, allow_list.clone(), vec![workspace("W", "tok1", 60)]);

        let err = relay
            .relay(&event("In_Meeting", "a@x.com", "nope"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::UnknownWorkspace));
        assert_eq!(allow_list.reads.load(Ordering::SeqCst), 0);
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn test_allow_list_failure_fails_request() {
        let mut server = mockito::Server::new_async().await;
        let lookup = mock_lookup(&mut server, 0).await;

        let relay = relay_with(
            &server,
            Arc::new(MemoryAllowList::failing()),
            vec![workspace("W", "tok1", 60)],
        );

        let err = relay
            .relay(&event("In_Meeting", "a@x.com", "tok1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::AllowList(_)));
        lookup.assert_async().await;
    }

    #[tokio::test]
    async fn test_profile_failure_still_runs_dnd() {
        let mut server = mockito::Server::new_async().await;
        let _lookup = mock_lookup(&mut server, 1).await;
        server
            .mock("POST", "/users.profile.set")
            .with_body(r#"{"ok": false, "error": "not_allowed_token_type"}"#)
            .create_async()
            .await;
        let snooze = mock_method(&mut server, "/dnd.setSnooze", 1).await;

        let relay = relay_with(
            &server,
            Arc::new(MemoryAllowList::with(&["a@x.com"])),
            vec![workspace("W", "tok1", 30)],
        );

        let err = relay
            .relay(&event("In_Meeting", "a@x.com", "tok1"))
            .await
            .unwrap_err();

        match err {
            RelayError::Slack { method, error } => {
                assert_eq!(method, "users.profile.set");
                assert_eq!(error, "not_allowed_token_type");
            }
            other => panic!("Expected Slack error, got {:?}", other),
        }
        snooze.assert_async().await;
    }

    #[tokio::test]
    async fn test_dnd_failure_fails_relay() {
        let mut server = mockito::Server::new_async().await;
        let _lookup = mock_lookup(&mut server, 1).await;
        let profile = mock_method(&mut server, "/users.profile.set", 1).await;
        let snooze = server
            .mock("POST", "/dnd.setSnooze")
            .with_body(r#"{"ok": false, "error": "missing_scope"}"#)
            .expect(1)
            .create_async()
            .await;

        let relay = relay_with(
            &server,
            Arc::new(MemoryAllowList::with(&["a@x.com"])),
            vec![workspace("W", "tok1", 30)],
        );

        let err = relay
            .relay(&event("In_Meeting", "a@x.com", "tok1"))
            .await
            .unwrap_err();

        match err {
            RelayError::Slack { method, error } => {
                assert_eq!(method, "dnd.setSnooze");
                assert_eq!(error, "missing_scope");
            }
            other => panic!("Expected Slack error, got {:?}", other),
        }
        profile.assert_async().await;
        snooze.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_failure_stops_dispatch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users.lookupByEmail")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": false, "error": "users_not_found"}"#)
            .create_async()
            .await;
        let profile = mock_method(&mut server, "/users.profile.set", 0).await;

        let relay = relay_with(
            &server,
            Arc::new(MemoryAllowList::with(&["a@x.com"])),
            vec![workspace("W", "tok1", 60)],
        );

        let err = relay
            .relay(&event("In_Meeting", "a@x.com", "tok1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Slack { method: "users.lookupByEmail", .. }));
        profile.assert_async().await;
    }
}
