//! Slack workspace records and the verification-token resolver.
//!
//! Workspaces are loaded once at startup, either from a JSON file or from
//! numbered environment variables, and never change afterwards.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{non_empty, Config};
use crate::error::RelayError;

/// Literal Slack status applied for one presence state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusTemplate {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub emoji: String,
}

impl StatusTemplate {
    pub fn new(text: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emoji: emoji.into(),
        }
    }
}

/// One Slack destination with its own tokens and status templates.
#[derive(Clone, Deserialize)]
pub struct Workspace {
    /// Display name, only used in logs
    pub name: String,
    /// Slack user token used for every Web API call
    pub slack_token: String,
    /// Zoom verification token sent in the webhook `Authorization` header
    pub verification_token: String,
    /// Snooze length in minutes; zero or negative disables DND toggling
    #[serde(default)]
    pub dnd_num_minutes: i64,
    #[serde(default)]
    pub meeting_status: StatusTemplate,
    #[serde(default)]
    pub no_meeting_status: StatusTemplate,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("name", &self.name)
            .field("slack_token", &"<redacted>")
            .field("verification_token", &"<redacted>")
            .field("dnd_num_minutes", &self.dnd_num_minutes)
            .field("meeting_status", &self.meeting_status)
            .field("no_meeting_status", &self.no_meeting_status)
            .finish()
    }
}

/// Immutable list of configured workspaces.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceRegistry {
    workspaces: Vec<Workspace>,
}

impl WorkspaceRegistry {
    pub fn new(workspaces: Vec<Workspace>) -> Self {
        Self { workspaces }
    }

    /// Find the workspace whose verification token matches.
    ///
    /// Linear scan, first match wins. Duplicated tokens are a configuration
    /// mistake and are not detected.
    pub fn resolve(&self, verification_token: Option<&str>) -> Result<&Workspace, RelayError> {
        let token = verification_token.ok_or(RelayError::UnknownWorkspace)?;

        self.workspaces
            .iter()
            .find(|w| w.verification_token == token)
            .ok_or(RelayError::UnknownWorkspace)
    }

    pub fn names(&self) -> Vec<&str> {
        self.workspaces.iter().map(|w| w.name.as_str()).collect()
    }
}

const SLACK_TOKEN_PREFIX: &str = "SLACK_TOKEN";
const VERIFICATION_TOKEN_PREFIX: &str = "ZOOM_VERIFICATION_TOKEN";

/// Load workspaces from `WORKSPACES_FILE` if set, else from numbered env vars.
pub fn load_workspaces(config: &Config) -> Result<WorkspaceRegistry> {
    let workspaces = match &config.workspaces_file {
        Some(path) => {
            let workspaces = load_from_file(path)?;
            info!(
                path = %path.display(),
                count = workspaces.len(),
                "workspaces_loaded_from_file"
            );
            workspaces
        }
        None => {
            let workspaces = load_from_env(
                SLACK_TOKEN_PREFIX,
                VERIFICATION_TOKEN_PREFIX,
                config.default_dnd_minutes,
            );
            info!(count = workspaces.len(), "workspaces_loaded_from_env");
            workspaces
        }
    };

    if workspaces.is_empty() {
        warn!("no_workspaces_configured");
    }

    Ok(WorkspaceRegistry::new(workspaces))
}

fn load_from_file(path: &Path) -> Result<Vec<Workspace>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read workspaces file {}", path.display()))?;

    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse workspaces file {}", path.display()))
}

/// Build workspaces from `<slack_prefix>_<n>` / `<verification_prefix>_<n>`
/// pairs, stopping at the first index where either is missing.
fn load_from_env(slack_prefix: &str, verification_prefix: &str, dnd_num_minutes: i64) -> Vec<Workspace> {
    let mut workspaces = Vec::new();

    for n in 1.. {
        let slack_token = non_empty(&format!("{}_{}", slack_prefix, n));
        let verification_token = non_empty(&format!("{}_{}", verification_prefix, n));

        match (slack_token, verification_token) {
            (Some(slack_token), Some(verification_token)) => workspaces.push(Workspace {
                name: format!("Workspace {}", n),
                slack_token,
                verification_token,
                dnd_num_minutes,
                meeting_status: StatusTemplate::new("On a Zoom Call", ":slack_call:"),
                no_meeting_status: StatusTemplate::default(),
            }),
            (None, None) => break,
            _ => {
                warn!(index = n, "workspace_env_pair_incomplete");
                break;
            }
        }
    }

    workspaces
}
