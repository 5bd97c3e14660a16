//! Presence Relay - Zoom presence to Slack status.
//!
//! This library backs the `presence-relay` server binary:
//! - Receives Zoom "presence status updated" webhooks
//! - Resolves the Slack workspace from the verification token
//! - Checks the email against the Postgres allow-list
//! - Sets the Slack status and toggles do-not-disturb
//!
//! ## Architecture
//!
//! ```text
//! Zoom webhook → Web Server → StatusRelay → Slack Web API
//!                    ↑             ↓
//!           allow-list API ↔ users table
//! ```

pub mod allow_list;
pub mod config;
pub mod db;
pub mod error;
pub mod presence;
pub mod relay;
pub mod slack;
pub mod status;
pub mod web;
pub mod workspace;

// Re-export commonly used types
pub use allow_list::{AllowListStore, PgAllowList};
pub use config::Config;
pub use error::{ApiError, RelayError};
pub use presence::{PresenceEvent, ZoomWebhook};
pub use relay::{RelayOutcome, StatusRelay};
pub use slack::SlackClient;
pub use web::AppState;
pub use workspace::{load_workspaces, Workspace, WorkspaceRegistry};
