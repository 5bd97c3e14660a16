//! Configuration module for environment variable parsing.
//!
//! Everything except the workspace list is read here. Workspaces are loaded
//! separately by [`crate::workspace::load_workspaces`] because that step can
//! fail on a malformed file.

use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::db::SslMode;

/// Presence value Zoom reports while a user is in a meeting.
pub const DEFAULT_MEETING_PRESENCE: &str = "In_Meeting";

/// Base URL of the Slack Web API. Method names are joined onto it.
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api/";

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Postgres connection URL for the allow-list table
    pub database_url: Option<String>,

    /// TLS mode for the Postgres pool
    pub database_ssl: SslMode,

    /// Static bearer credential for the allow-list endpoints
    pub api_key: Option<String>,

    /// Presence value that counts as "in a meeting"
    pub meeting_presence: String,

    /// Zoom app secret token used for URL validation and request signatures
    pub zoom_secret_token: Option<String>,

    /// Maximum age in seconds for Zoom signature timestamps
    pub zoom_signature_max_age: u64,

    /// Slack Web API base URL
    pub slack_api_base: String,

    /// Directory served as static assets
    pub assets_dir: PathBuf,

    /// Page returned for any GET path that matches no asset
    pub index_file: PathBuf,

    /// Optional JSON file listing the Slack workspaces
    pub workspaces_file: Option<PathBuf>,

    /// Snooze duration for workspaces built from numbered env vars
    pub default_dnd_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            database_url: non_empty("DATABASE_URL"),

            database_ssl: parse_ssl_mode("DATABASE_SSL"),

            api_key: non_empty("GW_STATUS_API_KEY"),

            meeting_presence: non_empty("ZOOM_MEETING_PRESENCE")
                .unwrap_or_else(|| DEFAULT_MEETING_PRESENCE.to_string()),

            zoom_secret_token: non_empty("ZOOM_WEBHOOK_SECRET_TOKEN"),

            zoom_signature_max_age: env::var("ZOOM_SIGNATURE_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300), // 5 minutes default

            slack_api_base: non_empty("SLACK_API_BASE")
                .map(|base| ensure_trailing_slash(&base))
                .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string()),

            assets_dir: non_empty("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets")),

            index_file: non_empty("INDEX_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("index.html")),

            workspaces_file: non_empty("WORKSPACES_FILE").map(PathBuf::from),

            default_dnd_minutes: parse_i64("DND_NUM_MINUTES", 60),
        }
    }
}

// Secrets stay out of log lines even when the whole config is printed.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url_set", &self.database_url.is_some())
            .field("database_ssl", &self.database_ssl)
            .field("api_key_set", &self.api_key.is_some())
            .field("meeting_presence", &self.meeting_presence)
            .field("zoom_secret_token_set", &self.zoom_secret_token.is_some())
            .field("zoom_signature_max_age", &self.zoom_signature_max_age)
            .field("slack_api_base", &self.slack_api_base)
            .field("assets_dir", &self.assets_dir)
            .field("index_file", &self.index_file)
            .field("workspaces_file", &self.workspaces_file)
            .field("default_dnd_minutes", &self.default_dnd_minutes)
            .finish()
    }
}

/// Read an env var, treating blank values as unset.
pub(crate) fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a signed integer, falling back to the default on bad input.
fn parse_i64(name: &str, default: i64) -> i64 {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid integer, using default");
            default
        }
    }
}

/// Unset means [`SslMode::Require`]; unknown values warn and keep it.
fn parse_ssl_mode(name: &str) -> SslMode {
    let raw = match non_empty(name) {
        Some(v) => v,
        None => return SslMode::default(),
    };

    SslMode::parse(&raw).unwrap_or_else(|| {
        warn!(env_var = name, value = %raw, "Invalid SSL mode, using require");
        SslMode::default()
    })
}

fn ensure_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}
