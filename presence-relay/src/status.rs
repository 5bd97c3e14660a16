//! Presence to Slack status mapping.

use crate::workspace::{StatusTemplate, Workspace};

/// Do-not-disturb call to make alongside the profile update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DndAction {
    /// `dnd.setSnooze` for the given number of minutes
    Snooze { minutes: i64 },
    /// `dnd.endSnooze`
    EndSnooze,
}

/// What a presence event turns into for one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange<'a> {
    pub in_meeting: bool,
    pub status: &'a StatusTemplate,
    pub dnd: Option<DndAction>,
}

/// Map a presence value onto the workspace's templates.
///
/// Only an exact match with `meeting_presence` counts as being in a meeting;
/// every other presence value, known or not, selects the non-meeting status.
pub fn map_presence<'a>(
    presence_status: &str,
    meeting_presence: &str,
    workspace: &'a Workspace,
) -> StatusChange<'a> {
    let in_meeting = presence_status == meeting_presence;

    let status = if in_meeting {
        &workspace.meeting_status
    } else {
        &workspace.no_meeting_status
    };

    let dnd = match (workspace.dnd_num_minutes > 0, in_meeting) {
        (false, _) => None,
        (true, true) => Some(DndAction::Snooze {
            minutes: workspace.dnd_num_minutes,
        }),
        (true, false) => Some(DndAction::EndSnooze),
    };

    StatusChange {
        in_meeting,
        status,
        dnd,
    }
}
