//! Queue entries and their append-only history log.

use serde::{Deserialize, Serialize};

use super::{Gender, UserRef};

/// Entry status. `in_queue`, `hold`, and `skipped` are the live statuses
/// that occupy a lane position; `completed` and `removed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    InQueue,
    Hold,
    Skipped,
    Completed,
    Removed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::InQueue => "in_queue",
            EntryStatus::Hold => "hold",
            EntryStatus::Skipped => "skipped",
            EntryStatus::Completed => "completed",
            EntryStatus::Removed => "removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_queue" => Some(EntryStatus::InQueue),
            "hold" => Some(EntryStatus::Hold),
            "skipped" => Some(EntryStatus::Skipped),
            "completed" => Some(EntryStatus::Completed),
            "removed" => Some(EntryStatus::Removed),
            _ => None,
        }
    }

    /// True for statuses that occupy a lane position.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            EntryStatus::InQueue | EntryStatus::Hold | EntryStatus::Skipped
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Removed)
    }
}

/// Helper preference recorded at enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    Any,
    Specific,
}

impl Preference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Any => "any",
            Preference::Specific => "specific",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Preference::Any),
            "specific" => Some(Preference::Specific),
            _ => None,
        }
    }
}

/// Action recorded in an entry's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Skip,
    Hold,
    Unhold,
    Remove,
    Next,
    AddTime,
    Edit,
    Undo,
}

impl HistoryAction {
    /// True for actions that `undo` can invert.
    pub fn is_invertible(&self) -> bool {
        !matches!(self, HistoryAction::Edit | HistoryAction::Undo)
    }
}

/// Who performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    User,
    Vendor,
}

/// One event in an entry's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub action: HistoryAction,
    pub source: ActionSource,
    /// UTC milliseconds.
    pub at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub est_wait: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newly_assigned_helper_id: Option<String>,
}

impl HistoryEvent {
    pub fn new(action: HistoryAction, source: ActionSource, at: u64) -> Self {
        Self {
            action,
            source,
            at,
            prev_position: None,
            new_position: None,
            added_time: None,
            est_wait: None,
            newly_assigned_helper_id: None,
        }
    }
}

/// A queue entry: one customer waiting for one service with one helper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: String,
    pub business_id: String,
    pub helper_id: String,
    pub user_ref: UserRef,
    pub service_id: String,
    pub gender: Gender,
    pub preference: Preference,
    /// Position assigned at enqueue; never mutated afterwards.
    pub joining_position: u32,
    pub current_position: u32,
    /// UTC milliseconds when the customer joined.
    pub joining_time: u64,
    pub created_at: u64,
    pub est_service_start_time: u64,
    /// Estimated wait in minutes.
    pub est_wait: u32,
    /// Accumulated add_time overlay in minutes.
    #[serde(default)]
    pub added_time: u32,
    pub status: EntryStatus,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEvent>,
}

impl QueueEntry {
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    pub fn push_history(&mut self, event: HistoryEvent) {
        self.history.push(event);
    }

    /// Most recent vendor-sourced invertible event that has not already
    /// been consumed by an undo. Each `undo` event in the history
    /// consumes the invertible event preceding it, so scanning newest
    /// first skips one invertible event per undo seen.
    pub fn last_undoable_event(&self) -> Option<&HistoryEvent> {
        let mut consumed = 0usize;
        for event in self.history.iter().rev() {
            if event.source != ActionSource::Vendor {
                continue;
            }
            match event.action {
                HistoryAction::Undo => consumed += 1,
                HistoryAction::Edit => {}
                _ => {
                    if consumed == 0 {
                        return Some(event);
                    }
                    consumed -= 1;
                }
            }
        }
        None
    }
}
