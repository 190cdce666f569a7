//! Undo of recent vendor-sourced actions.
//!
//! The most recent invertible vendor event within the undo window is
//! located in the entry's history and inverted. User-sourced actions,
//! `edit` events written by the restructure, and `undo` itself are never
//! inverted. Re-entry after undo of `remove`/`next` lands at the
//! recorded position; the restructure triggered by the undo repairs any
//! resulting lane collision.

use rusqlite::Transaction;

use super::lane;
use crate::error::{Error, Result};
use crate::model::{EntryStatus, HistoryAction, HistoryEvent, QueueEntry};
use crate::store::entries;

pub(crate) fn apply_undo(
    tx: &Transaction,
    entry: &mut QueueEntry,
    now: u64,
    window_ms: u64,
) -> Result<()> {
    let event = entry
        .last_undoable_event()
        .cloned()
        .ok_or_else(|| Error::FailedPrecondition("no undoable action".to_string()))?;

    if now.saturating_sub(event.at) > window_ms {
        return Err(Error::InvalidArgument(
            "the undo window for the last action has elapsed".to_string(),
        ));
    }

    match event.action {
        HistoryAction::Skip => undo_skip(tx, entry, &event, now)?,
        HistoryAction::Hold => {
            require_status(entry, EntryStatus::Hold, "hold")?;
            entry.status = EntryStatus::InQueue;
        }
        HistoryAction::Unhold => {
            require_status(entry, EntryStatus::InQueue, "unhold")?;
            entry.status = EntryStatus::Hold;
        }
        HistoryAction::Remove => {
            require_status(entry, EntryStatus::Removed, "remove")?;
            entry.status = EntryStatus::InQueue;
            if let Some(prev) = event.prev_position {
                entry.current_position = prev;
            }
            if let Some(est) = event.est_wait {
                entry.est_wait = est;
            }
        }
        HistoryAction::Next => {
            require_status(entry, EntryStatus::Completed, "next")?;
            entry.status = EntryStatus::InQueue;
            entry.current_position = event.prev_position.unwrap_or(1);
            if let Some(est) = event.est_wait {
                entry.est_wait = est;
            }
        }
        HistoryAction::AddTime => {
            let added = event.added_time.unwrap_or(0);
            entry.added_time = entry.added_time.saturating_sub(added);
            entry.est_wait = entry.est_wait.saturating_sub(added);
            entry.est_service_start_time = entry
                .est_service_start_time
                .saturating_sub(added as u64 * lane::MINUTE_MS);
        }
        HistoryAction::Edit | HistoryAction::Undo => {
            return Err(Error::Internal(
                "non-invertible event selected for undo".to_string(),
            ));
        }
    }

    Ok(())
}

fn require_status(entry: &QueueEntry, expected: EntryStatus, action: &str) -> Result<()> {
    if entry.status != expected {
        return Err(Error::FailedPrecondition(format!(
            "cannot undo {}: entry status changed to {}",
            action,
            entry.status.as_str()
        )));
    }
    Ok(())
}

/// Swap the positions back, but only when the counterpart entry still
/// sits at the recorded position.
fn undo_skip(
    tx: &Transaction,
    entry: &mut QueueEntry,
    event: &HistoryEvent,
    now: u64,
) -> Result<()> {
    let prev = event.prev_position.ok_or_else(|| {
        Error::FailedPrecondition("skip event is missing its recorded position".to_string())
    })?;

    let mut lane_entries = entries::live_lane(tx, &entry.business_id, &entry.helper_id)?;
    let self_idx = lane_entries.iter().position(|e| e.id == entry.id);
    let counterpart_idx = lane_entries
        .iter()
        .position(|e| e.id != entry.id && e.current_position == prev)
        .filter(|&idx| lane_entries[idx].status == EntryStatus::InQueue);

    let (Some(self_idx), Some(counterpart_idx)) = (self_idx, counterpart_idx) else {
        return Err(Error::FailedPrecondition(
            "cannot undo skip: the swapped entry is no longer at the recorded position"
                .to_string(),
        ));
    };

    let own_pos = lane_entries[self_idx].current_position;
    lane_entries[self_idx].current_position = prev;
    lane_entries[counterpart_idx].current_position = own_pos;

    lane_entries.sort_by_key(|e| e.current_position);
    let durations = lane::durations_for_business(tx, &entry.business_id)?;
    lane::apply_etas(&mut lane_entries, &durations, now);

    for updated in &lane_entries {
        if updated.id == entry.id {
            entry.current_position = updated.current_position;
            entry.est_wait = updated.est_wait;
            entry.est_service_start_time = updated.est_service_start_time;
        } else {
            entries::update(tx, updated)?;
        }
    }

    Ok(())
}
