//! Per-entry action state machine.
//!
//! One entry point, `apply_action`, enforces authorization first, then
//! the per-action preconditions, all inside a transaction scoped to the
//! entry's business. Committing the action triggers a restructure over
//! the configured horizon as a separate transaction.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::engine::Engine;
use super::lane;
use super::validation;
use crate::error::{Error, Result};
use crate::identity::{Principal, Role};
use crate::model::{
    ActionSource, Business, EntryStatus, HistoryAction, HistoryEvent, QueueEntry,
};
use crate::store::{businesses, entries};

/// Actions accepted by `apply_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    Skip,
    Hold,
    Unhold,
    Remove,
    Next,
    AddTime,
    Undo,
}

/// Action request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActionRequest {
    pub queue_id: String,
    pub action: QueueAction,
    #[serde(default)]
    pub added_time: Option<u32>,
}

impl Engine {
    /// Apply one action to one entry and return the updated record.
    pub async fn apply_action(
        &self,
        principal: &Principal,
        req: ActionRequest,
    ) -> Result<QueueEntry> {
        validation::validate_non_empty(&req.queue_id, "queueId")?;

        // The business id decides which mutex serializes this write.
        let business_id = self
            .read(|conn| entries::require(conn, &req.queue_id))?
            .business_id;

        let now = self.now();
        let undo_window_ms = self.settings.undo_window_ms;

        let updated = self
            .with_business_tx(&business_id, |tx| {
                let mut entry = entries::require(tx, &req.queue_id)?;
                let business = businesses::require(tx, &entry.business_id)?;
                let source = authorize_action(&business, principal, &entry, req.action)?;

                let mut event = HistoryEvent::new(history_action(req.action), source, now);
                event.prev_position = Some(entry.current_position);
                event.est_wait = Some(entry.est_wait);

                match req.action {
                    QueueAction::Skip => {
                        apply_skip(tx, &mut entry, &mut event, now)?;
                    }
                    QueueAction::Hold => {
                        require_status(&entry, EntryStatus::InQueue, "hold")?;
                        entry.status = EntryStatus::Hold;
                        event.new_position = Some(entry.current_position);
                    }
                    QueueAction::Unhold => {
                        require_status(&entry, EntryStatus::Hold, "unhold")?;
                        entry.status = EntryStatus::InQueue;
                        event.new_position = Some(entry.current_position);
                    }
                    QueueAction::Remove => {
                        if entry.status.is_terminal() {
                            return Err(Error::FailedPrecondition(format!(
                                "entry is already {}",
                                entry.status.as_str()
                            )));
                        }
                        entry.status = EntryStatus::Removed;
                    }
                    QueueAction::Next => {
                        require_status(&entry, EntryStatus::InQueue, "next")?;
                        if entry.current_position != 1 {
                            return Err(Error::FailedPrecondition(
                                "only the entry at position 1 can be completed".to_string(),
                            ));
                        }
                        entry.status = EntryStatus::Completed;
                    }
                    QueueAction::AddTime => {
                        let added = validation::validate_added_time(req.added_time)?;
                        if !entry.is_live() {
                            return Err(Error::FailedPrecondition(format!(
                                "cannot add time to a {} entry",
                                entry.status.as_str()
                            )));
                        }
                        entry.added_time += added;
                        entry.est_wait += added;
                        entry.est_service_start_time += added as u64 * lane::MINUTE_MS;
                        event.added_time = Some(added);
                        event.new_position = Some(entry.current_position);
                    }
                    QueueAction::Undo => {
                        super::undo::apply_undo(tx, &mut entry, now, undo_window_ms)?;
                        event.new_position = Some(entry.current_position);
                    }
                }

                entry.push_history(event);
                entries::update(tx, &entry)?;
                Ok(entry)
            })
            .await?;

        info!(
            queue_id = %req.queue_id,
            action = ?req.action,
            "applied queue action"
        );

        // Rebalance in its own transaction; the action above stands even
        // when the rebalance fails. The window covers everything up to
        // the horizon so entries enqueued earlier are rebalanced too.
        let horizon_end = now + self.settings.restructure_horizon_ms;
        if let Err(e) = self.restructure(&business_id, 0, horizon_end).await {
            warn!(
                business_id = %business_id,
                error = %e,
                "post-action restructure failed"
            );
        }

        Ok(updated)
    }
}

/// Map an accepted action to its history record.
fn history_action(action: QueueAction) -> HistoryAction {
    match action {
        QueueAction::Skip => HistoryAction::Skip,
        QueueAction::Hold => HistoryAction::Hold,
        QueueAction::Unhold => HistoryAction::Unhold,
        QueueAction::Remove => HistoryAction::Remove,
        QueueAction::Next => HistoryAction::Next,
        QueueAction::AddTime => HistoryAction::AddTime,
        QueueAction::Undo => HistoryAction::Undo,
    }
}

/// Authorization: a registered customer may only remove their own entry;
/// owners and accepted, active helpers may apply anything.
fn authorize_action(
    business: &Business,
    principal: &Principal,
    entry: &QueueEntry,
    action: QueueAction,
) -> Result<ActionSource> {
    match principal.role {
        Role::Customer => {
            let owns = entry.user_ref.registered_user_id() == Some(principal.id.as_str());
            if !owns {
                return Err(Error::Forbidden(
                    "customers may only act on their own entry".to_string(),
                ));
            }
            if action != QueueAction::Remove {
                return Err(Error::Forbidden(
                    "customers may only remove their entry".to_string(),
                ));
            }
            Ok(ActionSource::User)
        }
        Role::OwnerOrHelper => {
            Engine::authorize_vendor(business, principal)?;
            Ok(ActionSource::Vendor)
        }
    }
}

fn require_status(entry: &QueueEntry, expected: EntryStatus, action: &str) -> Result<()> {
    if entry.status != expected {
        return Err(Error::FailedPrecondition(format!(
            "{} requires a {} entry, found {}",
            action,
            expected.as_str(),
            entry.status.as_str()
        )));
    }
    Ok(())
}

/// Swap the entry with the next in-queue entry behind it and recompute
/// both ETAs (lane-wide, to keep overlay sums consistent).
fn apply_skip(
    tx: &rusqlite::Transaction,
    entry: &mut QueueEntry,
    event: &mut HistoryEvent,
    now: u64,
) -> Result<()> {
    require_status(entry, EntryStatus::InQueue, "skip")?;

    let mut lane_entries = entries::live_lane(tx, &entry.business_id, &entry.helper_id)?;
    let self_idx = lane_entries
        .iter()
        .position(|e| e.id == entry.id)
        .ok_or_else(|| Error::Internal("entry missing from its own lane".to_string()))?;
    let next_idx = lane::next_in_queue(&lane_entries, entry.current_position).ok_or_else(|| {
        Error::FailedPrecondition("no entry behind to skip past".to_string())
    })?;

    let own_pos = lane_entries[self_idx].current_position;
    let other_pos = lane_entries[next_idx].current_position;
    lane_entries[self_idx].current_position = other_pos;
    lane_entries[next_idx].current_position = own_pos;

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

    event.new_position = Some(other_pos);
    Ok(())
}
