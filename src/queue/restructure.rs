//! The FCFS balancer.
//!
//! Reassigns live entries across active helpers and renumbers every
//! affected lane in one transaction. Running it twice back-to-back
//! produces no additional updates. Notification intents for material
//! changes are built under the transaction and handed to the notifier
//! only after commit.

use std::collections::{BTreeMap, HashMap};

use rusqlite::Transaction;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use super::engine::Engine;
use super::lane;
use super::validation;
use crate::error::Result;
use crate::model::{
    ActionSource, Business, EntryStatus, Helper, HistoryAction, HistoryEvent, Preference,
    QueueEntry,
};
use crate::notify::PushMessage;
use crate::store::{businesses, entries};

/// Outcome of one restructure run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureReport {
    pub updated_count: usize,
    pub notifications_sent: usize,
    pub active_helpers: usize,
    pub total_queues: usize,
}

/// Pre-change snapshot used for diffing and notification decisions.
struct Before {
    helper_id: String,
    position: u32,
    est_wait: u32,
}

impl Engine {
    /// Rebalance the business's live entries created in `[t0, t1]`.
    pub async fn restructure(
        &self,
        business_id: &str,
        t0: u64,
        t1: u64,
    ) -> Result<RestructureReport> {
        validation::validate_window(t0, t1)?;
        validation::validate_non_empty(business_id, "businessId")?;

        let now = self.now();
        let material_delta = self.settings.material_wait_delta_minutes;

        let (mut report, messages) = self
            .with_business_tx(business_id, |tx| {
                rebalance(tx, business_id, t0, t1, now, material_delta)
            })
            .await?;

        report.notifications_sent = messages.len();
        self.notifier.enqueue_batch(messages);

        info!(
            business_id = %business_id,
            updated = report.updated_count,
            notified = report.notifications_sent,
            "restructure complete"
        );
        Ok(report)
    }

    /// Restructure on behalf of an external caller. Vendor-only; the
    /// internal trigger path skips this check.
    pub async fn restructure_for(
        &self,
        principal: &crate::identity::Principal,
        business_id: &str,
        t0: u64,
        t1: u64,
    ) -> Result<RestructureReport> {
        self.read(|conn| {
            let business = businesses::require(conn, business_id)?;
            Engine::authorize_vendor(&business, principal)
        })?;
        self.restructure(business_id, t0, t1).await
    }
}

/// The eight-step rebalance, run inside one transaction.
fn rebalance(
    tx: &Transaction,
    business_id: &str,
    t0: u64,
    t1: u64,
    now: u64,
    material_delta: u32,
) -> Result<(RestructureReport, Vec<PushMessage>)> {
    // Step 1: gate on the business and its active helpers.
    let business = businesses::require(tx, business_id)?;
    let active: Vec<Helper> = business
        .scheduling_helpers()
        .into_iter()
        .cloned()
        .collect();

    if !business.active {
        // The break flow already notified; nothing to move.
        return Ok((
            RestructureReport {
                updated_count: 0,
                notifications_sent: 0,
                active_helpers: active.len(),
                total_queues: 0,
            },
            Vec::new(),
        ));
    }

    // Step 2: load the affected entries, FCFS.
    let all = entries::live_for_business_window(tx, business_id, t0, t1)?;

    if active.is_empty() {
        let messages = paused_messages(tx, &business, &all)?;
        return Ok((
            RestructureReport {
                updated_count: 0,
                notifications_sent: 0,
                active_helpers: 0,
                total_queues: 0,
            },
            messages,
        ));
    }

    let durations = lane::durations_for_business(tx, business_id)?;

    // Steps 3-5: classify each entry and fill per-helper buckets.
    // Pinned entries (heads, specifics, holds) land first; flexibles
    // then fill the shortest capable bucket in FCFS order.
    let mut before: HashMap<String, Before> = HashMap::with_capacity(all.len());
    let mut buckets: BTreeMap<String, Vec<QueueEntry>> = active
        .iter()
        .map(|h| (h.helper_id.clone(), Vec::new()))
        .collect();
    let mut flexible: Vec<QueueEntry> = Vec::new();

    for entry in all {
        let capable: Vec<&Helper> = active
            .iter()
            .filter(|h| h.supports(&entry.service_id))
            .collect();
        if capable.is_empty() {
            // No active helper performs this service; leave the group
            // untouched.
            debug!(
                entry_id = %entry.id,
                service_id = %entry.service_id,
                "no capable helper, leaving entry in place"
            );
            continue;
        }

        before.insert(
            entry.id.clone(),
            Before {
                helper_id: entry.helper_id.clone(),
                position: entry.current_position,
                est_wait: entry.est_wait,
            },
        );

        let current_is_capable = capable.iter().any(|h| h.helper_id == entry.helper_id);
        let first_capable = capable[0].helper_id.clone();

        let is_head = entry.current_position == 1 && entry.status == EntryStatus::InQueue;
        let is_specific = entry.preference == Preference::Specific && current_is_capable;
        let is_hold = entry.status == EntryStatus::Hold;

        if is_head || is_specific || is_hold {
            let target = if current_is_capable {
                entry.helper_id.clone()
            } else {
                first_capable
            };
            buckets.entry(target).or_default().push(entry);
        } else {
            flexible.push(entry);
        }
    }

    for entry in flexible {
        let mut target: Option<(usize, &str)> = None;
        for helper in active.iter().filter(|h| h.supports(&entry.service_id)) {
            let len = buckets.get(&helper.helper_id).map(|b| b.len()).unwrap_or(0);
            // active is id-ordered, so strict less-than keeps the
            // smallest id on ties
            match target {
                Some((shortest, _)) if len >= shortest => {}
                _ => target = Some((len, &helper.helper_id)),
            }
        }
        if let Some((_, helper_id)) = target {
            buckets.entry(helper_id.to_string()).or_default().push(entry);
        }
    }

    // Step 6: order each bucket and recompute positions and ETAs.
    // Entries staying in their lane keep their relative order; entries
    // arriving from another lane append in FCFS order. Live entries
    // outside the window (or without a capable helper) are pinned: they
    // keep their positions and the bucket fills the free slots around
    // them.
    let mut updated_count = 0;
    let mut total_queues = 0;
    let mut messages = Vec::new();

    for (helper_id, mut bucket) in buckets {
        if bucket.is_empty() {
            continue;
        }
        total_queues += 1;

        bucket.sort_by(|a, b| sort_key(a, &helper_id).cmp(&sort_key(b, &helper_id)));

        for entry in bucket.iter_mut() {
            entry.helper_id = helper_id.clone();
        }

        let pinned: Vec<QueueEntry> = entries::live_lane(tx, business_id, &helper_id)?
            .into_iter()
            .filter(|e| !before.contains_key(&e.id))
            .collect();

        if pinned.is_empty() {
            lane::renumber(&mut bucket);
        } else {
            let total = (pinned.len() + bucket.len()) as u32;
            let taken: Vec<u32> = pinned.iter().map(|e| e.current_position).collect();
            let mut free = (1..=total).filter(|p| !taken.contains(p));
            for entry in bucket.iter_mut() {
                entry.current_position = free.next().unwrap_or(total);
            }
        }

        // ETA prefix sums run over the whole lane, pinned entries
        // included, but only bucket entries are rewritten.
        let mut merged: Vec<QueueEntry> = pinned;
        merged.extend(bucket.iter().cloned());
        merged.sort_by_key(|e| e.current_position);
        lane::apply_etas(&mut merged, &durations, now);
        for entry in bucket.iter_mut() {
            if let Some(computed) = merged.iter().find(|m| m.id == entry.id) {
                entry.est_wait = computed.est_wait;
                entry.est_service_start_time = computed.est_service_start_time;
            }
        }

        // Steps 7-8: write the diff and collect material-change
        // notifications.
        for mut entry in bucket {
            let prev = match before.get(&entry.id) {
                Some(prev) => prev,
                None => continue,
            };
            let helper_changed = prev.helper_id != entry.helper_id;
            let position_changed = prev.position != entry.current_position;
            let wait_changed = prev.est_wait != entry.est_wait;

            if !(helper_changed || position_changed || wait_changed) {
                continue;
            }

            let mut event = HistoryEvent::new(HistoryAction::Edit, ActionSource::Vendor, now);
            event.prev_position = Some(prev.position);
            event.new_position = Some(entry.current_position);
            event.est_wait = Some(entry.est_wait);
            if helper_changed {
                event.newly_assigned_helper_id = Some(entry.helper_id.clone());
            }
            entry.push_history(event);

            entries::update(tx, &entry)?;
            updated_count += 1;

            let material = position_changed
                || helper_changed
                || prev.est_wait.abs_diff(entry.est_wait) >= material_delta;
            if material {
                if let Some(user_id) = entry.user_ref.registered_user_id() {
                    let body = change_body(&entry, prev, helper_changed);
                    let data = json!({
                        "type": "queue_update",
                        "queueId": entry.id,
                        "businessId": entry.business_id,
                        "position": entry.current_position,
                        "estWait": entry.est_wait,
                    });
                    if let Some(message) =
                        Engine::push_for_user(tx, user_id, "Queue update", body, data)?
                    {
                        messages.push(message);
                    }
                }
            }
        }
    }

    Ok((
        RestructureReport {
            updated_count,
            notifications_sent: 0,
            active_helpers: active.len(),
            total_queues,
        },
        messages,
    ))
}

/// Bucket ordering: entries retained in their lane first, in current
/// position order (the head, at position 1, stays in front); entries
/// arriving from another lane after, in FCFS order.
fn sort_key(entry: &QueueEntry, bucket_helper: &str) -> (u8, u64, u64) {
    if entry.helper_id == bucket_helper {
        (0, entry.current_position as u64, entry.joining_time)
    } else {
        (1, entry.joining_time, entry.joining_time)
    }
}

/// Body text for a material change notification.
fn change_body(entry: &QueueEntry, prev: &Before, helper_changed: bool) -> String {
    if entry.status == EntryStatus::Hold {
        format!(
            "On HOLD at position {}. ETA: {} mins",
            entry.current_position, entry.est_wait
        )
    } else {
        let mut body = format!(
            "Position: {} → {}. ETA: {} mins",
            prev.position, entry.current_position, entry.est_wait
        );
        if helper_changed {
            body.push_str(" Helper reassigned.");
        }
        body
    }
}

/// One "queue paused" message per affected registered user.
fn paused_messages(
    tx: &Transaction,
    business: &Business,
    affected: &[QueueEntry],
) -> Result<Vec<PushMessage>> {
    let mut seen: Vec<&str> = Vec::new();
    let mut messages = Vec::new();
    for entry in affected {
        let Some(user_id) = entry.user_ref.registered_user_id() else {
            continue;
        };
        if seen.contains(&user_id) {
            continue;
        }
        seen.push(user_id);
        let data = json!({
            "type": "queue_paused",
            "queueId": entry.id,
            "businessId": business.id,
        });
        if let Some(message) = Engine::push_for_user(
            tx,
            user_id,
            "Queue paused",
            "The queue is paused until a helper becomes available.".to_string(),
            data,
        )? {
            messages.push(message);
        }
    }
    Ok(messages)
}
