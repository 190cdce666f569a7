//! Read projections over queue state.
//!
//! These reads use snapshot semantics outside transactions and may
//! observe briefly-stale positions while a restructure is in flight.

use std::collections::HashMap;

use serde::Serialize;

use super::engine::Engine;
use super::validation;
use crate::error::{Error, Result};
use crate::identity::Principal;
use crate::model::{ActionSource, EntryStatus, HistoryAction, QueueEntry, UserRef};
use crate::store::{businesses, customers, entries, services};

/// Per-status totals for a helper's queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCounts {
    pub in_queue: usize,
    pub hold: usize,
    pub skipped: usize,
    pub total: usize,
}

/// One entry joined with service and customer identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperQueueItem {
    #[serde(flatten)]
    pub entry: QueueEntry,
    pub service_name: String,
    pub duration_minutes: u32,
    /// Manual customers carry a display name; registered users are
    /// identified by id only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperQueueView {
    pub entries: Vec<HelperQueueItem>,
    pub counts: QueueCounts,
}

/// Expected wait per (helper, service) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperWaitTime {
    pub helper_id: String,
    pub service_id: String,
    pub service_name: String,
    pub queue_length: u32,
    pub estimated_wait: u32,
}

/// One recent vendor action on a live entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAction {
    pub queue_id: String,
    pub action: HistoryAction,
    pub at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_time: Option<u32>,
}

impl Engine {
    /// A helper's live queue in `[t0, t1]`, joined with service and
    /// customer identity, plus per-status counts. Vendor-only.
    pub async fn helper_queue(
        &self,
        principal: &Principal,
        helper_id: &str,
        t0: u64,
        t1: u64,
    ) -> Result<HelperQueueView> {
        validation::validate_window(t0, t1)?;

        self.read(|conn| {
            let business = businesses::find_by_helper(conn, helper_id)?
                .ok_or_else(|| Error::NotFound(format!("helper {} not found", helper_id)))?;
            Engine::authorize_vendor(&business, principal)?;

            let lane = entries::live_for_helper_window(conn, helper_id, t0, t1)?;

            let mut service_names: HashMap<String, (String, u32)> = HashMap::new();
            for service in services::for_business(conn, &business.id)? {
                service_names.insert(
                    service.id.clone(),
                    (service.name, service.duration_minutes),
                );
            }

            let mut counts = QueueCounts {
                in_queue: 0,
                hold: 0,
                skipped: 0,
                total: 0,
            };
            let mut items = Vec::with_capacity(lane.len());

            for entry in lane {
                match entry.status {
                    EntryStatus::InQueue => counts.in_queue += 1,
                    EntryStatus::Hold => counts.hold += 1,
                    EntryStatus::Skipped => counts.skipped += 1,
                    _ => {}
                }
                counts.total += 1;

                let (service_name, duration_minutes) = service_names
                    .get(&entry.service_id)
                    .cloned()
                    .unwrap_or_else(|| (entry.service_id.clone(), 0));

                let customer_name = match &entry.user_ref {
                    UserRef::Manual { manual_id } => {
                        customers::get_manual(conn, manual_id)?.map(|m| m.name)
                    }
                    UserRef::Registered { .. } => None,
                };

                items.push(HelperQueueItem {
                    entry,
                    service_name,
                    duration_minutes,
                    customer_name,
                });
            }

            Ok(HelperQueueView {
                entries: items,
                counts,
            })
        })
    }

    /// For each active helper, for each service it supports, the queue
    /// length and expected wait for a new customer.
    pub async fn helper_wait_times(&self, business_id: &str) -> Result<Vec<HelperWaitTime>> {
        validation::validate_non_empty(business_id, "businessId")?;

        self.read(|conn| {
            let business = businesses::require(conn, business_id)?;
            let catalog = services::for_business(conn, &business.id)?;

            let mut out = Vec::new();
            for helper in business.scheduling_helpers() {
                let queue_length = entries::live_count(conn, &business.id, &helper.helper_id)?;
                for service in catalog.iter().filter(|s| helper.supports(&s.id)) {
                    out.push(HelperWaitTime {
                        helper_id: helper.helper_id.clone(),
                        service_id: service.id.clone(),
                        service_name: service.name.clone(),
                        queue_length,
                        estimated_wait: queue_length * service.duration_minutes,
                    });
                }
            }
            Ok(out)
        })
    }

    /// Vendor-sourced history events on the helper's live entries within
    /// the undo window, excluding `undo`, newest first, at most 10.
    pub async fn helper_recent_actions(
        &self,
        principal: &Principal,
        helper_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RecentAction>> {
        let limit = validation::clamp_recent_limit(limit);
        let now = self.now();
        let window_ms = self.settings.undo_window_ms;

        self.read(|conn| {
            let business = businesses::find_by_helper(conn, helper_id)?
                .ok_or_else(|| Error::NotFound(format!("helper {} not found", helper_id)))?;
            Engine::authorize_vendor(&business, principal)?;

            let lane = entries::live_lane(conn, &business.id, helper_id)?;

            let mut actions: Vec<RecentAction> = Vec::new();
            for entry in &lane {
                for event in &entry.history {
                    if event.source != ActionSource::Vendor
                        || event.action == HistoryAction::Undo
                        || now.saturating_sub(event.at) > window_ms
                    {
                        continue;
                    }
                    actions.push(RecentAction {
                        queue_id: entry.id.clone(),
                        action: event.action,
                        at: event.at,
                        prev_position: event.prev_position,
                        new_position: event.new_position,
                        added_time: event.added_time,
                    });
                }
            }

            actions.sort_by(|a, b| b.at.cmp(&a.at));
            actions.truncate(limit);
            Ok(actions)
        })
    }

    /// The principal's own entries in `[t0, t1]`, newest first.
    pub async fn user_queue_history(
        &self,
        principal: &Principal,
        t0: u64,
        t1: u64,
    ) -> Result<Vec<QueueEntry>> {
        validation::validate_window(t0, t1)?;
        self.read(|conn| {
            entries::for_user_window(conn, &UserRef::registered(principal.id.clone()), t0, t1)
        })
    }

    /// All of a business's entries in `[t0, t1]`, optionally narrowed to
    /// one helper. Vendor-only.
    pub async fn business_queue_history(
        &self,
        principal: &Principal,
        business_id: &str,
        t0: u64,
        t1: u64,
        helper_id: Option<&str>,
    ) -> Result<Vec<QueueEntry>> {
        validation::validate_window(t0, t1)?;

        self.read(|conn| {
            let business = businesses::require(conn, business_id)?;
            Engine::authorize_vendor(&business, principal)?;
            entries::for_business_window(conn, &business.id, t0, t1, helper_id)
        })
    }
}
