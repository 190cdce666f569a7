//! Enqueue operation: create one entry per requested line item, all or
//! nothing, in a single transaction.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::engine::Engine;
use super::lane;
use super::validation;
use crate::error::{Error, Result};
use crate::identity::Principal;
use crate::model::{Business, EntryStatus, Gender, Preference, QueueEntry, UserRef};
use crate::store::{businesses, customers, entries, services};

/// Whether the enqueue targets a registered user or a manual customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Normal,
    Manual,
}

/// One requested service in an enqueue call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LineItem {
    pub service_id: String,
    pub gender: Gender,
    pub preference: Preference,
    #[serde(default)]
    pub helper_id: Option<String>,
}

/// Enqueue request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnqueueRequest {
    pub business_id: String,
    pub user_type: UserType,
    #[serde(default)]
    pub manual_id: Option<String>,
    pub services: Vec<LineItem>,
}

impl Engine {
    /// Create every requested entry or none. Positions and ETAs are
    /// assigned against the lane sizes observed under the transaction.
    pub async fn enqueue(
        &self,
        principal: &Principal,
        req: EnqueueRequest,
    ) -> Result<Vec<QueueEntry>> {
        validation::validate_line_item_count(req.services.len())?;
        validation::validate_non_empty(&req.business_id, "businessId")?;

        let now = self.now();

        let created = self
            .with_business_tx(&req.business_id, |tx| {
                let business = businesses::require(tx, &req.business_id)?;
                if business.suspended {
                    return Err(Error::FailedPrecondition(
                        "business is suspended".to_string(),
                    ));
                }
                if !business.active {
                    return Err(Error::FailedPrecondition(
                        "business is on a break".to_string(),
                    ));
                }

                let user_ref = resolve_user_ref(tx, &business, principal, &req)?;

                let mut created: Vec<QueueEntry> = Vec::with_capacity(req.services.len());

                for item in &req.services {
                    let service =
                        services::require_for_business(tx, &item.service_id, &business.id)?;
                    if !service.allows(item.gender) {
                        return Err(Error::InvalidArgument(format!(
                            "service {} does not accept gender {}",
                            service.name,
                            item.gender.as_str()
                        )));
                    }

                    let helper_id = select_helper(tx, &business, item)?;

                    // Entries inserted earlier in this transaction are
                    // already visible in the lane.
                    let existing = entries::live_lane(tx, &business.id, &helper_id)?;
                    let k = existing.len() as u32;

                    let est_wait =
                        lane::est_wait_for_join(&existing, k, service.duration_minutes);

                    let entry = QueueEntry {
                        id: Uuid::new_v4().to_string(),
                        business_id: business.id.clone(),
                        helper_id,
                        user_ref: user_ref.clone(),
                        service_id: service.id.clone(),
                        gender: item.gender,
                        preference: item.preference,
                        joining_position: k + 1,
                        current_position: k + 1,
                        joining_time: now,
                        created_at: now,
                        est_service_start_time: now + est_wait as u64 * lane::MINUTE_MS,
                        est_wait,
                        added_time: 0,
                        status: EntryStatus::InQueue,
                        total: service.price,
                        rating: None,
                        notes: None,
                        history: Vec::new(),
                    };
                    entries::insert(tx, &entry)?;
                    created.push(entry);
                }

                Ok(created)
            })
            .await?;

        info!(
            business_id = %req.business_id,
            count = created.len(),
            "enqueued entries"
        );
        Ok(created)
    }
}

/// Resolve and validate the customer reference for this enqueue.
fn resolve_user_ref(
    tx: &rusqlite::Transaction,
    business: &Business,
    principal: &Principal,
    req: &EnqueueRequest,
) -> Result<UserRef> {
    match req.user_type {
        UserType::Normal => {
            if req.manual_id.is_some() {
                return Err(Error::InvalidArgument(
                    "manualId must be absent for a normal enqueue".to_string(),
                ));
            }
            customers::require_active_user(tx, &principal.id)?;
            Ok(UserRef::registered(principal.id.clone()))
        }
        UserType::Manual => {
            let manual_id = req.manual_id.as_deref().ok_or_else(|| {
                Error::InvalidArgument("manualId is required for a manual enqueue".to_string())
            })?;
            Engine::authorize_vendor(business, principal)?;
            let manual = customers::require_manual_for_business(tx, manual_id, &business.id)?;
            Ok(UserRef::manual(manual.id))
        }
    }
}

/// Pick the helper for one line item. SPECIFIC pins the referenced
/// helper; ANY selects the capable helper with the shortest queue.
/// Lane counts include entries created earlier in this transaction.
fn select_helper(
    tx: &rusqlite::Transaction,
    business: &Business,
    item: &LineItem,
) -> Result<String> {
    match item.preference {
        Preference::Specific => {
            let helper_id = item.helper_id.as_deref().ok_or_else(|| {
                Error::InvalidArgument(
                    "helperId is required for a specific preference".to_string(),
                )
            })?;
            let helper = business
                .helper(helper_id)
                .ok_or_else(|| Error::NotFound(format!("helper {} not found", helper_id)))?;
            if !helper.is_scheduling() {
                return Err(Error::FailedPrecondition(format!(
                    "helper {} is not active",
                    helper_id
                )));
            }
            if !helper.supports(&item.service_id) {
                return Err(Error::FailedPrecondition(format!(
                    "helper {} does not perform service {}",
                    helper_id, item.service_id
                )));
            }
            Ok(helper_id.to_string())
        }
        Preference::Any => {
            let mut best: Option<(u32, String)> = None;
            for helper in business.scheduling_helpers() {
                if !helper.supports(&item.service_id) {
                    continue;
                }
                let length = entries::live_count(tx, &business.id, &helper.helper_id)?;
                // scheduling_helpers is id-ordered, so strict less-than
                // keeps the smallest id on ties
                let shorter = match &best {
                    Some((shortest, _)) => length < *shortest,
                    None => true,
                };
                if shorter {
                    best = Some((length, helper.helper_id.clone()));
                }
            }
            best.map(|(_, id)| id).ok_or_else(|| {
                Error::FailedPrecondition(format!(
                    "no active helper can perform service {}",
                    item.service_id
                ))
            })
        }
    }
}
