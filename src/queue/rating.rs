//! Post-service rating and notes.
//!
//! Terminal entries are immutable except for this one fill-in: a
//! completed, unrated entry may receive a rating and optional notes.

use tracing::info;

use super::engine::Engine;
use super::validation;
use crate::error::{Error, Result};
use crate::identity::{Principal, Role};
use crate::model::{EntryStatus, QueueEntry};
use crate::store::{businesses, entries};

impl Engine {
    pub async fn update_rating(
        &self,
        principal: &Principal,
        queue_id: &str,
        rating: u8,
        notes: Option<String>,
    ) -> Result<QueueEntry> {
        validation::validate_non_empty(queue_id, "queueId")?;
        validation::validate_rating(rating)?;

        let business_id = self.read(|conn| entries::require(conn, queue_id))?.business_id;

        let updated = self
            .with_business_tx(&business_id, |tx| {
                let mut entry = entries::require(tx, queue_id)?;
                let business = businesses::require(tx, &entry.business_id)?;

                // The served customer rates their own visit; vendors may
                // record a rating collected from a manual customer.
                let allowed = match principal.role {
                    Role::Customer => {
                        entry.user_ref.registered_user_id() == Some(principal.id.as_str())
                    }
                    Role::OwnerOrHelper => business.is_vendor(&principal.id),
                };
                if !allowed {
                    return Err(Error::Forbidden(
                        "principal may not rate this entry".to_string(),
                    ));
                }

                if entry.status != EntryStatus::Completed {
                    return Err(Error::FailedPrecondition(
                        "only a completed entry can be rated".to_string(),
                    ));
                }
                if entry.rating.is_some() {
                    return Err(Error::FailedPrecondition(
                        "entry is already rated".to_string(),
                    ));
                }

                entry.rating = Some(rating);
                entry.notes = notes.clone();
                entries::update(tx, &entry)?;
                Ok(entry)
            })
            .await?;

        info!(queue_id = %queue_id, rating, "rating recorded");
        Ok(updated)
    }
}
