//! Break and resume, business-wide or scoped to one helper.
//!
//! A break flips the scheduling-participation flag; helper-scoped breaks
//! (and every resume) trigger a restructure so flexible entries migrate
//! off the paused lane.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::engine::Engine;
use super::validation;
use crate::error::{Error, Result};
use crate::identity::Principal;
use crate::notify::PushMessage;
use crate::store::{businesses, entries};

/// Break / resume request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BreakRequest {
    pub business_id: String,
    #[serde(default)]
    pub helper_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Expected break length in minutes; informational only.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Engine {
    /// Pause the business or one helper.
    pub async fn set_break(&self, principal: &Principal, req: BreakRequest) -> Result<()> {
        self.toggle_break(principal, req, false).await
    }

    /// Resume the business or one helper. Always restructures after the
    /// flag flip.
    pub async fn resume_break(&self, principal: &Principal, req: BreakRequest) -> Result<()> {
        self.toggle_break(principal, req, true).await
    }

    async fn toggle_break(
        &self,
        principal: &Principal,
        req: BreakRequest,
        active: bool,
    ) -> Result<()> {
        validation::validate_non_empty(&req.business_id, "businessId")?;
        let now = self.now();

        let messages = self
            .with_business_tx(&req.business_id, |tx| {
                let mut business = businesses::require(tx, &req.business_id)?;
                Engine::authorize_vendor(&business, principal)?;

                let mut messages = Vec::new();

                match req.helper_id.as_deref() {
                    Some(helper_id) => {
                        let helper = business.helper_mut(helper_id).ok_or_else(|| {
                            Error::NotFound(format!("helper {} not found", helper_id))
                        })?;
                        helper.active = active;

                        if !active {
                            let affected = entries::live_lane(tx, &business.id, helper_id)?;
                            messages = break_messages(
                                tx,
                                &business.id,
                                req.message.as_deref(),
                                "Your helper is on a short break.",
                                affected.iter(),
                            )?;
                        }
                    }
                    None => {
                        business.active = active;

                        if !active {
                            let affected = entries::live_for_business(tx, &business.id)?;
                            messages = break_messages(
                                tx,
                                &business.id,
                                req.message.as_deref(),
                                "The queue is paused for a short break.",
                                affected.iter(),
                            )?;
                        }
                    }
                }

                businesses::put(tx, &business)?;
                Ok(messages)
            })
            .await?;

        self.notifier.enqueue_batch(messages);

        info!(
            business_id = %req.business_id,
            helper_id = req.helper_id.as_deref().unwrap_or("-"),
            active,
            reason = req.reason.as_deref().unwrap_or("-"),
            duration_minutes = req.duration.unwrap_or(0),
            "break flag updated"
        );

        // Helper-scoped breaks migrate flexible entries; resumes always
        // rebalance. A business-wide break gates the restructure anyway.
        let should_restructure = req.helper_id.is_some() || active;
        if should_restructure {
            let horizon_end = now + self.settings.restructure_horizon_ms;
            if let Err(e) = self.restructure(&req.business_id, 0, horizon_end).await {
                warn!(
                    business_id = %req.business_id,
                    error = %e,
                    "post-break restructure failed"
                );
            }
        }

        Ok(())
    }
}

/// One message per affected registered user, deduplicated.
fn break_messages<'a>(
    tx: &rusqlite::Transaction,
    business_id: &str,
    custom_message: Option<&str>,
    default_body: &str,
    affected: impl Iterator<Item = &'a crate::model::QueueEntry>,
) -> Result<Vec<PushMessage>> {
    let body = custom_message.unwrap_or(default_body);
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
            "type": "break",
            "queueId": entry.id,
            "businessId": business_id,
        });
        if let Some(message) =
            Engine::push_for_user(tx, user_id, "Queue paused", body.to_string(), data)?
        {
            messages.push(message);
        }
    }
    Ok(messages)
}
