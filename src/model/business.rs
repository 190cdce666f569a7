//! Business records with their embedded helper list.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Helper onboarding status. Only `accepted` helpers that are also
/// `active` participate in scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperStatus {
    Pending,
    Accepted,
    Rejected,
    Removed,
}

impl HelperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HelperStatus::Pending => "pending",
            HelperStatus::Accepted => "accepted",
            HelperStatus::Rejected => "rejected",
            HelperStatus::Removed => "removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(HelperStatus::Pending),
            "accepted" => Some(HelperStatus::Accepted),
            "rejected" => Some(HelperStatus::Rejected),
            "removed" => Some(HelperStatus::Removed),
            _ => None,
        }
    }
}

/// A helper embedded in a business document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Helper {
    pub helper_id: String,
    pub status: HelperStatus,
    pub active: bool,
    /// Ids of the services this helper can perform.
    pub services: BTreeSet<String>,
}

impl Helper {
    /// True when the helper participates in scheduling.
    pub fn is_scheduling(&self) -> bool {
        self.status == HelperStatus::Accepted && self.active
    }

    pub fn supports(&self, service_id: &str) -> bool {
        self.services.contains(service_id)
    }
}

/// A business. Owned by a single principal; `active = false` pauses the
/// whole business.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub owner_id: String,
    pub active: bool,
    pub timezone: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub helpers: Vec<Helper>,
}

impl Business {
    pub fn helper(&self, helper_id: &str) -> Option<&Helper> {
        self.helpers.iter().find(|h| h.helper_id == helper_id)
    }

    pub fn helper_mut(&mut self, helper_id: &str) -> Option<&mut Helper> {
        self.helpers.iter_mut().find(|h| h.helper_id == helper_id)
    }

    /// Helpers currently participating in scheduling, ordered by id for
    /// deterministic tie-breaking.
    pub fn scheduling_helpers(&self) -> Vec<&Helper> {
        let mut active: Vec<&Helper> = self
            .helpers
            .iter()
            .filter(|h| h.is_scheduling())
            .collect();
        active.sort_by(|a, b| a.helper_id.cmp(&b.helper_id));
        active
    }

    /// True when the principal owns this business or is one of its
    /// accepted, active helpers.
    pub fn is_vendor(&self, principal_id: &str) -> bool {
        if self.owner_id == principal_id {
            return true;
        }
        self.helper(principal_id)
            .map(|h| h.is_scheduling())
            .unwrap_or(false)
    }
}
