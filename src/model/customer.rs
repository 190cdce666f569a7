//! Customer principals: registered users and manual (walk-in) customers.

use serde::{Deserialize, Serialize};

use super::Gender;

/// A registered user with an optional push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub push_token: Option<String>,
    #[serde(default = "default_true")]
    pub receive_notifications: bool,
    pub gender: Gender,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub suspended: bool,
}

fn default_true() -> bool {
    true
}

impl UserRecord {
    /// Push token, if the user accepts notifications.
    pub fn notifiable_token(&self) -> Option<&str> {
        if self.receive_notifications {
            self.push_token.as_deref()
        } else {
            None
        }
    }
}

/// A manual customer added by a vendor; has no push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCustomer {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub phone: String,
    pub gender: Gender,
}

/// Reference from a queue entry to the customer it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserRef {
    Registered { user_id: String },
    Manual { manual_id: String },
}

impl UserRef {
    pub fn registered(user_id: impl Into<String>) -> Self {
        UserRef::Registered {
            user_id: user_id.into(),
        }
    }

    pub fn manual(manual_id: impl Into<String>) -> Self {
        UserRef::Manual {
            manual_id: manual_id.into(),
        }
    }

    /// The referenced id, regardless of kind.
    pub fn id(&self) -> &str {
        match self {
            UserRef::Registered { user_id } => user_id,
            UserRef::Manual { manual_id } => manual_id,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, UserRef::Registered { .. })
    }

    /// Registered user id, when this entry belongs to one.
    pub fn registered_user_id(&self) -> Option<&str> {
        match self {
            UserRef::Registered { user_id } => Some(user_id),
            UserRef::Manual { .. } => None,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            UserRef::Registered { .. } => "registered",
            UserRef::Manual { .. } => "manual",
        }
    }
}
