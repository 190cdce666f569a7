//! Service catalog records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Customer gender classes a service can be restricted to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Child,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Child => "child",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "child" => Some(Gender::Child),
            _ => None,
        }
    }
}

/// A service offered by a business. `duration_minutes` is immutable for
/// the lifetime of any queue entry that references the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub price: f64,
    pub allowed_genders: BTreeSet<Gender>,
    #[serde(default)]
    pub deleted: bool,
}

impl Service {
    pub fn allows(&self, gender: Gender) -> bool {
        self.allowed_genders.contains(&gender)
    }
}
