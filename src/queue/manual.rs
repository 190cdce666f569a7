//! Manual (walk-in) customer management.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::engine::Engine;
use super::validation;
use crate::error::Result;
use crate::identity::Principal;
use crate::model::{Gender, ManualCustomer};
use crate::store::{businesses, customers};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManualCustomerRequest {
    pub business_id: String,
    pub name: String,
    pub phone: String,
    pub gender: Gender,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManualSearchQuery {
    pub business_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Engine {
    /// Add a manual customer to a business. Vendor-only.
    pub async fn add_manual_customer(
        &self,
        principal: &Principal,
        req: ManualCustomerRequest,
    ) -> Result<ManualCustomer> {
        validation::validate_non_empty(&req.business_id, "businessId")?;
        validation::validate_non_empty(&req.name, "name")?;
        validation::validate_non_empty(&req.phone, "phone")?;

        let customer = self
            .with_business_tx(&req.business_id, |tx| {
                let business = businesses::require(tx, &req.business_id)?;
                Engine::authorize_vendor(&business, principal)?;

                let customer = ManualCustomer {
                    id: Uuid::new_v4().to_string(),
                    business_id: business.id.clone(),
                    name: req.name.trim().to_string(),
                    phone: req.phone.trim().to_string(),
                    gender: req.gender,
                };
                customers::put_manual(tx, &customer)?;
                Ok(customer)
            })
            .await?;

        info!(
            business_id = %req.business_id,
            manual_id = %customer.id,
            "manual customer added"
        );
        Ok(customer)
    }

    /// Search a business's manual customers by name and/or phone prefix.
    /// Vendor-only.
    pub async fn search_manual_customers(
        &self,
        principal: &Principal,
        query: ManualSearchQuery,
    ) -> Result<Vec<ManualCustomer>> {
        validation::validate_non_empty(&query.business_id, "businessId")?;

        self.read(|conn| {
            let business = businesses::require(conn, &query.business_id)?;
            Engine::authorize_vendor(&business, principal)?;
            customers::search_manual(
                conn,
                &business.id,
                query.name.as_deref(),
                query.phone.as_deref(),
            )
        })
    }
}
