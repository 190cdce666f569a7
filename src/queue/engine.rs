//! Core Engine struct and shared operation plumbing.
//!
//! The engine owns its three injected dependencies (store, clock,
//! notifier) and a table of per-business mutexes. Every write-path
//! operation takes the business mutex, runs one store transaction, and
//! only after commit hands its notification batch to the notifier.

use std::sync::Arc;

use dashmap::DashMap;
use rusqlite::{Connection, Transaction};
use serde_json::Value;
use tracing::warn;

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::Principal;
use crate::model::Business;
use crate::notify::{Notifier, PushMessage};
use crate::store::{customers, Store};

/// Transaction attempts before a Conflict is surfaced to the caller.
const MAX_TX_ATTEMPTS: u32 = 3;

/// Engine tuning derived from configuration, read once at start.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub undo_window_ms: u64,
    pub restructure_horizon_ms: u64,
    pub material_wait_delta_minutes: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            undo_window_ms: 300_000,
            restructure_horizon_ms: 86_400_000,
            material_wait_delta_minutes: 5,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            undo_window_ms: config.undo_window_seconds * 1_000,
            restructure_horizon_ms: config.restructure_horizon_seconds * 1_000,
            material_wait_delta_minutes: config.material_wait_delta_minutes,
        }
    }
}

/// The queue engine. One instance per process; workers share it by
/// reference.
pub struct Engine {
    pub(crate) store: Arc<Store>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) notifier: Arc<Notifier>,
    pub(crate) settings: EngineSettings,
    business_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl Engine {
    pub fn new(
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        notifier: Arc<Notifier>,
        settings: EngineSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            clock,
            notifier,
            settings,
            business_locks: DashMap::new(),
        })
    }

    #[inline(always)]
    pub(crate) fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Mutex serializing write operations for one business.
    fn business_lock(&self, business_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.business_locks
            .entry(business_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Run `f` in a transaction under the business mutex, retrying on
    /// Conflict. Nothing is published unless the transaction commits.
    pub(crate) async fn with_business_tx<T>(
        &self,
        business_id: &str,
        mut f: impl FnMut(&Transaction) -> Result<T>,
    ) -> Result<T> {
        let lock = self.business_lock(business_id);
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.with_tx(&mut f) {
                Err(e) if e.is_conflict() && attempt < MAX_TX_ATTEMPTS => {
                    warn!(
                        business_id = %business_id,
                        attempt,
                        "transaction conflict, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    /// Snapshot read outside any transaction.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.store.with_conn(f)
    }

    /// Require that the principal is the owner or an accepted, active
    /// helper of the business.
    pub(crate) fn authorize_vendor(business: &Business, principal: &Principal) -> Result<()> {
        if business.is_vendor(&principal.id) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "principal is not an owner or helper of business {}",
                business.id
            )))
        }
    }

    /// Build a push message for a registered user, respecting the user's
    /// notification preference and push channel. Returns None when the
    /// user cannot be reached.
    pub(crate) fn push_for_user(
        conn: &Connection,
        user_id: &str,
        title: &str,
        body: String,
        data: Value,
    ) -> Result<Option<PushMessage>> {
        let Some(user) = customers::get_user(conn, user_id)? else {
            return Ok(None);
        };
        Ok(user.notifiable_token().map(|token| PushMessage {
            to: token.to_string(),
            title: title.to_string(),
            body,
            data,
        }))
    }
}
