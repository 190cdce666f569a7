//! Engine tests: shared setup plus per-area test files.

mod breaks;
mod restructure;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::clock::{Clock, ManualClock};
use crate::identity::Principal;
use crate::model::{
    Business, EntryStatus, Gender, Helper, HelperStatus, Preference, QueueEntry, Service,
    UserRecord,
};
use crate::notify::Notifier;
use crate::queue::{
    ActionRequest, Engine, EngineSettings, EnqueueRequest, LineItem, QueueAction, UserType,
};
use crate::store::{businesses, customers, entries, services, Store, StoreConfig};

/// Stable test epoch.
pub const T0: u64 = 1_700_000_000_000;

pub struct TestRig {
    pub engine: Arc<Engine>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<Notifier>,
    pub store: Arc<Store>,
}

/// Engine on an in-memory store with a manual clock and a capturing
/// notifier.
pub fn setup() -> TestRig {
    let store = Arc::new(Store::open(StoreConfig::in_memory()).unwrap());
    store.migrate().unwrap();

    let clock = Arc::new(ManualClock::new(T0));
    let notifier = Notifier::capturing();
    let engine = Engine::new(
        Arc::clone(&store),
        clock.clone() as Arc<dyn crate::clock::Clock>,
        Arc::clone(&notifier),
        EngineSettings::default(),
    );

    TestRig {
        engine,
        clock,
        notifier,
        store,
    }
}

pub fn vendor(id: &str) -> Principal {
    Principal::vendor(id)
}

pub fn customer(id: &str) -> Principal {
    Principal::customer(id)
}

/// Seed a business whose helpers are all accepted and active.
pub fn seed_business(rig: &TestRig, id: &str, helpers: &[(&str, &[&str])]) {
    let business = Business {
        id: id.to_string(),
        owner_id: format!("owner-{}", id),
        active: true,
        timezone: "UTC".to_string(),
        deleted: false,
        suspended: false,
        helpers: helpers
            .iter()
            .map(|(helper_id, service_ids)| Helper {
                helper_id: helper_id.to_string(),
                status: HelperStatus::Accepted,
                active: true,
                services: service_ids.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    };
    rig.store.with_tx(|tx| businesses::put(tx, &business)).unwrap();
}

pub fn owner_of(business_id: &str) -> Principal {
    Principal::vendor(format!("owner-{}", business_id))
}

pub fn seed_service(rig: &TestRig, id: &str, business_id: &str, duration: u32, price: f64) {
    let service = Service {
        id: id.to_string(),
        business_id: business_id.to_string(),
        name: format!("service {}", id),
        duration_minutes: duration,
        price,
        allowed_genders: BTreeSet::from([Gender::Male, Gender::Female, Gender::Child]),
        deleted: false,
    };
    rig.store.with_tx(|tx| services::put(tx, &service)).unwrap();
}

pub fn seed_user(rig: &TestRig, id: &str) {
    let user = UserRecord {
        id: id.to_string(),
        push_token: Some(format!("tok-{}", id)),
        receive_notifications: true,
        gender: Gender::Male,
        active: true,
        deleted: false,
        suspended: false,
    };
    rig.store.with_tx(|tx| customers::put_user(tx, &user)).unwrap();
}

/// Single-service ANY enqueue for a registered user.
pub async fn enqueue_any(rig: &TestRig, user_id: &str, business_id: &str, service_id: &str) -> QueueEntry {
    rig.engine
        .enqueue(
            &customer(user_id),
            EnqueueRequest {
                business_id: business_id.to_string(),
                user_type: UserType::Normal,
                manual_id: None,
                services: vec![LineItem {
                    service_id: service_id.to_string(),
                    gender: Gender::Male,
                    preference: Preference::Any,
                    helper_id: None,
                }],
            },
        )
        .await
        .unwrap()
        .remove(0)
}

pub async fn act(
    rig: &TestRig,
    principal: &Principal,
    queue_id: &str,
    action: QueueAction,
) -> crate::error::Result<QueueEntry> {
    rig.engine
        .apply_action(
            principal,
            ActionRequest {
                queue_id: queue_id.to_string(),
                action,
                added_time: None,
            },
        )
        .await
}

pub fn lane_of(rig: &TestRig, business_id: &str, helper_id: &str) -> Vec<QueueEntry> {
    rig.store
        .with_conn(|conn| entries::live_lane(conn, business_id, helper_id))
        .unwrap()
}

pub fn reload(rig: &TestRig, entry_id: &str) -> QueueEntry {
    rig.store
        .with_conn(|conn| entries::require(conn, entry_id))
        .unwrap()
}

/// Position of each entry id in a lane, in lane order.
pub fn lane_positions(rig: &TestRig, business_id: &str, helper_id: &str) -> Vec<(String, u32)> {
    lane_of(rig, business_id, helper_id)
        .into_iter()
        .map(|e| (e.id, e.current_position))
        .collect()
}

/// Check that every lane of a business has dense, unique positions and
/// that every entry satisfies the ETA formula.
pub fn assert_invariants(rig: &TestRig, business_id: &str) {
    let business = rig
        .store
        .with_conn(|conn| businesses::require(conn, business_id))
        .unwrap();
    let durations = rig
        .store
        .with_conn(|conn| crate::queue::durations_for_business(conn, business_id))
        .unwrap();

    for helper in &business.helpers {
        let lane = lane_of(rig, business_id, &helper.helper_id);

        // positions are exactly 1..=N
        let mut positions: Vec<u32> = lane.iter().map(|e| e.current_position).collect();
        positions.sort_unstable();
        let expected: Vec<u32> = (1..=lane.len() as u32).collect();
        assert_eq!(
            positions, expected,
            "lane ({}, {}) positions are not dense",
            business_id, helper.helper_id
        );

        // estWait = (pos - 1) * duration + overlays at positions <= pos
        let mut by_pos = lane.clone();
        by_pos.sort_by_key(|e| e.current_position);
        let mut overlay = 0u32;
        for entry in &by_pos {
            overlay += entry.added_time;
            let duration = durations.get(&entry.service_id).copied().unwrap_or(0);
            let expected_wait = (entry.current_position - 1) * duration + overlay;
            assert_eq!(
                entry.est_wait, expected_wait,
                "entry {} violates the ETA formula",
                entry.id
            );
        }
    }
}
