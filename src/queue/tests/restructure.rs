//! Restructure tests: hold policy, reassignment, idempotence,
//! notifications.

use super::*;

const DAY_MS: u64 = 86_400_000;

async fn run_restructure(rig: &TestRig, business_id: &str) -> crate::queue::RestructureReport {
    let now = rig.clock.now_ms();
    rig.engine
        .restructure(business_id, now.saturating_sub(DAY_MS), now + DAY_MS)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_hold_keeps_its_slot_through_restructure() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    let mut created = Vec::new();
    for i in 1..=5 {
        let user = format!("u{}", i);
        seed_user(&rig, &user);
        created.push(enqueue_any(&rig, &user, "b1", "cut").await);
        rig.clock.advance_secs(60);
    }

    act(&rig, &owner_of("b1"), &created[2].id, QueueAction::Hold)
        .await
        .unwrap();
    let report = run_restructure(&rig, "b1").await;
    assert_eq!(report.updated_count, 0);

    // Hold remains at position 3, neighbours untouched, ETAs unchanged
    for (idx, entry) in created.iter().enumerate() {
        let loaded = reload(&rig, &entry.id);
        assert_eq!(loaded.current_position, idx as u32 + 1);
        assert_eq!(loaded.est_wait, idx as u32 * 30);
    }

    // Unhold plus restructure restores the original configuration
    act(&rig, &owner_of("b1"), &created[2].id, QueueAction::Unhold)
        .await
        .unwrap();
    let report = run_restructure(&rig, "b1").await;
    assert_eq!(report.updated_count, 0);
    assert_eq!(reload(&rig, &created[2].id).status, EntryStatus::InQueue);
    assert_invariants(&rig, "b1");
}

#[tokio::test]
async fn test_restructure_is_idempotent() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"]), ("h2", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    for i in 1..=6 {
        let user = format!("u{}", i);
        seed_user(&rig, &user);
        enqueue_any(&rig, &user, "b1", "cut").await;
        rig.clock.advance_secs(30);
    }

    // First run may or may not move entries; the second must not.
    run_restructure(&rig, "b1").await;
    let second = run_restructure(&rig, "b1").await;
    assert_eq!(second.updated_count, 0);
    assert_eq!(second.notifications_sent, 0);
    assert_invariants(&rig, "b1");
}

#[tokio::test]
async fn test_restructure_migrates_from_inactive_helper() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"]), ("h2", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);

    // All three land on h1 while h2 also exists: force them onto h1
    // via specific preference.
    let mut created = Vec::new();
    for i in 1..=3 {
        let user = format!("u{}", i);
        seed_user(&rig, &user);
        let entry = rig
            .engine
            .enqueue(
                &customer(&user),
                EnqueueRequest {
                    business_id: "b1".to_string(),
                    user_type: UserType::Normal,
                    manual_id: None,
                    services: vec![LineItem {
                        service_id: "cut".to_string(),
                        gender: Gender::Male,
                        preference: Preference::Any,
                        helper_id: None,
                    }],
                },
            )
            .await
            .unwrap()
            .remove(0);
        created.push(entry);
        rig.clock.advance_secs(60);
    }

    // Deactivate the helper holding entries directly, then rebalance.
    let mut business = rig
        .store
        .with_conn(|conn| businesses::require(conn, "b1"))
        .unwrap();
    for entry in &created {
        assert!(business.helper(&entry.helper_id).is_some());
    }
    let loaded_lanes: Vec<String> = created.iter().map(|e| e.helper_id.clone()).collect();
    let from = loaded_lanes[0].clone();
    business.helper_mut(&from).unwrap().active = false;
    rig.store.with_tx(|tx| businesses::put(tx, &business)).unwrap();

    rig.notifier.clear_captured();
    let report = run_restructure(&rig, "b1").await;
    assert_eq!(report.active_helpers, 1);

    // Every entry that sat on the paused helper moved off it, FCFS, and
    // carries the reassignment in its history.
    let moved: Vec<_> = created
        .iter()
        .filter(|e| e.helper_id == from)
        .collect();
    assert!(!moved.is_empty());
    for entry in &moved {
        let loaded = reload(&rig, &entry.id);
        assert_ne!(loaded.helper_id, from);
        let edit = loaded
            .history
            .iter()
            .rev()
            .find(|ev| ev.action == crate::model::HistoryAction::Edit)
            .unwrap();
        assert_eq!(
            edit.newly_assigned_helper_id.as_deref(),
            Some(loaded.helper_id.as_str())
        );
    }
    assert_invariants(&rig, "b1");

    // One reassignment notification per moved registered user
    let captured = rig.notifier.captured();
    let reassigned: Vec<_> = captured
        .iter()
        .filter(|m| m.body.contains("Helper reassigned"))
        .collect();
    assert_eq!(reassigned.len(), moved.len());
}

#[tokio::test]
async fn test_specific_entries_stay_with_their_helper() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"]), ("h2", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);

    // h2's queue is longer, but a specific entry must not migrate.
    for i in 1..=2 {
        let user = format!("s{}", i);
        seed_user(&rig, &user);
        rig.engine
            .enqueue(
                &customer(&user),
                EnqueueRequest {
                    business_id: "b1".to_string(),
                    user_type: UserType::Normal,
                    manual_id: None,
                    services: vec![LineItem {
                        service_id: "cut".to_string(),
                        gender: Gender::Male,
                        preference: Preference::Specific,
                        helper_id: Some("h2".to_string()),
                    }],
                },
            )
            .await
            .unwrap();
        rig.clock.advance_secs(30);
    }

    let report = run_restructure(&rig, "b1").await;
    assert_eq!(report.updated_count, 0);
    assert_eq!(lane_of(&rig, "b1", "h2").len(), 2);
    assert!(lane_of(&rig, "b1", "h1").is_empty());
}

#[tokio::test]
async fn test_no_active_helpers_is_noop_with_pause_notice() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    seed_user(&rig, "u1");
    let entry = enqueue_any(&rig, "u1", "b1", "cut").await;

    let mut business = rig
        .store
        .with_conn(|conn| businesses::require(conn, "b1"))
        .unwrap();
    business.helper_mut("h1").unwrap().active = false;
    rig.store.with_tx(|tx| businesses::put(tx, &business)).unwrap();

    rig.notifier.clear_captured();
    let report = run_restructure(&rig, "b1").await;
    assert_eq!(report.updated_count, 0);
    assert_eq!(report.active_helpers, 0);
    assert_eq!(report.notifications_sent, 1);

    let captured = rig.notifier.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].to, "tok-u1");
    assert_eq!(captured[0].data["type"], "queue_paused");

    // The entry itself is untouched
    assert_eq!(reload(&rig, &entry.id).current_position, 1);
}

#[tokio::test]
async fn test_inactive_business_is_silent_noop() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    seed_user(&rig, "u1");
    enqueue_any(&rig, "u1", "b1", "cut").await;

    let mut business = rig
        .store
        .with_conn(|conn| businesses::require(conn, "b1"))
        .unwrap();
    business.active = false;
    rig.store.with_tx(|tx| businesses::put(tx, &business)).unwrap();

    rig.notifier.clear_captured();
    let report = run_restructure(&rig, "b1").await;
    assert_eq!(report.updated_count, 0);
    assert!(rig.notifier.captured().is_empty());
}

#[tokio::test]
async fn test_window_excludes_older_entries() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    seed_user(&rig, "old");
    seed_user(&rig, "new");

    let old = enqueue_any(&rig, "old", "b1", "cut").await;
    rig.clock.advance_secs(3_600);
    let newer = enqueue_any(&rig, "new", "b1", "cut").await;

    // Restructure a window that only covers the newer entry. The older
    // entry keeps its position even though it is ahead in the lane.
    let now = rig.clock.now_ms();
    rig.engine
        .restructure("b1", now - 60_000, now + DAY_MS)
        .await
        .unwrap();

    assert_eq!(reload(&rig, &old.id).current_position, 1);
    assert_eq!(reload(&rig, &newer.id).current_position, 2);
}

#[tokio::test]
async fn test_material_notification_threshold() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"]), ("h2", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    for i in 1..=4 {
        let user = format!("u{}", i);
        seed_user(&rig, &user);
        enqueue_any(&rig, &user, "b1", "cut").await;
        rig.clock.advance_secs(30);
    }

    // Pausing h2 pushes its entries onto h1: position and helper both
    // change for the moved entries, so each moved registered user is
    // notified once.
    let mut business = rig
        .store
        .with_conn(|conn| businesses::require(conn, "b1"))
        .unwrap();
    business.helper_mut("h2").unwrap().active = false;
    rig.store.with_tx(|tx| businesses::put(tx, &business)).unwrap();

    rig.notifier.clear_captured();
    let report = run_restructure(&rig, "b1").await;
    assert!(report.updated_count > 0);
    assert_eq!(report.notifications_sent, rig.notifier.captured().len());
    for message in rig.notifier.captured() {
        assert_eq!(message.title, "Queue update");
        assert_eq!(message.data["type"], "queue_update");
    }
}
