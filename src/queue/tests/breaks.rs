//! Break and resume tests.

use super::*;
use crate::queue::BreakRequest;

fn break_req(business_id: &str, helper_id: Option<&str>) -> BreakRequest {
    BreakRequest {
        business_id: business_id.to_string(),
        helper_id: helper_id.map(|s| s.to_string()),
        reason: None,
        duration: None,
        message: None,
    }
}

#[tokio::test]
async fn test_helper_break_migrates_flexible_entries() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"]), ("h2", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);

    // Three entries on h1, none on h2: alternate enqueues land on h1
    // only when h2 is not yet seeded, so pin them with specific.
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
                        preference: Preference::Specific,
                        helper_id: Some("h1".to_string()),
                    }],
                },
            )
            .await
            .unwrap()
            .remove(0);
        created.push(entry);
        rig.clock.advance_secs(60);
    }
    assert_eq!(lane_of(&rig, "b1", "h1").len(), 3);

    rig.notifier.clear_captured();
    rig.engine
        .set_break(&owner_of("b1"), break_req("b1", Some("h1")))
        .await
        .unwrap();

    // All three migrated to h2 in joining-time order. A specific
    // preference is downgraded to flexible once its helper is inactive.
    let lane = lane_positions(&rig, "b1", "h2");
    assert_eq!(lane.len(), 3);
    for (idx, entry) in created.iter().enumerate() {
        let loaded = reload(&rig, &entry.id);
        assert_eq!(loaded.helper_id, "h2");
        assert_eq!(loaded.current_position, idx as u32 + 1);
        let edit = loaded
            .history
            .iter()
            .rev()
            .find(|e| e.action == crate::model::HistoryAction::Edit)
            .unwrap();
        assert_eq!(edit.newly_assigned_helper_id.as_deref(), Some("h2"));
    }
    assert!(lane_of(&rig, "b1", "h1").is_empty());
    assert_invariants(&rig, "b1");

    // Each user got one break notice plus one reassignment notice
    let captured = rig.notifier.captured();
    let reassigned = captured
        .iter()
        .filter(|m| m.body.contains("Helper reassigned"))
        .count();
    assert_eq!(reassigned, 3);
    let breaks = captured
        .iter()
        .filter(|m| m.data["type"] == "break")
        .count();
    assert_eq!(breaks, 3);
}

#[tokio::test]
async fn test_business_break_notifies_everyone_and_blocks_enqueue() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    for i in 1..=2 {
        let user = format!("u{}", i);
        seed_user(&rig, &user);
        enqueue_any(&rig, &user, "b1", "cut").await;
    }

    rig.notifier.clear_captured();
    rig.engine
        .set_break(&owner_of("b1"), break_req("b1", None))
        .await
        .unwrap();

    let captured = rig.notifier.captured();
    assert_eq!(captured.len(), 2);
    for message in &captured {
        assert_eq!(message.data["type"], "break");
    }

    let business = rig
        .store
        .with_conn(|conn| businesses::require(conn, "b1"))
        .unwrap();
    assert!(!business.active);
}

#[tokio::test]
async fn test_custom_break_message_is_used() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    seed_user(&rig, "u1");
    enqueue_any(&rig, "u1", "b1", "cut").await;

    rig.notifier.clear_captured();
    rig.engine
        .set_break(
            &owner_of("b1"),
            BreakRequest {
                business_id: "b1".to_string(),
                helper_id: None,
                reason: Some("lunch".to_string()),
                duration: Some(30),
                message: Some("Back at 1pm!".to_string()),
            },
        )
        .await
        .unwrap();

    let captured = rig.notifier.captured();
    assert_eq!(captured[0].body, "Back at 1pm!");
}

#[tokio::test]
async fn test_resume_restores_scheduling() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    seed_user(&rig, "u1");

    rig.engine
        .set_break(&owner_of("b1"), break_req("b1", None))
        .await
        .unwrap();
    rig.engine
        .resume_break(&owner_of("b1"), break_req("b1", None))
        .await
        .unwrap();

    // Enqueue works again after resume
    let entry = enqueue_any(&rig, "u1", "b1", "cut").await;
    assert_eq!(entry.current_position, 1);
}

#[tokio::test]
async fn test_helper_resume_rebalances_back() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"]), ("h2", &["cut"])]);
    seed_service(&rig, "cut", "b1", 30, 25.0);
    for i in 1..=4 {
        let user = format!("u{}", i);
        seed_user(&rig, &user);
        enqueue_any(&rig, &user, "b1", "cut").await;
        rig.clock.advance_secs(30);
    }

    rig.engine
        .set_break(&owner_of("b1"), break_req("b1", Some("h1")))
        .await
        .unwrap();
    assert!(lane_of(&rig, "b1", "h1").is_empty());
    assert_eq!(lane_of(&rig, "b1", "h2").len(), 4);

    rig.engine
        .resume_break(&owner_of("b1"), break_req("b1", Some("h1")))
        .await
        .unwrap();

    // Flexible entries spread back across both lanes
    assert_invariants(&rig, "b1");
    assert!(!lane_of(&rig, "b1", "h1").is_empty());
}

#[tokio::test]
async fn test_break_requires_vendor() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);

    let err = rig
        .engine
        .set_break(&customer("u1"), break_req("b1", None))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 403);
}

#[tokio::test]
async fn test_break_unknown_helper_is_not_found() {
    let rig = setup();
    seed_business(&rig, "b1", &[("h1", &["cut"])]);

    let err = rig
        .engine
        .set_break(&owner_of("b1"), break_req("b1", Some("ghost")))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 404);
}
