//! HTTP API integration tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{create_router, AppContext, AppState};
use crate::clock::SystemClock;
use crate::identity::TokenService;
use crate::model::{Business, Gender, Helper, HelperStatus, Service, UserRecord};
use crate::notify::Notifier;
use crate::queue::{Engine, EngineSettings};
use crate::store::{businesses, customers, services, Store, StoreConfig};

struct TestApp {
    router: Router,
    store: Arc<Store>,
}

fn create_test_app() -> TestApp {
    let store = Arc::new(Store::open(StoreConfig::in_memory()).unwrap());
    store.migrate().unwrap();

    let clock = Arc::new(SystemClock);
    let engine = Engine::new(
        Arc::clone(&store),
        clock.clone(),
        Notifier::capturing(),
        EngineSettings::default(),
    );
    let state: AppState = Arc::new(AppContext {
        engine,
        tokens: TokenService::new("test-secret", 3_600),
        clock,
    });

    TestApp {
        router: create_router(state),
        store,
    }
}

fn seed_catalog(app: &TestApp) {
    app.store
        .with_tx(|tx| {
            businesses::put(
                tx,
                &Business {
                    id: "b1".to_string(),
                    owner_id: "owner-1".to_string(),
                    active: true,
                    timezone: "UTC".to_string(),
                    deleted: false,
                    suspended: false,
                    helpers: vec![Helper {
                        helper_id: "h1".to_string(),
                        status: HelperStatus::Accepted,
                        active: true,
                        services: BTreeSet::from(["cut".to_string()]),
                    }],
                },
            )?;
            services::put(
                tx,
                &Service {
                    id: "cut".to_string(),
                    business_id: "b1".to_string(),
                    name: "Haircut".to_string(),
                    duration_minutes: 30,
                    price: 25.0,
                    allowed_genders: BTreeSet::from([Gender::Male, Gender::Female]),
                    deleted: false,
                },
            )?;
            customers::put_user(
                tx,
                &UserRecord {
                    id: "u1".to_string(),
                    push_token: None,
                    receive_notifications: true,
                    gender: Gender::Male,
                    active: true,
                    deleted: false,
                    suspended: false,
                },
            )?;
            Ok(())
        })
        .unwrap();
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn token_for(router: &Router, id: &str, role: &str) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/auth/token",
        None,
        Some(json!({"id": id, "role": role})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();
    let (status, body) = send(&app.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["success"].as_bool().unwrap());
}

#[tokio::test]
async fn test_missing_credential_is_unauthorized() {
    let app = create_test_app();
    let (status, body) = send(
        &app.router,
        "POST",
        "/queue",
        None,
        Some(json!({"businessId": "b1", "userType": "normal", "services": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body["success"].as_bool().unwrap());
}

#[tokio::test]
async fn test_enqueue_flow_over_http() {
    let app = create_test_app();
    seed_catalog(&app);
    let token = token_for(&app.router, "u1", "customer").await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/queue",
        Some(&token),
        Some(json!({
            "businessId": "b1",
            "userType": "normal",
            "services": [
                {"serviceId": "cut", "gender": "male", "preference": "any"}
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["success"].as_bool().unwrap());
    let entry = &body["data"][0];
    assert_eq!(entry["currentPosition"], 1);
    assert_eq!(entry["estWait"], 0);
    assert_eq!(entry["status"], "in_queue");
}

#[tokio::test]
async fn test_unknown_fields_rejected() {
    let app = create_test_app();
    seed_catalog(&app);
    let token = token_for(&app.router, "u1", "customer").await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/queue",
        Some(&token),
        Some(json!({
            "businessId": "b1",
            "userType": "normal",
            "services": [],
            "surprise": true
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["success"].as_bool().unwrap());
}

#[tokio::test]
async fn test_customer_hold_is_forbidden_over_http() {
    let app = create_test_app();
    seed_catalog(&app);
    let token = token_for(&app.router, "u1", "customer").await;

    let (_, enqueue_body) = send(
        &app.router,
        "POST",
        "/queue",
        Some(&token),
        Some(json!({
            "businessId": "b1",
            "userType": "normal",
            "services": [
                {"serviceId": "cut", "gender": "male", "preference": "any"}
            ]
        })),
    )
    .await;
    let queue_id = enqueue_body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/queue/{}/action", queue_id),
        Some(&token),
        Some(json!({"action": "hold"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // remove on their own entry succeeds
    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/queue/{}/action", queue_id),
        Some(&token),
        Some(json!({"action": "remove"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "removed");
}

#[tokio::test]
async fn test_vendor_action_and_restructure_report() {
    let app = create_test_app();
    seed_catalog(&app);
    let user_token = token_for(&app.router, "u1", "customer").await;
    let owner_token = token_for(&app.router, "owner-1", "ownerOrHelper").await;

    let (_, enqueue_body) = send(
        &app.router,
        "POST",
        "/queue",
        Some(&user_token),
        Some(json!({
            "businessId": "b1",
            "userType": "normal",
            "services": [
                {"serviceId": "cut", "gender": "male", "preference": "any"}
            ]
        })),
    )
    .await;
    let queue_id = enqueue_body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/queue/{}/action", queue_id),
        Some(&owner_token),
        Some(json!({"action": "next"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = send(
        &app.router,
        "POST",
        "/queue/restructure",
        Some(&owner_token),
        Some(json!({"businessId": "b1", "startTime": 0, "endTime": 4102444800000u64})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updatedCount"], 0);
    assert_eq!(body["data"]["activeHelpers"], 1);
}

#[tokio::test]
async fn test_wait_times_endpoint() {
    let app = create_test_app();
    seed_catalog(&app);
    let token = token_for(&app.router, "u1", "customer").await;

    let (status, body) = send(
        &app.router,
        "GET",
        "/businesses/b1/wait-times",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let waits = body["data"].as_array().unwrap();
    assert_eq!(waits.len(), 1);
    assert_eq!(waits[0]["helperId"], "h1");
    assert_eq!(waits[0]["queueLength"], 0);
}

#[tokio::test]
async fn test_helper_queue_requires_vendor() {
    let app = create_test_app();
    seed_catalog(&app);
    let user_token = token_for(&app.router, "u1", "customer").await;

    let (status, _) = send(
        &app.router,
        "GET",
        "/helpers/h1/queue",
        Some(&user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_not_found_entry_maps_to_404() {
    let app = create_test_app();
    seed_catalog(&app);
    let owner_token = token_for(&app.router, "owner-1", "ownerOrHelper").await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/queue/ghost/action",
        Some(&owner_token),
        Some(json!({"action": "hold"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body["success"].as_bool().unwrap());
}
