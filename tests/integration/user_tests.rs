//! User profile and user creation.

use axum::http::{Method, StatusCode};
use serde_json::json;

use rally_api::store::path::{self, EVENT_CHECKPOINTS};
use rally_api::DocumentStore;

use super::test_utils::TestApp;

#[tokio::test]
async fn test_user_profile_with_assigned_events() {
    let app = TestApp::new();
    app.seed(
        path::user("u1").unwrap(),
        json!({
            "authUserId": "auth-1",
            "personalData": { "fullName": "Ana Ruiz" },
            "eventStaffRelations": [
                { "eventId": "e1", "checkpointIds": ["cp2"] },
                { "eventId": "missing", "checkpointIds": [] },
            ],
        }),
    )
    .await;
    app.seed(
        path::event("e1").unwrap(),
        json!({ "name": "Baja 1000", "rallySystemId": "rs-9", "status": "live", "year": 2026 }),
    )
    .await;
    let checkpoints = path::event_collection("e1", EVENT_CHECKPOINTS).unwrap();
    app.seed(checkpoints.doc("cp1").unwrap(), json!({ "name": "Start", "type": "start" }))
        .await;
    app.seed(
        checkpoints.doc("cp2").unwrap(),
        json!({ "name": "Summit", "type": "pass", "status": "open" }),
    )
    .await;

    let response = app.get("/api/user-profile?userId=auth-1").await;
    assert_eq!(response.status, StatusCode::OK);

    let profile = response.json();
    assert_eq!(profile["id"], "u1");
    assert_eq!(profile["personalData"]["fullName"], "Ana Ruiz");
    assert_eq!(profile["emergencyContact"], json!({}));
    assert_eq!(profile["userData"], json!({}));
    assert_eq!(profile["appVersion"], "2.0.0");

    assert_eq!(
        profile["assignedEvents"],
        json!([{
            "id": "e1",
            "name": "Baja 1000",
            "rallySystemId": "rs-9",
            "status": "live",
            "year": 2026,
            "checkpoints": [
                { "id": "cp2", "name": "Summit", "type": "pass", "status": "open" },
            ],
        }])
    );
}

#[tokio::test]
async fn test_user_profile_not_found_and_missing_param() {
    let app = TestApp::new();

    app.get("/api/user-profile?userId=nobody")
        .await
        .assert_bare(StatusCode::NOT_FOUND);
    app.get("/api/user-profile")
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_user_keeps_accepted_keys() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            "/api/users",
            Some(json!({
                "authUserId": "auth-2",
                "personalData": { "fullName": "Luis" },
                "isActive": true,
                "role": "admin",
                "createdAt": "1999-01-01T00:00:00Z",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let created = response.json();
    assert_eq!(created.as_object().unwrap().len(), 1);
    let id = created["id"].as_str().unwrap().to_string();

    let stored = app
        .store
        .get(&path::user(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.str("authUserId"), Some("auth-2"));
    assert!(stored.get("role").is_none());
    assert_ne!(stored.json("createdAt"), json!("1999-01-01T00:00:00Z"));
    assert_eq!(stored.get("createdAt"), stored.get("updatedAt"));

    let profile = app.get("/api/user-profile?userId=auth-2").await;
    assert_eq!(profile.json()["id"], id.as_str());
}

#[tokio::test]
async fn test_create_user_rejects_non_object() {
    let app = TestApp::new();

    app.send(Method::POST, "/api/users", Some(json!([1, 2, 3])))
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
}
