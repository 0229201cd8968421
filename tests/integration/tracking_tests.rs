//! Competitor tracking views and status mutations.

use axum::http::{Method, StatusCode};
use serde_json::{json, Value as Json};

use rally_api::store::path;
use rally_api::DocumentStore;

use super::test_utils::TestApp;

/// Two competitors on day d1 of e1 with three checkpoints each.
async fn seeded_app() -> TestApp {
    let app = TestApp::new();
    let competitors = path::tracking_competitors("e1", "d1").unwrap();

    for (id, name, number) in [("c1", "Ana", json!(7)), ("c2", "Luis", json!(null))] {
        app.seed(
            competitors.doc(id).unwrap(),
            json!({ "name": name, "number": number, "category": "Pro", "order": 1 }),
        )
        .await;

        let checkpoints = path::tracking_checkpoints("e1", "d1", id).unwrap();
        for (cp, order, kind) in [("cp1", 1, "start"), ("cp2", 2, "pass"), ("cp3", 3, "finish")] {
            app.seed(
                checkpoints.doc(cp).unwrap(),
                json!({
                    "name": format!("Checkpoint {}", order),
                    "order": order,
                    "checkpointType": kind,
                    "statusCompetitor": "none",
                }),
            )
            .await;
        }
    }

    app.seed(
        path::tracking_routes("e1", "d1").unwrap().doc("r1").unwrap(),
        json!({ "name": "Desert loop", "checkpointIds": ["cp1", "cp2", "cp3"] }),
    )
    .await;
    app
}

async fn checkpoint(app: &TestApp, competitor: &str, checkpoint: &str) -> Json {
    let path = path::tracking_checkpoints("e1", "d1", competitor)
        .unwrap()
        .doc(checkpoint)
        .unwrap();
    app.store.get(&path).await.unwrap().unwrap().to_json()
}

fn change_body(checkpoint: &str, order: i64, status: &str, last: &str) -> Json {
    json!({
        "eventId": "e1",
        "dayOfRaceId": "d1",
        "competitorId": "c1",
        "checkpointId": checkpoint,
        "orderCheckpoint": order,
        "status": status,
        "lastStatusCompetitor": last,
        "checkpointName": format!("Checkpoint {}", order),
        "note": "engine failure",
    })
}

#[tokio::test]
async fn test_competitor_tracking_at_checkpoint() {
    let app = seeded_app().await;

    let response = app.get("/api/competitor-tracking/e1/d1/cp2").await;
    assert_eq!(response.status, StatusCode::OK);

    let view = response.json();
    assert_eq!(view["routeName"], "Desert loop");

    let competitors = view["competitors"].as_array().unwrap();
    assert_eq!(competitors.len(), 2);
    assert_eq!(competitors[0]["id"], "c1");
    assert_eq!(competitors[0]["number"], "7");
    assert_eq!(competitors[1]["number"], "");
    assert!(competitors[0]["createdAt"].is_string());

    let checkpoints = competitors[0]["trackingCheckpoints"].as_array().unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0]["id"], "cp2");
    assert_eq!(checkpoints[0]["checkpointType"], "pass");
    assert_eq!(checkpoints[0]["statusCompetitor"], "none");
}

#[tokio::test]
async fn test_competitor_tracking_empty_day() {
    let app = TestApp::new();

    let response = app
        .get("/api/competitor-tracking?eventId=e1&dayOfRaceId=d1&checkpointId=cp1")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({ "competitors": [], "routeName": null })
    );
}

#[tokio::test]
async fn test_out_start_hidden_at_pass_checkpoint() {
    let app = seeded_app().await;
    app.seed(
        path::tracking_checkpoints("e1", "d1", "c2")
            .unwrap()
            .doc("cp2")
            .unwrap(),
        json!({ "order": 2, "checkpointType": "pass", "statusCompetitor": "outStart" }),
    )
    .await;

    let view = app.get("/api/competitor-tracking/e1/d1/cp2").await.json();
    let ids: Vec<&str> = view["competitors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["c1"]);
}

#[tokio::test]
async fn test_all_competitor_tracking() {
    let app = seeded_app().await;

    let response = app.get("/api/all-competitor-tracking/e1/d1").await;
    assert_eq!(response.status, StatusCode::OK);

    let competitors = response.json();
    let competitors = competitors.as_array().unwrap();
    assert_eq!(competitors.len(), 2);
    assert_eq!(competitors[1]["name"], "Luis");
    assert!(competitors[1]["createdAt"].is_null());

    let checkpoints = competitors[0]["trackingCheckpoints"].as_array().unwrap();
    let ids: Vec<&str> = checkpoints.iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["cp1", "cp2", "cp3"]);

    let empty = app.get("/api/all-competitor-tracking/e1/d9").await;
    assert_eq!(empty.json(), json!([]));
}

#[tokio::test]
async fn test_change_status_out_propagates_forward() {
    let app = seeded_app().await;

    let response = app
        .send(
            Method::PUT,
            "/api/change-competitor-status",
            Some(change_body("cp2", 2, "out", "none")),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "success": true }));

    let earlier = checkpoint(&app, "c1", "cp1").await;
    assert_eq!(earlier["statusCompetitor"], "none");

    let target = checkpoint(&app, "c1", "cp2").await;
    assert_eq!(target["statusCompetitor"], "out");
    assert_eq!(target["checkpointDisable"], "cp2");
    assert!(target["passTime"].is_string());

    let later = checkpoint(&app, "c1", "cp3").await;
    assert_eq!(later["statusCompetitor"], "out");
    assert_eq!(later["checkpointDisable"], "cp2");
    assert_eq!(later["checkpointDisableName"], "Checkpoint 2");
    assert_eq!(later["note"], "engine failure");
    assert!(later["passTime"].is_null());

    let other = checkpoint(&app, "c2", "cp3").await;
    assert_eq!(other["statusCompetitor"], "none");
}

#[tokio::test]
async fn test_change_status_back_from_out_resets_later_checkpoints() {
    let app = seeded_app().await;
    app.send(
        Method::PUT,
        "/api/change-competitor-status",
        Some(change_body("cp2", 2, "out", "none")),
    )
    .await;

    let response = app
        .send(
            Method::PUT,
            "/api/change-competitor-status",
            Some(change_body("cp2", 2, "check", "out")),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let target = checkpoint(&app, "c1", "cp2").await;
    assert_eq!(target["statusCompetitor"], "check");
    assert!(target["checkpointDisable"].is_null());

    let later = checkpoint(&app, "c1", "cp3").await;
    assert_eq!(later["statusCompetitor"], "none");
    assert!(later["checkpointDisable"].is_null());
    assert!(later["checkpointDisableName"].is_null());
}

#[tokio::test]
async fn test_change_status_rejections() {
    let app = seeded_app().await;

    app.send(
        Method::PUT,
        "/api/change-competitor-status",
        Some(change_body("cp2", 3, "out", "none")),
    )
    .await
    .assert_bare(StatusCode::BAD_REQUEST);

    app.send(
        Method::PUT,
        "/api/change-competitor-status",
        Some(change_body("cp2", 2, "sideways", "none")),
    )
    .await
    .assert_bare(StatusCode::BAD_REQUEST);

    app.send(
        Method::PUT,
        "/api/change-competitor-status",
        Some(change_body("cp9", 2, "out", "none")),
    )
    .await
    .assert_bare(StatusCode::NOT_FOUND);

    // Nothing was written by the rejected requests.
    let target = checkpoint(&app, "c1", "cp2").await;
    assert_eq!(target["statusCompetitor"], "none");
}

#[tokio::test]
async fn test_update_single_checkpoint_status() {
    let app = seeded_app().await;

    let response = app
        .send(
            Method::PUT,
            "/api/update-competitor-status/e1/d1/c1/cp3",
            Some(json!({ "status": "outLast", "checkpointDisableName": "Finish" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "success": true }));

    let target = checkpoint(&app, "c1", "cp3").await;
    assert_eq!(target["statusCompetitor"], "outLast");
    assert_eq!(target["checkpointDisable"], "cp3");
    assert_eq!(target["checkpointDisableName"], "Finish");

    let untouched = checkpoint(&app, "c1", "cp2").await;
    assert_eq!(untouched["statusCompetitor"], "none");

    app.send(
        Method::PUT,
        "/api/update-competitor-status/e1/d1/c1/cp3",
        Some(json!({ "status": "out" })),
    )
    .await
    .assert_bare(StatusCode::BAD_REQUEST);

    app.send(
        Method::PUT,
        "/api/update-competitor-status/e1/d1/c1/cp9",
        Some(json!({ "status": "check" })),
    )
    .await
    .assert_bare(StatusCode::NOT_FOUND);
}
