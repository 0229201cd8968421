//! Paginated event listing.

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use serde_json::Value as Json;

use rally_api::store::{path, Fields};

use super::test_utils::TestApp;

/// Five events, `e1` oldest to `e5` newest.
async fn events_app() -> TestApp {
    let app = TestApp::new();
    for day in 1..=5u32 {
        let mut fields = Fields::new();
        fields.insert("name".into(), format!("Rally {}", day).into());
        fields.insert(
            "createdAt".into(),
            Utc.with_ymd_and_hms(2026, 1, day, 8, 0, 0).unwrap().into(),
        );
        app.store
            .insert(path::event(&format!("e{}", day)).unwrap(), fields)
            .await;
    }
    app
}

fn ids(listing: &Json) -> Vec<&str> {
    listing
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_events_newest_first_as_bare_array() {
    let app = events_app().await;

    let response = app.get("/api/events").await;
    assert_eq!(response.status, StatusCode::OK);
    let listing = response.json();
    assert_eq!(ids(&listing), vec!["e5", "e4", "e3", "e2", "e1"]);
    assert_eq!(listing[0]["name"], "Rally 5");
    assert_eq!(listing[0]["createdAt"], "2026-01-05T08:00:00.000000Z");
}

#[tokio::test]
async fn test_events_page_numbers() {
    let app = events_app().await;

    for (uri, expected) in [
        ("/api/events?size=2", vec!["e5", "e4"]),
        ("/api/events?size=2&page=2", vec!["e3", "e2"]),
        ("/api/events?size=2&page=3", vec!["e1"]),
        ("/api/events?size=2&page=4", vec![]),
        ("/api/events?size=2&page=0", vec!["e5", "e4"]),
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::OK, "{}", uri);
        assert_eq!(ids(&response.json()), expected, "{}", uri);
    }
}

#[tokio::test]
async fn test_events_cursor() {
    let app = events_app().await;

    for (uri, expected) in [
        ("/api/events?size=2&lastDocId=e4", vec!["e3", "e2"]),
        ("/api/events?size=2&lastDocId=e2", vec!["e1"]),
        // The cursor wins over the page number.
        ("/api/events?size=2&lastDocId=e4&page=3", vec!["e3", "e2"]),
        // An unknown cursor starts from the top.
        ("/api/events?size=2&lastDocId=missing", vec!["e5", "e4"]),
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::OK, "{}", uri);
        assert_eq!(ids(&response.json()), expected, "{}", uri);
    }
}

#[tokio::test]
async fn test_events_size_bounds() {
    let app = events_app().await;

    for uri in ["/api/events?size=0", "/api/events?size=-3", "/api/events?size=500"] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::OK, "{}", uri);
        assert_eq!(response.json().as_array().unwrap().len(), 5, "{}", uri);
    }

    for uri in ["/api/events?size=ten", "/api/events?page=two", "/api/events?size=1.5"] {
        app.get(uri).await.assert_bare(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_events_empty_listing() {
    let app = TestApp::new();

    let response = app.get("/api/events").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), Json::Array(Vec::new()));
}
