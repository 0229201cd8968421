//! Competitor lookups, route resolution and registration.

use axum::http::{Method, StatusCode};
use serde_json::{json, Value as Json};

use rally_api::store::path::{
    self, DAY_OF_RACES, EVENT_CATEGORIES, EVENT_PARTICIPANTS, EVENT_ROUTES,
    USER_EMERGENCY_CONTACTS, USER_HEALTH_DATA, USER_MEMBERSHIP, USER_PERSONAL_DATA,
    USER_VEHICLES,
};
use rally_api::DocumentStore;

use super::test_utils::TestApp;

const ROUTE_URI: &str = "/api/competitor-route/e1/d1/c1";

/// Fixture where every precondition of the route chain holds.
struct RouteFixture {
    participant: Json,
    day: Option<Json>,
    category: Json,
    route: Json,
}

impl RouteFixture {
    fn passing() -> Self {
        Self {
            participant: json!({
                "isAvailable": true,
                "competitionCategory": { "pilotNumber": 7, "registrationCategory": "Pro" },
            }),
            day: Some(json!({ "day": "Saturday", "isActivate": true })),
            category: json!({ "name": "Pro" }),
            route: json!({
                "name": "Pro loop",
                "routeUrl": "https://maps.example/pro.gpx",
                "totalDistance": 120,
                "typedistance": "km",
                "dayOfRaceIds": ["d1"],
                "categoryIds": ["cat-pro"],
            }),
        }
    }

    async fn seed(&self, app: &TestApp) {
        let event_doc = |collection: &str, id: &str| {
            path::event_collection("e1", collection)
                .unwrap()
                .doc(id)
                .unwrap()
        };
        app.seed(event_doc(EVENT_PARTICIPANTS, "c1"), self.participant.clone())
            .await;
        if let Some(day) = &self.day {
            app.seed(event_doc(DAY_OF_RACES, "d1"), day.clone()).await;
        }
        app.seed(event_doc(EVENT_CATEGORIES, "cat-pro"), self.category.clone())
            .await;
        app.seed(event_doc(EVENT_ROUTES, "r1"), self.route.clone())
            .await;
    }
}

#[tokio::test]
async fn test_competitor_route_shape() {
    let app = TestApp::new();
    RouteFixture::passing().seed(&app).await;

    let response = app.get(ROUTE_URI).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "competitor": { "id": "c1", "category": "7", "nombre": "Pro" },
            "route": {
                "id": "r1",
                "name": "Pro loop",
                "route": "https://maps.example/pro.gpx",
                "version": 1,
                "totalDistance": 120,
                "typedistance": "km",
            },
        })
    );
}

#[tokio::test]
async fn test_competitor_route_from_query_string() {
    let app = TestApp::new();
    RouteFixture::passing().seed(&app).await;

    let response = app
        .get("/api/competitor-route?eventId=e1&dayId=d1&competitorId=c1")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["route"]["id"], "r1");
}

#[tokio::test]
async fn test_each_failed_precondition_is_not_found() {
    let breakers: Vec<(&str, fn(&mut RouteFixture))> = vec![
        ("unavailable", |f| f.participant["isAvailable"] = json!(false)),
        ("inactive day", |f| {
            f.day = Some(json!({ "day": "Saturday", "isActivate": false }))
        }),
        ("missing day", |f| f.day = None),
        ("no category", |f| {
            f.participant["competitionCategory"]["registrationCategory"] = json!("")
        }),
        ("unknown category", |f| f.category["name"] = json!("Amateur")),
        ("route on another day", |f| f.route["dayOfRaceIds"] = json!(["d2"])),
        ("route for another category", |f| {
            f.route["categoryIds"] = json!(["cat-other"])
        }),
    ];

    for (label, breaker) in breakers {
        let app = TestApp::new();
        let mut fixture = RouteFixture::passing();
        breaker(&mut fixture);
        fixture.seed(&app).await;

        let response = app.get(ROUTE_URI).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", label);
        assert!(response.body.is_empty(), "{}", label);
    }
}

#[tokio::test]
async fn test_missing_participant_is_not_found() {
    let app = TestApp::new();
    app.get(ROUTE_URI).await.assert_bare(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_competitor_by_id() {
    let app = TestApp::new();
    RouteFixture::passing().seed(&app).await;

    let response = app.get("/api/get-competitor-by-id/e1/c1").await;
    assert_eq!(response.status, StatusCode::OK);

    let competitor = response.json();
    assert_eq!(competitor["id"], "c1");
    assert_eq!(competitor["eventId"], "e1");
    assert_eq!(competitor["competitionCategory"]["pilotNumber"], 7);
    assert_eq!(competitor["score"], 0);
    assert_eq!(competitor["timesToStart"], json!([]));

    app.get("/api/get-competitor-by-id/e1/ghost")
        .await
        .assert_bare(StatusCode::NOT_FOUND);
    app.get("/api/get-competitor-by-id?eventId=e1")
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_competitors_by_event_filters_and_order() {
    let app = TestApp::new();
    let participants = path::event_collection("e1", EVENT_PARTICIPANTS).unwrap();
    for (id, date, category, team) in [
        ("c1", "2026-01-01", "Pro", "Red"),
        ("c2", "2026-03-01", "Pro", "Blue"),
        ("c3", "2026-02-01", "Amateur", "Red"),
    ] {
        app.seed(
            participants.doc(id).unwrap(),
            json!({
                "registrationDate": date,
                "team": team,
                "competitionCategory": { "registrationCategory": category },
            }),
        )
        .await;
    }

    let ids = |json: Json| -> Vec<String> {
        json.as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap().to_string())
            .collect()
    };

    let all = app.get("/api/get-competitors-by-event/e1").await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(ids(all.json()), ["c2", "c3", "c1"]);

    let pro = app.get("/api/get-competitors-by-event/e1?category=Pro").await;
    assert_eq!(ids(pro.json()), ["c2", "c1"]);

    let red_pro = app
        .get("/api/get-competitors-by-event/e1?category=Pro&team=Red")
        .await;
    assert_eq!(ids(red_pro.json()), ["c1"]);

    let none = app.get("/api/get-competitors-by-event/other").await;
    assert_eq!(none.status, StatusCode::OK);
    assert_eq!(none.json(), json!([]));
}

// =============================================================================
// Registration
// =============================================================================

async fn registration_app() -> TestApp {
    let app = TestApp::new();
    app.seed(path::event("e1").unwrap(), json!({ "name": "Baja 1000" }))
        .await;
    app.seed(path::user("u1").unwrap(), json!({ "email": "u1@rally.mx" }))
        .await;
    app.seed(path::user("u2").unwrap(), json!({ "email": "u2@rally.mx" }))
        .await;
    app
}

fn competitor_account(email: &str, username: &str, pilot: &str) -> Json {
    json!({
        "email": email,
        "username": username,
        "personalData": {
            "fullName": "Ana Ruiz",
            "phone": "(664) 123-4567",
            "dateOfBirth": "1990-05-04",
            "city": "Tijuana",
        },
        "healthData": { "bloodType": "O+" },
        "emergencyContacts": [
            { "fullName": "Luis Ruiz", "phone": "+52 664 111 2233", "relationship": "brother" },
        ],
        "vehicleData": { "brand": "Honda", "model": "CRF450", "year": 2023, "color": "Red" },
        "competition": {
            "eventId": "e1",
            "pilotNumber": pilot,
            "registrationCategory": "Pro",
            "team": "Dust Devils",
        },
    })
}

async fn user_docs(app: &TestApp, user_id: &str, collection: &str) -> Vec<Json> {
    app.store
        .list(&path::user_collection(user_id, collection).unwrap())
        .await
        .unwrap()
        .iter()
        .map(|doc| doc.to_json())
        .collect()
}

#[tokio::test]
async fn test_create_competitor() {
    let app = registration_app().await;

    let response = app
        .send(
            Method::POST,
            "/api/create-competitor",
            Some(json!({
                "userId": " u1 ",
                "eventId": "e1",
                "competitionCategory": { "pilotNumber": "7", "registrationCategory": "Pro" },
                "registrationDate": "2026-02-01T10:00:00Z",
                "team": "Red",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json(), json!({ "id": "u1" }));

    let competitor = app.get("/api/get-competitor-by-id/e1/u1").await;
    assert_eq!(competitor.status, StatusCode::OK);
    let competitor = competitor.json();
    assert_eq!(competitor["id"], "u1");
    assert_eq!(competitor["team"], "Red");

    let stored = app
        .store
        .get(&path::event_collection("e1", EVENT_PARTICIPANTS).unwrap().doc("u1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.str("userId"), Some("u1"));
    assert_eq!(stored.json("registrationDate"), json!("2026-02-01T10:00:00.000000Z"));
    assert_eq!(stored.json("timesToStart"), json!([]));
}

#[tokio::test]
async fn test_create_competitor_rejections() {
    let app = registration_app().await;
    let register = |user: &str, pilot: &str| {
        json!({
            "userId": user,
            "eventId": "e1",
            "competitionCategory": { "pilotNumber": pilot },
        })
    };

    let created = app
        .send(Method::POST, "/api/create-competitor", Some(register("u1", "7")))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    // Already registered, then pilot number taken.
    app.send(Method::POST, "/api/create-competitor", Some(register("u1", "8")))
        .await
        .assert_bare(StatusCode::CONFLICT);
    app.send(Method::POST, "/api/create-competitor", Some(register("u2", "7")))
        .await
        .assert_bare(StatusCode::CONFLICT);

    app.send(Method::POST, "/api/create-competitor", Some(register("ghost", "9")))
        .await
        .assert_bare(StatusCode::NOT_FOUND);
    app.send(
        Method::POST,
        "/api/create-competitor",
        Some(json!({ "userId": "u2", "eventId": "nope" })),
    )
    .await
    .assert_bare(StatusCode::NOT_FOUND);

    app.send(Method::POST, "/api/create-competitor", Some(json!({ "eventId": "e1" })))
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
    app.send(Method::GET, "/api/create-competitor", None)
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_competitor_user_writes_account() {
    let app = registration_app().await;

    let response = app
        .send(
            Method::POST,
            "/api/create-competitor-user",
            Some(competitor_account("ana@rally.mx", "ana_r", "42")),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let created = response.json();
    assert_eq!(created.as_object().unwrap().len(), 2);
    assert_eq!(created["membershipId"], "e1");
    let user_id = created["id"].as_str().unwrap().to_string();

    let user = app
        .store
        .get(&path::user(&user_id).unwrap())
        .await
        .unwrap()
        .unwrap()
        .to_json();
    assert_eq!(user["email"], "ana@rally.mx");
    assert_eq!(user["username"], "ana_r");
    assert_eq!(user["isActive"], false);
    assert_eq!(user["authUserId"], Json::Null);

    let personal = user_docs(&app, &user_id, USER_PERSONAL_DATA).await;
    assert_eq!(personal.len(), 1);
    assert_eq!(personal[0]["fullName"], "Ana Ruiz");
    assert_eq!(personal[0]["dateOfBirth"], "1990-05-04");
    assert_eq!(personal[0]["country"], "");

    let health = user_docs(&app, &user_id, USER_HEALTH_DATA).await;
    assert_eq!(health[0]["bloodType"], "O+");

    let contacts = user_docs(&app, &user_id, USER_EMERGENCY_CONTACTS).await;
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["relationship"], "brother");

    let vehicles = app.get(&format!("/api/vehicles?userId={}", user_id)).await.json();
    assert_eq!(vehicles[0]["branch"], "Honda");
    assert_eq!(vehicles[0]["year"], 2023);

    let membership = user_docs(&app, &user_id, USER_MEMBERSHIP).await;
    assert_eq!(membership[0]["id"], "e1");
    assert_eq!(membership[0]["userId"], user_id.as_str());

    let competitor = app
        .get(&format!("/api/get-competitor-by-id/e1/{}", user_id))
        .await
        .json();
    assert_eq!(competitor["team"], "Dust Devils");
}

#[tokio::test]
async fn test_create_competitor_user_conflicts_write_nothing() {
    let app = registration_app().await;
    let created = app
        .send(
            Method::POST,
            "/api/create-competitor-user",
            Some(competitor_account("ana@rally.mx", "ana_r", "42")),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let before = app.store.len().await;

    for (email, username, pilot) in [
        ("ana@rally.mx", "someone", "1"),
        ("other@rally.mx", "ana_r", "1"),
        ("other@rally.mx", "someone", "42"),
    ] {
        app.send(
            Method::POST,
            "/api/create-competitor-user",
            Some(competitor_account(email, username, pilot)),
        )
        .await
        .assert_bare(StatusCode::CONFLICT);
    }

    let mut unknown_event = competitor_account("other@rally.mx", "someone", "1");
    unknown_event["competition"]["eventId"] = json!("nope");
    app.send(Method::POST, "/api/create-competitor-user", Some(unknown_event))
        .await
        .assert_bare(StatusCode::NOT_FOUND);

    let mut bad_email = competitor_account("not-an-email", "someone", "1");
    bad_email["emergencyContacts"] = json!([]);
    app.send(Method::POST, "/api/create-competitor-user", Some(bad_email))
        .await
        .assert_bare(StatusCode::BAD_REQUEST);

    assert_eq!(app.store.len().await, before);
}

#[tokio::test]
async fn test_delete_competitor_user_removes_everything() {
    let app = registration_app().await;
    let before = app.store.len().await;

    let created = app
        .send(
            Method::POST,
            "/api/create-competitor-user",
            Some(competitor_account("ana@rally.mx", "ana_r", "42")),
        )
        .await
        .json();
    let user_id = created["id"].as_str().unwrap().to_string();
    assert!(app.store.len().await > before);

    app.send(
        Method::DELETE,
        "/api/delete-competitor-user",
        Some(json!({ "email": "ana@rally.mx", "event_id": "e1" })),
    )
    .await
    .assert_bare(StatusCode::NO_CONTENT);

    assert_eq!(app.store.len().await, before);
    for collection in [
        USER_PERSONAL_DATA,
        USER_HEALTH_DATA,
        USER_EMERGENCY_CONTACTS,
        USER_VEHICLES,
        USER_MEMBERSHIP,
    ] {
        assert!(user_docs(&app, &user_id, collection).await.is_empty());
    }
    app.get(&format!("/api/get-competitor-by-id/e1/{}", user_id))
        .await
        .assert_bare(StatusCode::NOT_FOUND);

    // The pilot number is free again.
    let reused = app
        .send(
            Method::POST,
            "/api/create-competitor",
            Some(json!({
                "userId": "u1",
                "eventId": "e1",
                "competitionCategory": { "pilotNumber": "42" },
            })),
        )
        .await;
    assert_eq!(reused.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_delete_competitor_user_rejections() {
    let app = registration_app().await;

    for body in [
        json!({ "userId": "u1" }),
        json!({ "eventId": "e1" }),
        json!({ "userId": "  ", "eventId": "e1" }),
    ] {
        app.send(Method::DELETE, "/api/delete-competitor-user", Some(body))
            .await
            .assert_bare(StatusCode::BAD_REQUEST);
    }

    app.send(
        Method::DELETE,
        "/api/delete-competitor-user",
        Some(json!({ "email": "nobody@rally.mx", "eventId": "e1" })),
    )
    .await
    .assert_bare(StatusCode::NOT_FOUND);
    app.send(
        Method::DELETE,
        "/api/delete-competitor-user",
        Some(json!({ "userId": "ghost", "eventId": "e1" })),
    )
    .await
    .assert_bare(StatusCode::NOT_FOUND);
    app.send(
        Method::POST,
        "/api/delete-competitor-user",
        Some(json!({ "userId": "u1", "eventId": "e1" })),
    )
    .await
    .assert_bare(StatusCode::BAD_REQUEST);
}
