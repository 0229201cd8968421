//! Bearer-token authentication, method handling, CORS and health.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use rally_api::store::path::{self, DAY_OF_RACES};
use rally_api::{HmacTokenVerifier, RouterConfig};

use super::test_utils::{TestApp, TEST_SECRET};

fn request(method: Method, uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn seeded_app() -> TestApp {
    let app = TestApp::new();
    app.seed(
        path::event_collection("e1", DAY_OF_RACES)
            .unwrap()
            .doc("d1")
            .unwrap(),
        json!({ "isActivate": true }),
    )
    .await;
    app
}

#[tokio::test]
async fn test_valid_token_is_accepted() {
    let app = seeded_app().await;
    let token = app.token("staff-1");

    let response = app
        .call(request(
            Method::GET,
            "/api/days-of-race/e1",
            Some(&format!("Bearer {}", token)),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_or_malformed_header() {
    let app = seeded_app().await;
    let token = app.token("staff-1");

    for authorization in [
        None,
        Some(String::new()),
        Some("Bearer ".to_string()),
        Some(token.clone()),
        Some(format!("Basic {}", token)),
        Some("Bearer not-a-token".to_string()),
    ] {
        let response = app
            .call(request(
                Method::GET,
                "/api/days-of-race/e1",
                authorization.as_deref(),
            ))
            .await;
        response.assert_bare(StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_expired_and_forged_tokens() {
    let app = seeded_app().await;

    let expired = HmacTokenVerifier::new(TEST_SECRET)
        .unwrap()
        .issue_with_expiry("staff-1", 1_000);
    app.call(request(
        Method::GET,
        "/api/days-of-race/e1",
        Some(&format!("Bearer {}", expired)),
    ))
    .await
    .assert_bare(StatusCode::UNAUTHORIZED);

    let forged = HmacTokenVerifier::new("a-completely-different-secret")
        .unwrap()
        .issue("staff-1", std::time::Duration::from_secs(300));
    app.call(request(
        Method::GET,
        "/api/days-of-race/e1",
        Some(&format!("Bearer {}", forged)),
    ))
    .await
    .assert_bare(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_checked_before_parameters() {
    let app = TestApp::new();

    // Missing parameters would be a 400, an unknown user a 404.
    app.call(request(Method::GET, "/api/vehicles", None))
        .await
        .assert_bare(StatusCode::UNAUTHORIZED);
    app.call(request(Method::GET, "/api/vehicles?userId=ghost", None))
        .await
        .assert_bare(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_method_is_bad_request() {
    let app = seeded_app().await;
    let token = format!("Bearer {}", app.token("staff-1"));

    app.call(request(Method::POST, "/api/days-of-race/e1", Some(&token)))
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
    app.call(request(Method::GET, "/api/change-competitor-status", Some(&token)))
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
    app.call(request(Method::PATCH, "/api/catalogs/color", Some(&token)))
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
    app.call(request(Method::HEAD, "/api/days-of-race/e1", Some(&token)))
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
    app.call(request(Method::HEAD, "/api/vehicles?userId=u1", Some(&token)))
        .await
        .assert_bare(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_path_ids_are_bad_request() {
    let app = seeded_app().await;
    let token = format!("Bearer {}", app.token("staff-1"));

    for (method, uri) in [
        (Method::GET, "/api/competitor-route/e1/d1"),
        (Method::GET, "/api/get-competitor-by-id/e1"),
        (Method::GET, "/api/days-of-race/"),
        (Method::GET, "/api/checkpoint/cp1"),
        (Method::GET, "/api/all-competitor-tracking/e1"),
        (Method::PUT, "/api/update-competitor-status/e1/d1/c1"),
        (Method::GET, "/api/catalogs/"),
    ] {
        let response = app.call(request(method, uri, Some(&token))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(response.body.is_empty());
    }

    // Authentication is still decided first.
    app.call(request(Method::GET, "/api/competitor-route/e1/d1", None))
        .await
        .assert_bare(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_paths_are_not_found() {
    let app = seeded_app().await;
    let token = format!("Bearer {}", app.token("staff-1"));

    for uri in ["/api/no-such-endpoint", "/api/days-of-races/e1", "/favicon.ico"] {
        app.call(request(Method::GET, uri, Some(&token)))
            .await
            .assert_bare(StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = TestApp::new();

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/change-competitor-status")
        .header(header::ORIGIN, "https://app.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.call(preflight).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
    assert_eq!(
        response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );

    let methods = response
        .headers
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("PUT"));
    assert!(!methods.contains("GET"));

    let headers = response
        .headers
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(headers.contains("authorization"));
    assert!(headers.contains("content-type"));

    assert_eq!(
        response.headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(),
        "3600"
    );
}

#[tokio::test]
async fn test_cors_origin_on_every_response() {
    let app = TestApp::new();

    let response = app
        .call(
            Request::builder()
                .uri("/api/days-of-race/e1")
                .header(header::ORIGIN, "https://app.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    response.assert_bare(StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let app = TestApp::with_config(
        RouterConfig::new()
            .with_tracing(false)
            .with_cors_origins(vec!["https://app.example".to_string()]),
    );

    let allowed = app
        .call(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://app.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(
        allowed.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://app.example"
    );

    let denied = app
        .call(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert!(denied.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();

    let response = app.call(request(Method::GET, "/health", None)).await;
    assert_eq!(response.status, StatusCode::OK);

    let health = response.json();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}
