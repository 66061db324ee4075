//! HTTP round trips through the full router.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use storerate_core::Role;
use storerate_integration_tests::{
    TEST_PASSWORD, create_store, create_user, test_pool, test_state, unique_email,
};
use storerate_server::app;

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "192.0.2.10");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn session_cookie(response: &axum::response::Response) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_owned()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_rate_store_over_http() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::User).await;
    let store = create_store(&pool, None).await;
    let router = app(test_state(pool));

    let login = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "email": user.email.as_str(), "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let cookie = session_cookie(&login);

    let body = json!({ "storeId": store.id, "value": 4 });
    let created = router
        .clone()
        .oneshot(json_request("POST", "/api/ratings", Some(&cookie), &body))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = router
        .clone()
        .oneshot(json_request("POST", "/api/ratings", Some(&cookie), &body))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let invalid = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/ratings",
            Some(&cookie),
            &json!({ "storeId": store.id, "value": 6 }),
        ))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let stats = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/stores/{}/statistics", store.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::OK);
    let stats = read_json(stats).await;
    assert_eq!(stats["ratingCount"], 1);
    assert_eq!(stats["distribution"]["4"], 1);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_register_validation_errors() {
    let pool = test_pool().await;
    let router = app(test_state(pool));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({
                "name": "Al",
                "email": unique_email("weak"),
                "password": "weak",
                "address": "1 Test Street"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["errors"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_admin_routes_require_admin() {
    let pool = test_pool().await;
    let router = app(test_state(pool));

    let anonymous = router
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

async fn login(router: &axum::Router, email: &str) -> String {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "email": email, "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_admin_owner_reads_store_dashboard() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;
    let plain = create_user(&pool, Role::User).await;
    let store = create_store(&pool, Some(admin.id)).await;
    let router = app(test_state(pool));

    let cookie = login(&router, admin.email.as_str()).await;
    let response = router
        .clone()
        .oneshot(get("/api/dashboard/store-owner", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["store"]["id"], json!(store.id));
    assert_eq!(body["statistics"]["ratingCount"], 0);

    let cookie = login(&router, plain.email.as_str()).await;
    let response = router
        .oneshot(get("/api/dashboard/store-owner", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_admin_without_store_is_refused_store_dashboard() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;
    let router = app(test_state(pool));

    let cookie = login(&router, admin.email.as_str()).await;
    let response = router
        .oneshot(get("/api/dashboard/store-owner", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
