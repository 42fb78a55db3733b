use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use std::net::SocketAddr;
use tower::ServiceExt;

use super::helpers::{create_test_app_with, json, seed_user, test_request, PASSWORD};

fn login_from(peer: [u8; 4], password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .extension(ConnectInfo(SocketAddr::from((peer, 40000))))
        .body(Body::from(
            json!({ "email": "test@example.com", "password": password }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn login_is_limited_per_client() {
    let app = create_test_app_with(&[("AUTH_RATE_LIMIT_MAX", "3")]).await;
    seed_user(&app.pool, "test@example.com", "testuser", false).await;

    for _ in 0..3 {
        let response = app
            .router
            .clone()
            .oneshot(login_from([10, 0, 0, 1], "WrongPassword1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused once the bucket is empty.
    let response = app
        .router
        .clone()
        .oneshot(login_from([10, 0, 0, 1], PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = json(std::str::from_utf8(&body).unwrap());
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");

    // Another client is unaffected.
    let response = app
        .router
        .oneshot(login_from([10, 0, 0, 2], PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_and_login_share_a_bucket() {
    let app = create_test_app_with(&[("AUTH_RATE_LIMIT_MAX", "2")]).await;

    let register = |username: &'static str| {
        json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "password": PASSWORD
        })
    };

    let (status, _, _) = test_request(
        app.router.clone(),
        "POST",
        "/auth/register",
        Some(register("first")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = test_request(
        app.router.clone(),
        "POST",
        "/auth/login",
        Some(json!({ "email": "first@example.com", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = test_request(
        app.router.clone(),
        "POST",
        "/auth/register",
        Some(register("second")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json(&body)["code"], "RATE_LIMIT_EXCEEDED");

    // Refresh has its own bucket.
    let (status, body, _) =
        test_request(app.router, "POST", "/auth/refresh", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "REFRESH_TOKEN_REQUIRED");
}

#[tokio::test]
async fn refresh_is_limited_separately() {
    let app = create_test_app_with(&[("REFRESH_RATE_LIMIT_MAX", "1")]).await;

    let (status, _, _) =
        test_request(app.router.clone(), "POST", "/auth/refresh", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body, _) =
        test_request(app.router.clone(), "POST", "/auth/refresh", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json(&body)["code"], "RATE_LIMIT_EXCEEDED");

    let (status, _, _) = test_request(
        app.router,
        "POST",
        "/auth/login",
        Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
