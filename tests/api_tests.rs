//! Tests del router que no tocan la base: el pool es lazy y nunca se conecta

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use vti_backend::middleware::auth::issue_session_token;

fn app() -> Router {
    vti_backend::create_router(common::offline_state())
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_protected_route_requires_session_cookie() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri(format!("/applications/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_mutation_without_cookie_is_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/applications/{}/consume-slot", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_signed_with_other_secret_is_rejected() {
    let token = issue_session_token(
        "another-secret",
        uuid::Uuid::new_v4(),
        chrono::Duration::hours(1),
    )
    .unwrap();

    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments")
                .header(header::COOKIE, format!("session={}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cron_requires_api_key() {
    let missing = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cron/condicional-expired")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cron/condicional-expired")
                .header("X-Api-Key", "not-the-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/no-such-route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
