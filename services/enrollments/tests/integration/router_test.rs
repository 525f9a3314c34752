use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use campus_auth_types::token::Role;
use campus_enrollments::router::build_router;
use campus_enrollments::state::AppState;
use campus_testing::auth::MockAuth;

use crate::helpers::TEST_JWT_SECRET;

/// Router over a connection that was never opened: every route that reaches
/// the database fails, so these tests cover what happens before it.
fn app() -> Router {
    build_router(AppState::new(
        DatabaseConnection::Disconnected,
        TEST_JWT_SECRET.to_owned(),
    ))
}

fn request(method: &str, uri: &str, auth: Option<&MockAuth>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", auth.token()));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(req: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn should_answer_liveness_and_echo_request_id() {
    let response = app()
        .oneshot(request("GET", "/healthz", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn should_keep_caller_request_id() {
    let req = Request::builder()
        .uri("/healthz")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(req).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn should_report_not_ready_without_database() {
    let (status, _) = send(request("GET", "/readyz", None, None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn should_reject_missing_bearer_token() {
    let (status, body) = send(request("GET", "/check-access/1", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "UNAUTHORIZED");
}

#[tokio::test]
async fn should_reject_token_signed_with_other_secret() {
    let token = campus_auth_types::token::issue_access_token(
        Uuid::new_v4(),
        Role::Admin,
        4_000_000_000,
        "some-other-secret",
    )
    .unwrap()
    .0;
    let req = Request::builder()
        .method("POST")
        .uri("/provision-access/1")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_forbid_non_admin_mutations() {
    let student = MockAuth::student(Uuid::new_v4());
    let polo = MockAuth::new(Uuid::new_v4(), Role::Polo(3));
    let cases = [
        ("POST", "/provision-access/1", None),
        (
            "POST",
            "/block-access/1",
            Some(json!({ "reason": "nonpayment", "durationDays": 10 })),
        ),
        ("POST", "/unblock-access/1", Some(json!({ "reason": "paid" }))),
        (
            "PUT",
            "/update-access-period/1",
            Some(json!({ "expiresAt": null })),
        ),
        ("POST", "/v2/simplified-enrollments/1/convert", None),
        ("GET", "/enrollments", None),
        ("GET", "/enrollments/1/history", None),
    ];
    for auth in [&student, &polo] {
        for (method, uri, body) in cases.clone() {
            let (status, body) = send(request(method, uri, Some(auth), body)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(body["kind"], "FORBIDDEN");
        }
    }
}

#[tokio::test]
async fn should_forbid_students_from_submitting_intake() {
    let student = MockAuth::student(Uuid::new_v4());
    let body = json!({
        "studentName": "Ana",
        "studentEmail": "ana@example.com",
        "courseId": 1,
        "institutionId": 1,
        "amountCents": 1000,
    });
    let (status, _) = send(request(
        "POST",
        "/v2/simplified-enrollments",
        Some(&student),
        Some(body),
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn should_forbid_students_from_reading_intake_records() {
    let student = MockAuth::student(Uuid::new_v4());
    let (status, body) = send(request(
        "GET",
        "/v2/simplified-enrollments/1",
        Some(&student),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "FORBIDDEN");
}

#[tokio::test]
async fn should_reject_unknown_status_value() {
    let admin = MockAuth::admin();
    let (status, body) = send(request(
        "PATCH",
        "/enrollments/1/status",
        Some(&admin),
        Some(json!({ "status": "archived" })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "INVALID_STATUS");
}

#[tokio::test]
async fn should_reject_oversized_block_duration() {
    let admin = MockAuth::admin();
    let (status, body) = send(request(
        "POST",
        "/block-access/1",
        Some(&admin),
        Some(json!({ "reason": "x", "durationDays": 4_000_000_000u32 })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "INVALID_ACCESS_PERIOD");
}

#[tokio::test]
async fn should_require_login_fields_for_token() {
    let (status, body) = send(request(
        "POST",
        "/auth/token",
        None,
        Some(json!({ "login": " ", "password": "x" })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "MISSING_DATA");
}

#[tokio::test]
async fn should_hide_database_failures_behind_generic_500() {
    let admin = MockAuth::admin();
    let (status, body) = send(request("GET", "/enrollments/1", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "INTERNAL");
    assert_eq!(body["message"], "internal error");
}
