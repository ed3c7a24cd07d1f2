mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use tutordesk_models::users::UserRole;

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::new();
    app.user_with_password("tutor@test.com", "testpass123", UserRole::Instructor)
        .await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "tutor@test.com", "password": "testpass123"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["user"]["email"], "tutor@test.com");
    assert_eq!(body["user"]["role"], "instructor");
    assert!(body["user"]["last_login"].is_string());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_token_authenticates_me() {
    let app = TestApp::new();
    app.user_with_password("tutor@test.com", "testpass123", UserRole::Assistant)
        .await;

    let (_, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "tutor@test.com", "password": "testpass123"}),
        )
        .await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "tutor@test.com");
    assert_eq!(me["role"], "assistant");
}

#[tokio::test]
async fn test_login_invalid_password() {
    let app = TestApp::new();
    app.user_with_password("tutor@test.com", "testpass123", UserRole::Instructor)
        .await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "tutor@test.com", "password": "wrongpassword"}),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_unknown_email() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "nobody@test.com", "password": "testpass123"}),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_validation_error() {
    let app = TestApp::new();

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "not-an-email", "password": "testpass123"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/lessons", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/lessons", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let app = TestApp::new();
    let admin = app.user(UserRole::Admin).await;
    let tutor = app.user(UserRole::Instructor).await;
    let tutor_token = app.token_for(&tutor);

    let (status, _) = app
        .delete(
            &format!("/api/users/{}", tutor.id),
            Some(&app.token_for(&admin)),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/api/auth/me", Some(&tutor_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_change_applies_to_existing_token() {
    let app = TestApp::new();
    let admin = app.user(UserRole::Admin).await;
    let tutor = app.user(UserRole::Instructor).await;
    let tutor_token = app.token_for(&tutor);

    let (status, _) = app.get("/api/users", Some(&tutor_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(
            &format!("/api/users/{}", tutor.id),
            Some(&app.token_for(&admin)),
            json!({"role": "admin"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/users", Some(&tutor_token)).await;
    assert_eq!(status, StatusCode::OK);
}
