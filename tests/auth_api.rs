mod common;

use axum::http::StatusCode;
use common::{admin_token, body_json, get_request, json_request, test_app, token_for};
use peptide_ops_api::entities::user::UserRole;
use tower::ServiceExt;

#[tokio::test]
async fn health_and_status_are_public() {
    let (app, _state) = test_app().await;

    let response = app
        .clone()
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/status", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["environment"], "test");
}

#[tokio::test]
async fn login_issues_a_working_token() {
    let (app, state) = test_app().await;
    // Creates the account with a known password.
    token_for(&state, "ops@portal.example", UserRole::Operator).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            serde_json::json!({
                "email": "ops@portal.example",
                "password": "correct-horse-battery",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    let token = payload["access_token"].as_str().unwrap().to_string();
    assert_eq!(payload["token_type"], "Bearer");
    // The body never carries the password hash.
    assert!(payload["user"].get("password_hash").is_none());

    let response = app
        .oneshot(get_request("/api/v1/products", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, state) = test_app().await;
    token_for(&state, "ops@portal.example", UserRole::Operator).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            serde_json::json!({
                "email": "ops@portal.example",
                "password": "not-the-password",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_users_cannot_log_in() {
    let (app, state) = test_app().await;
    token_for(&state, "gone@portal.example", UserRole::Operator).await;

    let (users, _) = state.services.users.list_users(1, 10).await.unwrap();
    state
        .services
        .users
        .deactivate_user(users[0].id, "system")
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            serde_json::json!({
                "email": "gone@portal.example",
                "password": "correct-horse-battery",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let (app, _state) = test_app().await;

    let response = app
        .oneshot(get_request("/api/v1/products", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let (app, state) = test_app().await;
    let operator = token_for(&state, "operator@portal.example", UserRole::Operator).await;
    let admin = admin_token(&state).await;

    let response = app
        .clone()
        .oneshot(get_request("/api/v1/users", Some(&operator)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(get_request("/api/v1/users", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["total"], 2);
}

#[tokio::test]
async fn kyb_decisions_are_admin_only() {
    let (app, state) = test_app().await;
    let operator = token_for(&state, "operator@portal.example", UserRole::Operator).await;

    // Register + submit as operator is allowed.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/merchants",
            Some(&operator),
            serde_json::json!({
                "business_name": "Gated Labs",
                "contact_email": "gated@labs.example",
                "research_use_attested": true,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let merchant = body_json(response).await;
    let merchant_id = merchant["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/merchants/{merchant_id}/submit-review"),
            Some(&operator),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Approval is not.
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/merchants/{merchant_id}/approve"),
            Some(&operator),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
