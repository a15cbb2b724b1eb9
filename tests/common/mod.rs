#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use peptide_ops_api::{
    app,
    config::AppConfig,
    entities::user::UserRole,
    events::{process_events, EventSender},
    migrator::Migrator,
    services::users::CreateUserInput,
    AppState,
};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;

pub const TEST_JWT_SECRET: &str =
    "integration_test_secret_key_that_is_definitely_long_enough_for_hs256";

/// Fresh in-memory database with the full schema applied. A single
/// connection is required: every pooled sqlite::memory: connection would
/// otherwise get its own empty database.
pub async fn test_state() -> AppState {
    test_state_with(|_| {}).await
}

pub async fn test_state_with(customize: impl FnOnce(&mut AppConfig)) -> AppState {
    let (state, _db) = test_state_and_db(customize).await;
    state
}

/// Like [`test_state_with`], but also hands back the underlying connection
/// so tests can manipulate the schema directly.
pub async fn test_state_and_db(
    customize: impl FnOnce(&mut AppConfig),
) -> (AppState, Arc<sea_orm::DatabaseConnection>) {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("migrate");
    let db = Arc::new(db);

    let mut config = AppConfig::new(
        "sqlite::memory:".to_string(),
        TEST_JWT_SECRET.to_string(),
        0,
        "test".to_string(),
    );
    customize(&mut config);

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(process_events(rx));

    let state = AppState::new(db.clone(), Arc::new(config), EventSender::new(tx))
        .expect("app state");
    (state, db)
}

pub async fn test_app() -> (Router, AppState) {
    let state = test_state().await;
    (app(state.clone()), state)
}

/// Creates a user and returns a bearer token for it.
pub async fn token_for(state: &AppState, email: &str, role: UserRole) -> String {
    let user = state
        .services
        .users
        .create_user(
            CreateUserInput {
                email: email.to_string(),
                name: "Test User".to_string(),
                password: "correct-horse-battery".to_string(),
                role,
            },
            "system",
        )
        .await
        .expect("create user");

    state
        .auth_service
        .generate_token(&user)
        .expect("token")
        .access_token
}

pub async fn admin_token(state: &AppState) -> String {
    token_for(state, "admin@test.example", UserRole::Admin).await
}

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Builds a multipart upload request with a single `file` field.
pub fn multipart_csv_request(path: &str, token: &str, file_name: &str, csv: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{BOUNDARY}--\r\n"
    );

    Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .expect("request")
}

pub fn json_request(
    method: &str,
    path: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_request(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
