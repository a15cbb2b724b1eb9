use crate::{
    auth::AuthenticatedUser,
    entities::user::UserRole,
    errors::ServiceError,
    handlers::common::{created, PaginatedResponse, PaginationParams},
    services::users::{CreateUserInput, LoginInput},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

/// Login route; mounted without auth middleware.
pub fn auth_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// User management routes; mounted behind the admin role.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user))
        .route("/:id/deactivate", post(deactivate_user))
        .route("/:id/role", put(change_role))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let (user, token) = state.services.users.login(input).await?;
    Ok(Json(serde_json::json!({
        "user": user,
        "access_token": token.access_token,
        "token_type": token.token_type,
        "expires_in": token.expires_in,
    })))
}

async fn create_user(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    Json(input): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .users
        .create_user(input, &actor.actor())
        .await?;
    Ok(created(user))
}

async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .users
        .list_users(pagination.page(), pagination.per_page())
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, &pagination)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.users.get_user(id).await?))
}

async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .users
            .deactivate_user(id, &actor.actor())
            .await?,
    ))
}

async fn change_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: AuthenticatedUser,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .users
            .change_role(id, request.role, &actor.actor())
            .await?,
    ))
}
