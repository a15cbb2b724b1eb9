use crate::{
    auth::AuthenticatedUser,
    entities::merchant::KybStatus,
    errors::ServiceError,
    handlers::common::{created, PaginatedResponse, PaginationParams},
    services::merchants::RegisterMerchantInput,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MerchantFilters {
    pub status: Option<KybStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub notes: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_merchants).post(register_merchant))
        .route("/:id", get(get_merchant))
        .route("/:id/submit-review", post(submit_for_review))
}

/// KYB decisions; mounted behind the admin role.
pub fn review_router() -> Router<AppState> {
    Router::new()
        .route("/:id/approve", post(approve_merchant))
        .route("/:id/reject", post(reject_merchant))
}

async fn register_merchant(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<RegisterMerchantInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let merchant = state
        .services
        .merchants
        .register(input, &user.actor())
        .await?;
    Ok(created(merchant))
}

async fn list_merchants(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filters): Query<MerchantFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .merchants
        .list_merchants(pagination.page(), pagination.per_page(), filters.status)
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, &pagination)))
}

async fn get_merchant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.merchants.get_merchant(id).await?))
}

async fn submit_for_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .merchants
            .submit_for_review(id, &user.actor())
            .await?,
    ))
}

async fn approve_merchant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(request): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .merchants
            .approve(id, request.notes, &user.actor())
            .await?,
    ))
}

async fn reject_merchant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(request): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .merchants
            .reject(id, request.notes, &user.actor())
            .await?,
    ))
}
