use crate::{
    auth::AuthenticatedUser,
    entities::order::OrderStatus,
    errors::ServiceError,
    handlers::common::{created, PaginatedResponse, PaginationParams},
    services::orders::CreateOrderInput,
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
pub struct OrderFilters {
    pub merchant_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/submit", post(submit_order))
        .route("/:id/ship", post(mark_shipped))
        .route("/:id/cancel", post(cancel_order))
}

async fn create_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .create_order(input, &user.actor())
        .await?;
    Ok(created(order))
}

async fn list_orders(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filters): Query<OrderFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .orders
        .list_orders(
            pagination.page(),
            pagination.per_page(),
            filters.merchant_id,
            filters.status,
        )
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, &pagination)))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.orders.get_order(id).await?))
}

async fn submit_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .orders
            .submit_to_fulfillment(id, &user.actor())
            .await?,
    ))
}

async fn mark_shipped(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.orders.mark_shipped(id, &user.actor()).await?))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.orders.cancel_order(id, &user.actor()).await?))
}
