use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    handlers::common::{PaginatedResponse, PaginationParams},
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
pub struct AdjustRequest {
    pub delta: i32,
    pub reason: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory))
        .route("/low-stock", get(low_stock))
        .route("/:product_id", get(get_inventory))
        .route("/:product_id/adjust", post(adjust_inventory))
}

async fn list_inventory(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .inventory
        .list(pagination.page(), pagination.per_page())
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, &pagination)))
}

async fn low_stock(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.inventory.low_stock().await?))
}

async fn get_inventory(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.inventory.get_for_product(product_id).await?))
}

async fn adjust_inventory(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(request): Json<AdjustRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if request.reason.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "A reason is required for manual adjustments".to_string(),
        ));
    }

    let record = state
        .services
        .inventory
        .adjust(product_id, request.delta, request.reason.clone())
        .await?;

    state
        .services
        .audit
        .record(
            &user.actor(),
            "inventory.adjust",
            "inventory_record",
            Some(product_id),
            Some(serde_json::json!({ "delta": request.delta, "reason": request.reason })),
        )
        .await;

    Ok(Json(record))
}
