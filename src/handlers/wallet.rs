use crate::{
    errors::ServiceError,
    handlers::common::{PaginatedResponse, PaginationParams},
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
pub struct AmountRequest {
    pub amount_cents: i64,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub reserve_cents: i64,
}

/// Nested under `/merchants/:id/wallet`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/wallet", get(get_wallet))
        .route("/:id/wallet/credit", post(credit_wallet))
        .route("/:id/wallet/debit", post(debit_wallet))
        .route("/:id/wallet/reserve", put(set_reserve))
        .route("/:id/wallet/transactions", get(list_transactions))
}

async fn get_wallet(
    State(state): State<AppState>,
    Path(merchant_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.wallet.get_by_merchant(merchant_id).await?))
}

async fn credit_wallet(
    State(state): State<AppState>,
    Path(merchant_id): Path<Uuid>,
    Json(request): Json<AmountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .wallet
            .credit(merchant_id, request.amount_cents, request.reference)
            .await?,
    ))
}

async fn debit_wallet(
    State(state): State<AppState>,
    Path(merchant_id): Path<Uuid>,
    Json(request): Json<AmountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .wallet
            .debit(merchant_id, request.amount_cents, request.reference)
            .await?,
    ))
}

async fn set_reserve(
    State(state): State<AppState>,
    Path(merchant_id): Path<Uuid>,
    Json(request): Json<ReserveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .services
            .wallet
            .set_reserve(merchant_id, request.reserve_cents)
            .await?,
    ))
}

async fn list_transactions(
    State(state): State<AppState>,
    Path(merchant_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .wallet
        .transactions(merchant_id, pagination.page(), pagination.per_page())
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, &pagination)))
}
