use crate::{
    errors::ServiceError,
    handlers::common::{created, PaginatedResponse, PaginationParams},
    services::catalog::{CreateProductInput, UpdateProductInput},
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
pub struct ProductFilters {
    pub active_only: Option<bool>,
    pub category: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/by-sku/:sku", get(get_product_by_sku))
        .route("/:id", get(get_product).put(update_product))
        .route("/:id/deactivate", post(deactivate_product))
}

async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filters): Query<ProductFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .catalog
        .list_products(
            pagination.page(),
            pagination.per_page(),
            filters.active_only.unwrap_or(false),
            filters.category,
        )
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, &pagination)))
}

async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.create_product(input).await?;
    Ok(created(product))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.catalog.get_product(id).await?))
}

async fn get_product_by_sku(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.catalog.get_product_by_sku(&sku).await?))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.catalog.update_product(id, input).await?))
}

async fn deactivate_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.services.catalog.deactivate_product(id).await?))
}
