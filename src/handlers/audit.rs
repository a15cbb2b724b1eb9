use crate::{
    errors::ServiceError,
    handlers::common::{PaginatedResponse, PaginationParams},
    AppState,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AuditFilters {
    pub action: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_audit_events))
}

async fn list_audit_events(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filters): Query<AuditFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .audit
        .list(pagination.page(), pagination.per_page(), filters.action)
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, &pagination)))
}
