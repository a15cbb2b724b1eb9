use crate::{
    db::DbPool,
    entities::audit_event::{self, Entity as AuditEvents},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Append-only audit trail for operator actions.
#[derive(Clone)]
pub struct AuditService {
    db_pool: Arc<DbPool>,
}

impl AuditService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records an audit event. Failures are logged and swallowed: auditing
    /// must never fail the operation being audited.
    #[instrument(skip(self, detail))]
    pub async fn record(
        &self,
        actor: &str,
        action: &str,
        entity_type: &str,
        entity_id: Option<Uuid>,
        detail: Option<serde_json::Value>,
    ) {
        let model = audit_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            actor: Set(actor.to_string()),
            action: Set(action.to_string()),
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id.map(|id| id.to_string())),
            detail: Set(detail.map(|d| d.to_string())),
            created_at: Set(Utc::now()),
        };

        if let Err(e) = model.insert(&*self.db_pool).await {
            warn!(error = %e, action, "Failed to record audit event");
        }
    }

    /// Lists audit events newest first, optionally filtered by action.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
        action: Option<String>,
    ) -> Result<(Vec<audit_event::Model>, u64), ServiceError> {
        let mut query = AuditEvents::find().order_by_desc(audit_event::Column::CreatedAt);
        if let Some(action) = action {
            query = query.filter(audit_event::Column::Action.eq(action));
        }

        let paginator = query.paginate(&*self.db_pool, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }
}
