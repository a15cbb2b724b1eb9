use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only audit trail. Writes are best-effort: a failed audit write is
/// logged and never fails the operation that produced it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// User id or "system"
    pub actor: String,

    /// e.g. "products.import", "merchants.kyb_transition"
    pub action: String,

    pub entity_type: String,

    pub entity_id: Option<String>,

    /// JSON-encoded detail payload
    pub detail: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
