use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-product stock record, 1:1 with `products`.
///
/// `available` is always derived as `on_hand - reserved` and never stored;
/// it is deliberately not clamped, so a negative value surfaces oversell.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub product_id: Uuid,

    pub on_hand: i32,

    pub reserved: i32,

    pub incoming: i32,

    pub reorder_point: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Quantity available for new orders.
    pub fn available(&self) -> i32 {
        self.on_hand - self.reserved
    }

    pub fn is_low_stock(&self) -> bool {
        self.available() <= self.reorder_point
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(on_hand: i32, reserved: i32) -> Model {
        Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            on_hand,
            reserved,
            incoming: 0,
            reorder_point: 10,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn available_is_derived_and_unclamped() {
        assert_eq!(record(100, 30).available(), 70);
        // Oversell shows up as a negative available quantity.
        assert_eq!(record(5, 8).available(), -3);
    }

    #[test]
    fn low_stock_uses_available_not_on_hand() {
        let mut r = record(20, 15);
        r.reorder_point = 10;
        assert!(r.is_low_stock());
        r.reserved = 0;
        assert!(!r.is_low_stock());
    }
}
