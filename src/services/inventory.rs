use crate::{
    db::DbPool,
    entities::inventory_record::{self, Entity as InventoryRecords},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Service for tracking per-product stock.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<inventory_record::Model, ServiceError> {
        self.find_for_product(product_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("No inventory record for product {}", product_id))
        })
    }

    async fn find_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Option<inventory_record::Model>, ServiceError> {
        Ok(InventoryRecords::find()
            .filter(inventory_record::Column::ProductId.eq(product_id))
            .one(&*self.db_pool)
            .await?)
    }

    /// Creates or replaces the stock record for a product. Used by the bulk
    /// import path, which treats the uploaded figures as authoritative.
    #[instrument(skip(self))]
    pub async fn upsert_for_product(
        &self,
        product_id: Uuid,
        on_hand: i32,
        reorder_point: i32,
    ) -> Result<inventory_record::Model, ServiceError> {
        match self.find_for_product(product_id).await? {
            Some(existing) => {
                let old_on_hand = existing.on_hand;
                let mut active: inventory_record::ActiveModel = existing.into();
                active.on_hand = Set(on_hand);
                active.reorder_point = Set(reorder_point);
                active.updated_at = Set(Some(Utc::now()));

                let saved = active.update(&*self.db_pool).await?;
                if old_on_hand != on_hand {
                    let _ = self
                        .event_sender
                        .send(Event::InventoryAdjusted {
                            product_id,
                            old_on_hand,
                            new_on_hand: on_hand,
                            reason: "bulk_import".to_string(),
                        })
                        .await;
                }
                Ok(saved)
            }
            None => {
                let model = inventory_record::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    on_hand: Set(on_hand),
                    reserved: Set(0),
                    incoming: Set(0),
                    reorder_point: Set(reorder_point),
                    created_at: Set(Utc::now()),
                    updated_at: Set(None),
                };
                Ok(model.insert(&*self.db_pool).await?)
            }
        }
    }

    /// Applies a signed adjustment to on-hand stock. The result may not go
    /// negative; reservations are unaffected.
    #[instrument(skip(self))]
    pub async fn adjust(
        &self,
        product_id: Uuid,
        delta: i32,
        reason: String,
    ) -> Result<inventory_record::Model, ServiceError> {
        let existing = self.get_for_product(product_id).await?;
        let old_on_hand = existing.on_hand;
        let new_on_hand = old_on_hand + delta;
        if new_on_hand < 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Adjustment of {} would take on-hand stock below zero (currently {})",
                delta, old_on_hand
            )));
        }

        let mut active: inventory_record::ActiveModel = existing.into();
        active.on_hand = Set(new_on_hand);
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        info!(%product_id, old_on_hand, new_on_hand, %reason, "Inventory adjusted");
        let _ = self
            .event_sender
            .send(Event::InventoryAdjusted {
                product_id,
                old_on_hand,
                new_on_hand,
                reason,
            })
            .await;
        Ok(saved)
    }

    /// Reserves stock for an order. Fails when the available quantity
    /// (on-hand minus already reserved) cannot cover the request.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        product_id: Uuid,
        quantity: i32,
        order_id: Uuid,
    ) -> Result<inventory_record::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "Reservation quantity must be positive".to_string(),
            ));
        }

        let existing = self.get_for_product(product_id).await?;
        if existing.available() < quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Requested {} but only {} available for product {}",
                quantity,
                existing.available(),
                product_id
            )));
        }

        let new_reserved = existing.reserved + quantity;
        let mut active: inventory_record::ActiveModel = existing.into();
        active.reserved = Set(new_reserved);
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        let _ = self
            .event_sender
            .send(Event::InventoryReserved {
                product_id,
                quantity,
                order_id,
            })
            .await;
        Ok(saved)
    }

    /// Releases a previous reservation, e.g. when an order is cancelled.
    /// The reserved count never drops below zero.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        product_id: Uuid,
        quantity: i32,
        order_id: Uuid,
    ) -> Result<inventory_record::Model, ServiceError> {
        let existing = self.get_for_product(product_id).await?;
        let new_reserved = existing.reserved - quantity;
        if new_reserved < 0 {
            warn!(
                %product_id, reserved = existing.reserved, quantity,
                "Release exceeds reserved stock, clamping to zero"
            );
        }

        let mut active: inventory_record::ActiveModel = existing.into();
        active.reserved = Set(new_reserved.max(0));
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        let _ = self
            .event_sender
            .send(Event::InventoryReleased {
                product_id,
                quantity,
                order_id,
            })
            .await;
        Ok(saved)
    }

    /// Converts a reservation into shipped stock: both on-hand and reserved
    /// drop by the quantity. Used when an order leaves the building.
    #[instrument(skip(self))]
    pub async fn commit_reservation(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<inventory_record::Model, ServiceError> {
        let existing = self.get_for_product(product_id).await?;
        let mut active: inventory_record::ActiveModel = existing.clone().into();
        active.on_hand = Set(existing.on_hand - quantity);
        active.reserved = Set((existing.reserved - quantity).max(0));
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Paginated stock records, newest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_record::Model>, u64), ServiceError> {
        let paginator = InventoryRecords::find()
            .order_by_desc(inventory_record::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Records with available stock at or below their reorder point.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<inventory_record::Model>, ServiceError> {
        let records = InventoryRecords::find().all(&*self.db_pool).await?;
        Ok(records.into_iter().filter(|r| r.is_low_stock()).collect())
    }
}
