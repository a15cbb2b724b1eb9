use crate::{
    clients::shipping::{ShipmentLine, ShipmentRequest, ShippingClient},
    db::DbPool,
    entities::order::{self, Entity as Orders, OrderStatus},
    entities::order_item::{self, Entity as OrderItems},
    errors::ServiceError,
    events::{Event, EventSender},
    services::audit::AuditService,
    services::catalog::CatalogService,
    services::inventory::InventoryService,
    services::wallet::WalletService,
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineInput {
    pub sku: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub merchant_id: Uuid,
    pub lines: Vec<OrderLineInput>,
    pub notes: Option<String>,
}

/// An order with its lines, as returned to callers.
#[derive(Debug, serde::Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

fn generate_order_number() -> String {
    // Date prefix plus a random suffix; uniqueness is enforced by the db.
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("PO-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Order lifecycle: creation reserves stock and debits the wallet, so a
/// persisted order is already `paid`.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    catalog: Arc<CatalogService>,
    inventory: Arc<InventoryService>,
    wallet: Arc<WalletService>,
    shipping: Arc<ShippingClient>,
    audit: Arc<AuditService>,
    event_sender: EventSender,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: Arc<DbPool>,
        catalog: Arc<CatalogService>,
        inventory: Arc<InventoryService>,
        wallet: Arc<WalletService>,
        shipping: Arc<ShippingClient>,
        audit: Arc<AuditService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db_pool,
            catalog,
            inventory,
            wallet,
            shipping,
            audit,
            event_sender,
        }
    }

    /// Creates a prepaid order: validates each line against the catalog,
    /// reserves stock, then debits the merchant wallet. A wallet failure
    /// rolls back every reservation made so far.
    #[instrument(skip(self, input), fields(merchant_id = %input.merchant_id))]
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
        actor: &str,
    ) -> Result<OrderWithItems, ServiceError> {
        if input.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order must contain at least one line".to_string(),
            ));
        }

        // Resolve and validate every line before touching stock.
        let mut resolved = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for SKU '{}' must be positive",
                    line.sku
                )));
            }

            let product = self.catalog.get_product_by_sku(&line.sku).await?;
            if !product.is_active {
                return Err(ServiceError::InvalidOperation(format!(
                    "Product '{}' is not active",
                    product.sku
                )));
            }
            if let Some(min) = product.min_order_qty {
                if line.quantity < min {
                    return Err(ServiceError::ValidationError(format!(
                        "Quantity for '{}' is below the minimum of {}",
                        product.sku, min
                    )));
                }
            }
            if let Some(max) = product.max_order_qty {
                if line.quantity > max {
                    return Err(ServiceError::ValidationError(format!(
                        "Quantity for '{}' exceeds the maximum of {}",
                        product.sku, max
                    )));
                }
            }
            resolved.push((product, line.quantity));
        }

        let total_cents: i64 = resolved
            .iter()
            .map(|(p, qty)| p.price_cents * *qty as i64)
            .sum();

        let order_id = Uuid::new_v4();

        // Reserve stock line by line, unwinding on any failure.
        let mut reserved: Vec<(Uuid, i32)> = Vec::with_capacity(resolved.len());
        for (product, qty) in &resolved {
            match self.inventory.reserve(product.id, *qty, order_id).await {
                Ok(_) => reserved.push((product.id, *qty)),
                Err(e) => {
                    self.unwind_reservations(&reserved, order_id).await;
                    return Err(e);
                }
            }
        }

        // Debit under the compliance-reserve rule; failure rolls back stock.
        if let Err(e) = self
            .wallet
            .debit(input.merchant_id, total_cents, Some(order_id.to_string()))
            .await
        {
            self.unwind_reservations(&reserved, order_id).await;
            return Err(e);
        }

        let model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(generate_order_number()),
            merchant_id: Set(input.merchant_id),
            status: Set(OrderStatus::Paid.to_string()),
            total_cents: Set(total_cents),
            tracking_number: Set(None),
            notes: Set(input.notes),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let saved = model.insert(&*self.db_pool).await?;

        let mut items = Vec::with_capacity(resolved.len());
        for (product, qty) in &resolved {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                sku: Set(product.sku.clone()),
                quantity: Set(*qty),
                unit_price_cents: Set(product.price_cents),
            };
            items.push(item.insert(&*self.db_pool).await?);
        }

        info!(order_id = %saved.id, order_number = %saved.order_number, total_cents, "Order created");
        self.audit
            .record(actor, "orders.create", "order", Some(saved.id), None)
            .await;
        let _ = self.event_sender.send(Event::OrderCreated(saved.id)).await;

        Ok(OrderWithItems { order: saved, items })
    }

    async fn unwind_reservations(&self, reserved: &[(Uuid, i32)], order_id: Uuid) {
        for (product_id, qty) in reserved {
            if let Err(e) = self.inventory.release(*product_id, *qty, order_id).await {
                error!(%product_id, qty, error = %e, "Failed to unwind reservation");
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = Orders::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
        let items = OrderItems::find()
            .filter(order_item::Column::OrderId.eq(id))
            .all(&*self.db_pool)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        merchant_id: Option<Uuid>,
        status: Option<OrderStatus>,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let mut query = Orders::find().order_by_desc(order::Column::CreatedAt);
        if let Some(merchant_id) = merchant_id {
            query = query.filter(order::Column::MerchantId.eq(merchant_id));
        }
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }

        let paginator = query.paginate(&*self.db_pool, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Hands a paid order to the shipping SaaS. On success the order moves
    /// to `submitted` with the returned tracking number, and each line's
    /// reservation is committed (on-hand decremented, reserved released).
    #[instrument(skip(self))]
    pub async fn submit_to_fulfillment(
        &self,
        id: Uuid,
        actor: &str,
    ) -> Result<order::Model, ServiceError> {
        let OrderWithItems { order, items } = self.get_order(id).await?;
        let current = order.status()?;
        if !current.can_transition_to(OrderStatus::Submitted) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot submit an order in status '{}'",
                current
            )));
        }

        let request = ShipmentRequest {
            order_number: order.order_number.clone(),
            reference_id: order.id,
            lines: items
                .iter()
                .map(|i| ShipmentLine {
                    sku: i.sku.clone(),
                    quantity: i.quantity,
                })
                .collect(),
        };
        let shipment = self.shipping.create_shipment(&request).await?;

        for item in &items {
            self.inventory
                .commit_reservation(item.product_id, item.quantity)
                .await?;
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Submitted.to_string());
        active.tracking_number = Set(Some(shipment.tracking_number.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        info!(order_id = %saved.id, tracking = %shipment.tracking_number, "Order submitted to fulfillment");
        self.audit
            .record(actor, "orders.submit", "order", Some(saved.id), None)
            .await;
        let _ = self
            .event_sender
            .send(Event::OrderSubmitted {
                order_id: saved.id,
                tracking_number: shipment.tracking_number,
            })
            .await;
        Ok(saved)
    }

    /// Marks a submitted order as shipped (carrier pickup confirmed).
    #[instrument(skip(self))]
    pub async fn mark_shipped(&self, id: Uuid, actor: &str) -> Result<order::Model, ServiceError> {
        let OrderWithItems { order, .. } = self.get_order(id).await?;
        let current = order.status()?;
        if !current.can_transition_to(OrderStatus::Shipped) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot mark an order in status '{}' as shipped",
                current
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Shipped.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        self.audit
            .record(actor, "orders.ship", "order", Some(saved.id), None)
            .await;
        Ok(saved)
    }

    /// Cancels a paid order: releases every reservation and refunds the
    /// wallet for the full total.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: Uuid, actor: &str) -> Result<order::Model, ServiceError> {
        let OrderWithItems { order, items } = self.get_order(id).await?;
        let current = order.status()?;
        if !current.can_transition_to(OrderStatus::Cancelled) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot cancel an order in status '{}'",
                current
            )));
        }

        for item in &items {
            self.inventory
                .release(item.product_id, item.quantity, order.id)
                .await?;
        }
        self.wallet
            .credit(
                order.merchant_id,
                order.total_cents,
                Some(format!("refund:{}", order.id)),
            )
            .await?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        info!(order_id = %saved.id, "Order cancelled");
        self.audit
            .record(actor, "orders.cancel", "order", Some(saved.id), None)
            .await;
        let _ = self.event_sender.send(Event::OrderCancelled(saved.id)).await;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_carry_date_prefix() {
        let number = generate_order_number();
        assert!(number.starts_with("PO-"));
        assert_eq!(number.split('-').count(), 3);
    }
}
