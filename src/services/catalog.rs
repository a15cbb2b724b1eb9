use crate::{
    db::DbPool,
    entities::product::{self, Entity as Products},
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Payload for creating a product directly (as opposed to via CSV import).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 50, message = "SKU must be between 1 and 50 characters"))]
    pub sku: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Price must be non-negative"))]
    pub price_cents: i64,
    pub weight_grams: Option<i32>,
    pub min_order_qty: Option<i32>,
    pub max_order_qty: Option<i32>,
    pub requires_coa: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub weight_grams: Option<i32>,
    pub min_order_qty: Option<i32>,
    pub max_order_qty: Option<i32>,
    pub is_active: Option<bool>,
    pub requires_coa: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Field values applied during an upsert-by-SKU, used by the bulk import
/// path. Every field is written on both insert and update.
#[derive(Debug, Clone)]
pub struct ProductUpsert {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: i64,
    pub weight_grams: Option<i32>,
    pub min_order_qty: Option<i32>,
    pub max_order_qty: Option<i32>,
    pub is_active: bool,
    pub requires_coa: bool,
    pub tags: Option<String>,
}

fn join_tags(tags: Option<Vec<String>>) -> Option<String> {
    tags.filter(|t| !t.is_empty()).map(|t| t.join(";"))
}

/// Service for managing the product catalog.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a product. The SKU is upper-cased before storage and must
    /// not collide with an existing product.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        let sku = input.sku.trim().to_uppercase();
        if self.find_by_sku(&sku).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU '{}' already exists",
                sku
            )));
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku),
            name: Set(input.name),
            description: Set(input.description),
            category: Set(input.category),
            price_cents: Set(input.price_cents),
            weight_grams: Set(input.weight_grams),
            min_order_qty: Set(input.min_order_qty),
            max_order_qty: Set(input.max_order_qty),
            is_active: Set(true),
            requires_coa: Set(input.requires_coa.unwrap_or(false)),
            tags: Set(join_tags(input.tags)),
            ..Default::default()
        };

        let saved = model.insert(&*self.db_pool).await?;
        info!(product_id = %saved.id, sku = %saved.sku, "Product created");

        let _ = self.event_sender.send(Event::ProductCreated(saved.id)).await;
        Ok(saved)
    }

    /// Inserts or updates a product keyed by upper-cased SKU. Returns the
    /// saved model plus whether a new row was created.
    #[instrument(skip(self, fields), fields(sku = %fields.sku))]
    pub async fn upsert_by_sku(
        &self,
        fields: ProductUpsert,
    ) -> Result<(product::Model, bool), ServiceError> {
        let sku = fields.sku.trim().to_uppercase();

        match self.find_by_sku(&sku).await? {
            Some(existing) => {
                let mut active: product::ActiveModel = existing.into();
                active.name = Set(fields.name);
                active.description = Set(fields.description);
                active.category = Set(fields.category);
                active.price_cents = Set(fields.price_cents);
                active.weight_grams = Set(fields.weight_grams);
                active.min_order_qty = Set(fields.min_order_qty);
                active.max_order_qty = Set(fields.max_order_qty);
                active.is_active = Set(fields.is_active);
                active.requires_coa = Set(fields.requires_coa);
                active.tags = Set(fields.tags);

                let saved = active.update(&*self.db_pool).await?;
                let _ = self.event_sender.send(Event::ProductUpdated(saved.id)).await;
                Ok((saved, false))
            }
            None => {
                let model = product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    sku: Set(sku),
                    name: Set(fields.name),
                    description: Set(fields.description),
                    category: Set(fields.category),
                    price_cents: Set(fields.price_cents),
                    weight_grams: Set(fields.weight_grams),
                    min_order_qty: Set(fields.min_order_qty),
                    max_order_qty: Set(fields.max_order_qty),
                    is_active: Set(fields.is_active),
                    requires_coa: Set(fields.requires_coa),
                    tags: Set(fields.tags),
                    ..Default::default()
                };
                let saved = model.insert(&*self.db_pool).await?;
                let _ = self.event_sender.send(Event::ProductCreated(saved.id)).await;
                Ok((saved, true))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Products::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_product_by_sku(&self, sku: &str) -> Result<product::Model, ServiceError> {
        let normalized = sku.trim().to_uppercase();
        self.find_by_sku(&normalized)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with SKU '{}' not found", normalized)))
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<product::Model>, ServiceError> {
        Ok(Products::find()
            .filter(product::Column::Sku.eq(sku))
            .one(&*self.db_pool)
            .await?)
    }

    /// Lists products, newest first. `active_only` hides deactivated items.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
        active_only: bool,
        category: Option<String>,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = Products::find().order_by_desc(product::Column::CreatedAt);
        if active_only {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        if let Some(category) = category {
            query = query.filter(product::Column::Category.eq(category));
        }

        let paginator = query.paginate(&*self.db_pool, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if let Some(price) = input.price_cents {
            if price < 0 {
                return Err(ServiceError::ValidationError(
                    "Price must be non-negative".to_string(),
                ));
            }
        }

        let existing = self.get_product(id).await?;
        let mut active: product::ActiveModel = existing.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = input.category {
            active.category = Set(Some(category));
        }
        if let Some(price_cents) = input.price_cents {
            active.price_cents = Set(price_cents);
        }
        if let Some(weight) = input.weight_grams {
            active.weight_grams = Set(Some(weight));
        }
        if let Some(min_qty) = input.min_order_qty {
            active.min_order_qty = Set(Some(min_qty));
        }
        if let Some(max_qty) = input.max_order_qty {
            active.max_order_qty = Set(Some(max_qty));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(requires_coa) = input.requires_coa {
            active.requires_coa = Set(requires_coa);
        }
        if let Some(tags) = input.tags {
            active.tags = Set(join_tags(Some(tags)));
        }

        let saved = active.update(&*self.db_pool).await?;
        let _ = self.event_sender.send(Event::ProductUpdated(saved.id)).await;
        Ok(saved)
    }

    /// Soft-deactivates a product; it stays in the catalog for order history.
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(id).await?;
        let mut active: product::ActiveModel = existing.into();
        active.is_active = Set(false);

        let saved = active.update(&*self.db_pool).await?;
        info!(product_id = %saved.id, "Product deactivated");
        let _ = self.event_sender.send(Event::ProductUpdated(saved.id)).await;
        Ok(saved)
    }
}
