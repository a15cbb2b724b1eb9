use crate::{
    db::DbPool,
    entities::merchant::{self, Entity as Merchants, KybStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::audit::AuditService,
    services::wallet::WalletService,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterMerchantInput {
    #[validate(length(min = 1, max = 255, message = "Business name is required"))]
    pub business_name: String,
    #[validate(email(message = "Contact email must be a valid email address"))]
    pub contact_email: String,
    pub research_use_attested: bool,
}

/// Merchant onboarding and KYB review.
#[derive(Clone)]
pub struct MerchantService {
    db_pool: Arc<DbPool>,
    wallet_service: Arc<WalletService>,
    audit: Arc<AuditService>,
    event_sender: EventSender,
    /// Compliance reserve applied to newly provisioned wallets, in cents.
    default_reserve_cents: i64,
}

impl MerchantService {
    pub fn new(
        db_pool: Arc<DbPool>,
        wallet_service: Arc<WalletService>,
        audit: Arc<AuditService>,
        event_sender: EventSender,
        default_reserve_cents: i64,
    ) -> Self {
        Self {
            db_pool,
            wallet_service,
            audit,
            event_sender,
            default_reserve_cents,
        }
    }

    /// Registers a merchant in `pending` state. Registration requires the
    /// research-use-only attestation up front.
    #[instrument(skip(self, input), fields(business_name = %input.business_name))]
    pub async fn register(
        &self,
        input: RegisterMerchantInput,
        actor: &str,
    ) -> Result<merchant::Model, ServiceError> {
        input.validate()?;
        if !input.research_use_attested {
            return Err(ServiceError::ValidationError(
                "Research-use attestation is required to register".to_string(),
            ));
        }

        let model = merchant::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_name: Set(input.business_name),
            contact_email: Set(input.contact_email.to_lowercase()),
            kyb_status: Set(KybStatus::Pending.to_string()),
            research_use_attested: Set(true),
            review_notes: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let saved = model.insert(&*self.db_pool).await?;
        info!(merchant_id = %saved.id, "Merchant registered");

        self.audit
            .record(actor, "merchants.register", "merchant", Some(saved.id), None)
            .await;
        let _ = self
            .event_sender
            .send(Event::MerchantRegistered(saved.id))
            .await;
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn get_merchant(&self, id: Uuid) -> Result<merchant::Model, ServiceError> {
        Merchants::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Merchant {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_merchants(
        &self,
        page: u64,
        per_page: u64,
        status: Option<KybStatus>,
    ) -> Result<(Vec<merchant::Model>, u64), ServiceError> {
        let mut query = Merchants::find().order_by_desc(merchant::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(merchant::Column::KybStatus.eq(status.to_string()));
        }

        let paginator = query.paginate(&*self.db_pool, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Moves a pending merchant into KYB review.
    #[instrument(skip(self))]
    pub async fn submit_for_review(
        &self,
        id: Uuid,
        actor: &str,
    ) -> Result<merchant::Model, ServiceError> {
        self.transition(id, KybStatus::UnderReview, None, actor).await
    }

    /// Approves a merchant under review and provisions their wallet with
    /// the default compliance reserve.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        id: Uuid,
        notes: Option<String>,
        actor: &str,
    ) -> Result<merchant::Model, ServiceError> {
        let saved = self.transition(id, KybStatus::Approved, notes, actor).await?;
        self.wallet_service
            .provision(saved.id, self.default_reserve_cents)
            .await?;
        Ok(saved)
    }

    /// Rejects a merchant under review. Rejection is terminal.
    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        id: Uuid,
        notes: Option<String>,
        actor: &str,
    ) -> Result<merchant::Model, ServiceError> {
        self.transition(id, KybStatus::Rejected, notes, actor).await
    }

    async fn transition(
        &self,
        id: Uuid,
        next: KybStatus,
        notes: Option<String>,
        actor: &str,
    ) -> Result<merchant::Model, ServiceError> {
        let existing = self.get_merchant(id).await?;
        let current = existing.status()?;

        if !current.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot move merchant from '{}' to '{}'",
                current, next
            )));
        }

        let mut active: merchant::ActiveModel = existing.into();
        active.kyb_status = Set(next.to_string());
        if notes.is_some() {
            active.review_notes = Set(notes);
        }
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        info!(merchant_id = %saved.id, from = %current, to = %next, "KYB status changed");
        self.audit
            .record(
                actor,
                "merchants.kyb_transition",
                "merchant",
                Some(saved.id),
                Some(serde_json::json!({ "from": current.to_string(), "to": next.to_string() })),
            )
            .await;
        let _ = self
            .event_sender
            .send(Event::MerchantKybStatusChanged {
                merchant_id: saved.id,
                old_status: current.to_string(),
                new_status: next.to_string(),
            })
            .await;

        Ok(saved)
    }
}
