use crate::{
    db::DbPool,
    entities::wallet::{self, Entity as Wallets},
    entities::wallet_transaction::{self, Entity as WalletTransactions, TransactionKind},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Service for prepaid merchant wallets.
///
/// The balance change and its ledger entry are always written in one
/// database transaction, so the ledger can never disagree with the balance.
#[derive(Clone)]
pub struct WalletService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl WalletService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a wallet for a merchant, typically on KYB approval.
    #[instrument(skip(self))]
    pub async fn provision(
        &self,
        merchant_id: Uuid,
        reserve_cents: i64,
    ) -> Result<wallet::Model, ServiceError> {
        if self.find_by_merchant(merchant_id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Merchant {} already has a wallet",
                merchant_id
            )));
        }

        let model = wallet::ActiveModel {
            id: Set(Uuid::new_v4()),
            merchant_id: Set(merchant_id),
            balance_cents: Set(0),
            reserve_cents: Set(reserve_cents),
            currency: Set("USD".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let saved = model.insert(&*self.db_pool).await?;
        info!(wallet_id = %saved.id, %merchant_id, "Wallet provisioned");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn get_by_merchant(&self, merchant_id: Uuid) -> Result<wallet::Model, ServiceError> {
        self.find_by_merchant(merchant_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("No wallet for merchant {}", merchant_id))
        })
    }

    async fn find_by_merchant(
        &self,
        merchant_id: Uuid,
    ) -> Result<Option<wallet::Model>, ServiceError> {
        Ok(Wallets::find()
            .filter(wallet::Column::MerchantId.eq(merchant_id))
            .one(&*self.db_pool)
            .await?)
    }

    /// Tops up the wallet.
    #[instrument(skip(self))]
    pub async fn credit(
        &self,
        merchant_id: Uuid,
        amount_cents: i64,
        reference: Option<String>,
    ) -> Result<wallet::Model, ServiceError> {
        if amount_cents <= 0 {
            return Err(ServiceError::InvalidInput(
                "Credit amount must be positive".to_string(),
            ));
        }

        let existing = self.get_by_merchant(merchant_id).await?;
        let new_balance = existing.balance_cents.checked_add(amount_cents).ok_or_else(|| {
            ServiceError::InvalidOperation("Credit would overflow the wallet balance".to_string())
        })?;

        let saved = self
            .apply_balance_change(existing, new_balance, TransactionKind::Credit, amount_cents, reference)
            .await?;

        let _ = self
            .event_sender
            .send(Event::WalletCredited {
                wallet_id: saved.id,
                amount_cents,
            })
            .await;
        Ok(saved)
    }

    /// Debits the wallet. The balance may never fall below the compliance
    /// reserve: `balance - amount < reserve` fails with `InsufficientFunds`.
    #[instrument(skip(self))]
    pub async fn debit(
        &self,
        merchant_id: Uuid,
        amount_cents: i64,
        reference: Option<String>,
    ) -> Result<wallet::Model, ServiceError> {
        if amount_cents <= 0 {
            return Err(ServiceError::InvalidInput(
                "Debit amount must be positive".to_string(),
            ));
        }

        let existing = self.get_by_merchant(merchant_id).await?;
        let new_balance = existing.balance_cents - amount_cents;
        if new_balance < existing.reserve_cents {
            return Err(ServiceError::InsufficientFunds(format!(
                "Debit of {} cents would take the balance below the {} cent compliance reserve (balance: {})",
                amount_cents, existing.reserve_cents, existing.balance_cents
            )));
        }

        let saved = self
            .apply_balance_change(existing, new_balance, TransactionKind::Debit, amount_cents, reference)
            .await?;

        let _ = self
            .event_sender
            .send(Event::WalletDebited {
                wallet_id: saved.id,
                amount_cents,
            })
            .await;
        Ok(saved)
    }

    async fn apply_balance_change(
        &self,
        existing: wallet::Model,
        new_balance: i64,
        kind: TransactionKind,
        amount_cents: i64,
        reference: Option<String>,
    ) -> Result<wallet::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let wallet_id = existing.id;
        let mut active: wallet::ActiveModel = existing.into();
        active.balance_cents = Set(new_balance);
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&txn).await?;

        let ledger = wallet_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            wallet_id: Set(wallet_id),
            kind: Set(kind.to_string()),
            amount_cents: Set(amount_cents),
            balance_after_cents: Set(new_balance),
            reference: Set(reference),
            created_at: Set(Utc::now()),
        };
        ledger.insert(&txn).await?;

        txn.commit().await?;
        Ok(saved)
    }

    /// Adjusts the compliance reserve. The reserve may exceed the current
    /// balance; that only blocks future debits, it never claws back funds.
    #[instrument(skip(self))]
    pub async fn set_reserve(
        &self,
        merchant_id: Uuid,
        reserve_cents: i64,
    ) -> Result<wallet::Model, ServiceError> {
        if reserve_cents < 0 {
            return Err(ServiceError::InvalidInput(
                "Reserve must be non-negative".to_string(),
            ));
        }

        let existing = self.get_by_merchant(merchant_id).await?;
        let mut active: wallet::ActiveModel = existing.into();
        active.reserve_cents = Set(reserve_cents);
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Ledger entries newest first.
    #[instrument(skip(self))]
    pub async fn transactions(
        &self,
        merchant_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<wallet_transaction::Model>, u64), ServiceError> {
        let wallet = self.get_by_merchant(merchant_id).await?;

        let paginator = WalletTransactions::find()
            .filter(wallet_transaction::Column::WalletId.eq(wallet.id))
            .order_by_desc(wallet_transaction::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }
}
