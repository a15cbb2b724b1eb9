use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// KYB (know-your-business) review state for a merchant account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KybStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl KybStatus {
    /// Allowed transitions: pending -> under_review -> approved | rejected.
    pub fn can_transition_to(self, next: KybStatus) -> bool {
        matches!(
            (self, next),
            (KybStatus::Pending, KybStatus::UnderReview)
                | (KybStatus::UnderReview, KybStatus::Approved)
                | (KybStatus::UnderReview, KybStatus::Rejected)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "merchants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub business_name: String,

    #[validate(email)]
    pub contact_email: String,

    /// One of the `KybStatus` tokens
    pub kyb_status: String,

    /// Merchant has attested products are bought for research use only
    pub research_use_attested: bool,

    pub review_notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Result<KybStatus, DbErr> {
        self.kyb_status
            .parse()
            .map_err(|_| DbErr::Custom(format!("Unknown KYB status '{}'", self.kyb_status)))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::wallet::Entity")]
    Wallet,
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kyb_transition_matrix() {
        assert!(KybStatus::Pending.can_transition_to(KybStatus::UnderReview));
        assert!(KybStatus::UnderReview.can_transition_to(KybStatus::Approved));
        assert!(KybStatus::UnderReview.can_transition_to(KybStatus::Rejected));

        assert!(!KybStatus::Pending.can_transition_to(KybStatus::Approved));
        assert!(!KybStatus::Approved.can_transition_to(KybStatus::Rejected));
        assert!(!KybStatus::Rejected.can_transition_to(KybStatus::UnderReview));
    }

    #[test]
    fn kyb_status_round_trips_through_strings() {
        assert_eq!(KybStatus::UnderReview.to_string(), "under_review");
        assert_eq!(
            "under_review".parse::<KybStatus>().unwrap(),
            KybStatus::UnderReview
        );
    }
}
