mod common;

use common::test_state;
use peptide_ops_api::entities::merchant::KybStatus;
use peptide_ops_api::errors::ServiceError;
use peptide_ops_api::services::merchants::RegisterMerchantInput;

fn registration(name: &str) -> RegisterMerchantInput {
    RegisterMerchantInput {
        business_name: name.to_string(),
        contact_email: format!("{}@labs.example", name.to_lowercase()),
        research_use_attested: true,
    }
}

#[tokio::test]
async fn registration_requires_research_use_attestation() {
    let state = test_state().await;

    let mut input = registration("Apex");
    input.research_use_attested = false;

    let err = state
        .services
        .merchants
        .register(input, "system")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn kyb_approval_provisions_a_wallet_with_the_default_reserve() {
    let state = test_state().await;

    let merchant = state
        .services
        .merchants
        .register(registration("Apex"), "system")
        .await
        .unwrap();
    assert_eq!(merchant.status().unwrap(), KybStatus::Pending);

    // No wallet before approval.
    assert!(state
        .services
        .wallet
        .get_by_merchant(merchant.id)
        .await
        .is_err());

    state
        .services
        .merchants
        .submit_for_review(merchant.id, "ops@portal")
        .await
        .unwrap();
    let approved = state
        .services
        .merchants
        .approve(merchant.id, Some("docs verified".to_string()), "ops@portal")
        .await
        .unwrap();
    assert_eq!(approved.status().unwrap(), KybStatus::Approved);
    assert_eq!(approved.review_notes.as_deref(), Some("docs verified"));

    let wallet = state
        .services
        .wallet
        .get_by_merchant(merchant.id)
        .await
        .unwrap();
    assert_eq!(wallet.balance_cents, 0);
    assert_eq!(wallet.reserve_cents, 5000);
}

#[tokio::test]
async fn invalid_kyb_transitions_are_rejected() {
    let state = test_state().await;

    let merchant = state
        .services
        .merchants
        .register(registration("Skipper"), "system")
        .await
        .unwrap();

    // Approval straight from pending skips review.
    let err = state
        .services
        .merchants
        .approve(merchant.id, None, "ops@portal")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));

    // Rejection is terminal.
    state
        .services
        .merchants
        .submit_for_review(merchant.id, "ops@portal")
        .await
        .unwrap();
    state
        .services
        .merchants
        .reject(merchant.id, Some("shell company".to_string()), "ops@portal")
        .await
        .unwrap();
    let err = state
        .services
        .merchants
        .submit_for_review(merchant.id, "ops@portal")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));
}

async fn approved_merchant(state: &peptide_ops_api::AppState) -> uuid::Uuid {
    let merchant = state
        .services
        .merchants
        .register(registration("Funded"), "system")
        .await
        .unwrap();
    state
        .services
        .merchants
        .submit_for_review(merchant.id, "ops@portal")
        .await
        .unwrap();
    state
        .services
        .merchants
        .approve(merchant.id, None, "ops@portal")
        .await
        .unwrap();
    merchant.id
}

#[tokio::test]
async fn debit_is_blocked_exactly_below_the_compliance_reserve() {
    let state = test_state().await;
    let merchant_id = approved_merchant(&state).await;

    state
        .services
        .wallet
        .credit(merchant_id, 10_000, Some("top-up".to_string()))
        .await
        .unwrap();

    // Reserve is 5000: spending down to exactly the reserve is allowed.
    let wallet = state
        .services
        .wallet
        .debit(merchant_id, 5_000, None)
        .await
        .unwrap();
    assert_eq!(wallet.balance_cents, 5_000);
    assert_eq!(wallet.spendable_cents(), 0);

    // One more cent would cross the floor.
    let err = state
        .services
        .wallet
        .debit(merchant_id, 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientFunds(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);

    // Balance unchanged by the failed debit.
    let wallet = state
        .services
        .wallet
        .get_by_merchant(merchant_id)
        .await
        .unwrap();
    assert_eq!(wallet.balance_cents, 5_000);
}

#[tokio::test]
async fn ledger_records_every_balance_change_in_order() {
    let state = test_state().await;
    let merchant_id = approved_merchant(&state).await;

    state
        .services
        .wallet
        .credit(merchant_id, 20_000, Some("initial".to_string()))
        .await
        .unwrap();
    state
        .services
        .wallet
        .debit(merchant_id, 7_500, Some("order x".to_string()))
        .await
        .unwrap();

    let (entries, total) = state
        .services
        .wallet
        .transactions(merchant_id, 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 2);

    // Newest first.
    assert_eq!(entries[0].kind, "debit");
    assert_eq!(entries[0].amount_cents, 7_500);
    assert_eq!(entries[0].balance_after_cents, 12_500);
    assert_eq!(entries[1].kind, "credit");
    assert_eq!(entries[1].balance_after_cents, 20_000);
}

#[tokio::test]
async fn raising_the_reserve_never_claws_back_funds() {
    let state = test_state().await;
    let merchant_id = approved_merchant(&state).await;

    state
        .services
        .wallet
        .credit(merchant_id, 1_000, None)
        .await
        .unwrap();

    // Reserve above the balance is allowed; it only blocks future debits.
    let wallet = state
        .services
        .wallet
        .set_reserve(merchant_id, 50_000)
        .await
        .unwrap();
    assert_eq!(wallet.balance_cents, 1_000);
    assert_eq!(wallet.reserve_cents, 50_000);

    let err = state
        .services
        .wallet
        .debit(merchant_id, 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientFunds(_)));
}
