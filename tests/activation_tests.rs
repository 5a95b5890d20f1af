mod common;

use common::{harness, rejecting_harness};
use kazi::application::gateway::ReconcileOutcome;
use kazi::domain::ledger::WalletKind;
use kazi::domain::payment::PaymentState;
use kazi::error::EngineError;
use rust_decimal_macros::dec;

#[tokio::test]
async fn activation_flips_the_account_and_credits_no_one_without_a_referrer() {
    let h = harness();
    let account = h.registered("solo").await;
    assert!(!account.activated);

    let account = h.activate(account.id).await;
    assert!(account.activated);
    assert_eq!(account.referral_wallet.value(), dec!(0));
}

#[tokio::test]
async fn referral_bonus_lands_once_despite_repeated_callbacks() {
    let h = harness();
    let referrer = h.activated("ref").await;
    let referred = h
        .registered_with_code("friend", Some(&referrer.referral_code))
        .await;
    assert_eq!(referred.referred_by, Some(referrer.id));

    let payment = h
        .adapter
        .initiate_activation(referred.id, "254700000002")
        .await
        .unwrap();

    // At-least-once delivery: the gateway may retry the same callback.
    let first = h
        .adapter
        .reconcile(&payment.checkout_ref, true, Some("RCPT002".into()))
        .await
        .unwrap();
    assert_eq!(first, ReconcileOutcome::Applied);
    for _ in 0..2 {
        let again = h
            .adapter
            .reconcile(&payment.checkout_ref, true, Some("RCPT002".into()))
            .await
            .unwrap();
        assert_eq!(again, ReconcileOutcome::AlreadySettled);
    }

    assert_eq!(
        h.ledger
            .balance(referrer.id, WalletKind::Referral)
            .await
            .unwrap(),
        dec!(50)
    );
    assert_eq!(
        h.ledger
            .audited_balance(referrer.id, WalletKind::Referral)
            .await
            .unwrap(),
        dec!(50)
    );
}

#[tokio::test]
async fn inactive_referrer_earns_nothing() {
    let h = harness();
    let referrer = h.registered("dormant").await;
    let referred = h
        .registered_with_code("friend", Some(&referrer.referral_code))
        .await;

    h.activate(referred.id).await;

    assert_eq!(
        h.ledger
            .balance(referrer.id, WalletKind::Referral)
            .await
            .unwrap(),
        dec!(0)
    );
    // The referred account still activates normally.
    assert!(h.account(referred.id).await.activated);
}

#[tokio::test]
async fn failure_callback_leaves_the_account_inactive() {
    let h = harness();
    let account = h.registered("unlucky").await;
    let payment = h
        .adapter
        .initiate_activation(account.id, "254700000003")
        .await
        .unwrap();

    let outcome = h
        .adapter
        .reconcile(&payment.checkout_ref, false, None)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);
    assert!(!h.account(account.id).await.activated);

    let stored = h.adapter.payment(&payment.checkout_ref).await.unwrap();
    assert_eq!(stored.state, PaymentState::Failed);

    // The failure is terminal; a late success callback cannot revive it.
    let late = h
        .adapter
        .reconcile(&payment.checkout_ref, true, Some("RCPT003".into()))
        .await
        .unwrap();
    assert_eq!(late, ReconcileOutcome::AlreadySettled);
    assert!(!h.account(account.id).await.activated);
}

#[tokio::test]
async fn unknown_checkout_ref_is_absorbed() {
    let h = harness();
    let outcome = h.adapter.reconcile("CK0000000000", true, None).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::NotFound);
    // A direct status lookup does surface the miss.
    assert!(matches!(
        h.adapter.payment("CK0000000000").await,
        Err(EngineError::PaymentNotFound(_))
    ));
}

#[tokio::test]
async fn gateway_rejection_fails_the_payment_immediately() {
    let h = rejecting_harness();
    let account = h.registered("rejected").await;

    let err = h
        .adapter
        .initiate_activation(account.id, "254700000004")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::GatewayRejected(_)));

    let requests = h.gateway.requests();
    assert_eq!(requests.len(), 1);
    let stored = h
        .payments
        .by_checkout_ref(&requests[0].checkout_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, PaymentState::Failed);
}

#[tokio::test]
async fn initiation_forwards_the_configured_fee() {
    let h = harness();
    let account = h.registered("payer").await;
    h.adapter
        .initiate_activation(account.id, "254700000005")
        .await
        .unwrap();

    let requests = h.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount.value(), dec!(1000));
    assert!(requests[0].checkout_ref.starts_with("CK"));
    assert!(requests[0].merchant_ref.starts_with("MR"));
}
