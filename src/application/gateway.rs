use crate::application::config::EngineConfig;
use crate::application::ledger::{Ledger, Posting};
use crate::application::locks::KeyedLocks;
use crate::domain::ledger::{EntryKind, WalletKind};
use crate::domain::money::Amount;
use crate::domain::payment::{PaymentPurpose, PaymentState, PendingPayment};
use crate::domain::ports::{
    AccountStoreRef, InitiationRequest, Notification, NotificationAudience, NotificationKind,
    NotifierRef, PaymentGatewayRef, PaymentStoreRef,
};
use crate::error::{EngineError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What `reconcile` did with a callback. Unknown and duplicate callbacks
/// are absorbed (the gateway only needs an acknowledgement), so they are
/// outcomes here rather than errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    AlreadySettled,
    NotFound,
}

/// Bridges the external payment gateway to the ledger.
///
/// `initiate` persists a pending record and forwards the push request;
/// `reconcile` turns the asynchronous callback into ledger effects. Both
/// sides of a checkout reference serialize on a keyed lock so duplicate
/// callbacks cannot double-settle.
pub struct PaymentGatewayAdapter {
    payments: PaymentStoreRef,
    accounts: AccountStoreRef,
    ledger: Arc<Ledger>,
    gateway: PaymentGatewayRef,
    notifier: NotifierRef,
    config: EngineConfig,
    ref_locks: KeyedLocks<String>,
}

impl PaymentGatewayAdapter {
    pub fn new(
        payments: PaymentStoreRef,
        accounts: AccountStoreRef,
        ledger: Arc<Ledger>,
        gateway: PaymentGatewayRef,
        notifier: NotifierRef,
        config: EngineConfig,
    ) -> Self {
        Self {
            payments,
            accounts,
            ledger,
            gateway,
            notifier,
            config,
            ref_locks: KeyedLocks::new(),
        }
    }

    /// Starts an account-activation payment for the configured fee.
    pub async fn initiate_activation(
        &self,
        account_id: Uuid,
        phone_number: &str,
    ) -> Result<PendingPayment> {
        let fee = Amount::new(self.config.activation_fee)?;
        self.initiate(
            account_id,
            fee,
            phone_number,
            PaymentPurpose::Activation,
            None,
            "Account Activation Fee",
        )
        .await
    }

    /// Persists a pending record, then calls the gateway. An immediate
    /// rejection moves the record straight to `failed`; acceptance leaves
    /// it pending until the callback lands. The external call happens
    /// outside any balance lock.
    pub async fn initiate(
        &self,
        account_id: Uuid,
        amount: Amount,
        phone_number: &str,
        purpose: PaymentPurpose,
        job_id: Option<Uuid>,
        description: &str,
    ) -> Result<PendingPayment> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(EngineError::AccountNotFound(account_id))?;

        let mut payment = PendingPayment::new(
            account.id,
            job_id,
            amount,
            phone_number,
            purpose,
            description,
        );
        self.payments.store(payment.clone()).await?;

        let ack = self
            .gateway
            .initiate(&InitiationRequest {
                phone_number: payment.phone_number.clone(),
                amount: payment.amount,
                description: payment.description.clone(),
                checkout_ref: payment.checkout_ref.clone(),
                merchant_ref: payment.merchant_ref.clone(),
            })
            .await?;

        if !ack.accepted {
            payment.state = PaymentState::Failed;
            self.payments.store(payment).await?;
            return Err(EngineError::GatewayRejected(ack.detail));
        }

        info!(checkout_ref = %payment.checkout_ref, account = %account.id, "payment initiated");
        Ok(payment)
    }

    /// Status lookup by checkout reference, for callers polling an
    /// in-flight payment.
    pub async fn payment(&self, checkout_ref: &str) -> Result<PendingPayment> {
        self.payments
            .by_checkout_ref(checkout_ref)
            .await?
            .ok_or_else(|| EngineError::PaymentNotFound(checkout_ref.to_string()))
    }

    /// Applies a gateway callback. Serialized per checkout reference;
    /// terminal records are never mutated twice, so at-least-once callback
    /// delivery is safe.
    pub async fn reconcile(
        &self,
        checkout_ref: &str,
        success: bool,
        external_transaction_id: Option<String>,
    ) -> Result<ReconcileOutcome> {
        let _guard = self.ref_locks.acquire(&checkout_ref.to_string()).await;

        let Some(mut payment) = self.payments.by_checkout_ref(checkout_ref).await? else {
            warn!(checkout_ref, "callback for unknown payment dropped");
            return Ok(ReconcileOutcome::NotFound);
        };
        if payment.state.is_terminal() {
            info!(checkout_ref, state = ?payment.state, "duplicate callback ignored");
            return Ok(ReconcileOutcome::AlreadySettled);
        }

        if !success {
            payment.state = PaymentState::Failed;
            self.payments.store(payment).await?;
            return Ok(ReconcileOutcome::Applied);
        }

        payment.completed_at = Some(Utc::now());
        payment.external_transaction_id = external_transaction_id;

        // Settlement runs before the record turns terminal: if it fails the
        // payment stays pending and the next callback retry can finish it.
        if payment.purpose == PaymentPurpose::Activation {
            self.settle_activation(&payment).await?;
        }

        payment.state = PaymentState::Completed;
        self.payments.store(payment).await?;
        Ok(ReconcileOutcome::Applied)
    }

    /// Activates the paying account and, when the referrer is itself
    /// already activated, credits the fixed referral bonus. The bonus is
    /// keyed by the referred account so it fires at most once no matter how
    /// often the callback is retried.
    async fn settle_activation(&self, payment: &PendingPayment) -> Result<()> {
        let account = self
            .ledger
            .update_account(payment.account_id, |account| account.activated = true)
            .await?;

        if let Some(referrer_id) = account.referred_by
            && let Some(referrer) = self.accounts.get(referrer_id).await?
            && referrer.activated
        {
            let bonus = Amount::new(self.config.referral_bonus)?;
            self.ledger
                .credit(
                    Posting::new(
                        referrer.id,
                        WalletKind::Referral,
                        bonus,
                        EntryKind::ReferralBonus,
                    )
                    .describe(format!("Referral bonus from {}", account.email))
                    .reference(format!("REF_{}", account.id)),
                )
                .await?;
            self.notify(Notification {
                audience: NotificationAudience::Users(vec![referrer.id]),
                title: "Referral Bonus Received".into(),
                message: format!("You received KSh {bonus} for referring {}", account.email),
                kind: NotificationKind::Referral,
            })
            .await;
        }

        self.notify(Notification {
            audience: NotificationAudience::Users(vec![account.id]),
            title: "Account Activated".into(),
            message: "Your account has been successfully activated".into(),
            kind: NotificationKind::Activation,
        })
        .await;
        Ok(())
    }

    async fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.notify(&notification).await {
            warn!(%err, "notification delivery failed");
        }
    }
}
