use crate::application::config::EngineConfig;
use crate::application::ledger::{Ledger, Posting};
use crate::application::locks::KeyedLocks;
use crate::domain::ledger::{EntryKind, WalletKind};
use crate::domain::money::Amount;
use crate::domain::ports::{
    AccountStoreRef, Notification, NotificationAudience, NotificationKind, NotifierRef,
    WithdrawalStoreRef,
};
use crate::domain::withdrawal::{WithdrawalRequest, WithdrawalState};
use crate::error::{EngineError, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Validates and records withdrawal requests, and applies the one-shot
/// administrative decision.
///
/// Requesting never debits a wallet; the debit happens at approval time,
/// keyed by the request id so a replayed approval cannot double-debit.
pub struct WithdrawalPolicy {
    withdrawals: WithdrawalStoreRef,
    accounts: AccountStoreRef,
    ledger: Arc<Ledger>,
    notifier: NotifierRef,
    config: EngineConfig,
    request_locks: KeyedLocks<Uuid>,
}

impl WithdrawalPolicy {
    pub fn new(
        withdrawals: WithdrawalStoreRef,
        accounts: AccountStoreRef,
        ledger: Arc<Ledger>,
        notifier: NotifierRef,
        config: EngineConfig,
    ) -> Self {
        Self {
            withdrawals,
            accounts,
            ledger,
            notifier,
            config,
            request_locks: KeyedLocks::new(),
        }
    }

    pub async fn request(
        &self,
        account_id: Uuid,
        wallet: WalletKind,
        amount: Amount,
    ) -> Result<WithdrawalRequest> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(EngineError::AccountNotFound(account_id))?;

        match wallet {
            WalletKind::Earnings => {
                let cooldown = Duration::days(self.config.earnings_withdrawal_cooldown_days);
                if let Some(last) = account.last_earnings_withdrawal
                    && last > Utc::now() - cooldown
                {
                    return Err(EngineError::WithdrawalTooSoon(
                        self.config.earnings_withdrawal_cooldown_days,
                    ));
                }
                if amount.value() > account.earnings_wallet.value() {
                    return Err(EngineError::InsufficientFunds { wallet: "earnings" });
                }
            }
            WalletKind::Referral => {
                if amount.value() > account.referral_wallet.value() {
                    return Err(EngineError::InsufficientFunds { wallet: "referral" });
                }
                if amount.value() < self.config.referral_withdrawal_min {
                    return Err(EngineError::BelowMinimum {
                        minimum: self.config.referral_withdrawal_min,
                    });
                }
            }
        }

        let request = WithdrawalRequest::new(account.id, wallet, amount);
        self.withdrawals.store(request.clone()).await?;

        if let Err(err) = self
            .notifier
            .notify(&Notification {
                audience: NotificationAudience::Broadcast,
                title: "New Withdrawal Request".into(),
                message: format!("User {} requested withdrawal of KSh {amount}", account.email),
                kind: NotificationKind::Withdrawal,
            })
            .await
        {
            warn!(%err, "withdrawal notification failed");
        }
        Ok(request)
    }

    /// Applies the administrative decision exactly once. Approval debits
    /// the wallet with `reference = request id`; rejection records the
    /// reason and touches no balance.
    pub async fn finalize(
        &self,
        request_id: Uuid,
        approve: bool,
        rejection_reason: Option<String>,
    ) -> Result<WithdrawalRequest> {
        let _guard = self.request_locks.acquire(&request_id).await;
        let mut request = self
            .withdrawals
            .get(request_id)
            .await?
            .ok_or(EngineError::WithdrawalNotFound(request_id))?;

        if request.state != WithdrawalState::Pending {
            return Err(EngineError::AlreadyProcessed(request_id));
        }

        if approve {
            self.ledger
                .debit(
                    Posting::new(
                        request.account_id,
                        request.wallet,
                        request.amount,
                        EntryKind::Withdrawal,
                    )
                    .describe(format!("Withdrawal from {} wallet", request.wallet.as_str()))
                    .reference(request.id.to_string()),
                )
                .await?;

            if request.wallet == WalletKind::Earnings {
                self.ledger
                    .update_account(request.account_id, |account| {
                        account.last_earnings_withdrawal = Some(Utc::now());
                    })
                    .await?;
            }
            request.state = WithdrawalState::Approved;
        } else {
            request.state = WithdrawalState::Rejected;
            request.rejection_reason = rejection_reason;
        }
        request.processed_at = Some(Utc::now());
        self.withdrawals.store(request.clone()).await?;
        Ok(request)
    }
}
