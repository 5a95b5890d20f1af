use crate::application::locks::KeyedLocks;
use crate::domain::account::Account;
use crate::domain::ledger::{EntryKind, LedgerEntry, WalletKind};
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{AccountStoreRef, LedgerEntryStoreRef};
use crate::error::{EngineError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Parameters shared by `credit` and `debit`.
#[derive(Debug, Clone)]
pub struct Posting {
    pub account_id: Uuid,
    pub wallet: WalletKind,
    pub amount: Amount,
    pub kind: EntryKind,
    pub job_id: Option<Uuid>,
    pub description: String,
    /// Idempotency key: posting the same `(account, wallet, kind,
    /// reference)` twice returns the original entry instead of applying a
    /// second time.
    pub reference: Option<String>,
}

impl Posting {
    pub fn new(account_id: Uuid, wallet: WalletKind, amount: Amount, kind: EntryKind) -> Self {
        Self {
            account_id,
            wallet,
            amount,
            kind,
            job_id: None,
            description: String::new(),
            reference: None,
        }
    }

    pub fn job(mut self, job_id: Uuid) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// The ledger engine: the only mutator of wallet balances.
///
/// Each posting appends one immutable entry and updates the cached balance
/// on the account under that account's lock, so the cache and the log never
/// diverge and concurrent postings serialize.
pub struct Ledger {
    accounts: AccountStoreRef,
    entries: LedgerEntryStoreRef,
    account_locks: KeyedLocks<Uuid>,
}

impl Ledger {
    pub fn new(accounts: AccountStoreRef, entries: LedgerEntryStoreRef) -> Self {
        Self {
            accounts,
            entries,
            account_locks: KeyedLocks::new(),
        }
    }

    pub async fn credit(&self, posting: Posting) -> Result<LedgerEntry> {
        self.post(posting, true).await
    }

    pub async fn debit(&self, posting: Posting) -> Result<LedgerEntry> {
        self.post(posting, false).await
    }

    /// Cached balance, maintained alongside the entry log.
    pub async fn balance(&self, account_id: Uuid, wallet: WalletKind) -> Result<Decimal> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(EngineError::AccountNotFound(account_id))?;
        Ok(account.balance(wallet).value())
    }

    /// Applies a non-posting mutation to an account under the same lock the
    /// postings take. Every writer that stores a whole account record goes
    /// through here; a stale snapshot taken outside the lock could
    /// otherwise erase a concurrent posting's balance update.
    pub async fn update_account<F>(&self, account_id: Uuid, mutate: F) -> Result<Account>
    where
        F: FnOnce(&mut Account),
    {
        let _guard = self.account_locks.acquire(&account_id).await;
        let mut account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(EngineError::AccountNotFound(account_id))?;
        mutate(&mut account);
        self.accounts.store(account.clone()).await?;
        Ok(account)
    }

    /// Balance recomputed from the entry log. The entries are the source of
    /// truth; this must always agree with `balance`.
    pub async fn audited_balance(&self, account_id: Uuid, wallet: WalletKind) -> Result<Decimal> {
        let entries = self.entries.for_wallet(account_id, wallet).await?;
        Ok(entries.iter().map(|e| e.amount).sum())
    }

    async fn post(&self, posting: Posting, is_credit: bool) -> Result<LedgerEntry> {
        let _guard = self.account_locks.acquire(&posting.account_id).await;

        if let Some(reference) = posting.reference.as_deref()
            && let Some(existing) = self
                .entries
                .by_reference(posting.account_id, posting.wallet, posting.kind, reference)
                .await?
        {
            return Ok(existing);
        }

        let mut account = self
            .accounts
            .get(posting.account_id)
            .await?
            .ok_or(EngineError::AccountNotFound(posting.account_id))?;

        if is_credit {
            account.credit_wallet(posting.wallet, posting.amount);
            if posting.wallet == WalletKind::Earnings
                && matches!(
                    posting.kind,
                    EntryKind::JobPayment | EntryKind::MilestonePayment
                )
            {
                account.total_earnings += Balance::from(posting.amount);
            }
        } else {
            account.debit_wallet(posting.wallet, posting.amount)?;
        }

        let signed = if is_credit {
            posting.amount.value()
        } else {
            -posting.amount.value()
        };
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            account_id: posting.account_id,
            wallet: posting.wallet,
            amount: signed,
            kind: posting.kind,
            job_id: posting.job_id,
            description: posting.description,
            reference: posting.reference,
            created_at: Utc::now(),
        };

        self.entries.append(entry.clone()).await?;
        self.accounts.store(account).await?;
        Ok(entry)
    }
}
