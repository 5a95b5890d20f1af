use crate::domain::account::Account;
use crate::domain::escrow::EscrowHold;
use crate::domain::job::{Job, JobApplication, Milestone, Review};
use crate::domain::ledger::{EntryKind, LedgerEntry, WalletKind};
use crate::domain::payment::PendingPayment;
use crate::domain::ports::{
    AccountStore, ApplicationStore, EscrowStore, JobStore, LedgerEntryStore, MilestoneStore,
    PaymentStore, ReviewStore, WithdrawalStore,
};
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory account store keyed by account id.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn store(&self, account: Account) -> Result<()> {
        self.accounts.write().await.insert(account.id, account);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn by_external_id(&self, external_id: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.external_id == external_id)
            .cloned())
    }

    async fn by_referral_code(&self, code: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.referral_code == code)
            .cloned())
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }
}

/// Append-only in-memory entry log; idempotency lookups scan it.
#[derive(Default, Clone)]
pub struct InMemoryLedgerEntryStore {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl InMemoryLedgerEntryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerEntryStore for InMemoryLedgerEntryStore {
    async fn append(&self, entry: LedgerEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn by_reference(
        &self,
        account_id: Uuid,
        wallet: WalletKind,
        kind: EntryKind,
        reference: &str,
    ) -> Result<Option<LedgerEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .find(|e| {
                e.account_id == account_id
                    && e.wallet == wallet
                    && e.kind == kind
                    && e.reference.as_deref() == Some(reference)
            })
            .cloned())
    }

    async fn for_wallet(&self, account_id: Uuid, wallet: WalletKind) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.account_id == account_id && e.wallet == wallet)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryEscrowStore {
    holds: Arc<RwLock<HashMap<Uuid, EscrowHold>>>,
}

impl InMemoryEscrowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EscrowStore for InMemoryEscrowStore {
    async fn store(&self, hold: EscrowHold) -> Result<()> {
        self.holds.write().await.insert(hold.id, hold);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<EscrowHold>> {
        Ok(self.holds.read().await.get(&id).cloned())
    }

    async fn for_milestone(&self, milestone_id: Uuid) -> Result<Option<EscrowHold>> {
        Ok(self
            .holds
            .read()
            .await
            .values()
            .find(|h| h.milestone_id == Some(milestone_id))
            .cloned())
    }

    async fn for_job(&self, job_id: Uuid) -> Result<Vec<EscrowHold>> {
        Ok(self
            .holds
            .read()
            .await
            .values()
            .filter(|h| h.job_id == job_id)
            .cloned()
            .collect())
    }
}

/// Pending payments keyed by their globally unique checkout reference.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, PendingPayment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn store(&self, payment: PendingPayment) -> Result<()> {
        self.payments
            .write()
            .await
            .insert(payment.checkout_ref.clone(), payment);
        Ok(())
    }

    async fn by_checkout_ref(&self, checkout_ref: &str) -> Result<Option<PendingPayment>> {
        Ok(self.payments.read().await.get(checkout_ref).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryWithdrawalStore {
    requests: Arc<RwLock<HashMap<Uuid, WithdrawalRequest>>>,
}

impl InMemoryWithdrawalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WithdrawalStore for InMemoryWithdrawalStore {
    async fn store(&self, request: WithdrawalRequest) -> Result<()> {
        self.requests.write().await.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<WithdrawalRequest>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn store(&self, job: Job) -> Result<()> {
        self.jobs.write().await.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMilestoneStore {
    milestones: Arc<RwLock<HashMap<Uuid, Milestone>>>,
}

impl InMemoryMilestoneStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MilestoneStore for InMemoryMilestoneStore {
    async fn store(&self, milestone: Milestone) -> Result<()> {
        self.milestones
            .write()
            .await
            .insert(milestone.id, milestone);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Milestone>> {
        Ok(self.milestones.read().await.get(&id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryApplicationStore {
    applications: Arc<RwLock<HashMap<Uuid, JobApplication>>>,
}

impl InMemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn store(&self, application: JobApplication) -> Result<()> {
        self.applications
            .write()
            .await
            .insert(application.id, application);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobApplication>> {
        Ok(self.applications.read().await.get(&id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryReviewStore {
    reviews: Arc<RwLock<Vec<Review>>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn append(&self, review: Review) -> Result<()> {
        self.reviews.write().await.push(review);
        Ok(())
    }

    async fn exists(&self, job_id: Uuid, reviewer_id: Uuid) -> Result<bool> {
        Ok(self
            .reviews
            .read()
            .await
            .iter()
            .any(|r| r.job_id == job_id && r.reviewer_id == reviewer_id))
    }

    async fn for_reviewee(&self, reviewee_id: Uuid) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .read()
            .await
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn account_store_lookups() {
        let store = InMemoryAccountStore::new();
        let account = Account::new("uid-1", "a@example.com");
        let code = account.referral_code.clone();
        store.store(account.clone()).await.unwrap();

        assert_eq!(store.get(account.id).await.unwrap(), Some(account.clone()));
        assert_eq!(
            store.by_external_id("uid-1").await.unwrap(),
            Some(account.clone())
        );
        assert_eq!(store.by_referral_code(&code).await.unwrap(), Some(account));
        assert!(store.by_external_id("uid-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn payment_store_is_keyed_by_checkout_ref() {
        let store = InMemoryPaymentStore::new();
        let payment = PendingPayment::new(
            Uuid::new_v4(),
            None,
            Amount::new(dec!(1000)).unwrap(),
            "254700000001",
            crate::domain::payment::PaymentPurpose::Activation,
            "activation",
        );
        let checkout_ref = payment.checkout_ref.clone();
        store.store(payment.clone()).await.unwrap();
        assert_eq!(
            store.by_checkout_ref(&checkout_ref).await.unwrap(),
            Some(payment)
        );
        assert!(store.by_checkout_ref("CKMISSING").await.unwrap().is_none());
    }
}
