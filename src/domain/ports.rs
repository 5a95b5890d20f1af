use crate::domain::account::Account;
use crate::domain::escrow::EscrowHold;
use crate::domain::job::{Job, JobApplication, Milestone, Review};
use crate::domain::ledger::{EntryKind, LedgerEntry, WalletKind};
use crate::domain::money::Amount;
use crate::domain::payment::PendingPayment;
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type LedgerEntryStoreRef = Arc<dyn LedgerEntryStore>;
pub type EscrowStoreRef = Arc<dyn EscrowStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type WithdrawalStoreRef = Arc<dyn WithdrawalStore>;
pub type JobStoreRef = Arc<dyn JobStore>;
pub type MilestoneStoreRef = Arc<dyn MilestoneStore>;
pub type ApplicationStoreRef = Arc<dyn ApplicationStore>;
pub type ReviewStoreRef = Arc<dyn ReviewStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type NotifierRef = Arc<dyn Notifier>;
pub type IdentityProviderRef = Arc<dyn IdentityProvider>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn store(&self, account: Account) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Account>>;
    async fn by_external_id(&self, external_id: &str) -> Result<Option<Account>>;
    async fn by_referral_code(&self, code: &str) -> Result<Option<Account>>;
    async fn all(&self) -> Result<Vec<Account>>;
}

#[async_trait]
pub trait LedgerEntryStore: Send + Sync {
    async fn append(&self, entry: LedgerEntry) -> Result<()>;
    /// Looks up a previously applied entry by its idempotency key.
    async fn by_reference(
        &self,
        account_id: Uuid,
        wallet: WalletKind,
        kind: EntryKind,
        reference: &str,
    ) -> Result<Option<LedgerEntry>>;
    async fn for_wallet(&self, account_id: Uuid, wallet: WalletKind) -> Result<Vec<LedgerEntry>>;
}

#[async_trait]
pub trait EscrowStore: Send + Sync {
    async fn store(&self, hold: EscrowHold) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<EscrowHold>>;
    async fn for_milestone(&self, milestone_id: Uuid) -> Result<Option<EscrowHold>>;
    async fn for_job(&self, job_id: Uuid) -> Result<Vec<EscrowHold>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn store(&self, payment: PendingPayment) -> Result<()>;
    async fn by_checkout_ref(&self, checkout_ref: &str) -> Result<Option<PendingPayment>>;
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn store(&self, request: WithdrawalRequest) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<WithdrawalRequest>>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn store(&self, job: Job) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Job>>;
}

#[async_trait]
pub trait MilestoneStore: Send + Sync {
    async fn store(&self, milestone: Milestone) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Milestone>>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn store(&self, application: JobApplication) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<JobApplication>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn append(&self, review: Review) -> Result<()>;
    async fn exists(&self, job_id: Uuid, reviewer_id: Uuid) -> Result<bool>;
    async fn for_reviewee(&self, reviewee_id: Uuid) -> Result<Vec<Review>>;
}

/// Payment-initiation request forwarded to the external gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiationRequest {
    pub phone_number: String,
    pub amount: Amount,
    pub description: String,
    pub checkout_ref: String,
    pub merchant_ref: String,
}

/// Synchronous gateway answer. `accepted` only means the push was queued;
/// final state always comes through the callback path.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayAck {
    pub accepted: bool,
    pub detail: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, request: &InitiationRequest) -> Result<GatewayAck>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Activation,
    Referral,
    Withdrawal,
    JobApplication,
    JobAccepted,
    JobCompleted,
    MilestoneCompleted,
    ReviewReceived,
    Dispute,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationAudience {
    Users(Vec<Uuid>),
    Broadcast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub audience: NotificationAudience,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

/// Fire-and-forget collaborator; a failed notify never rolls back ledger
/// work. Callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub external_id: String,
    pub email: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves an opaque bearer credential to a verified identity, or
    /// fails with `InvalidCredential`.
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity>;
}
