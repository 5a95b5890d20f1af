use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the ledger, escrow, payment and lifecycle engines.
///
/// Validation errors are returned before any state is written, so a caller
/// receiving one of these can assume zero side effects.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("amount must be strictly positive, got {0}")]
    InvalidAmount(Decimal),
    #[error("insufficient funds in {wallet} wallet")]
    InsufficientFunds { wallet: &'static str },
    #[error("illegal escrow transition from {from} to {to}")]
    InvalidEscrowTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("escrow hold {0} not found")]
    EscrowNotFound(Uuid),
    #[error("pending payment {0} not found")]
    PaymentNotFound(String),
    #[error("request {0} has already been processed")]
    AlreadyProcessed(Uuid),
    #[error("job {0} already has an assigned freelancer")]
    AlreadyAssigned(Uuid),
    #[error("caller is not authorized for this operation")]
    Unauthorized,
    #[error("earnings wallet can only be withdrawn once per {0} days")]
    WithdrawalTooSoon(i64),
    #[error("minimum withdrawal amount is {minimum}")]
    BelowMinimum { minimum: Decimal },
    #[error("account {0} not found")]
    AccountNotFound(Uuid),
    #[error("job {0} not found")]
    JobNotFound(Uuid),
    #[error("milestone {0} not found")]
    MilestoneNotFound(Uuid),
    #[error("application {0} not found")]
    ApplicationNotFound(Uuid),
    #[error("withdrawal request {0} not found")]
    WithdrawalNotFound(Uuid),
    #[error("job {0} has no assigned freelancer")]
    JobNotAssigned(Uuid),
    #[error("a review for this job by this reviewer already exists")]
    DuplicateReview,
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("unknown referral code")]
    InvalidReferralCode,
    #[error("credential could not be verified")]
    InvalidCredential,
    #[error("payment gateway rejected the initiation: {0}")]
    GatewayRejected(String),
    #[error("internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(Box::new(err))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err)
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EngineError {
    fn from(err: rocksdb::Error) -> Self {
        Self::internal(err)
    }
}
