use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Earnings,
    Referral,
}

impl WalletKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earnings => "earnings",
            Self::Referral => "referral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    ActivationFee,
    ReferralBonus,
    JobPayment,
    MilestonePayment,
    Withdrawal,
    AdminAdjustment,
    DisputeRefund,
    Other,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActivationFee => "activation_fee",
            Self::ReferralBonus => "referral_bonus",
            Self::JobPayment => "job_payment",
            Self::MilestonePayment => "milestone_payment",
            Self::Withdrawal => "withdrawal",
            Self::AdminAdjustment => "admin_adjustment",
            Self::DisputeRefund => "dispute_refund",
            Self::Other => "other",
        }
    }
}

/// One immutable balance-affecting event.
///
/// The entry log is the source of truth: a wallet balance at any time equals
/// the sum of the signed `amount`s of its entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub wallet: WalletKind,
    /// Signed: positive for credits, negative for debits.
    pub amount: Decimal,
    pub kind: EntryKind,
    pub job_id: Option<Uuid>,
    pub description: String,
    /// Idempotency key; unique per `(account, wallet, kind)` when present.
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}
