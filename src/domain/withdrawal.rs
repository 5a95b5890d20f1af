use crate::domain::ledger::WalletKind;
use crate::domain::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalState {
    Pending,
    Approved,
    Rejected,
}

/// A withdrawal awaiting administrative review. The wallet is only debited
/// at approval time, never at request time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub account_id: Uuid,
    pub wallet: WalletKind,
    pub amount: Amount,
    pub state: WithdrawalState,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl WithdrawalRequest {
    pub fn new(account_id: Uuid, wallet: WalletKind, amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            wallet,
            amount,
            state: WithdrawalState::Pending,
            requested_at: Utc::now(),
            processed_at: None,
            rejection_reason: None,
        }
    }
}
