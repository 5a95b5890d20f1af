use crate::domain::ledger::WalletKind;
use crate::domain::money::{Amount, Balance};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A marketplace user's money-facing state.
///
/// The wallet balances are a derived cache over the ledger entry log and are
/// only mutated through the `Ledger` engine; everything else reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Verified identifier from the identity collaborator.
    pub external_id: String,
    pub email: String,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub activated: bool,
    pub earnings_wallet: Balance,
    pub referral_wallet: Balance,
    /// Lifetime earnings from job and milestone payments.
    pub total_earnings: Balance,
    pub rating: Decimal,
    pub total_reviews: u32,
    pub last_earnings_withdrawal: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(external_id: impl Into<String>, email: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            external_id: external_id.into(),
            email: email.into(),
            referral_code: referral_code_from(id),
            referred_by: None,
            activated: false,
            earnings_wallet: Balance::ZERO,
            referral_wallet: Balance::ZERO,
            total_earnings: Balance::ZERO,
            rating: Decimal::ZERO,
            total_reviews: 0,
            last_earnings_withdrawal: None,
            created_at: Utc::now(),
        }
    }

    pub fn balance(&self, wallet: WalletKind) -> Balance {
        match wallet {
            WalletKind::Earnings => self.earnings_wallet,
            WalletKind::Referral => self.referral_wallet,
        }
    }

    /// Adds to a wallet. Only the `Ledger` calls this, inside the
    /// per-account lock, alongside appending the matching entry.
    pub(crate) fn credit_wallet(&mut self, wallet: WalletKind, amount: Amount) {
        match wallet {
            WalletKind::Earnings => self.earnings_wallet += amount.into(),
            WalletKind::Referral => self.referral_wallet += amount.into(),
        }
    }

    /// Subtracts from a wallet, failing if the balance would go negative.
    /// Only the `Ledger` calls this, inside the per-account lock.
    pub(crate) fn debit_wallet(&mut self, wallet: WalletKind, amount: Amount) -> Result<()> {
        let current = self.balance(wallet);
        if current < amount.into() {
            return Err(EngineError::InsufficientFunds {
                wallet: wallet.as_str(),
            });
        }
        match wallet {
            WalletKind::Earnings => self.earnings_wallet -= amount.into(),
            WalletKind::Referral => self.referral_wallet -= amount.into(),
        }
        Ok(())
    }
}

/// Referral codes are derived from the account id, which keeps them unique
/// without a retry loop against the store.
fn referral_code_from(id: Uuid) -> String {
    id.simple().to_string()[..8].to_uppercase()
}
