use crate::domain::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    Activation,
    JobFunding,
    Other,
}

/// An in-flight payment tracked between initiation and the asynchronous
/// gateway callback. Matched by `checkout_ref`, which is globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub id: Uuid,
    pub account_id: Uuid,
    pub job_id: Option<Uuid>,
    pub amount: Amount,
    pub checkout_ref: String,
    pub merchant_ref: String,
    pub phone_number: String,
    pub purpose: PaymentPurpose,
    pub state: PaymentState,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub external_transaction_id: Option<String>,
}

impl PendingPayment {
    pub fn new(
        account_id: Uuid,
        job_id: Option<Uuid>,
        amount: Amount,
        phone_number: impl Into<String>,
        purpose: PaymentPurpose,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            job_id,
            amount,
            checkout_ref: external_ref("CK"),
            merchant_ref: external_ref("MR"),
            phone_number: phone_number.into(),
            purpose,
            state: PaymentState::Pending,
            description: description.into(),
            created_at: Utc::now(),
            completed_at: None,
            external_transaction_id: None,
        }
    }
}

/// Gateway-facing reference in the same `CK…`/`MR…` shape the upstream
/// sandbox uses: prefix plus ten uppercase hex characters.
fn external_ref(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", hex[..10].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_payments_start_pending_with_distinct_refs() {
        let payment = PendingPayment::new(
            Uuid::new_v4(),
            None,
            Amount::new(dec!(1000)).unwrap(),
            "254700000001",
            PaymentPurpose::Activation,
            "Account Activation Fee",
        );
        assert_eq!(payment.state, PaymentState::Pending);
        assert!(payment.checkout_ref.starts_with("CK"));
        assert!(payment.merchant_ref.starts_with("MR"));
        assert_eq!(payment.checkout_ref.len(), 12);
        assert_ne!(payment.checkout_ref[2..], payment.merchant_ref[2..]);
    }

    #[test]
    fn terminal_states() {
        assert!(!PaymentState::Pending.is_terminal());
        assert!(PaymentState::Completed.is_terminal());
        assert!(PaymentState::Failed.is_terminal());
        assert!(PaymentState::Cancelled.is_terminal());
    }
}
