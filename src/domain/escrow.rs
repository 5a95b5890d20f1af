use crate::domain::money::Amount;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowState {
    Held,
    Released,
    Refunded,
    Disputed,
}

impl EscrowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Released => "released",
            Self::Refunded => "refunded",
            Self::Disputed => "disputed",
        }
    }
}

/// Funds set aside for a job or one of its milestones.
///
/// A hold reserves accounting intent; the client is not debited when it is
/// created. State machine: held -> released | refunded | disputed, and
/// disputed -> released | refunded. Released and refunded are terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowHold {
    pub id: Uuid,
    pub job_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub amount: Amount,
    pub state: EscrowState,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl EscrowHold {
    pub fn new(
        job_id: Uuid,
        milestone_id: Option<Uuid>,
        client_id: Uuid,
        freelancer_id: Uuid,
        amount: Amount,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            milestone_id,
            client_id,
            freelancer_id,
            amount,
            state: EscrowState::Held,
            description: description.into(),
            created_at: Utc::now(),
            released_at: None,
        }
    }

    /// Validates a transition onto `next`. Repeats are rejected here;
    /// callers that want idempotent replay check the state first.
    pub fn transition(&mut self, next: EscrowState) -> Result<()> {
        let legal = matches!(
            (self.state, next),
            (
                EscrowState::Held,
                EscrowState::Released | EscrowState::Refunded | EscrowState::Disputed
            ) | (
                EscrowState::Disputed,
                EscrowState::Released | EscrowState::Refunded
            )
        );
        if !legal {
            return Err(EngineError::InvalidEscrowTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        self.state = next;
        if next == EscrowState::Released {
            self.released_at = Some(Utc::now());
        }
        Ok(())
    }
}
