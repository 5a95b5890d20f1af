use crate::application::ledger::{Ledger, Posting};
use crate::application::locks::KeyedLocks;
use crate::domain::escrow::{EscrowHold, EscrowState};
use crate::domain::ledger::{EntryKind, WalletKind};
use crate::domain::money::Amount;
use crate::domain::ports::EscrowStoreRef;
use crate::error::{EngineError, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Owns the lifecycle of held funds for jobs and milestones.
///
/// Creating a hold does not debit the client; budgets are advisory at
/// creation time and the hold tracks obligation, not prepaid capital.
/// Releasing credits the freelancer exactly once, keyed by the hold id.
pub struct EscrowManager {
    holds: EscrowStoreRef,
    ledger: Arc<Ledger>,
    hold_locks: KeyedLocks<Uuid>,
}

impl EscrowManager {
    pub fn new(holds: EscrowStoreRef, ledger: Arc<Ledger>) -> Self {
        Self {
            holds,
            ledger,
            hold_locks: KeyedLocks::new(),
        }
    }

    /// Read access to the hold store for callers that need to look holds
    /// up by job or milestone before acting on them.
    pub fn holds(&self) -> &EscrowStoreRef {
        &self.holds
    }

    pub async fn hold(
        &self,
        job_id: Uuid,
        milestone_id: Option<Uuid>,
        client_id: Uuid,
        freelancer_id: Uuid,
        amount: Amount,
        description: impl Into<String>,
    ) -> Result<EscrowHold> {
        let hold = EscrowHold::new(
            job_id,
            milestone_id,
            client_id,
            freelancer_id,
            amount,
            description,
        );
        self.holds.store(hold.clone()).await?;
        Ok(hold)
    }

    /// Releases held (or disputed) funds to the freelancer's earnings
    /// wallet. A second call for an already-released hold is a no-op that
    /// returns the terminal hold; the ledger reference makes the credit
    /// idempotent even across races.
    pub async fn release(&self, hold_id: Uuid) -> Result<EscrowHold> {
        let _guard = self.hold_locks.acquire(&hold_id).await;
        let mut hold = self
            .holds
            .get(hold_id)
            .await?
            .ok_or(EngineError::EscrowNotFound(hold_id))?;

        if hold.state == EscrowState::Released {
            return Ok(hold);
        }
        hold.transition(EscrowState::Released)?;

        let kind = if hold.milestone_id.is_some() {
            EntryKind::MilestonePayment
        } else {
            EntryKind::JobPayment
        };
        self.ledger
            .credit(
                Posting::new(hold.freelancer_id, WalletKind::Earnings, hold.amount, kind)
                    .job(hold.job_id)
                    .describe(hold.description.clone())
                    .reference(hold.id.to_string()),
            )
            .await?;

        self.holds.store(hold.clone()).await?;
        Ok(hold)
    }

    /// Marks a hold refunded. The client was never debited, so there is no
    /// compensating ledger entry; only the one-shot transition is enforced.
    pub async fn refund(&self, hold_id: Uuid) -> Result<EscrowHold> {
        let _guard = self.hold_locks.acquire(&hold_id).await;
        let mut hold = self
            .holds
            .get(hold_id)
            .await?
            .ok_or(EngineError::EscrowNotFound(hold_id))?;

        if hold.state == EscrowState::Refunded {
            return Ok(hold);
        }
        hold.transition(EscrowState::Refunded)?;
        self.holds.store(hold.clone()).await?;
        Ok(hold)
    }

    /// Freezes a hold while its job is under dispute. Allowed from `held`
    /// only; repeated calls on an already-disputed hold are no-ops.
    pub async fn mark_disputed(&self, hold_id: Uuid) -> Result<EscrowHold> {
        let _guard = self.hold_locks.acquire(&hold_id).await;
        let mut hold = self
            .holds
            .get(hold_id)
            .await?
            .ok_or(EngineError::EscrowNotFound(hold_id))?;

        if hold.state == EscrowState::Disputed {
            return Ok(hold);
        }
        hold.transition(EscrowState::Disputed)?;
        self.holds.store(hold.clone()).await?;
        Ok(hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Account;
    use crate::domain::ports::{AccountStore, LedgerEntryStore};
    use crate::infrastructure::in_memory::{
        InMemoryAccountStore, InMemoryEscrowStore, InMemoryLedgerEntryStore,
    };
    use rust_decimal_macros::dec;

    struct Fixture {
        manager: Arc<EscrowManager>,
        ledger: Arc<Ledger>,
        entries: Arc<InMemoryLedgerEntryStore>,
        client: Uuid,
        freelancer: Uuid,
    }

    async fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let entries = Arc::new(InMemoryLedgerEntryStore::new());
        let client = Account::new("client", "c@example.com");
        let freelancer = Account::new("freelancer", "f@example.com");
        let (client_id, freelancer_id) = (client.id, freelancer.id);
        accounts.store(client).await.unwrap();
        accounts.store(freelancer).await.unwrap();
        let entry_store: crate::domain::ports::LedgerEntryStoreRef = entries.clone();
        let ledger = Arc::new(Ledger::new(accounts, entry_store));
        let manager = Arc::new(EscrowManager::new(
            Arc::new(InMemoryEscrowStore::new()),
            Arc::clone(&ledger),
        ));
        Fixture {
            manager,
            ledger,
            entries,
            client: client_id,
            freelancer: freelancer_id,
        }
    }

    #[tokio::test]
    async fn release_credits_freelancer_once() {
        let fx = fixture().await;
        let milestone_id = Uuid::new_v4();
        let hold = fx
            .manager
            .hold(
                Uuid::new_v4(),
                Some(milestone_id),
                fx.client,
                fx.freelancer,
                Amount::new(dec!(500)).unwrap(),
                "Milestone: design",
            )
            .await
            .unwrap();

        let released = fx.manager.release(hold.id).await.unwrap();
        assert_eq!(released.state, EscrowState::Released);
        assert!(released.released_at.is_some());
        assert_eq!(
            fx.ledger
                .balance(fx.freelancer, WalletKind::Earnings)
                .await
                .unwrap(),
            dec!(500)
        );

        // Duplicate release: no-op, still exactly one entry.
        let again = fx.manager.release(hold.id).await.unwrap();
        assert_eq!(again.state, EscrowState::Released);
        let entries = fx
            .entries
            .for_wallet(fx.freelancer, WalletKind::Earnings)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::MilestonePayment);
    }

    #[tokio::test]
    async fn concurrent_release_produces_one_credit() {
        let fx = fixture().await;
        let hold = fx
            .manager
            .hold(
                Uuid::new_v4(),
                Some(Uuid::new_v4()),
                fx.client,
                fx.freelancer,
                Amount::new(dec!(250)).unwrap(),
                "Milestone: build",
            )
            .await
            .unwrap();

        let a = {
            let manager = Arc::clone(&fx.manager);
            let id = hold.id;
            tokio::spawn(async move { manager.release(id).await })
        };
        let b = {
            let manager = Arc::clone(&fx.manager);
            let id = hold.id;
            tokio::spawn(async move { manager.release(id).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(
            fx.ledger
                .balance(fx.freelancer, WalletKind::Earnings)
                .await
                .unwrap(),
            dec!(250)
        );
        let entries = fx
            .entries
            .for_wallet(fx.freelancer, WalletKind::Earnings)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn whole_job_holds_release_as_job_payment() {
        let fx = fixture().await;
        let hold = fx
            .manager
            .hold(
                Uuid::new_v4(),
                None,
                fx.client,
                fx.freelancer,
                Amount::new(dec!(900)).unwrap(),
                "Job settlement",
            )
            .await
            .unwrap();
        fx.manager.release(hold.id).await.unwrap();
        let entries = fx
            .entries
            .for_wallet(fx.freelancer, WalletKind::Earnings)
            .await
            .unwrap();
        assert_eq!(entries[0].kind, EntryKind::JobPayment);
    }

    #[tokio::test]
    async fn refund_has_no_ledger_effect_and_blocks_release() {
        let fx = fixture().await;
        let hold = fx
            .manager
            .hold(
                Uuid::new_v4(),
                None,
                fx.client,
                fx.freelancer,
                Amount::new(dec!(100)).unwrap(),
                "to refund",
            )
            .await
            .unwrap();
        let refunded = fx.manager.refund(hold.id).await.unwrap();
        assert_eq!(refunded.state, EscrowState::Refunded);
        assert_eq!(
            fx.ledger
                .balance(fx.freelancer, WalletKind::Earnings)
                .await
                .unwrap(),
            dec!(0)
        );
        assert!(matches!(
            fx.manager.release(hold.id).await,
            Err(EngineError::InvalidEscrowTransition { .. })
        ));
        // Refund replay is a no-op.
        fx.manager.refund(hold.id).await.unwrap();
    }

    #[tokio::test]
    async fn disputed_holds_can_still_be_released() {
        let fx = fixture().await;
        let hold = fx
            .manager
            .hold(
                Uuid::new_v4(),
                Some(Uuid::new_v4()),
                fx.client,
                fx.freelancer,
                Amount::new(dec!(75)).unwrap(),
                "contested milestone",
            )
            .await
            .unwrap();
        fx.manager.mark_disputed(hold.id).await.unwrap();
        let released = fx.manager.release(hold.id).await.unwrap();
        assert_eq!(released.state, EscrowState::Released);
        assert_eq!(
            fx.ledger
                .balance(fx.freelancer, WalletKind::Earnings)
                .await
                .unwrap(),
            dec!(75)
        );
    }

    #[tokio::test]
    async fn unknown_hold_is_reported() {
        let fx = fixture().await;
        let missing = Uuid::new_v4();
        assert!(matches!(
            fx.manager.release(missing).await,
            Err(EngineError::EscrowNotFound(id)) if id == missing
        ));
    }
}
