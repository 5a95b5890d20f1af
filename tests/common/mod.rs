#![allow(dead_code)]

use kazi::application::accounts::AccountService;
use kazi::application::config::EngineConfig;
use kazi::application::escrow::EscrowManager;
use kazi::application::gateway::PaymentGatewayAdapter;
use kazi::application::ledger::Ledger;
use kazi::application::lifecycle::LifecycleCoordinator;
use kazi::application::withdrawal::WithdrawalPolicy;
use kazi::domain::account::Account;
use kazi::domain::ports::{
    AccountStoreRef, JobStoreRef, LedgerEntryStoreRef, PaymentStoreRef, WithdrawalStoreRef,
};
use kazi::infrastructure::collaborators::{SandboxGateway, StaticIdentity, TracingNotifier};
use kazi::infrastructure::in_memory::{
    InMemoryAccountStore, InMemoryApplicationStore, InMemoryEscrowStore, InMemoryJobStore,
    InMemoryLedgerEntryStore, InMemoryMilestoneStore, InMemoryPaymentStore, InMemoryReviewStore,
    InMemoryWithdrawalStore,
};
use std::sync::Arc;
use uuid::Uuid;

/// Fully wired engine set over in-memory stores, shared by the
/// integration suites.
pub struct Harness {
    pub accounts: AccountStoreRef,
    pub entries: LedgerEntryStoreRef,
    pub payments: PaymentStoreRef,
    pub withdrawal_requests: WithdrawalStoreRef,
    pub jobs: JobStoreRef,
    pub ledger: Arc<Ledger>,
    pub escrow: Arc<EscrowManager>,
    pub adapter: PaymentGatewayAdapter,
    pub withdrawals: WithdrawalPolicy,
    pub lifecycle: LifecycleCoordinator,
    pub registration: AccountService,
    pub identity: Arc<StaticIdentity>,
    pub gateway: Arc<SandboxGateway>,
}

pub fn harness() -> Harness {
    harness_with_gateway(SandboxGateway::accepting())
}

pub fn rejecting_harness() -> Harness {
    harness_with_gateway(SandboxGateway::rejecting())
}

fn harness_with_gateway(gateway: SandboxGateway) -> Harness {
    let accounts: AccountStoreRef = Arc::new(InMemoryAccountStore::new());
    let entries: LedgerEntryStoreRef = Arc::new(InMemoryLedgerEntryStore::new());
    let payments: PaymentStoreRef = Arc::new(InMemoryPaymentStore::new());
    let withdrawal_requests: WithdrawalStoreRef = Arc::new(InMemoryWithdrawalStore::new());
    let jobs: JobStoreRef = Arc::new(InMemoryJobStore::new());
    let identity = Arc::new(StaticIdentity::new());
    let gateway = Arc::new(gateway);
    let notifier = Arc::new(TracingNotifier);
    let config = EngineConfig::default();

    let ledger = Arc::new(Ledger::new(Arc::clone(&accounts), Arc::clone(&entries)));
    let escrow = Arc::new(EscrowManager::new(
        Arc::new(InMemoryEscrowStore::new()),
        Arc::clone(&ledger),
    ));
    let registration = AccountService::new(Arc::clone(&accounts), identity.clone());
    let adapter = PaymentGatewayAdapter::new(
        Arc::clone(&payments),
        Arc::clone(&accounts),
        Arc::clone(&ledger),
        gateway.clone(),
        notifier.clone(),
        config.clone(),
    );
    let withdrawals = WithdrawalPolicy::new(
        Arc::clone(&withdrawal_requests),
        Arc::clone(&accounts),
        Arc::clone(&ledger),
        notifier.clone(),
        config,
    );
    let lifecycle = LifecycleCoordinator::new(
        Arc::clone(&jobs),
        Arc::new(InMemoryMilestoneStore::new()),
        Arc::new(InMemoryApplicationStore::new()),
        Arc::new(InMemoryReviewStore::new()),
        Arc::clone(&escrow),
        Arc::clone(&ledger),
        notifier,
    );

    Harness {
        accounts,
        entries,
        payments,
        withdrawal_requests,
        jobs,
        ledger,
        escrow,
        adapter,
        withdrawals,
        lifecycle,
        registration,
        identity,
        gateway,
    }
}

impl Harness {
    /// Registers an account under `tag` with no referrer.
    pub async fn registered(&self, tag: &str) -> Account {
        self.registered_with_code(tag, None).await
    }

    pub async fn registered_with_code(&self, tag: &str, code: Option<&str>) -> Account {
        self.identity
            .insert(&format!("tok-{tag}"), &format!("uid-{tag}"), &format!("{tag}@example.com"));
        self.registration
            .register(&format!("tok-{tag}"), code)
            .await
            .unwrap()
    }

    /// Registers `tag` and runs the full activation round trip.
    pub async fn activated(&self, tag: &str) -> Account {
        let account = self.registered(tag).await;
        self.activate(account.id).await
    }

    /// Initiates an activation payment and delivers its success callback.
    pub async fn activate(&self, account_id: Uuid) -> Account {
        let payment = self
            .adapter
            .initiate_activation(account_id, "254700000001")
            .await
            .unwrap();
        self.adapter
            .reconcile(&payment.checkout_ref, true, Some("RCPT001".into()))
            .await
            .unwrap();
        self.account(account_id).await
    }

    pub async fn account(&self, id: Uuid) -> Account {
        self.accounts.get(id).await.unwrap().unwrap()
    }
}
