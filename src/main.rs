use clap::Parser;
use kazi::application::accounts::AccountService;
use kazi::application::config::EngineConfig;
use kazi::application::escrow::EscrowManager;
use kazi::application::gateway::PaymentGatewayAdapter;
use kazi::application::ledger::Ledger;
use kazi::application::lifecycle::LifecycleCoordinator;
use kazi::application::withdrawal::WithdrawalPolicy;
use kazi::domain::ledger::WalletKind;
use kazi::domain::money::Amount;
use kazi::domain::ports::{
    AccountStoreRef, ApplicationStoreRef, EscrowStoreRef, JobStoreRef, LedgerEntryStoreRef,
    MilestoneStoreRef, PaymentStoreRef, ReviewStoreRef, WithdrawalStoreRef,
};
use kazi::error::EngineError;
use kazi::infrastructure::collaborators::{SandboxGateway, StaticIdentity, TracingNotifier};
use kazi::infrastructure::in_memory::{
    InMemoryAccountStore, InMemoryApplicationStore, InMemoryEscrowStore, InMemoryJobStore,
    InMemoryLedgerEntryStore, InMemoryMilestoneStore, InMemoryPaymentStore, InMemoryReviewStore,
    InMemoryWithdrawalStore,
};
use kazi::interfaces::replay::{EventReader, ReplayEvent, WithdrawalDecision};
use kazi::interfaces::statement::StatementWriter;
use kazi::interfaces::webhook::CallbackSummary;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Replays a marketplace event log through the ledger and escrow engines
/// and prints the resulting account statement as CSV.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input JSON-lines event log
    input: PathBuf,

    /// Optional engine config (JSON); defaults match production values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database. If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

struct Stores {
    accounts: AccountStoreRef,
    entries: LedgerEntryStoreRef,
    escrows: EscrowStoreRef,
    payments: PaymentStoreRef,
    withdrawals: WithdrawalStoreRef,
    jobs: JobStoreRef,
    milestones: MilestoneStoreRef,
    applications: ApplicationStoreRef,
    reviews: ReviewStoreRef,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            accounts: Arc::new(InMemoryAccountStore::new()),
            entries: Arc::new(InMemoryLedgerEntryStore::new()),
            escrows: Arc::new(InMemoryEscrowStore::new()),
            payments: Arc::new(InMemoryPaymentStore::new()),
            withdrawals: Arc::new(InMemoryWithdrawalStore::new()),
            jobs: Arc::new(InMemoryJobStore::new()),
            milestones: Arc::new(InMemoryMilestoneStore::new()),
            applications: Arc::new(InMemoryApplicationStore::new()),
            reviews: Arc::new(InMemoryReviewStore::new()),
        }
    }

    #[cfg(feature = "storage-rocksdb")]
    fn rocksdb(path: &std::path::Path) -> kazi::error::Result<Self> {
        let store = kazi::infrastructure::rocksdb::RocksDbStore::open(path)?;
        Ok(Self {
            accounts: Arc::new(store.clone()),
            entries: Arc::new(store.clone()),
            escrows: Arc::new(store.clone()),
            payments: Arc::new(store.clone()),
            withdrawals: Arc::new(store.clone()),
            jobs: Arc::new(store.clone()),
            milestones: Arc::new(store.clone()),
            applications: Arc::new(store.clone()),
            reviews: Arc::new(store),
        })
    }
}

struct Engines {
    accounts: AccountStoreRef,
    identity: Arc<StaticIdentity>,
    registration: AccountService,
    adapter: PaymentGatewayAdapter,
    withdrawals: WithdrawalPolicy,
    lifecycle: LifecycleCoordinator,
}

fn build_engines(stores: Stores, config: EngineConfig) -> Engines {
    let identity = Arc::new(StaticIdentity::new());
    let notifier = Arc::new(TracingNotifier);
    let gateway = Arc::new(SandboxGateway::accepting());

    let ledger = Arc::new(Ledger::new(
        Arc::clone(&stores.accounts),
        Arc::clone(&stores.entries),
    ));
    let escrow = Arc::new(EscrowManager::new(
        Arc::clone(&stores.escrows),
        Arc::clone(&ledger),
    ));
    let registration = AccountService::new(Arc::clone(&stores.accounts), identity.clone());
    let adapter = PaymentGatewayAdapter::new(
        Arc::clone(&stores.payments),
        Arc::clone(&stores.accounts),
        Arc::clone(&ledger),
        gateway,
        notifier.clone(),
        config.clone(),
    );
    let withdrawals = WithdrawalPolicy::new(
        Arc::clone(&stores.withdrawals),
        Arc::clone(&stores.accounts),
        Arc::clone(&ledger),
        notifier.clone(),
        config,
    );
    let lifecycle = LifecycleCoordinator::new(
        Arc::clone(&stores.jobs),
        Arc::clone(&stores.milestones),
        Arc::clone(&stores.applications),
        Arc::clone(&stores.reviews),
        escrow,
        ledger,
        notifier,
    );

    Engines {
        accounts: stores.accounts,
        identity,
        registration,
        adapter,
        withdrawals,
        lifecycle,
    }
}

/// Resolves caller-chosen event labels to the ids the engines mint.
#[derive(Default)]
struct Labels {
    accounts: HashMap<String, Uuid>,
    jobs: HashMap<String, Uuid>,
    applications: HashMap<String, Uuid>,
    milestones: HashMap<String, Uuid>,
}

impl Labels {
    fn resolve(map: &HashMap<String, Uuid>, label: &str) -> kazi::error::Result<Uuid> {
        map.get(label).copied().ok_or_else(|| {
            EngineError::internal(std::io::Error::other(format!("unknown label {label}")))
        })
    }
}

fn wallet_kind(name: &str) -> kazi::error::Result<WalletKind> {
    match name {
        "earnings" => Ok(WalletKind::Earnings),
        "referral" => Ok(WalletKind::Referral),
        other => Err(EngineError::internal(std::io::Error::other(format!(
            "unknown wallet {other}"
        )))),
    }
}

async fn apply_event(
    engines: &Engines,
    labels: &mut Labels,
    event: ReplayEvent,
) -> kazi::error::Result<()> {
    match event {
        ReplayEvent::Account {
            label,
            email,
            referred_by,
        } => {
            let referral_code = match referred_by {
                Some(referrer) => {
                    let id = Labels::resolve(&labels.accounts, &referrer)?;
                    let referrer = engines
                        .accounts
                        .get(id)
                        .await?
                        .ok_or(EngineError::AccountNotFound(id))?;
                    Some(referrer.referral_code)
                }
                None => None,
            };
            engines.identity.insert(&label, &label, &email);
            let account = engines
                .registration
                .register(&label, referral_code.as_deref())
                .await?;
            labels.accounts.insert(label, account.id);
        }
        ReplayEvent::Activation {
            account,
            phone,
            success,
        } => {
            let account_id = Labels::resolve(&labels.accounts, &account)?;
            let payment = engines.adapter.initiate_activation(account_id, &phone).await?;
            // The sandbox gateway delivers its callback inline; parse it the
            // same way the live webhook body would be.
            let body =
                SandboxGateway::callback_body(&payment.checkout_ref, &payment.merchant_ref, success);
            let summary = CallbackSummary::parse(&body)?;
            engines
                .adapter
                .reconcile(&summary.checkout_ref, summary.success, summary.transaction_id)
                .await?;
        }
        ReplayEvent::PostJob {
            label,
            client,
            budget,
        } => {
            let client_id = Labels::resolve(&labels.accounts, &client)?;
            let job = engines
                .lifecycle
                .post_job(client_id, Amount::new(budget)?)
                .await?;
            labels.jobs.insert(label, job.id);
        }
        ReplayEvent::Apply {
            label,
            job,
            freelancer,
        } => {
            let job_id = Labels::resolve(&labels.jobs, &job)?;
            let freelancer_id = Labels::resolve(&labels.accounts, &freelancer)?;
            let application = engines.lifecycle.apply(job_id, freelancer_id).await?;
            labels.applications.insert(label, application.id);
        }
        ReplayEvent::Accept { application, actor } => {
            let application_id = Labels::resolve(&labels.applications, &application)?;
            let actor_id = Labels::resolve(&labels.accounts, &actor)?;
            engines
                .lifecycle
                .accept_application(application_id, actor_id)
                .await?;
        }
        ReplayEvent::Milestone {
            label,
            job,
            actor,
            title,
            amount,
        } => {
            let job_id = Labels::resolve(&labels.jobs, &job)?;
            let actor_id = Labels::resolve(&labels.accounts, &actor)?;
            let milestone = engines
                .lifecycle
                .create_milestone(job_id, actor_id, &title, Amount::new(amount)?)
                .await?;
            labels.milestones.insert(label, milestone.id);
        }
        ReplayEvent::CompleteMilestone { milestone, actor } => {
            let milestone_id = Labels::resolve(&labels.milestones, &milestone)?;
            let actor_id = Labels::resolve(&labels.accounts, &actor)?;
            engines
                .lifecycle
                .complete_milestone(milestone_id, actor_id)
                .await?;
        }
        ReplayEvent::CompleteJob {
            job,
            actor,
            final_amount,
        } => {
            let job_id = Labels::resolve(&labels.jobs, &job)?;
            let actor_id = Labels::resolve(&labels.accounts, &actor)?;
            let final_amount = final_amount.map(Amount::new).transpose()?;
            engines
                .lifecycle
                .complete_job(job_id, actor_id, final_amount)
                .await?;
        }
        ReplayEvent::Dispute { job, actor } => {
            let job_id = Labels::resolve(&labels.jobs, &job)?;
            let actor_id = Labels::resolve(&labels.accounts, &actor)?;
            engines.lifecycle.raise_dispute(job_id, actor_id).await?;
        }
        ReplayEvent::Withdraw {
            account,
            wallet,
            amount,
            decision,
        } => {
            let account_id = Labels::resolve(&labels.accounts, &account)?;
            let wallet = wallet_kind(&wallet)?;
            let request = engines
                .withdrawals
                .request(account_id, wallet, Amount::new(amount)?)
                .await?;
            if let Some(decision) = decision {
                let approve = decision == WithdrawalDecision::Approve;
                let reason = (!approve).then(|| "rejected by operator".to_string());
                engines
                    .withdrawals
                    .finalize(request.id, approve, reason)
                    .await?;
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            serde_json::from_reader(file).into_diagnostic()
        }
        None => Ok(EngineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    #[cfg(feature = "storage-rocksdb")]
    let stores = match cli.db_path.as_deref() {
        Some(path) => Stores::rocksdb(path).into_diagnostic()?,
        None => Stores::in_memory(),
    };
    #[cfg(not(feature = "storage-rocksdb"))]
    let stores = Stores::in_memory();

    let engines = build_engines(stores, config);
    let mut labels = Labels::default();

    let file = File::open(&cli.input).into_diagnostic()?;
    for event in EventReader::new(file).events() {
        match event {
            Ok(event) => {
                if let Err(e) = apply_event(&engines, &mut labels, event).await {
                    eprintln!("Error processing event: {e}");
                }
            }
            Err(e) => eprintln!("Error reading event: {e}"),
        }
    }

    let accounts = engines.accounts.all().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = StatementWriter::new(stdout.lock());
    writer.write_accounts(&accounts).into_diagnostic()?;
    Ok(())
}
