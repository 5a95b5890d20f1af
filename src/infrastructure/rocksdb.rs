use crate::domain::account::Account;
use crate::domain::escrow::EscrowHold;
use crate::domain::job::{Job, JobApplication, Milestone, Review};
use crate::domain::ledger::{EntryKind, LedgerEntry, WalletKind};
use crate::domain::payment::PendingPayment;
use crate::domain::ports::{
    AccountStore, ApplicationStore, EscrowStore, JobStore, LedgerEntryStore, MilestoneStore,
    PaymentStore, ReviewStore, WithdrawalStore,
};
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const CF_ACCOUNTS: &str = "accounts";
const CF_ENTRIES: &str = "entries";
const CF_ESCROWS: &str = "escrows";
const CF_PAYMENTS: &str = "payments";
const CF_WITHDRAWALS: &str = "withdrawals";
const CF_JOBS: &str = "jobs";
const CF_MILESTONES: &str = "milestones";
const CF_APPLICATIONS: &str = "applications";
const CF_REVIEWS: &str = "reviews";
/// Secondary indexes for the uniqueness keys the engines look things up by.
const CF_IDX_ACCOUNT_EXTERNAL: &str = "idx_account_external";
const CF_IDX_ACCOUNT_REFCODE: &str = "idx_account_refcode";
const CF_IDX_ENTRY_REFERENCE: &str = "idx_entry_reference";
const CF_IDX_ESCROW_MILESTONE: &str = "idx_escrow_milestone";
const CF_IDX_ESCROW_ID: &str = "idx_escrow_id";
const CF_IDX_REVIEW_REVIEWER: &str = "idx_review_reviewer";

const ALL_CFS: &[&str] = &[
    CF_ACCOUNTS,
    CF_ENTRIES,
    CF_ESCROWS,
    CF_PAYMENTS,
    CF_WITHDRAWALS,
    CF_JOBS,
    CF_MILESTONES,
    CF_APPLICATIONS,
    CF_REVIEWS,
    CF_IDX_ACCOUNT_EXTERNAL,
    CF_IDX_ACCOUNT_REFCODE,
    CF_IDX_ENTRY_REFERENCE,
    CF_IDX_ESCROW_MILESTONE,
    CF_IDX_ESCROW_ID,
    CF_IDX_REVIEW_REVIEWER,
];

/// Persistent store backing every engine port with RocksDB.
///
/// Entities serialize as JSON values in one column family each; prefix-keyed
/// families (`entries`, `escrows`, `reviews`) cluster rows under their owning
/// id so scoped scans stay cheap. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            EngineError::internal(std::io::Error::other(format!(
                "column family {name} not found"
            )))
        })
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: impl AsRef<[u8]>, value: &T) -> Result<()> {
        let cf = self.cf(cf)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        let cf = self.cf(cf)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_indexed<T: DeserializeOwned>(
        &self,
        index_cf: &str,
        index_key: impl AsRef<[u8]>,
        entity_cf: &str,
    ) -> Result<Option<T>> {
        let index = self.cf(index_cf)?;
        match self.db.get_cf(index, index_key)? {
            Some(primary_key) => self.get_json(entity_cf, primary_key),
            None => Ok(None),
        }
    }

    fn scan_prefix<T: DeserializeOwned>(&self, cf: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let handle = self.cf(cf)?;
        let mut items = Vec::new();
        for row in self
            .db
            .iterator_cf(handle, IteratorMode::From(prefix, rocksdb::Direction::Forward))
        {
            let (key, value) = row?;
            if !key.starts_with(prefix) {
                break;
            }
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }
}

fn prefixed_key(prefix: Uuid, id: Uuid) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(prefix.as_bytes());
    key[16..].copy_from_slice(id.as_bytes());
    key
}

fn entry_reference_key(
    account_id: Uuid,
    wallet: WalletKind,
    kind: EntryKind,
    reference: &str,
) -> Vec<u8> {
    format!("{account_id}/{}/{}/{reference}", wallet.as_str(), kind.as_str()).into_bytes()
}

#[async_trait]
impl AccountStore for RocksDbStore {
    async fn store(&self, account: Account) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_ACCOUNTS)?,
            account.id.as_bytes(),
            serde_json::to_vec(&account)?,
        );
        batch.put_cf(
            self.cf(CF_IDX_ACCOUNT_EXTERNAL)?,
            account.external_id.as_bytes(),
            account.id.as_bytes(),
        );
        batch.put_cf(
            self.cf(CF_IDX_ACCOUNT_REFCODE)?,
            account.referral_code.as_bytes(),
            account.id.as_bytes(),
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Account>> {
        self.get_json(CF_ACCOUNTS, id.as_bytes())
    }

    async fn by_external_id(&self, external_id: &str) -> Result<Option<Account>> {
        self.get_indexed(CF_IDX_ACCOUNT_EXTERNAL, external_id.as_bytes(), CF_ACCOUNTS)
    }

    async fn by_referral_code(&self, code: &str) -> Result<Option<Account>> {
        self.get_indexed(CF_IDX_ACCOUNT_REFCODE, code.as_bytes(), CF_ACCOUNTS)
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let handle = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for row in self.db.iterator_cf(handle, IteratorMode::Start) {
            let (_, value) = row?;
            accounts.push(serde_json::from_slice::<Account>(&value)?);
        }
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }
}

#[async_trait]
impl LedgerEntryStore for RocksDbStore {
    async fn append(&self, entry: LedgerEntry) -> Result<()> {
        // Entry and index land in one atomic batch; a crash can never
        // leave a reference pointing at a missing row or vice versa.
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_ENTRIES)?,
            prefixed_key(entry.account_id, entry.id),
            serde_json::to_vec(&entry)?,
        );
        if let Some(reference) = entry.reference.as_deref() {
            batch.put_cf(
                self.cf(CF_IDX_ENTRY_REFERENCE)?,
                entry_reference_key(entry.account_id, entry.wallet, entry.kind, reference),
                prefixed_key(entry.account_id, entry.id),
            );
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn by_reference(
        &self,
        account_id: Uuid,
        wallet: WalletKind,
        kind: EntryKind,
        reference: &str,
    ) -> Result<Option<LedgerEntry>> {
        self.get_indexed(
            CF_IDX_ENTRY_REFERENCE,
            entry_reference_key(account_id, wallet, kind, reference),
            CF_ENTRIES,
        )
    }

    async fn for_wallet(&self, account_id: Uuid, wallet: WalletKind) -> Result<Vec<LedgerEntry>> {
        let entries: Vec<LedgerEntry> = self.scan_prefix(CF_ENTRIES, account_id.as_bytes())?;
        Ok(entries.into_iter().filter(|e| e.wallet == wallet).collect())
    }
}

#[async_trait]
impl EscrowStore for RocksDbStore {
    async fn store(&self, hold: EscrowHold) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_ESCROWS)?,
            prefixed_key(hold.job_id, hold.id),
            serde_json::to_vec(&hold)?,
        );
        if let Some(milestone_id) = hold.milestone_id {
            batch.put_cf(
                self.cf(CF_IDX_ESCROW_MILESTONE)?,
                milestone_id.as_bytes(),
                prefixed_key(hold.job_id, hold.id),
            );
        }
        // get() has no job context, so keep a direct id row as well.
        batch.put_cf(
            self.cf(CF_IDX_ESCROW_ID)?,
            hold.id.as_bytes(),
            prefixed_key(hold.job_id, hold.id),
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<EscrowHold>> {
        self.get_indexed(CF_IDX_ESCROW_ID, id.as_bytes(), CF_ESCROWS)
    }

    async fn for_milestone(&self, milestone_id: Uuid) -> Result<Option<EscrowHold>> {
        self.get_indexed(CF_IDX_ESCROW_MILESTONE, milestone_id.as_bytes(), CF_ESCROWS)
    }

    async fn for_job(&self, job_id: Uuid) -> Result<Vec<EscrowHold>> {
        self.scan_prefix(CF_ESCROWS, job_id.as_bytes())
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn store(&self, payment: PendingPayment) -> Result<()> {
        self.put_json(CF_PAYMENTS, payment.checkout_ref.as_bytes(), &payment)
    }

    async fn by_checkout_ref(&self, checkout_ref: &str) -> Result<Option<PendingPayment>> {
        self.get_json(CF_PAYMENTS, checkout_ref.as_bytes())
    }
}

#[async_trait]
impl WithdrawalStore for RocksDbStore {
    async fn store(&self, request: WithdrawalRequest) -> Result<()> {
        self.put_json(CF_WITHDRAWALS, request.id.as_bytes(), &request)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WithdrawalRequest>> {
        self.get_json(CF_WITHDRAWALS, id.as_bytes())
    }
}

#[async_trait]
impl JobStore for RocksDbStore {
    async fn store(&self, job: Job) -> Result<()> {
        self.put_json(CF_JOBS, job.id.as_bytes(), &job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        self.get_json(CF_JOBS, id.as_bytes())
    }
}

#[async_trait]
impl MilestoneStore for RocksDbStore {
    async fn store(&self, milestone: Milestone) -> Result<()> {
        self.put_json(CF_MILESTONES, milestone.id.as_bytes(), &milestone)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Milestone>> {
        self.get_json(CF_MILESTONES, id.as_bytes())
    }
}

#[async_trait]
impl ApplicationStore for RocksDbStore {
    async fn store(&self, application: JobApplication) -> Result<()> {
        self.put_json(CF_APPLICATIONS, application.id.as_bytes(), &application)
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobApplication>> {
        self.get_json(CF_APPLICATIONS, id.as_bytes())
    }
}

#[async_trait]
impl ReviewStore for RocksDbStore {
    async fn append(&self, review: Review) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_REVIEWS)?,
            prefixed_key(review.reviewee_id, review.id),
            serde_json::to_vec(&review)?,
        );
        batch.put_cf(
            self.cf(CF_IDX_REVIEW_REVIEWER)?,
            prefixed_key(review.job_id, review.reviewer_id),
            review.id.as_bytes(),
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn exists(&self, job_id: Uuid, reviewer_id: Uuid) -> Result<bool> {
        let index = self.cf(CF_IDX_REVIEW_REVIEWER)?;
        Ok(self
            .db
            .get_pinned_cf(index, prefixed_key(job_id, reviewer_id))?
            .is_some())
    }

    async fn for_reviewee(&self, reviewee_id: Uuid) -> Result<Vec<Review>> {
        self.scan_prefix(CF_REVIEWS, reviewee_id.as_bytes())
    }
}
