//! CSV account-statement output for the replay binary.

use crate::domain::account::Account;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct StatementRow<'a> {
    account: &'a str,
    earnings: String,
    referral: String,
    total_earnings: String,
    activated: bool,
}

/// Writes one row per account: external id, both wallet balances, lifetime
/// earnings and the activation flag.
pub struct StatementWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> StatementWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn write_accounts(&mut self, accounts: &[Account]) -> Result<()> {
        for account in accounts {
            self.writer
                .serialize(StatementRow {
                    account: &account.external_id,
                    earnings: account.earnings_wallet.to_string(),
                    referral: account.referral_wallet.to_string(),
                    total_earnings: account.total_earnings.to_string(),
                    activated: account.activated,
                })
                .map_err(crate::error::EngineError::internal)?;
        }
        self.writer
            .flush()
            .map_err(crate::error::EngineError::internal)?;
        Ok(())
    }
}
