//! The money-moving engines. Every mutation of wallet state goes through
//! the `Ledger`; the escrow manager, gateway adapter, withdrawal policy and
//! lifecycle coordinator orchestrate it through keyed per-entity locks.

pub mod accounts;
pub mod config;
pub mod escrow;
pub mod gateway;
pub mod ledger;
pub mod lifecycle;
pub mod locks;
pub mod withdrawal;
