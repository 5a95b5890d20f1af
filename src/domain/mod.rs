//! Domain entities, value objects and the port traits the engines depend on.

pub mod account;
pub mod escrow;
pub mod job;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod ports;
pub mod withdrawal;
