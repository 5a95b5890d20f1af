//! Store and collaborator implementations behind the domain ports.

pub mod collaborators;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
