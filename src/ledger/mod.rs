//! Append-only validation ledger.

pub mod record;
pub mod store;

pub use record::ValidationRecord;
pub use store::ValidationStore;
