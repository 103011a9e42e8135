//! The transaction manager and per-transaction state that drive MVCC
//! access to `babydb_index` (spec §4.3, §4.5).

#![warn(missing_docs)]

mod manager;
mod transaction;

pub use manager::TransactionManager;
pub use transaction::{Transaction, TxnStatus};
