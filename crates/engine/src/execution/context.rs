//! The execution context: what every operator is handed on every call
//! (spec §4.4) — the calling transaction, the catalog, and the
//! configuration.

use std::sync::Arc;

use babydb_concurrency::Transaction;
use babydb_core::Config;
use babydb_index::TxnContext;
use parking_lot::Mutex;

use crate::catalog::Catalog;

/// Carries everything an operator needs to reach the MVCC substrate
/// without owning it: the calling transaction (shared with the
/// transaction manager's active map), the catalog for name resolution,
/// and the engine configuration.
pub struct ExecutionContext<'db> {
    txn: Arc<Mutex<Transaction>>,
    /// The catalog operators resolve table and index names against.
    pub catalog: &'db Catalog,
    /// The active configuration (chunk size, isolation level).
    pub config: Config,
}

impl<'db> ExecutionContext<'db> {
    /// Build a context around a transaction handle's underlying state.
    pub fn new(txn: Arc<Mutex<Transaction>>, catalog: &'db Catalog, config: Config) -> Self {
        ExecutionContext { txn, catalog, config }
    }

    /// Lock the calling transaction for the duration of `f`, handing it
    /// back as a [`TxnContext`] for a single index call. Never held
    /// across a `Next` call boundary — transactions are driven by one
    /// thread at a time, so there is no concurrency to serialize here,
    /// only a clear acquisition/release per operation.
    pub fn with_txn_context<T>(&self, f: impl FnOnce(&mut dyn TxnContext) -> T) -> T {
        let mut guard = self.txn.lock();
        f(&mut *guard)
    }

    /// The underlying transaction handle, for callers that need direct
    /// access (e.g. to inspect status after a `Tainted` error).
    pub fn transaction(&self) -> &Arc<Mutex<Transaction>> {
        &self.txn
    }
}
