//! The database handle: the only entry point a caller outside this crate
//! ever touches (spec §6.1). DDL takes the database-exclusive guard;
//! every transaction holds it shared for its lifetime, so DDL can never
//! race DML (spec §5).

use std::sync::Arc;

use babydb_core::types::{IsolationLevel, Schema};
use babydb_core::Config;
use babydb_concurrency::{Transaction, TransactionManager, TxnStatus};
use parking_lot::{Mutex, RwLock};

use crate::catalog::{Catalog, CatalogError, IndexKind};

/// Everything that can go wrong at the database-handle level: catalog
/// naming conflicts, and programmer misuse forwarded from the
/// transaction manager (spec §4.5).
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatabaseError {
    /// A catalog operation failed (unknown table/index, duplicate name).
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// A transaction-manager precondition was violated (commit on a
    /// non-running transaction, abort on a terminated one).
    #[error(transparent)]
    Logic(#[from] babydb_core::error::LogicError),
}

/// An in-process database: a catalog plus the transaction manager that
/// mediates every read and write against it.
pub struct Database {
    catalog: Catalog,
    txn_manager: TransactionManager,
    guard: RwLock<()>,
    config: Config,
}

impl Database {
    /// A fresh, empty database under the given configuration.
    pub fn new(config: Config) -> Self {
        Database {
            catalog: Catalog::new(),
            txn_manager: TransactionManager::new(),
            guard: RwLock::new(()),
            config,
        }
    }

    /// This database's configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// This database's catalog, for operators that resolve tables/indexes
    /// by name.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Register a new table. Takes the database-exclusive guard (spec
    /// §5): blocks until no transaction holds it shared.
    pub fn create_table(
        &self,
        name: impl Into<String>,
        schema: Schema,
        key_column: usize,
    ) -> Result<(), DatabaseError> {
        let _exclusive = self.guard.write();
        self.catalog.create_table(name, schema, key_column)?;
        Ok(())
    }

    /// Drop a table and its index.
    pub fn drop_table(&self, name: &str) -> Result<(), DatabaseError> {
        let _exclusive = self.guard.write();
        self.catalog.drop_table(name)?;
        Ok(())
    }

    /// Create `kind`'s index over `table_name.key_column_name`.
    pub fn create_index(
        &self,
        index_name: impl Into<String>,
        table_name: &str,
        key_column_name: &str,
        kind: IndexKind,
    ) -> Result<(), DatabaseError> {
        let _exclusive = self.guard.write();
        self.catalog
            .create_index(index_name, table_name, key_column_name, kind)?;
        Ok(())
    }

    /// Drop a table's index.
    pub fn drop_index(&self, table_name: &str, index_name: &str) -> Result<(), DatabaseError> {
        let _exclusive = self.guard.write();
        self.catalog.drop_index(table_name, index_name)?;
        Ok(())
    }

    /// Begin a new transaction under this database's configured isolation
    /// level. The returned handle holds the database guard shared for its
    /// whole lifetime; dropping it without calling `commit`/`abort` aborts
    /// it automatically if it's still running (spec §9 "destructor-driven
    /// abort").
    pub fn create_txn(&self) -> TxnHandle<'_> {
        self.create_txn_with_isolation(self.config.isolation_level)
    }

    /// Begin a new transaction under an explicit isolation level,
    /// overriding the database's configured default.
    pub fn create_txn_with_isolation(&self, isolation: IsolationLevel) -> TxnHandle<'_> {
        let db_guard = self.guard.read();
        let txn = self.txn_manager.create_txn(isolation);
        TxnHandle {
            db: self,
            txn,
            _db_guard: db_guard,
            finished: false,
        }
    }
}

/// A scoped handle to a running transaction. Must be terminated by
/// calling [`TxnHandle::commit`] or [`TxnHandle::abort`]; if dropped
/// without either, a still-running transaction is aborted automatically.
pub struct TxnHandle<'db> {
    db: &'db Database,
    txn: Arc<Mutex<Transaction>>,
    _db_guard: parking_lot::RwLockReadGuard<'db, ()>,
    finished: bool,
}

impl<'db> TxnHandle<'db> {
    /// This transaction's underlying state, shared with the transaction
    /// manager's active map.
    pub fn transaction(&self) -> &Arc<Mutex<Transaction>> {
        &self.txn
    }

    /// Attempt to commit. Returns `Ok(false)` if the serializability
    /// check failed — the transaction has already been rolled back by
    /// the time this returns (spec §4.3 `Commit`).
    pub fn commit(mut self) -> Result<bool, DatabaseError> {
        let result = self.db.txn_manager.commit(&self.txn)?;
        self.finished = true;
        Ok(result)
    }

    /// Roll back this transaction's writes and terminate it.
    pub fn abort(mut self) -> Result<(), DatabaseError> {
        self.db.txn_manager.abort(&self.txn)?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for TxnHandle<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let status = self.txn.lock().status();
        if matches!(status, TxnStatus::Running | TxnStatus::Tainted) {
            if let Err(err) = self.db.txn_manager.abort(&self.txn) {
                tracing::warn!(?err, "auto-abort on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IndexKind;

    fn new_db() -> Database {
        let db = Database::new(Config::default());
        db.create_table("t0", Schema::new(["key", "payload"]), 0)
            .unwrap();
        db.create_index("t0_pk", "t0", "key", IndexKind::Art)
            .unwrap();
        db
    }

    #[test]
    fn dropping_a_handle_without_commit_aborts_it() {
        let db = new_db();
        let table = db.catalog().table("t0").unwrap();
        {
            let handle = db.create_txn();
            let mut guard = handle.transaction().lock();
            table
                .with_index(|_, idx| {
                    babydb_index::Index::insert(idx.as_index(), 1, 1, &mut *guard)
                })
                .unwrap()
                .unwrap();
        }
        let handle = db.create_txn();
        let mut guard = handle.transaction().lock();
        let found = table
            .with_index(|_, idx| babydb_index::Index::lookup(idx.as_index(), 1, &mut *guard))
            .unwrap();
        assert_eq!(found, babydb_core::types::INVALID_ROW_ID);
    }

    #[test]
    fn ddl_and_transactions_share_a_database_guard() {
        let db = new_db();
        let handle = db.create_txn();
        // Holding a transaction doesn't deadlock a read of the catalog —
        // only a concurrent *DDL* write would contend on the guard.
        assert!(db.catalog().table("t0").is_ok());
        drop(handle);
    }
}
