//! The transaction manager (spec §4.3): allocates transactions, assigns
//! timestamps, drives commit/abort, and runs the serializability check.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use babydb_core::error::LogicError;
use babydb_core::types::{IsolationLevel, Timestamp, TxnId, TXN_START_ID};
use parking_lot::Mutex;

use crate::transaction::{Transaction, TxnStatus};

/// Allocates transactions and owns the commit protocol. One instance per
/// database; every table's indexes are reached through transactions this
/// manager hands out.
pub struct TransactionManager {
    next_txn_id: AtomicU64,
    last_commit_ts: AtomicU64,
    active: Mutex<HashMap<TxnId, Arc<Mutex<Transaction>>>>,
    commit_latch: Mutex<()>,
}

impl TransactionManager {
    /// A fresh manager with no committed history and no active
    /// transactions.
    pub fn new() -> Self {
        TransactionManager {
            next_txn_id: AtomicU64::new(TXN_START_ID),
            last_commit_ts: AtomicU64::new(0),
            active: Mutex::new(HashMap::new()),
            commit_latch: Mutex::new(()),
        }
    }

    /// Create and register a new transaction under `isolation`. Its
    /// `read_ts` is the last committed timestamp at this instant; its
    /// `gc_ts` is the current `T_min` watermark (spec §4.3 `CreateTxn`).
    pub fn create_txn(&self, isolation: IsolationLevel) -> Arc<Mutex<Transaction>> {
        let mut active = self.active.lock();
        let last_commit_ts = self.last_commit_ts.load(Ordering::SeqCst);
        let t_min = Self::t_min_locked(&active, last_commit_ts);
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Mutex::new(Transaction::new(
            txn_id,
            last_commit_ts,
            t_min,
            isolation,
        )));
        active.insert(txn_id, txn.clone());
        tracing::debug!(txn_id, read_ts = last_commit_ts, gc_ts = t_min, "created transaction");
        txn
    }

    /// Attempt to commit `txn`. Returns `Ok(true)` on success, `Ok(false)`
    /// if the serializability check failed (the transaction has already
    /// been aborted by the time this returns). `Err` only for programmer
    /// misuse: committing a transaction that isn't `RUNNING`.
    pub fn commit(&self, txn: &Arc<Mutex<Transaction>>) -> Result<bool, LogicError> {
        let commit_guard = self.commit_latch.lock();

        {
            let guard = txn.lock();
            if guard.status() != TxnStatus::Running {
                return Err(LogicError::new(
                    "commit called on a transaction that is not running",
                ));
            }
        }

        let verified = {
            let guard = txn.lock();
            self.verify(&guard)
        };
        if !verified {
            drop(commit_guard);
            self.abort(txn)?;
            return Ok(false);
        }

        let commit_ts = self.last_commit_ts.fetch_add(1, Ordering::SeqCst) + 1;
        let (txn_id, gc_ts, read_set) = {
            let mut guard = txn.lock();
            let write_set = guard.write_set().to_vec();
            let read_set = guard.read_set().to_vec();
            for chain in &write_set {
                chain.commit(commit_ts);
            }
            guard.mark_committed(commit_ts);
            (guard.txn_id(), guard.gc_ts(), read_set)
        };
        drop(commit_guard);

        // Opportunistic GC against chains this transaction read (spec
        // §4.4): bounded by its own gc_ts watermark, never the global
        // T_min at this later instant, since that could have moved past
        // what a concurrent reader still pinned at creation time.
        for chain in &read_set {
            chain.garbage_collect(gc_ts);
        }

        self.active.lock().remove(&txn_id);
        tracing::debug!(txn_id, commit_ts, "committed transaction");
        Ok(true)
    }

    /// Roll back `txn`'s writes and terminate it. `Err` only for
    /// programmer misuse: aborting a transaction that has already
    /// committed or aborted.
    pub fn abort(&self, txn: &Arc<Mutex<Transaction>>) -> Result<(), LogicError> {
        let _commit_guard = self.commit_latch.lock();
        let mut guard = txn.lock();
        if !matches!(guard.status(), TxnStatus::Running | TxnStatus::Tainted) {
            return Err(LogicError::new(
                "abort called on an already-terminated transaction",
            ));
        }
        let txn_id = guard.txn_id();
        let write_set = guard.write_set().to_vec();
        for chain in &write_set {
            chain.rollback(txn_id);
        }
        guard.mark_aborted();
        drop(guard);
        self.active.lock().remove(&txn_id);
        tracing::debug!(txn_id, "aborted transaction");
        Ok(())
    }

    /// The current `T_min` watermark: the minimum `read_ts` among active
    /// transactions, or the last commit timestamp if none are active.
    pub fn t_min(&self) -> Timestamp {
        let active = self.active.lock();
        let last_commit_ts = self.last_commit_ts.load(Ordering::SeqCst);
        Self::t_min_locked(&active, last_commit_ts)
    }

    fn t_min_locked(active: &HashMap<TxnId, Arc<Mutex<Transaction>>>, default: Timestamp) -> Timestamp {
        active
            .values()
            .map(|t| t.lock().snapshot_ts())
            .min()
            .unwrap_or(default)
    }

    fn verify(&self, txn: &Transaction) -> bool {
        match txn.isolation() {
            IsolationLevel::Snapshot => true,
            IsolationLevel::Serializable => txn
                .read_set()
                .iter()
                .all(|chain| chain.last_commit_ts() <= txn.snapshot_ts()),
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        TransactionManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use babydb_index::{ArtIndex, Index};

    fn mkidx() -> ArtIndex {
        ArtIndex::new("pk")
    }

    #[test]
    fn commit_assigns_monotone_commit_timestamps() {
        let mgr = TransactionManager::new();
        let index = mkidx();

        let t1 = mgr.create_txn(IsolationLevel::Snapshot);
        {
            let mut g = t1.lock();
            index.insert(1, 1, &mut *g).unwrap();
        }
        assert!(mgr.commit(&t1).unwrap());
        let ts1 = t1.lock().commit_ts().unwrap();

        let t2 = mgr.create_txn(IsolationLevel::Snapshot);
        {
            let mut g = t2.lock();
            index.insert(2, 2, &mut *g).unwrap();
        }
        assert!(mgr.commit(&t2).unwrap());
        let ts2 = t2.lock().commit_ts().unwrap();

        assert!(ts1 < ts2);
    }

    #[test]
    fn commit_on_a_non_running_transaction_is_a_programming_error() {
        let mgr = TransactionManager::new();
        let t1 = mgr.create_txn(IsolationLevel::Snapshot);
        mgr.commit(&t1).unwrap();
        assert!(mgr.commit(&t1).is_err());
    }

    #[test]
    fn abort_rolls_back_pending_writes() {
        let mgr = TransactionManager::new();
        let index = mkidx();

        let t1 = mgr.create_txn(IsolationLevel::Snapshot);
        {
            let mut g = t1.lock();
            index.insert(1, 1, &mut *g).unwrap();
        }
        mgr.abort(&t1).unwrap();

        let t2 = mgr.create_txn(IsolationLevel::Snapshot);
        let mut g = t2.lock();
        assert_eq!(index.lookup(1, &mut *g), babydb_core::types::INVALID_ROW_ID);
    }

    #[test]
    fn serializable_commit_fails_when_a_read_key_was_concurrently_written() {
        let mgr = TransactionManager::new();
        let index = mkidx();

        let setup = mgr.create_txn(IsolationLevel::Snapshot);
        {
            let mut g = setup.lock();
            index.insert(1, 100, &mut *g).unwrap();
        }
        mgr.commit(&setup).unwrap();

        let t1 = mgr.create_txn(IsolationLevel::Serializable);
        {
            let mut g = t1.lock();
            index.lookup(1, &mut *g);
        }

        let t2 = mgr.create_txn(IsolationLevel::Serializable);
        {
            let mut g = t2.lock();
            index.insert_for_update(1, 200, &mut *g).unwrap();
        }
        assert!(mgr.commit(&t2).unwrap());

        // t1's read set now trails a committer; it must fail to commit.
        assert!(!mgr.commit(&t1).unwrap());
        assert_eq!(t1.lock().status(), TxnStatus::Aborted);
    }
}
