//! The versioned key-value substrate: version chains, the transaction-aware
//! ART primary index that carries them, and the unversioned `Stlmap`
//! point index used by single-transaction tests (spec §4.1, §4.2, §6.3).
//!
//! [`TxnContext`] lives here rather than in `babydb_concurrency` so this
//! crate never has to depend upward on the transaction manager: the index
//! only needs to read a caller's read timestamp and transaction id, and to
//! record which chains it touched. `babydb_concurrency::Transaction`
//! implements this trait.

#![warn(missing_docs)]

mod art;
pub mod chain;
pub mod counters;

use std::collections::BTreeMap;
use std::sync::Arc;

use babydb_core::error::{DuplicateKeyError, TaintedError};
use babydb_core::types::{Key, RangeInfo, RowId, Timestamp, TxnId, INVALID_ROW_ID};
use parking_lot::RwLock;

pub use chain::VersionChain;

use art::ArtTree;

/// What an index needs from the calling transaction: its snapshot, its
/// identity, and somewhere to record the chains it reads or writes so the
/// transaction manager can run garbage collection and the serializability
/// check (spec §4.3 `VerifyTxn`).
pub trait TxnContext {
    /// The snapshot this transaction reads at.
    fn read_ts(&self) -> Timestamp;
    /// This transaction's identity, used to find or claim a chain's
    /// uncommitted slot.
    fn txn_id(&self) -> TxnId;
    /// Record that this transaction observed `chain` (added to its read
    /// set).
    fn record_read(&mut self, chain: Arc<VersionChain>);
    /// Record that this transaction installed an uncommitted version on
    /// `chain` (added to its write set).
    fn record_write(&mut self, chain: Arc<VersionChain>);
    /// Transition the owning transaction to TAINTED. Called by the
    /// operator layer when an index write returns
    /// [`babydb_core::error::TaintedError`] (spec §4.2/§4.5): the error is
    /// raised by the version chain, propagated by the index, and only
    /// becomes a transaction-wide side effect here.
    fn mark_tainted(&mut self);
}

/// A primary-key index over one table (spec §6.3). Object-safe so a
/// catalog can hold indexes of different kinds behind one trait object.
pub trait Index: Send + Sync {
    /// The index's name, as registered with the catalog.
    fn name(&self) -> &str;

    /// Insert a brand-new row under `key`. Enforces primary-key
    /// uniqueness: fails if `key` is already visible (committed or this
    /// transaction's own pending write notwithstanding — see
    /// [`Index::insert`] vs [`Index::insert_for_update`]) at the caller's
    /// snapshot (spec §4.4 Insert).
    fn insert(&self, key: Key, row_id: RowId, ctx: &mut dyn TxnContext) -> Result<(), TaintedError>;

    /// Repoint `key` at a new row without the uniqueness check — the
    /// Update operator's path, which legitimately targets a key that
    /// already exists (spec §4.4 Update: "two successive writes by the
    /// same transaction [are] overwrite ... not conflict").
    fn insert_for_update(
        &self,
        key: Key,
        row_id: RowId,
        ctx: &mut dyn TxnContext,
    ) -> Result<(), TaintedError>;

    /// Resolve `key` against the caller's snapshot, or
    /// [`INVALID_ROW_ID`] if no version is visible.
    fn lookup(&self, key: Key, ctx: &mut dyn TxnContext) -> RowId;
}

/// An index additionally capable of an ordered range scan (spec §4.2
/// `ScanRange`). `Stlmap` deliberately does not implement this — it's a
/// point-only index (spec §6.3).
pub trait RangeIndex: Index {
    /// Every row-id visible to the caller's snapshot whose key falls in
    /// `range`, in ascending key order.
    fn scan_range(&self, range: RangeInfo, ctx: &mut dyn TxnContext) -> Vec<RowId>;
}

/// The MVCC-aware adaptive radix tree index (spec §4.2).
pub struct ArtIndex {
    name: String,
    tree: ArtTree,
}

impl ArtIndex {
    /// Create an empty ART index with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        ArtIndex {
            name: name.into(),
            tree: ArtTree::new(),
        }
    }
}

impl Index for ArtIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert(&self, key: Key, row_id: RowId, ctx: &mut dyn TxnContext) -> Result<(), TaintedError> {
        let read_ts = ctx.read_ts();
        let txn_id = ctx.txn_id();
        let (chain, created) = self.tree.get_or_insert_chain(key, row_id, txn_id);
        if created {
            ctx.record_write(chain);
            return Ok(());
        }
        if chain.is_visible_to(read_ts, txn_id) {
            return Err(DuplicateKeyError.into());
        }
        chain.install_uncommitted(row_id, read_ts, txn_id)?;
        ctx.record_write(chain);
        Ok(())
    }

    fn insert_for_update(
        &self,
        key: Key,
        row_id: RowId,
        ctx: &mut dyn TxnContext,
    ) -> Result<(), TaintedError> {
        let read_ts = ctx.read_ts();
        let txn_id = ctx.txn_id();
        let (chain, created) = self.tree.get_or_insert_chain(key, row_id, txn_id);
        if !created {
            chain.install_uncommitted(row_id, read_ts, txn_id)?;
        }
        ctx.record_write(chain);
        Ok(())
    }

    fn lookup(&self, key: Key, ctx: &mut dyn TxnContext) -> RowId {
        let read_ts = ctx.read_ts();
        let txn_id = ctx.txn_id();
        match self.tree.find_chain(key) {
            Some(chain) => {
                let row_id = chain.search(read_ts, txn_id);
                ctx.record_read(chain);
                row_id
            }
            None => INVALID_ROW_ID,
        }
    }
}

impl RangeIndex for ArtIndex {
    fn scan_range(&self, range: RangeInfo, ctx: &mut dyn TxnContext) -> Vec<RowId> {
        let read_ts = ctx.read_ts();
        let txn_id = ctx.txn_id();
        let mut out = Vec::new();
        for (_key, chain) in self.tree.scan_range(range) {
            let row_id = chain.search(read_ts, txn_id);
            if row_id != chain::NOT_VISIBLE {
                out.push(row_id);
            }
            ctx.record_read(chain);
        }
        out
    }
}

/// An ordered, unversioned point index (spec §6.3): no version chains, no
/// MVCC visibility, used only by single-transaction tests that don't need
/// concurrency control.
pub struct Stlmap {
    name: String,
    table: RwLock<BTreeMap<Key, RowId>>,
}

impl Stlmap {
    /// Create an empty `Stlmap` index with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Stlmap {
            name: name.into(),
            table: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Index for Stlmap {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert(&self, key: Key, row_id: RowId, _ctx: &mut dyn TxnContext) -> Result<(), TaintedError> {
        let mut table = self.table.write();
        if table.contains_key(&key) {
            return Err(DuplicateKeyError.into());
        }
        table.insert(key, row_id);
        Ok(())
    }

    fn insert_for_update(
        &self,
        key: Key,
        row_id: RowId,
        _ctx: &mut dyn TxnContext,
    ) -> Result<(), TaintedError> {
        self.table.write().insert(key, row_id);
        Ok(())
    }

    fn lookup(&self, key: Key, _ctx: &mut dyn TxnContext) -> RowId {
        self.table.read().get(&key).copied().unwrap_or(INVALID_ROW_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCtx {
        read_ts: Timestamp,
        txn_id: TxnId,
        reads: Vec<Arc<VersionChain>>,
        writes: Vec<Arc<VersionChain>>,
    }

    impl FakeCtx {
        fn new(read_ts: Timestamp, txn_id: TxnId) -> Self {
            FakeCtx {
                read_ts,
                txn_id,
                reads: Vec::new(),
                writes: Vec::new(),
            }
        }
    }

    impl TxnContext for FakeCtx {
        fn read_ts(&self) -> Timestamp {
            self.read_ts
        }
        fn txn_id(&self) -> TxnId {
            self.txn_id
        }
        fn record_read(&mut self, chain: Arc<VersionChain>) {
            self.reads.push(chain);
        }
        fn record_write(&mut self, chain: Arc<VersionChain>) {
            self.writes.push(chain);
        }
        fn mark_tainted(&mut self) {}
    }

    #[test]
    fn insert_then_lookup_roundtrips() {
        let index = ArtIndex::new("pk");
        let mut ctx = FakeCtx::new(0, 100);
        index.insert(5, 55, &mut ctx).unwrap();
        assert_eq!(ctx.writes.len(), 1);
        assert_eq!(index.lookup(5, &mut ctx), 55);
    }

    #[test]
    fn duplicate_insert_of_a_committed_key_fails() {
        let index = ArtIndex::new("pk");
        let mut ctx1 = FakeCtx::new(0, 100);
        index.insert(5, 55, &mut ctx1).unwrap();
        ctx1.writes[0].commit(1);

        let mut ctx2 = FakeCtx::new(1, 200);
        let err = index.insert(5, 66, &mut ctx2);
        assert!(err.is_err());
    }

    #[test]
    fn update_path_overwrites_without_uniqueness_check() {
        let index = ArtIndex::new("pk");
        let mut ctx1 = FakeCtx::new(0, 100);
        index.insert(5, 55, &mut ctx1).unwrap();
        ctx1.writes[0].commit(1);

        let mut ctx2 = FakeCtx::new(1, 200);
        index.insert_for_update(5, 77, &mut ctx2).unwrap();
        assert_eq!(index.lookup(5, &mut ctx2), 77);
    }

    #[test]
    fn scan_range_respects_bounds_and_visibility() {
        let index = ArtIndex::new("pk");
        let mut ctx = FakeCtx::new(0, 100);
        for k in [1u64, 5, 9, 15] {
            index.insert(k, k, &mut ctx).unwrap();
        }
        let result = index.scan_range(RangeInfo::inclusive(1, 9), &mut ctx);
        let mut sorted = result.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 5, 9]);
    }

    #[test]
    fn stlmap_is_point_only_and_ordered() {
        let index = Stlmap::new("pk");
        let mut ctx = FakeCtx::new(0, 100);
        index.insert(1, 10, &mut ctx).unwrap();
        index.insert(2, 20, &mut ctx).unwrap();
        assert_eq!(index.lookup(1, &mut ctx), 10);
        assert_eq!(index.lookup(2, &mut ctx), 20);
        assert_eq!(index.lookup(3, &mut ctx), INVALID_ROW_ID);
        assert!(index.insert(1, 99, &mut ctx).is_err());
    }
}
