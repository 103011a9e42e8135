//! Version chain: for one key, the ordered history of committed values plus
//! at most one pending uncommitted write (spec §4.1). This is the atomic
//! unit of MVCC — every visibility decision in the engine bottoms out in a
//! call to [`VersionChain::search`].
//!
//! A chain's committed history only ever grows at the tail (I2: strictly
//! increasing `commit_ts`, enforced by the transaction manager's single
//! commit latch serializing every `commit_ts` assignment), so a plain
//! ascending `Vec` gives O(log n) visibility lookup via binary search and
//! O(1) amortized append — the sorted-vector option the version-chain
//! design notes call out as sufficient for this workload.

use babydb_core::error::TaintedError;
use babydb_core::types::{RowId, Timestamp, TxnId, INVALID_ROW_ID};
use parking_lot::RwLock;

use crate::counters;

/// Returned by [`VersionChain::search`] when no version is visible to the
/// caller: no committed version exists at or before the snapshot, and the
/// caller doesn't own the uncommitted slot.
pub const NOT_VISIBLE: RowId = INVALID_ROW_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommittedVersion {
    commit_ts: Timestamp,
    row_id: RowId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UncommittedSlot {
    txn_id: TxnId,
    row_id: RowId,
}

#[derive(Debug, Default)]
struct ChainInner {
    /// Ascending by `commit_ts` (I2).
    committed: Vec<CommittedVersion>,
    uncommitted: Option<UncommittedSlot>,
    last_commit_ts: Timestamp,
}

/// One key's version history, reached only through an ART leaf (spec §4.2).
#[derive(Debug)]
pub struct VersionChain {
    inner: RwLock<ChainInner>,
}

impl VersionChain {
    /// An empty chain with no committed history and no pending write.
    /// Exists mainly for tests; ART always creates a chain via
    /// [`VersionChain::with_uncommitted`] on a key's first install.
    pub fn new() -> Self {
        VersionChain {
            inner: RwLock::new(ChainInner::default()),
        }
    }

    /// Build a chain carrying a single freshly-installed uncommitted
    /// version — the case of inserting a key the ART index has never seen
    /// before (spec §4.2 `Insert`, "on a new leaf").
    pub fn with_uncommitted(row_id: RowId, txn_id: TxnId) -> Self {
        counters::register();
        VersionChain {
            inner: RwLock::new(ChainInner {
                committed: Vec::new(),
                uncommitted: Some(UncommittedSlot { txn_id, row_id }),
                last_commit_ts: 0,
            }),
        }
    }

    /// Which row is visible to a transaction reading at `read_ts`: its own
    /// uncommitted write if it holds the slot, else the latest committed
    /// version with `commit_ts <= read_ts`, else [`NOT_VISIBLE`] (I4).
    pub fn search(&self, read_ts: Timestamp, txn_id: TxnId) -> RowId {
        let inner = self.inner.read();
        if let Some(slot) = inner.uncommitted {
            if slot.txn_id == txn_id {
                return slot.row_id;
            }
        }
        let idx = inner.committed.partition_point(|v| v.commit_ts <= read_ts);
        if idx == 0 {
            NOT_VISIBLE
        } else {
            inner.committed[idx - 1].row_id
        }
    }

    /// Install (or overwrite, if the caller already owns the slot) the
    /// uncommitted version for `txn_id`.
    ///
    /// Fails with [`TaintedError`] — a terminal, transaction-tainting
    /// condition — if another transaction holds the slot, or if a
    /// committed version has landed since `read_ts` (first-committer-wins,
    /// spec §4.1).
    pub fn install_uncommitted(
        &self,
        row_id: RowId,
        read_ts: Timestamp,
        txn_id: TxnId,
    ) -> Result<(), TaintedError> {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.uncommitted {
            if slot.txn_id != txn_id {
                return Err(TaintedError::new(
                    "uncommitted slot held by another transaction",
                ));
            }
        }
        if inner.last_commit_ts > read_ts {
            return Err(TaintedError::new(
                "write-write conflict: a committed version landed after this transaction's snapshot",
            ));
        }
        let is_new_node = inner.uncommitted.is_none();
        inner.uncommitted = Some(UncommittedSlot { txn_id, row_id });
        if is_new_node {
            counters::register();
        }
        Ok(())
    }

    /// Whether `txn_id` currently owns this chain's uncommitted slot —
    /// used by the ART index to distinguish "key already live" from
    /// "this transaction's own pending write" when enforcing primary-key
    /// uniqueness on insert.
    pub fn is_visible_to(&self, read_ts: Timestamp, txn_id: TxnId) -> bool {
        self.search(read_ts, txn_id) != NOT_VISIBLE
    }

    /// Append the uncommitted slot as a new committed node at `commit_ts`
    /// and clear the slot. No-op if there is no pending write (the chain
    /// was in this transaction's read set but not its write set).
    pub fn commit(&self, commit_ts: Timestamp) {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.uncommitted.take() {
            inner.committed.push(CommittedVersion {
                commit_ts,
                row_id: slot.row_id,
            });
            inner.last_commit_ts = commit_ts;
        }
    }

    /// Clear the uncommitted slot if it belongs to `txn_id`; no-op
    /// otherwise. The node allocated for that slot is freed here — this is
    /// the only place an uncommitted (never-committed) node disappears.
    pub fn rollback(&self, txn_id: TxnId) {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.uncommitted {
            if slot.txn_id == txn_id {
                inner.uncommitted = None;
                counters::unregister();
            }
        }
    }

    /// Drop committed nodes strictly older than `gc_ts`, retaining the
    /// single newest one among them as the floor visible to snapshots at
    /// or below `gc_ts` (I5). Never touches the uncommitted slot or the
    /// chain's single newest committed node.
    pub fn garbage_collect(&self, gc_ts: Timestamp) {
        let mut inner = self.inner.write();
        let keep_from = match inner.committed.iter().rposition(|v| v.commit_ts < gc_ts) {
            Some(idx) => idx,
            None => return,
        };
        if keep_from == 0 {
            return;
        }
        inner.committed.drain(0..keep_from);
        for _ in 0..keep_from {
            counters::unregister();
        }
    }

    /// The `commit_ts` of the most recently committed version, or `0` if
    /// none (I3).
    pub fn last_commit_ts(&self) -> Timestamp {
        self.inner.read().last_commit_ts
    }

    /// Number of committed versions currently retained. Test/diagnostic
    /// use only.
    pub fn committed_len(&self) -> usize {
        self.inner.read().committed.len()
    }
}

impl Default for VersionChain {
    fn default() -> Self {
        VersionChain::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_uncommitted_write_is_visible_to_self_only() {
        let chain = VersionChain::with_uncommitted(7, 100);
        assert_eq!(chain.search(0, 100), 7);
        assert_eq!(chain.search(0, 200), NOT_VISIBLE);
    }

    #[test]
    fn commit_makes_the_version_visible_at_or_after_its_commit_ts() {
        let chain = VersionChain::with_uncommitted(7, 100);
        chain.commit(5);
        assert_eq!(chain.search(4, 999), NOT_VISIBLE);
        assert_eq!(chain.search(5, 999), 7);
        assert_eq!(chain.search(100, 999), 7);
    }

    #[test]
    fn second_writer_conflicts_while_slot_is_held() {
        let chain = VersionChain::with_uncommitted(1, 100);
        let err = chain.install_uncommitted(2, 0, 200);
        assert!(err.is_err());
    }

    #[test]
    fn same_txn_may_overwrite_its_own_slot() {
        let chain = VersionChain::with_uncommitted(1, 100);
        chain.install_uncommitted(2, 0, 100).unwrap();
        assert_eq!(chain.search(0, 100), 2);
        assert_eq!(chain.committed_len(), 0);
    }

    #[test]
    fn first_committer_wins_over_a_stale_snapshot() {
        let chain = VersionChain::with_uncommitted(1, 100);
        chain.commit(10);
        // txn 200 took its snapshot before ts 10 committed.
        let err = chain.install_uncommitted(2, 5, 200);
        assert!(err.is_err());
        // txn 300 snapshotted at or after the commit: fine.
        chain.install_uncommitted(3, 10, 300).unwrap();
    }

    #[test]
    fn rollback_clears_only_the_owning_txns_slot() {
        let chain = VersionChain::with_uncommitted(1, 100);
        chain.rollback(200);
        assert_eq!(chain.search(0, 100), 1);
        chain.rollback(100);
        assert_eq!(chain.search(0, 100), NOT_VISIBLE);
    }

    #[test]
    fn garbage_collect_keeps_the_newest_node_below_the_watermark() {
        let chain = VersionChain::with_uncommitted(1, 100);
        chain.commit(1);
        chain.install_uncommitted(2, 1, 100).unwrap();
        chain.commit(2);
        chain.install_uncommitted(3, 2, 100).unwrap();
        chain.commit(3);
        assert_eq!(chain.committed_len(), 3);

        chain.garbage_collect(3);
        // commit_ts 1 and 2 are both < 3; keep only the newest of those (ts 2).
        assert_eq!(chain.committed_len(), 2);
        assert_eq!(chain.search(2, 999), 2);
        assert_eq!(chain.search(3, 999), 3);
    }

    #[test]
    fn garbage_collect_never_drops_the_sole_newest_version() {
        let chain = VersionChain::with_uncommitted(1, 100);
        chain.commit(1);
        chain.garbage_collect(1000);
        assert_eq!(chain.committed_len(), 1);
        assert_eq!(chain.search(1000, 999), 1);
    }

    #[test]
    fn garbage_collect_leaves_the_pending_slot_untouched() {
        let chain = VersionChain::with_uncommitted(1, 100);
        chain.commit(1);
        chain.install_uncommitted(2, 1, 200).unwrap();
        chain.garbage_collect(1000);
        assert_eq!(chain.search(0, 200), 2);
        assert_eq!(chain.committed_len(), 1);
    }
}
