//! Per-transaction state (spec §4.3 data model): read set, write set,
//! isolation level, status. Shared between the caller and the
//! transaction manager's active map — hence `Arc` at the call sites, not
//! baked into this type.

use std::sync::Arc;

use babydb_core::types::{IsolationLevel, Timestamp, TxnId};
use babydb_index::{TxnContext, VersionChain};

/// A transaction's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    /// Accepting reads and writes.
    Running,
    /// A write conflict has occurred; only `Abort` is a valid next
    /// operation (spec §4.5, GLOSSARY "Tainted").
    Tainted,
    /// Terminated successfully; `commit_ts` is set.
    Committed,
    /// Terminated by rollback.
    Aborted,
}

/// One transaction's full state (spec §3 `Transaction`).
pub struct Transaction {
    txn_id: TxnId,
    read_ts: Timestamp,
    gc_ts: Timestamp,
    commit_ts: Option<Timestamp>,
    isolation: IsolationLevel,
    status: TxnStatus,
    read_set: Vec<Arc<VersionChain>>,
    write_set: Vec<Arc<VersionChain>>,
}

impl Transaction {
    pub(crate) fn new(
        txn_id: TxnId,
        read_ts: Timestamp,
        gc_ts: Timestamp,
        isolation: IsolationLevel,
    ) -> Self {
        Transaction {
            txn_id,
            read_ts,
            gc_ts,
            commit_ts: None,
            isolation,
            status: TxnStatus::Running,
            read_set: Vec::new(),
            write_set: Vec::new(),
        }
    }

    /// This transaction's identity.
    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    /// The snapshot this transaction reads at.
    pub fn snapshot_ts(&self) -> Timestamp {
        self.read_ts
    }

    /// The watermark this transaction pinned at creation — no chain may
    /// discard a committed version at or above this timestamp while this
    /// transaction is alive (I5, P8).
    pub fn gc_ts(&self) -> Timestamp {
        self.gc_ts
    }

    /// The commit timestamp assigned at `Commit`, if this transaction has
    /// committed.
    pub fn commit_ts(&self) -> Option<Timestamp> {
        self.commit_ts
    }

    /// This transaction's isolation level.
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// This transaction's current lifecycle state.
    pub fn status(&self) -> TxnStatus {
        self.status
    }

    /// Every chain this transaction has read, for the serializability
    /// check and for opportunistic GC on commit.
    pub fn read_set(&self) -> &[Arc<VersionChain>] {
        &self.read_set
    }

    /// Every chain this transaction has installed an uncommitted version
    /// on, to commit or roll back as a unit.
    pub fn write_set(&self) -> &[Arc<VersionChain>] {
        &self.write_set
    }

    pub(crate) fn mark_tainted(&mut self) {
        if self.status == TxnStatus::Running {
            self.status = TxnStatus::Tainted;
        }
    }

    pub(crate) fn mark_committed(&mut self, commit_ts: Timestamp) {
        self.commit_ts = Some(commit_ts);
        self.status = TxnStatus::Committed;
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.status = TxnStatus::Aborted;
    }
}

impl TxnContext for Transaction {
    fn read_ts(&self) -> Timestamp {
        self.read_ts
    }

    fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    fn record_read(&mut self, chain: Arc<VersionChain>) {
        self.read_set.push(chain);
    }

    fn record_write(&mut self, chain: Arc<VersionChain>) {
        if self.write_set.iter().any(|c| Arc::ptr_eq(c, &chain)) {
            return;
        }
        self.write_set.push(chain);
    }

    fn mark_tainted(&mut self) {
        Transaction::mark_tainted(self)
    }
}
