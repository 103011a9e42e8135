//! The base row store: an append-only vector of `(tuple, deleted)` pairs
//! behind a shared/exclusive latch.
//!
//! This is deliberately the simplest component in the workspace (spec §1
//! calls it an "external collaborator" whose only role is feeding data into
//! the MVCC core). Versioning lives one layer up, in `babydb_index`'s
//! version chains; this store never resolves visibility itself.

use babydb_core::types::{RowId, Tuple};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One physical row: its current tuple value and whether it has been
/// logically deleted.
///
/// The only mutations the core ever performs on a `BaseRow` are flipping
/// `deleted` and, during an in-place update with an unchanged key,
/// overwriting `tuple` (spec §3 data model). Key-changing updates instead
/// append a brand new row and repoint the version chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRow {
    /// The row's current column values.
    pub tuple: Tuple,
    /// Whether this row has been superseded and should be skipped by scans.
    pub deleted: bool,
}

impl BaseRow {
    /// Build a live (non-deleted) row.
    pub fn new(tuple: Tuple) -> Self {
        BaseRow {
            tuple,
            deleted: false,
        }
    }
}

/// Append-only storage for one table's rows, reached only through
/// [`RowStore::read`] / [`RowStore::write`].
///
/// # Non-reentrancy
///
/// Callers must not acquire a second guard (from this store or any other)
/// while holding one from here — the table latch and a version chain's
/// latch have no agreed acquisition order, so nesting them risks deadlock.
/// Acquire a guard, do the row-level work, and drop it before touching
/// anything else that latches.
#[derive(Debug, Default)]
pub struct RowStore {
    rows: RwLock<Vec<BaseRow>>,
}

impl RowStore {
    /// Create an empty row store.
    pub fn new() -> Self {
        RowStore {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Acquire a shared read guard over the row vector.
    pub fn read(&self) -> RowReadGuard<'_> {
        RowReadGuard {
            inner: self.rows.read(),
        }
    }

    /// Acquire an exclusive write guard over the row vector.
    pub fn write(&self) -> RowWriteGuard<'_> {
        RowWriteGuard {
            inner: self.rows.write(),
        }
    }

    /// Number of physical rows, including deleted and superseded ones.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// True if the store holds no rows at all.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

/// A shared guard over the row vector. Readers fetch a row by id and check
/// `deleted` themselves; this guard does not interpret visibility.
pub struct RowReadGuard<'a> {
    inner: RwLockReadGuard<'a, Vec<BaseRow>>,
}

impl RowReadGuard<'_> {
    /// Borrow the full row vector.
    pub fn rows(&self) -> &[BaseRow] {
        &self.inner
    }

    /// Fetch a single row by id.
    ///
    /// Panics if `row_id` is out of range, which should never happen for a
    /// row id returned by a version chain search against this same table.
    pub fn row(&self, row_id: RowId) -> &BaseRow {
        &self.inner[row_id as usize]
    }
}

/// An exclusive guard over the row vector, used by writers to append new
/// rows or flip `deleted` / overwrite a tuple in place.
pub struct RowWriteGuard<'a> {
    inner: RwLockWriteGuard<'a, Vec<BaseRow>>,
}

impl RowWriteGuard<'_> {
    /// Borrow the full row vector.
    pub fn rows(&self) -> &[BaseRow] {
        &self.inner
    }

    /// Append a new row and return its freshly allocated id.
    ///
    /// Row ids are never reused: a key's subsequent updates append new rows
    /// rather than rewriting an old one's id (spec §3, `RowId`).
    pub fn push(&mut self, tuple: Tuple) -> RowId {
        self.inner.push(BaseRow::new(tuple));
        (self.inner.len() - 1) as RowId
    }

    /// Mark a row deleted. The row itself is retained.
    pub fn mark_deleted(&mut self, row_id: RowId) {
        self.inner[row_id as usize].deleted = true;
    }

    /// Overwrite a row's tuple in place, for the in-place-update fast path
    /// where the primary key does not change.
    pub fn overwrite(&mut self, row_id: RowId, tuple: Tuple) {
        self.inner[row_id as usize].tuple = tuple;
    }
}
