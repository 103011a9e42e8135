//! Scalar types shared by every layer of the engine.
//!
//! BabyDB has exactly one scalar type (a 64-bit integer) and keys a table by
//! a single 64-bit unsigned integer column. These aliases exist so every
//! crate in the workspace speaks the same vocabulary without re-deriving it.

/// The database's only scalar type. A [`Tuple`] is a sequence of these.
pub type Value = i64;

/// A 64-bit unsigned primary-key value. Serialized big-endian wherever it is
/// used as a byte-comparable index key (see `babydb_index::art`).
pub type Key = u64;

/// Index into the base row vector. Stable for the lifetime of the row: rows
/// are never physically removed, only marked deleted or superseded by a new
/// row on update.
pub type RowId = u64;

/// Sentinel for "no such row" / "no such key", matching the C++ original's
/// `INVALID_ID = idx_t(-1)`.
pub const INVALID_ROW_ID: RowId = u64::MAX;

/// Logical timestamp. Transaction read timestamps and commit timestamps
/// share this space; `0` means "before any commit".
pub type Timestamp = u64;

/// Transaction identifier. Drawn from [`TXN_START_ID`] upward so a `TxnId`
/// can never collide with a [`Timestamp`] (invariant I6).
pub type TxnId = u64;

/// First transaction id ever handed out. Chosen so the id space is disjoint
/// from the timestamp space even after `2^62` commits, which the benchmark
/// workloads in this crate's test suite never come close to.
pub const TXN_START_ID: TxnId = 1u64 << 62;

/// A row of the database's single scalar type, in column order.
///
/// `Tuple` is a thin wrapper over `Vec<Value>` rather than a bare alias so
/// the key-projection helpers below have a natural home.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tuple(pub Vec<Value>);

impl Tuple {
    /// Build a tuple from the given values.
    pub fn new(values: impl Into<Vec<Value>>) -> Self {
        Tuple(values.into())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the tuple has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read the value at `position` as a primary-key candidate.
    ///
    /// Panics if `position` is out of range; callers are expected to have
    /// validated the position against a [`Schema`] at `Check` time.
    pub fn key_from_tuple(&self, position: usize) -> Key {
        self.0[position] as Key
    }

    /// Project this tuple down to the given column positions, in order.
    pub fn keys_from_tuple(&self, positions: &[usize]) -> Tuple {
        Tuple(positions.iter().map(|&p| self.0[p]).collect())
    }
}

impl std::ops::Deref for Tuple {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Tuple(values)
    }
}

/// An ordered list of unique column names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema(Vec<String>);

impl Schema {
    /// Build a schema from column names. Does not itself check uniqueness;
    /// `Check`-time validation in the operator layer is where that's
    /// enforced, matching where the original raises `LogicError`.
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Schema(columns.into_iter().map(Into::into).collect())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column names, in order.
    pub fn columns(&self) -> &[String] {
        &self.0
    }

    /// Resolve a single column name to its position.
    pub fn key_attr(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|c| c == name)
    }

    /// Resolve every column of `sub` against `self`, in `sub`'s order.
    /// Returns `None` if any column of `sub` is not present in `self`.
    pub fn key_attrs(&self, sub: &Schema) -> Option<Vec<usize>> {
        sub.0.iter().map(|c| self.key_attr(c)).collect()
    }
}

/// Isolation level recognized by the transaction manager.
///
/// See the GLOSSARY entries for `SNAPSHOT` and `SERIALIZABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Each transaction reads a fixed snapshot and writes pass under
    /// first-committer-wins. The default.
    #[default]
    Snapshot,
    /// Snapshot isolation plus a read-set check at commit time.
    Serializable,
}

/// A closed or half-open range of primary-key values, as consumed by
/// `RangeIndex::scan_range`.
///
/// Defaults to an inclusive range, matching the original's `RangeInfo`
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeInfo {
    /// Lower bound.
    pub start: Key,
    /// Upper bound.
    pub end: Key,
    /// Whether `start` itself is included.
    pub contain_start: bool,
    /// Whether `end` itself is included.
    pub contain_end: bool,
}

impl RangeInfo {
    /// An inclusive `[start, end]` range.
    pub fn inclusive(start: Key, end: Key) -> Self {
        RangeInfo {
            start,
            end,
            contain_start: true,
            contain_end: true,
        }
    }

    /// Whether `key` falls within this range, honoring boundary inclusivity.
    pub fn contains(&self, key: Key) -> bool {
        let above_start = if self.contain_start {
            key >= self.start
        } else {
            key > self.start
        };
        let below_end = if self.contain_end {
            key <= self.end
        } else {
            key < self.end
        };
        above_start && below_end
    }
}

impl Default for RangeInfo {
    fn default() -> Self {
        RangeInfo::inclusive(Key::MIN, Key::MAX)
    }
}
