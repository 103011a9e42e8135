//! Tables and indexes, reached by name (spec §1, "database façade" — an
//! external collaborator the core's operators look things up through, not
//! itself part of the MVCC hard engineering).

use std::collections::HashMap;
use std::sync::Arc;

use babydb_core::types::Schema;
use babydb_index::{ArtIndex, Index, RangeIndex, Stlmap};
use babydb_storage::RowStore;
use parking_lot::RwLock;

/// Which index implementation backs a table's one permitted index (spec
/// §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// The MVCC-aware adaptive radix tree (spec §4.2).
    Art,
    /// The unversioned ordered point map, for single-transaction tests.
    Stlmap,
}

/// A table's one index, tagged by kind so callers can recover range-scan
/// capability without downcasting a trait object.
pub enum TableIndex {
    /// An [`ArtIndex`], which also supports ordered range scan.
    Art(Arc<ArtIndex>),
    /// A [`Stlmap`], point lookups only.
    Stlmap(Arc<Stlmap>),
}

impl TableIndex {
    /// This index's kind.
    pub fn kind(&self) -> IndexKind {
        match self {
            TableIndex::Art(_) => IndexKind::Art,
            TableIndex::Stlmap(_) => IndexKind::Stlmap,
        }
    }

    /// Borrow this index through the base [`Index`] trait.
    pub fn as_index(&self) -> &dyn Index {
        match self {
            TableIndex::Art(idx) => idx.as_ref(),
            TableIndex::Stlmap(idx) => idx.as_ref(),
        }
    }

    /// Borrow this index through [`RangeIndex`], if it supports range
    /// scan.
    pub fn as_range_index(&self) -> Option<&dyn RangeIndex> {
        match self {
            TableIndex::Art(idx) => Some(idx.as_ref()),
            TableIndex::Stlmap(_) => None,
        }
    }
}

/// One table: its schema, its base row store, the position of its key
/// column, and at most one index (spec §1: "one index kind per table").
pub struct Table {
    name: String,
    schema: Schema,
    key_column: usize,
    rows: RowStore,
    index: RwLock<Option<(String, TableIndex)>>,
}

impl Table {
    fn new(name: impl Into<String>, schema: Schema, key_column: usize) -> Self {
        Table {
            name: name.into(),
            schema,
            key_column,
            rows: RowStore::new(),
            index: RwLock::new(None),
        }
    }

    /// This table's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This table's column schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The schema position of the primary-key column.
    pub fn key_column(&self) -> usize {
        self.key_column
    }

    /// This table's base row store.
    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    /// Run `f` with this table's index, if it has one.
    pub fn with_index<T>(&self, f: impl FnOnce(&str, &TableIndex) -> T) -> Option<T> {
        let guard = self.index.read();
        guard.as_ref().map(|(name, idx)| f(name, idx))
    }

    fn set_index(&self, name: String, index: TableIndex) {
        *self.index.write() = Some((name, index));
    }

    fn clear_index(&self) {
        *self.index.write() = None;
    }
}

/// Programmer-visible catalog failures: naming conflicts and lookups by a
/// name that doesn't exist. Distinct from [`babydb_core::error::LogicError`],
/// which covers protocol misuse once a table/index handle is already in
/// hand.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// `CreateTable` targeted a name already in use.
    #[error("table already exists: {0}")]
    TableAlreadyExists(String),
    /// A lookup targeted a table that doesn't exist.
    #[error("no such table: {0}")]
    NoSuchTable(String),
    /// `CreateIndex` targeted a table that already has one (spec: one
    /// index kind per table).
    #[error("table {0} already has an index")]
    IndexAlreadyExists(String),
    /// A lookup targeted an index that doesn't exist, or whose name
    /// doesn't match the table's current index.
    #[error("no such index: {0}")]
    NoSuchIndex(String),
    /// The named column isn't in the table's schema.
    #[error("unknown column: {0}")]
    UnknownColumn(String),
}

/// The set of tables known to a [`crate::Database`] (spec §6.1 `CreateTable`
/// / `DropTable` / `CreateIndex` / `DropIndex`).
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Register a new table. Fails if `name` is already taken.
    pub fn create_table(
        &self,
        name: impl Into<String>,
        schema: Schema,
        key_column: usize,
    ) -> Result<Arc<Table>, CatalogError> {
        let name = name.into();
        let mut tables = self.tables.write();
        if tables.contains_key(&name) {
            return Err(CatalogError::TableAlreadyExists(name));
        }
        let table = Arc::new(Table::new(name.clone(), schema, key_column));
        tables.insert(name, table.clone());
        Ok(table)
    }

    /// Remove a table and everything it owns, including its index.
    pub fn drop_table(&self, name: &str) -> Result<(), CatalogError> {
        let mut tables = self.tables.write();
        tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CatalogError::NoSuchTable(name.to_string()))
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Result<Arc<Table>, CatalogError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::NoSuchTable(name.to_string()))
    }

    /// Create an index of `kind` over `table_name`'s `key_column_name`
    /// column. Fails if the table already has an index, the table
    /// doesn't exist, or the column name isn't in its schema.
    pub fn create_index(
        &self,
        index_name: impl Into<String>,
        table_name: &str,
        key_column_name: &str,
        kind: IndexKind,
    ) -> Result<(), CatalogError> {
        let index_name = index_name.into();
        let table = self.table(table_name)?;
        if table
            .schema()
            .key_attr(key_column_name)
            .is_none()
        {
            return Err(CatalogError::UnknownColumn(key_column_name.to_string()));
        }
        if table.with_index(|_, _| ()).is_some() {
            return Err(CatalogError::IndexAlreadyExists(table_name.to_string()));
        }
        let index = match kind {
            IndexKind::Art => TableIndex::Art(Arc::new(ArtIndex::new(index_name.clone()))),
            IndexKind::Stlmap => TableIndex::Stlmap(Arc::new(Stlmap::new(index_name.clone()))),
        };
        table.set_index(index_name, index);
        Ok(())
    }

    /// Drop `table_name`'s index, if `index_name` matches the one it has.
    pub fn drop_index(&self, table_name: &str, index_name: &str) -> Result<(), CatalogError> {
        let table = self.table(table_name)?;
        let matches = table
            .with_index(|name, _| name == index_name)
            .unwrap_or(false);
        if !matches {
            return Err(CatalogError::NoSuchIndex(index_name.to_string()));
        }
        table.clear_index();
        Ok(())
    }
}
