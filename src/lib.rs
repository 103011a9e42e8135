//! BabyDB core: an in-process, single-node MVCC relational store.
//!
//! This crate is a thin re-export of the workspace members that make up the
//! engine. Each member owns one layer of the system:
//!
//! - [`babydb_core`] — scalar types, schema, config, and the shared error
//!   taxonomy.
//! - [`babydb_storage`] — the append-only base row store.
//! - [`babydb_index`] — the version chain and the ART primary index built on
//!   top of it.
//! - [`babydb_concurrency`] — the transaction object and transaction manager.
//! - [`babydb_engine`] — the database handle, catalog, and the pull-based
//!   operator pipeline that ties the rest together.
//!
//! See `DESIGN.md` for how each module grounds in the reference
//! implementation this workspace was built from.

pub use babydb_concurrency as concurrency;
pub use babydb_core as core;
pub use babydb_engine as engine;
pub use babydb_index as index;
pub use babydb_storage as storage;

pub use babydb_engine::{Database, DatabaseError};
