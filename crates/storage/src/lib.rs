//! The base row store.
//!
//! Everything in this crate is deliberately uninteresting: an append-only
//! vector behind a shared/exclusive latch (spec §1, §3). The hard MVCC work
//! — version chains and the ART index that carries them — lives in
//! `babydb_index`; this crate only has to hand back rows by id.

#![warn(missing_docs)]

pub mod row_store;

pub use row_store::{BaseRow, RowReadGuard, RowStore, RowWriteGuard};
