//! Scalar types, schema, configuration, and the shared error taxonomy for
//! BabyDB's MVCC core.
//!
//! This crate has no dependency on the storage, index, concurrency, or
//! engine crates — it exists so all of them can agree on what a [`Key`],
//! a [`Tuple`], and a [`TaintedError`] are without a dependency cycle.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{DuplicateKeyError, LogicError, TaintedError};
pub use types::{
    IsolationLevel, Key, RangeInfo, RowId, Schema, Timestamp, Tuple, TxnId, Value, INVALID_ROW_ID,
    TXN_START_ID,
};
