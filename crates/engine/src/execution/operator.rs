//! The pull-based operator protocol (spec §4.4, §6.4): `Init`, `Check`,
//! `Next(chunk) -> state`.

use babydb_core::error::{LogicError, TaintedError};
use babydb_core::types::{RowId, Schema, Tuple};

use crate::catalog::CatalogError;
use crate::execution::context::ExecutionContext;

/// A batch of `(tuple, row_id)` pairs passed between operators in one
/// `Next` call. `row_id` is [`babydb_core::types::INVALID_ROW_ID`] for
/// tuples that don't correspond to a physical base row (e.g. `Value`'s
/// literal rows).
pub type Chunk = Vec<(Tuple, RowId)>;

/// What a `Next` call accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    /// The chunk was filled (or partially filled) and more output remains.
    HaveMoreOutput,
    /// The chunk holds the operator's final output, if any; no further
    /// `Next` call will produce more rows.
    Exhausted,
}

/// Everything an operator can fail with. `Tainted` is the only one a
/// well-behaved client retries (spec §7); the rest are fatal to the
/// operator tree.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OperatorError {
    /// A write conflict occurred; the owning transaction is now TAINTED.
    #[error(transparent)]
    Tainted(#[from] TaintedError),
    /// Schema mismatch or other protocol misuse.
    #[error(transparent)]
    Logic(#[from] LogicError),
    /// A table or index name this operator targets doesn't exist.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// The operator protocol. Child operators are wired bottom-up; `Init`
/// recurses into children first, `Check` validates schema compatibility
/// before any `Next` call is made (spec §4.4).
pub trait Operator {
    /// Reset this operator (and its children) to start producing output
    /// from the beginning.
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), OperatorError>;

    /// Validate that this operator (and its children) can run against the
    /// current catalog — unknown columns, missing indexes, and similar
    /// are caught here rather than mid-scan.
    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError>;

    /// Produce up to one chunk of output, appending to `out` (which is
    /// cleared first). Returns whether more output remains.
    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError>;

    /// The schema of tuples this operator emits.
    fn output_schema(&self) -> &Schema;
}
