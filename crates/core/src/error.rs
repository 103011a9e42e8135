//! The error taxonomy shared by the whole engine.
//!
//! Per the failure semantics table: a write-write conflict raises
//! [`TaintedError`] (recoverable only by abort), a schema or protocol misuse
//! raises [`LogicError`] (a programming bug, fatal to the caller), and a
//! serializability failure is not an exception at all — it's a `false`
//! return from commit, handled in `babydb_concurrency`.

/// Raised when an install onto a version chain cannot proceed because
/// another transaction holds the uncommitted slot, or because a committer
/// has landed since the writer's snapshot was taken (first-committer-wins).
///
/// Once raised, the owning transaction transitions to `TAINTED`: the only
/// valid next action is `Abort`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("write conflict: {0}")]
pub struct TaintedError(pub String);

impl TaintedError {
    /// Build a tainted error with the given explanation.
    pub fn new(reason: impl Into<String>) -> Self {
        TaintedError(reason.into())
    }
}

/// Programmer misuse: an unknown schema column, committing a transaction
/// that isn't `RUNNING`, aborting one that's already terminated, or any
/// other condition the spec calls a programming error. Never recoverable;
/// callers should treat this as fatal to the operator tree.
#[derive(Debug, Clone, thiserror::Error)]
#[error("logic error: {0}")]
pub struct LogicError(pub String);

impl LogicError {
    /// Build a logic error with the given explanation.
    pub fn new(reason: impl Into<String>) -> Self {
        LogicError(reason.into())
    }
}

/// Raised by an index when an insert targets a key that is already visible
/// and committed at the caller's snapshot. A more specific [`TaintedError`]
/// used for the primary-key-uniqueness case (§4.4 Insert).
#[derive(Debug, Clone, thiserror::Error)]
#[error("duplicate key")]
pub struct DuplicateKeyError;

impl From<DuplicateKeyError> for TaintedError {
    fn from(_: DuplicateKeyError) -> Self {
        TaintedError::new("duplicate key")
    }
}
