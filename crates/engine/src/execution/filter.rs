//! The `Filter` operator: keeps rows for which a predicate over the
//! child's schema holds. Plumbing (spec §1) — predicates are a plain
//! closure rather than an expression tree, matching the "not the hard
//! part" framing of peripheral operators.

use babydb_core::types::{Schema, Tuple};

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Passes through rows from `child` for which `predicate` returns true.
pub struct FilterOperator {
    child: Box<dyn Operator>,
    predicate: Box<dyn Fn(&Tuple) -> bool + Send + Sync>,
}

impl FilterOperator {
    /// Build a `Filter` over `child` with the given predicate.
    pub fn new(child: Box<dyn Operator>, predicate: impl Fn(&Tuple) -> bool + Send + Sync + 'static) -> Self {
        FilterOperator {
            child,
            predicate: Box::new(predicate),
        }
    }
}

impl Operator for FilterOperator {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.init(ctx)
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.check(ctx)
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();
        loop {
            let mut child_chunk = Vec::new();
            let state = self.child.next(ctx, &mut child_chunk)?;
            out.extend(child_chunk.into_iter().filter(|(tuple, _)| (self.predicate)(tuple)));
            if state == OperatorState::Exhausted || !out.is_empty() {
                return Ok(state);
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        self.child.output_schema()
    }
}
