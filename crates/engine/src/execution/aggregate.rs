//! The `Aggregate` operator: a single-group `SUM` over one child column.
//! Plumbing (spec §1) — no grouping, no other aggregate functions; the
//! minimum needed to exercise the pipeline end to end.

use babydb_core::types::{Schema, Tuple, INVALID_ROW_ID};

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Sums `column` across every row the child produces, emitting a single
/// one-column row on the call that drains the child.
pub struct SumAggregate {
    child: Box<dyn Operator>,
    column: usize,
    schema: Schema,
    done: bool,
}

impl SumAggregate {
    /// Build a `SUM(column)` aggregate over `child`.
    pub fn new(child: Box<dyn Operator>, column: usize) -> Self {
        SumAggregate {
            child,
            column,
            schema: Schema::new(["sum"]),
            done: false,
        }
    }
}

impl Operator for SumAggregate {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.init(ctx)?;
        self.done = false;
        Ok(())
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.check(ctx)?;
        if self.column >= self.child.output_schema().len() {
            return Err(babydb_core::error::LogicError::new("aggregate column out of range").into());
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();
        if self.done {
            return Ok(OperatorState::Exhausted);
        }

        let mut total: i64 = 0;
        loop {
            let mut chunk = Vec::new();
            let state = self.child.next(ctx, &mut chunk)?;
            for (tuple, _) in &chunk {
                total += tuple[self.column];
            }
            if state == OperatorState::Exhausted {
                break;
            }
        }

        self.done = true;
        out.push((Tuple::new(vec![total]), INVALID_ROW_ID));
        Ok(OperatorState::Exhausted)
    }

    fn output_schema(&self) -> &Schema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::execution::value::ValueOperator;
    use babydb_concurrency::TransactionManager;
    use babydb_core::types::IsolationLevel;

    #[test]
    fn sums_the_whole_child_then_reports_exhausted_forever() {
        let catalog = Catalog::new();
        let mgr = TransactionManager::new();
        let txn = mgr.create_txn(IsolationLevel::Snapshot);
        let ctx = ExecutionContext::new(txn, &catalog, babydb_core::Config::default());

        let values = ValueOperator::new(
            Schema::new(["a"]),
            vec![Tuple::new(vec![3]), Tuple::new(vec![4]), Tuple::new(vec![5])],
        );
        let mut op = SumAggregate::new(Box::new(values), 0);
        op.init(&ctx).unwrap();
        op.check(&ctx).unwrap();

        let mut chunk = Vec::new();
        let state = op.next(&ctx, &mut chunk).unwrap();
        assert_eq!(state, OperatorState::Exhausted);
        assert_eq!(chunk, vec![(Tuple::new(vec![12]), INVALID_ROW_ID)]);

        let mut chunk2 = Vec::new();
        let state2 = op.next(&ctx, &mut chunk2).unwrap();
        assert_eq!(state2, OperatorState::Exhausted);
        assert!(chunk2.is_empty());
    }
}
