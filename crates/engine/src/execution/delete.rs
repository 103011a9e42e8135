//! The `Delete` operator: marks every row its child produces as deleted
//! in the base row store. Dropped from the distilled specification but
//! present in the original source (`delete_operator.cpp`) — restored here
//! since every other write operator has a counterpart and a store with no
//! way to retire a row is missing a basic piece of its own data model.
//!
//! Deletion does not touch the index: a deleted row's chain entry still
//! resolves to its row id under MVCC visibility, but readers skip it via
//! the `deleted` flag, matching how `RangeIndexScan` already treats it.

use babydb_core::types::Schema;

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Marks every row from `child` deleted in `table_name`'s base row store.
/// Emits no output rows.
pub struct DeleteOperator {
    table_name: String,
    child: Box<dyn Operator>,
    schema: Schema,
}

impl DeleteOperator {
    /// Build a `Delete` over `table_name`, fed by `child`.
    pub fn new(table_name: impl Into<String>, child: Box<dyn Operator>) -> Self {
        DeleteOperator {
            table_name: table_name.into(),
            child,
            schema: Schema::new(Vec::<String>::new()),
        }
    }
}

impl Operator for DeleteOperator {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.init(ctx)
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.check(ctx)?;
        ctx.catalog.table(&self.table_name)?;
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();
        let table = ctx.catalog.table(&self.table_name)?;

        loop {
            let mut child_chunk = Vec::new();
            let state = self.child.next(ctx, &mut child_chunk)?;
            if !child_chunk.is_empty() {
                let mut rows = table.rows().write();
                for (_, row_id) in child_chunk {
                    rows.mark_deleted(row_id);
                }
            }
            if state == OperatorState::Exhausted {
                break;
            }
        }
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
    use crate::execution::seq_scan::SeqScan;
    use babydb_concurrency::TransactionManager;
    use babydb_core::types::{IsolationLevel, Tuple};

    #[test]
    fn marks_every_scanned_row_deleted_without_touching_the_index() {
        let catalog = Catalog::new();
        let schema = Schema::new(["key", "payload"]);
        let table = catalog.create_table("t0", schema.clone(), 0).unwrap();
        let r0 = table.rows().write().push(Tuple::new(vec![1, 10]));
        let r1 = table.rows().write().push(Tuple::new(vec![2, 20]));

        let mgr = TransactionManager::new();
        let txn = mgr.create_txn(IsolationLevel::Snapshot);
        let ctx = ExecutionContext::new(txn, &catalog, babydb_core::Config::default());

        let scan = SeqScan::new("t0", schema);
        let mut op = DeleteOperator::new("t0", Box::new(scan));
        op.init(&ctx).unwrap();
        op.check(&ctx).unwrap();

        let mut chunk = Vec::new();
        let state = op.next(&ctx, &mut chunk).unwrap();
        assert_eq!(state, OperatorState::Exhausted);
        assert!(chunk.is_empty());

        let rows = table.rows().read();
        assert!(rows.row(r0).deleted);
        assert!(rows.row(r1).deleted);
    }
}
