//! The `Update` operator (spec §4.4): pulls all input eagerly, then for
//! each row appends a new base row and installs it on the index without
//! the uniqueness check `Insert` applies — two successive writes to the
//! same key by the same transaction are an overwrite, not a conflict.

use babydb_core::error::LogicError;
use babydb_core::types::{Schema, Tuple};

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Writes every tuple its child produces back into `table_name`, keyed by
/// that tuple's key column (which may or may not equal the row's
/// original key, depending on what the child computed).
pub struct UpdateOperator {
    table_name: String,
    child: Box<dyn Operator>,
    pending: Vec<Tuple>,
    pulled: bool,
    cursor: usize,
}

impl UpdateOperator {
    /// Build an `Update` over `table_name`. `child` must already produce
    /// the fully computed replacement tuples (e.g. via a `Projection`
    /// ahead of it) — this operator only writes what it's handed.
    pub fn new(table_name: impl Into<String>, child: Box<dyn Operator>) -> Self {
        UpdateOperator {
            table_name: table_name.into(),
            child,
            pending: Vec::new(),
            pulled: false,
            cursor: 0,
        }
    }
}

impl Operator for UpdateOperator {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.init(ctx)?;
        self.pending.clear();
        self.pulled = false;
        self.cursor = 0;
        Ok(())
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.check(ctx)?;
        let table = ctx.catalog.table(&self.table_name)?;
        if table.with_index(|_, _| ()).is_none() {
            return Err(LogicError::new(format!(
                "update requires table {} to have an index",
                self.table_name
            ))
            .into());
        }
        if table.schema() != self.child.output_schema() {
            return Err(LogicError::new("update child schema does not match the table").into());
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();

        if !self.pulled {
            loop {
                let mut child_chunk = Vec::new();
                let state = self.child.next(ctx, &mut child_chunk)?;
                self.pending.extend(child_chunk.into_iter().map(|(tuple, _)| tuple));
                if state == OperatorState::Exhausted {
                    break;
                }
            }
            self.pulled = true;
        }

        let table = ctx.catalog.table(&self.table_name)?;
        let key_col = table.key_column();
        let suggest = ctx.config.chunk_suggest_size.max(1);

        while self.cursor < self.pending.len() && out.len() < suggest {
            let tuple = self.pending[self.cursor].clone();
            self.cursor += 1;
            let key = tuple.key_from_tuple(key_col);
            let row_id = table.rows().write().push(tuple.clone());
            ctx.with_txn_context(|txn_ctx| {
                let result = table.with_index(|_, idx| idx.as_index().insert_for_update(key, row_id, txn_ctx));
                if matches!(result, Some(Err(_))) {
                    txn_ctx.mark_tainted();
                }
                result
            })
            .expect("checked in check()")?;
            out.push((tuple, row_id));
        }

        if self.cursor >= self.pending.len() {
            Ok(OperatorState::Exhausted)
        } else {
            Ok(OperatorState::HaveMoreOutput)
        }
    }

    fn output_schema(&self) -> &Schema {
        self.child.output_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, IndexKind};
    use crate::execution::value::ValueOperator;
    use babydb_concurrency::TransactionManager;
    use babydb_core::types::IsolationLevel;

    #[test]
    fn retargets_an_existing_key_without_a_uniqueness_conflict() {
        let catalog = Catalog::new();
        let schema = Schema::new(["key", "payload"]);
        catalog.create_table("t0", schema.clone(), 0).unwrap();
        catalog.create_index("t0_pk", "t0", "key", IndexKind::Art).unwrap();

        let mgr = TransactionManager::new();
        let txn = mgr.create_txn(IsolationLevel::Snapshot);
        let ctx = ExecutionContext::new(txn, &catalog, babydb_core::Config::default());
        let table = ctx.catalog.table("t0").unwrap();

        let original_row = table.rows().write().push(Tuple::new(vec![7, 70]));
        ctx.with_txn_context(|txn_ctx| {
            table.with_index(|_, idx| idx.as_index().insert(7, original_row, txn_ctx))
        })
        .unwrap()
        .unwrap();

        let values = ValueOperator::new(schema, vec![Tuple::new(vec![7, 700])]);
        let mut op = UpdateOperator::new("t0", Box::new(values));
        op.init(&ctx).unwrap();
        op.check(&ctx).unwrap();

        let mut chunk = Vec::new();
        let state = op.next(&ctx, &mut chunk).unwrap();
        assert_eq!(state, OperatorState::Exhausted);
        assert_eq!(chunk.len(), 1);

        let row_id = ctx
            .with_txn_context(|txn_ctx| table.with_index(|_, idx| idx.as_index().lookup(7, txn_ctx)))
            .unwrap();
        assert_eq!(table.rows().read().row(row_id).tuple, Tuple::new(vec![7, 700]));
        assert_ne!(row_id, original_row);
    }

    #[test]
    fn a_write_conflict_taints_the_losing_transaction() {
        use babydb_concurrency::TxnStatus;

        let catalog = Catalog::new();
        let schema = Schema::new(["key", "payload"]);
        catalog.create_table("t0", schema.clone(), 0).unwrap();
        catalog.create_index("t0_pk", "t0", "key", IndexKind::Art).unwrap();
        let table = catalog.table("t0").unwrap();

        let mgr = TransactionManager::new();
        let seed = mgr.create_txn(IsolationLevel::Snapshot);
        let row0 = table.rows().write().push(Tuple::new(vec![7, 0]));
        {
            let mut guard = seed.lock();
            table.with_index(|_, idx| idx.as_index().insert(7, row0, &mut *guard)).unwrap().unwrap();
        }
        assert!(mgr.commit(&seed).unwrap());

        let t1 = mgr.create_txn(IsolationLevel::Snapshot);
        let t2 = mgr.create_txn(IsolationLevel::Snapshot);

        let t1_ctx = ExecutionContext::new(t1.clone(), &catalog, babydb_core::Config::default());
        let mut t1_update = UpdateOperator::new("t0", Box::new(ValueOperator::new(schema.clone(), vec![Tuple::new(vec![7, 1])])));
        t1_update.init(&t1_ctx).unwrap();
        t1_update.check(&t1_ctx).unwrap();
        t1_update.next(&t1_ctx, &mut Vec::new()).unwrap();
        assert!(mgr.commit(&t1).unwrap());

        let t2_ctx = ExecutionContext::new(t2.clone(), &catalog, babydb_core::Config::default());
        let mut t2_update = UpdateOperator::new("t0", Box::new(ValueOperator::new(schema, vec![Tuple::new(vec![7, 2])])));
        t2_update.init(&t2_ctx).unwrap();
        t2_update.check(&t2_ctx).unwrap();
        let result = t2_update.next(&t2_ctx, &mut Vec::new());

        assert!(matches!(result, Err(OperatorError::Tainted(_))));
        assert_eq!(t2.lock().status(), TxnStatus::Tainted);
    }
}
