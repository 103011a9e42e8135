//! The `Insert` operator (spec §4.4): for each input tuple, appends a new
//! base row and installs it on the index under primary-key-uniqueness
//! enforcement.

use babydb_core::error::LogicError;
use babydb_core::types::Schema;

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Inserts every tuple its child produces into `table_name`.
pub struct InsertOperator {
    table_name: String,
    child: Box<dyn Operator>,
}

impl InsertOperator {
    /// Build an `Insert` over `table_name`, fed by `child`.
    pub fn new(table_name: impl Into<String>, child: Box<dyn Operator>) -> Self {
        InsertOperator {
            table_name: table_name.into(),
            child,
        }
    }
}

impl Operator for InsertOperator {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.init(ctx)
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.check(ctx)?;
        let table = ctx.catalog.table(&self.table_name)?;
        if table.with_index(|_, _| ()).is_none() {
            return Err(LogicError::new(format!(
                "insert requires table {} to have an index",
                self.table_name
            ))
            .into());
        }
        if table.schema() != self.child.output_schema() {
            return Err(LogicError::new("insert child schema does not match the table").into());
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();
        let table = ctx.catalog.table(&self.table_name)?;
        let key_col = table.key_column();

        let mut child_chunk = Vec::new();
        let state = self.child.next(ctx, &mut child_chunk)?;

        for (tuple, _) in child_chunk {
            let key = tuple.key_from_tuple(key_col);
            let row_id = table.rows().write().push(tuple.clone());
            ctx.with_txn_context(|txn_ctx| {
                let result = table.with_index(|_, idx| idx.as_index().insert(key, row_id, txn_ctx));
                if matches!(result, Some(Err(_))) {
                    txn_ctx.mark_tainted();
                }
                result
            })
            .expect("checked in check()")?;
            out.push((tuple, row_id));
        }
        Ok(state)
    }

    fn output_schema(&self) -> &Schema {
        self.child.output_schema()
    }
}
