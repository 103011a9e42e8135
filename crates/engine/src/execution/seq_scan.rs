//! The `SeqScan` operator: walks a table's base row store in row-id
//! order, skipping logically deleted rows. Plumbing (spec §1) — it does
//! not consult version chains, so it is only safe to use where the
//! caller already knows there is nothing concurrent to hide (a freshly
//! created table, an exclusive DDL context, tests).

use babydb_core::types::Schema;

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Scans every live row of `table_name` in physical order.
pub struct SeqScan {
    table_name: String,
    schema: Schema,
    cursor: usize,
}

impl SeqScan {
    /// Build a full scan of `table_name`, emitting `schema`'s columns
    /// (must equal the table's own schema; no projection here).
    pub fn new(table_name: impl Into<String>, schema: Schema) -> Self {
        SeqScan {
            table_name: table_name.into(),
            schema,
            cursor: 0,
        }
    }
}

impl Operator for SeqScan {
    fn init(&mut self, _ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.cursor = 0;
        Ok(())
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        let table = ctx.catalog.table(&self.table_name)?;
        if table.schema() != &self.schema {
            return Err(babydb_core::error::LogicError::new(
                "seq scan schema does not match the table",
            )
            .into());
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();
        let table = ctx.catalog.table(&self.table_name)?;
        let suggest = ctx.config.chunk_suggest_size.max(1);
        let guard = table.rows().read();
        let rows = guard.rows();
        while self.cursor < rows.len() && out.len() < suggest {
            let row = &rows[self.cursor];
            let row_id = self.cursor as babydb_core::types::RowId;
            self.cursor += 1;
            if row.deleted {
                continue;
            }
            out.push((row.tuple.clone(), row_id));
        }
        if self.cursor >= rows.len() {
            Ok(OperatorState::Exhausted)
        } else {
            Ok(OperatorState::HaveMoreOutput)
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.schema
    }
}
