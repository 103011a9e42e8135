//! The `RangeIndexScan` operator (spec §4.4): on first `Next`, resolves
//! the whole row-id range against the ART index at the caller's
//! snapshot; subsequent calls page the results into chunks, fetching and
//! projecting each base row.

use babydb_core::error::LogicError;
use babydb_core::types::{RangeInfo, RowId, Schema};

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Scans `table_name`'s index over `range`, projecting `fetch_schema`'s
/// columns out of each visible row.
pub struct RangeIndexScan {
    table_name: String,
    range: RangeInfo,
    fetch_schema: Schema,
    row_ids: Vec<RowId>,
    cursor: usize,
    resolved: bool,
}

impl RangeIndexScan {
    /// Build a scan of `table_name` over `range`, emitting `fetch_schema`.
    pub fn new(table_name: impl Into<String>, range: RangeInfo, fetch_schema: Schema) -> Self {
        RangeIndexScan {
            table_name: table_name.into(),
            range,
            fetch_schema,
            row_ids: Vec::new(),
            cursor: 0,
            resolved: false,
        }
    }
}

impl Operator for RangeIndexScan {
    fn init(&mut self, _ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.row_ids.clear();
        self.cursor = 0;
        self.resolved = false;
        Ok(())
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        let table = ctx.catalog.table(&self.table_name)?;
        let scannable = table
            .with_index(|_, idx| idx.as_range_index().is_some())
            .unwrap_or(false);
        if !scannable {
            return Err(LogicError::new(format!(
                "table {} has no range-scannable index",
                self.table_name
            ))
            .into());
        }
        if table.schema().key_attrs(&self.fetch_schema).is_none() {
            return Err(LogicError::new("range index scan requests an unknown column").into());
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();
        let table = ctx.catalog.table(&self.table_name)?;

        if !self.resolved {
            let range = self.range;
            self.row_ids = ctx
                .with_txn_context(|txn_ctx| {
                    table.with_index(|_, idx| {
                        idx.as_range_index()
                            .expect("validated in check()")
                            .scan_range(range, txn_ctx)
                    })
                })
                .ok_or_else(|| LogicError::new("table lost its index between check and next"))?;
            self.resolved = true;
        }

        let fetch_positions = table
            .schema()
            .key_attrs(&self.fetch_schema)
            .expect("validated in check()");
        let suggest = ctx.config.chunk_suggest_size.max(1);
        let guard = table.rows().read();
        while self.cursor < self.row_ids.len() && out.len() < suggest {
            let row_id = self.row_ids[self.cursor];
            self.cursor += 1;
            let row = guard.row(row_id);
            if row.deleted {
                continue;
            }
            out.push((row.tuple.keys_from_tuple(&fetch_positions), row_id));
        }
        if self.cursor >= self.row_ids.len() {
            Ok(OperatorState::Exhausted)
        } else {
            Ok(OperatorState::HaveMoreOutput)
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.fetch_schema
    }
}
