//! The `Value` operator: emits a fixed in-memory list of tuples (spec
//! §4.4). The simplest operator in the tree — mostly useful for feeding
//! literal rows into `Insert`/`Update` in tests.

use babydb_core::types::{Schema, Tuple, INVALID_ROW_ID};

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Emits `rows` once, in order, then reports exhausted.
pub struct ValueOperator {
    schema: Schema,
    rows: Vec<Tuple>,
    emitted: usize,
}

impl ValueOperator {
    /// Build a `Value` operator over a fixed row list.
    pub fn new(schema: Schema, rows: Vec<Tuple>) -> Self {
        ValueOperator { schema, rows, emitted: 0 }
    }
}

impl Operator for ValueOperator {
    fn init(&mut self, _ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.emitted = 0;
        Ok(())
    }

    fn check(&self, _ctx: &ExecutionContext) -> Result<(), OperatorError> {
        for row in &self.rows {
            if row.len() != self.schema.len() {
                return Err(babydb_core::error::LogicError::new(
                    "value operator row width does not match its schema",
                )
                .into());
            }
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();
        let suggest = ctx.config.chunk_suggest_size.max(1);
        while self.emitted < self.rows.len() && out.len() < suggest {
            out.push((self.rows[self.emitted].clone(), INVALID_ROW_ID));
            self.emitted += 1;
        }
        if self.emitted >= self.rows.len() {
            Ok(OperatorState::Exhausted)
        } else {
            Ok(OperatorState::HaveMoreOutput)
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.schema
    }
}
