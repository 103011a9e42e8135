//! The `Projection` operator: maps each child row through a column
//! expression list. Plumbing (spec §1); expressions here are plain
//! position references or constants, the minimum needed to feed
//! `Update`'s "compute the new tuple" step.

use babydb_core::types::{Schema, Tuple, Value};

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// One output column: either copied from a child column or a constant.
#[derive(Debug, Clone, Copy)]
pub enum ProjectExpr {
    /// Copy the child's column at this position.
    Column(usize),
    /// Emit this constant regardless of the input row.
    Constant(Value),
}

/// Projects each row from `child` through `exprs`, producing `schema`.
pub struct ProjectionOperator {
    child: Box<dyn Operator>,
    exprs: Vec<ProjectExpr>,
    schema: Schema,
}

impl ProjectionOperator {
    /// Build a `Projection` over `child`. `exprs.len()` must equal
    /// `schema.len()`.
    pub fn new(child: Box<dyn Operator>, exprs: Vec<ProjectExpr>, schema: Schema) -> Self {
        ProjectionOperator { child, exprs, schema }
    }

    fn project(&self, tuple: &Tuple) -> Tuple {
        Tuple::new(
            self.exprs
                .iter()
                .map(|e| match *e {
                    ProjectExpr::Column(pos) => tuple[pos],
                    ProjectExpr::Constant(v) => v,
                })
                .collect::<Vec<Value>>(),
        )
    }
}

impl Operator for ProjectionOperator {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.init(ctx)
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.child.check(ctx)?;
        if self.exprs.len() != self.schema.len() {
            return Err(babydb_core::error::LogicError::new(
                "projection expression count does not match its output schema",
            )
            .into());
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();
        let mut child_chunk = Vec::new();
        let state = self.child.next(ctx, &mut child_chunk)?;
        out.extend(
            child_chunk
                .into_iter()
                .map(|(tuple, row_id)| (self.project(&tuple), row_id)),
        );
        Ok(state)
    }

    fn output_schema(&self) -> &Schema {
        &self.schema
    }
}
