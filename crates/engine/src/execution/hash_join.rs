//! The `HashJoin` operator: a simple equi-join, build side fully
//! materialized into a hash map keyed by its join column. Plumbing
//! (spec §1) — no spilling, no outer-join variants.

use std::collections::HashMap;

use babydb_core::types::{Schema, Tuple, Value, INVALID_ROW_ID};

use super::context::ExecutionContext;
use super::operator::{Chunk, Operator, OperatorError, OperatorState};

/// Inner equi-join of `left` and `right` on `left_key`/`right_key`,
/// emitting left columns followed by right columns.
pub struct HashJoinOperator {
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    left_key: usize,
    right_key: usize,
    schema: Schema,
    build: Option<HashMap<Value, Vec<Tuple>>>,
    probe_matches: Vec<(Tuple, Tuple)>,
    probe_cursor: usize,
    right_exhausted: bool,
}

impl HashJoinOperator {
    /// Build a `HashJoin` of `left.left_key = right.right_key`.
    pub fn new(left: Box<dyn Operator>, right: Box<dyn Operator>, left_key: usize, right_key: usize) -> Self {
        let mut columns = left.output_schema().columns().to_vec();
        columns.extend(right.output_schema().columns().iter().cloned());
        let schema = Schema::new(columns);
        HashJoinOperator {
            left,
            right,
            left_key,
            right_key,
            schema,
            build: None,
            probe_matches: Vec::new(),
            probe_cursor: 0,
            right_exhausted: false,
        }
    }

    fn join_row(&self, left: &Tuple, right: &Tuple) -> Tuple {
        let mut values: Vec<Value> = left.to_vec();
        values.extend_from_slice(right);
        Tuple::new(values)
    }
}

impl Operator for HashJoinOperator {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.left.init(ctx)?;
        self.right.init(ctx)?;
        self.build = None;
        self.probe_matches.clear();
        self.probe_cursor = 0;
        self.right_exhausted = false;
        Ok(())
    }

    fn check(&self, ctx: &ExecutionContext) -> Result<(), OperatorError> {
        self.left.check(ctx)?;
        self.right.check(ctx)?;
        if self.left_key >= self.left.output_schema().len() || self.right_key >= self.right.output_schema().len() {
            return Err(babydb_core::error::LogicError::new("hash join key column out of range").into());
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext, out: &mut Chunk) -> Result<OperatorState, OperatorError> {
        out.clear();

        if self.build.is_none() {
            let mut build = HashMap::new();
            loop {
                let mut chunk = Vec::new();
                let state = self.left.next(ctx, &mut chunk)?;
                for (tuple, _) in chunk {
                    let key = tuple[self.left_key];
                    build.entry(key).or_insert_with(Vec::new).push(tuple);
                }
                if state == OperatorState::Exhausted {
                    break;
                }
            }
            self.build = Some(build);
        }

        while self.probe_cursor >= self.probe_matches.len() {
            if self.right_exhausted {
                return Ok(OperatorState::Exhausted);
            }
            let mut chunk = Vec::new();
            let state = self.right.next(ctx, &mut chunk)?;
            self.probe_matches.clear();
            self.probe_cursor = 0;
            let build = self.build.as_ref().expect("built above");
            for (right_tuple, _) in chunk {
                if let Some(matches) = build.get(&right_tuple[self.right_key]) {
                    for left_tuple in matches {
                        self.probe_matches.push((left_tuple.clone(), right_tuple.clone()));
                    }
                }
            }
            if state == OperatorState::Exhausted {
                self.right_exhausted = true;
            }
        }

        let suggest = ctx.config.chunk_suggest_size.max(1);
        while self.probe_cursor < self.probe_matches.len() && out.len() < suggest {
            let (left, right) = &self.probe_matches[self.probe_cursor];
            self.probe_cursor += 1;
            out.push((self.join_row(left, right), INVALID_ROW_ID));
        }

        if self.probe_cursor >= self.probe_matches.len() && self.right_exhausted {
            Ok(OperatorState::Exhausted)
        } else {
            Ok(OperatorState::HaveMoreOutput)
        }
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
    fn matches_rows_on_the_join_key() {
        let catalog = Catalog::new();
        let mgr = TransactionManager::new();
        let txn = mgr.create_txn(IsolationLevel::Snapshot);
        let ctx = ExecutionContext::new(txn, &catalog, babydb_core::Config::default());

        let left = ValueOperator::new(
            Schema::new(["lk", "lv"]),
            vec![Tuple::new(vec![1, 100]), Tuple::new(vec![2, 200])],
        );
        let right = ValueOperator::new(
            Schema::new(["rk", "rv"]),
            vec![Tuple::new(vec![2, 20]), Tuple::new(vec![3, 30])],
        );
        let mut op = HashJoinOperator::new(Box::new(left), Box::new(right), 0, 0);
        op.init(&ctx).unwrap();
        op.check(&ctx).unwrap();

        let mut chunk = Vec::new();
        let state = op.next(&ctx, &mut chunk).unwrap();
        assert_eq!(state, OperatorState::Exhausted);
        assert_eq!(chunk, vec![(Tuple::new(vec![2, 200, 2, 20]), INVALID_ROW_ID)]);
    }
}
