//! Compound query combining clauses.

use neural_core::{Error, Result};
use serde_json::{Map, Value, json};

use crate::context::RewriteContext;
use crate::node::{QueryNode, Rewrite};
use crate::parse::as_object;
use crate::wire::{StreamInput, StreamOutput};

const CLAUSES: [&str; 3] = ["must", "should", "filter"];

/// Boolean combination of sub-queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    must: Vec<QueryNode>,
    should: Vec<QueryNode>,
    filter: Vec<QueryNode>,
}

impl BoolQuery {
    /// Query name in structured input and on the wire.
    pub const NAME: &'static str = "bool";

    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause that must match.
    pub fn must(mut self, query: impl Into<QueryNode>) -> Self {
        self.must.push(query.into());
        self
    }

    /// Add a clause that should match.
    pub fn should(mut self, query: impl Into<QueryNode>) -> Self {
        self.should.push(query.into());
        self
    }

    /// Add a non-scoring filter clause.
    pub fn filter(mut self, query: impl Into<QueryNode>) -> Self {
        self.filter.push(query.into());
        self
    }

    /// `must` clauses.
    pub fn must_clauses(&self) -> &[QueryNode] {
        &self.must
    }

    /// `should` clauses.
    pub fn should_clauses(&self) -> &[QueryNode] {
        &self.should
    }

    /// `filter` clauses.
    pub fn filter_clauses(&self) -> &[QueryNode] {
        &self.filter
    }

    /// All clauses, in `must`, `should`, `filter` order.
    pub fn clauses(&self) -> impl Iterator<Item = &QueryNode> {
        self.must.iter().chain(&self.should).chain(&self.filter)
    }

    fn lists(&self) -> [&Vec<QueryNode>; 3] {
        [&self.must, &self.should, &self.filter]
    }

    fn lists_mut(&mut self) -> [&mut Vec<QueryNode>; 3] {
        [&mut self.must, &mut self.should, &mut self.filter]
    }

    /// Parse the body of a `bool` query. Each clause is a query object or an
    /// array of them. Unknown keys are ignored.
    pub fn from_json(body: &Value) -> Result<Self> {
        let obj = as_object(body, Self::NAME)?;
        let mut query = Self::new();

        for (name, list) in CLAUSES.iter().zip(query.lists_mut()) {
            *list = parse_clause(obj, name)?;
        }
        Ok(query)
    }

    /// Render as structured output. Empty clause lists are omitted.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (name, list) in CLAUSES.iter().zip(self.lists()) {
            if !list.is_empty() {
                body.insert(
                    (*name).to_string(),
                    Value::Array(list.iter().map(QueryNode::to_json).collect()),
                );
            }
        }
        json!({ Self::NAME: body })
    }

    /// Write each clause list as a count followed by its nodes.
    pub fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        for list in self.lists() {
            out.write_count(list.len())?;
            for node in list {
                node.write_to(out)?;
            }
        }
        Ok(())
    }

    /// Read a query written by [`BoolQuery::write_to`].
    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        input.enter_nested()?;
        let mut query = Self::new();
        for list in query.lists_mut() {
            let count = input.read_u32()? as usize;
            // Every node needs at least its 4-byte name prefix.
            if count > input.remaining() / 4 {
                return Err(Error::wire(format!(
                    "[bool] clause count {count} exceeds remaining input"
                )));
            }
            for _ in 0..count {
                list.push(QueryNode::read_from(input)?);
            }
        }
        input.leave_nested();
        Ok(query)
    }
}

fn parse_clause(obj: &Map<String, Value>, name: &str) -> Result<Vec<QueryNode>> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(QueryNode::from_json).collect(),
        Some(item @ Value::Object(_)) => Ok(vec![QueryNode::from_json(item)?]),
        Some(other) => Err(Error::parse(format!(
            "[bool] '{name}' must be a query or an array of queries, got {other}"
        ))),
    }
}

impl Rewrite for BoolQuery {
    fn rewrite(&self, ctx: &mut RewriteContext) -> Result<QueryNode> {
        let mut rewritten = Self::new();
        let mut changed = false;

        for (source, target) in self.lists().into_iter().zip(rewritten.lists_mut()) {
            for clause in source {
                let next = clause.rewrite(ctx)?;
                changed |= next != *clause;
                target.push(next);
            }
        }

        if changed {
            Ok(QueryNode::Bool(rewritten))
        } else {
            Ok(QueryNode::Bool(self.clone()))
        }
    }
}
