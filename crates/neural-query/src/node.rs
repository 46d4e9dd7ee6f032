//! Query tree nodes and the rewrite step.

use bytes::Bytes;
use neural_core::{Error, Result};
use serde_json::Value;

use crate::boolean::BoolQuery;
use crate::context::RewriteContext;
use crate::embedding::EmbeddingQuery;
use crate::knn::KnnQuery;
use crate::parse::as_object;
use crate::wire::{StreamInput, StreamOutput};

/// One synchronous rewrite step.
///
/// Implementations never block. Slow work is registered with the context
/// and its result picked up on a later pass. A node that needs no further
/// rewriting returns a value equal to itself.
pub trait Rewrite {
    /// Produce the next form of this node.
    fn rewrite(&self, ctx: &mut RewriteContext) -> Result<QueryNode>;
}

/// A node in a query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Text awaiting an embedding.
    Embedding(EmbeddingQuery),
    /// Vector similarity search.
    Knn(KnnQuery),
    /// Boolean combination.
    Bool(BoolQuery),
}

impl QueryNode {
    /// Query name used in structured input and on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Embedding(_) => EmbeddingQuery::NAME,
            Self::Knn(_) => KnnQuery::NAME,
            Self::Bool(_) => BoolQuery::NAME,
        }
    }

    /// Whether no embedding query remains anywhere in the tree.
    pub fn is_fully_resolved(&self) -> bool {
        match self {
            Self::Embedding(_) => false,
            Self::Knn(_) => true,
            Self::Bool(query) => query.clauses().all(Self::is_fully_resolved),
        }
    }

    /// Parse `{"<name>": {...}}`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, "query")?;
        let mut entries = obj.iter();
        let (name, body) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(Error::parse(format!(
                    "query must have exactly one top-level key, found {}",
                    obj.len()
                )));
            }
        };

        match name.as_str() {
            EmbeddingQuery::NAME => Ok(Self::Embedding(EmbeddingQuery::from_json(body)?)),
            KnnQuery::NAME => Ok(Self::Knn(KnnQuery::from_json(body)?)),
            BoolQuery::NAME => Ok(Self::Bool(BoolQuery::from_json(body)?)),
            other => Err(Error::parse(format!("unknown query [{other}]"))),
        }
    }

    /// Parse a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| Error::parse(format!("invalid JSON: {e}")))?;
        Self::from_json(&value)
    }

    /// Render as structured output.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Embedding(query) => query.to_json(),
            Self::Knn(query) => query.to_json(),
            Self::Bool(query) => query.to_json(),
        }
    }

    /// Write the name prefix followed by the node body.
    pub fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(self.name())?;
        match self {
            Self::Embedding(query) => query.write_to(out),
            Self::Knn(query) => query.write_to(out),
            Self::Bool(query) => query.write_to(out),
        }
    }

    /// Read a node written by [`QueryNode::write_to`].
    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let name = input.read_string()?;
        match name.as_str() {
            EmbeddingQuery::NAME => Ok(Self::Embedding(EmbeddingQuery::read_from(input)?)),
            KnnQuery::NAME => Ok(Self::Knn(KnnQuery::read_from(input)?)),
            BoolQuery::NAME => Ok(Self::Bool(BoolQuery::read_from(input)?)),
            other => Err(Error::wire(format!("unknown query name '{other}'"))),
        }
    }

    /// Encode the tree. Fails with [`Error::Wire`] when a string or vector
    /// exceeds [`crate::wire::MAX_ITEM_LEN`].
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut out = StreamOutput::new();
        self.write_to(&mut out)?;
        Ok(out.into_bytes())
    }

    /// Decode a tree, rejecting trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut input = StreamInput::new(bytes);
        let node = Self::read_from(&mut input)?;
        input.finish()?;
        Ok(node)
    }
}

impl Rewrite for QueryNode {
    fn rewrite(&self, ctx: &mut RewriteContext) -> Result<QueryNode> {
        match self {
            Self::Embedding(query) => query.rewrite(ctx),
            Self::Knn(query) => query.rewrite(ctx),
            Self::Bool(query) => query.rewrite(ctx),
        }
    }
}

impl From<EmbeddingQuery> for QueryNode {
    fn from(query: EmbeddingQuery) -> Self {
        Self::Embedding(query)
    }
}

impl From<KnnQuery> for QueryNode {
    fn from(query: KnnQuery) -> Self {
        Self::Knn(query)
    }
}

impl From<BoolQuery> for QueryNode {
    fn from(query: BoolQuery) -> Self {
        Self::Bool(query)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_dispatch() {
        let neural = QueryNode::from_json(&json!({
            "neural": {"doc": "d", "model_id": "m", "knn_vector_field": "f"}
        }))
        .unwrap();
        assert_eq!(neural.name(), "neural");

        let knn = QueryNode::from_json(&json!({"knn": {"f": {"vector": [1.0]}}})).unwrap();
        assert_eq!(knn.name(), "knn");

        let compound = QueryNode::from_json(&json!({"bool": {}})).unwrap();
        assert_eq!(compound, QueryNode::Bool(BoolQuery::new()));
    }

    #[test]
    fn test_from_json_unknown_query() {
        let err = QueryNode::from_json(&json!({"match": {"title": "x"}})).unwrap_err();
        assert!(err.to_string().contains("unknown query [match]"));
    }

    #[test]
    fn test_from_json_requires_single_key() {
        assert!(QueryNode::from_json(&json!({})).is_err());
        assert!(QueryNode::from_json(&json!({"knn": {}, "bool": {}})).is_err());
    }

    #[test]
    fn test_from_json_str_invalid() {
        let err = QueryNode::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_is_fully_resolved() {
        let knn: QueryNode = KnnQuery::new("f", vec![1.0], 1).into();
        let neural: QueryNode = EmbeddingQuery::new("d", "m", "f").into();
        assert!(knn.is_fully_resolved());
        assert!(!neural.is_fully_resolved());

        let tree: QueryNode = BoolQuery::new().must(knn.clone()).should(neural).into();
        assert!(!tree.is_fully_resolved());
        assert!(QueryNode::from(BoolQuery::new().must(knn)).is_fully_resolved());
    }

    #[test]
    fn test_bytes_prefix_is_query_name() {
        let node: QueryNode = EmbeddingQuery::new("d", "m", "f").into();
        let bytes = node.to_bytes().unwrap();
        assert_eq!(&bytes[..10], &[0, 0, 0, 6, b'n', b'e', b'u', b'r', b'a', b'l']);
        assert_eq!(QueryNode::from_bytes(&bytes).unwrap(), node);
    }

    #[test]
    fn test_from_bytes_unknown_name() {
        let mut out = StreamOutput::new();
        out.write_string("match").unwrap();
        let err = QueryNode::from_bytes(&out.into_bytes()).unwrap_err();
        assert!(matches!(err, Error::Wire(_)));
    }

    #[test]
    fn test_from_bytes_trailing() {
        let node: QueryNode = KnnQuery::new("f", vec![1.0], 1).into();
        let mut bytes = node.to_bytes().unwrap().to_vec();
        bytes.push(0);
        assert!(QueryNode::from_bytes(&bytes).is_err());
    }
}
