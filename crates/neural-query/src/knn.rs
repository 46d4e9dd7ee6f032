//! Terminal k-nearest-neighbor query.

use neural_core::{Error, Result};
use serde_json::{Value, json};

use crate::context::RewriteContext;
use crate::node::{QueryNode, Rewrite};
use crate::parse::{as_object, k_field, validate_k};
use crate::wire::{StreamInput, StreamOutput};

/// A vector similarity query over an indexed field.
///
/// This is what an embedding query becomes once its vector is known. It
/// needs no further rewriting: `rewrite` returns an equal copy.
///
/// Vectors compare by bit pattern, so a query always equals its own copy
/// even when the vector holds NaN.
#[derive(Debug, Clone)]
pub struct KnnQuery {
    field: String,
    vector: Vec<f32>,
    k: u32,
}

/// Element-wise bit equality of two vectors.
pub(crate) fn same_vector(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl PartialEq for KnnQuery {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.k == other.k && same_vector(&self.vector, &other.vector)
    }
}

impl KnnQuery {
    /// Query name in structured input.
    pub const NAME: &'static str = "knn";

    /// Create a query for `k` neighbors of `vector` in `field`.
    pub fn new(field: impl Into<String>, vector: Vec<f32>, k: u32) -> Self {
        Self {
            field: field.into(),
            vector,
            k,
        }
    }

    /// Target vector field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Query vector.
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Number of neighbors.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Parse the body of a `knn` query: `{"<field>": {"vector": [...], "k": n}}`.
    pub fn from_json(body: &Value) -> Result<Self> {
        let obj = as_object(body, Self::NAME)?;
        let mut fields = obj.iter();
        let (field, params) = match (fields.next(), fields.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(Error::parse(
                    "[knn] query must name exactly one vector field",
                ));
            }
        };

        let params = as_object(params, Self::NAME)?;
        let vector = params
            .get("vector")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::missing_field(Self::NAME, "vector"))?
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| Error::parse(format!("[knn] vector element {v} is not a number")))
            })
            .collect::<Result<Vec<f32>>>()?;

        Ok(Self::new(field.clone(), vector, k_field(params, Self::NAME)?))
    }

    /// Render as structured output.
    pub fn to_json(&self) -> Value {
        json!({
            Self::NAME: {
                self.field.as_str(): {
                    "vector": self.vector,
                    "k": self.k,
                }
            }
        })
    }

    /// Write the wire form: field, vector, k.
    pub fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.field)?;
        out.write_f32_slice(&self.vector)?;
        out.write_u32(self.k);
        Ok(())
    }

    /// Read the wire form written by [`KnnQuery::write_to`].
    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let field = input.read_string()?;
        let vector = input.read_f32_vec()?;
        let k = validate_k(Self::NAME, i64::from(input.read_u32()?))?;
        Ok(Self::new(field, vector, k))
    }
}

impl Rewrite for KnnQuery {
    fn rewrite(&self, _ctx: &mut RewriteContext) -> Result<QueryNode> {
        Ok(QueryNode::Knn(self.clone()))
    }
}
