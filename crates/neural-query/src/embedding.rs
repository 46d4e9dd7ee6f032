//! Embedding query: text that becomes a k-NN query once a model embeds it.
//!
//! Lifecycle of one query lineage:
//!
//! ```text
//!   Unresolved ──rewrite──▶ Pending ──action sets vector──▶ Settled
//!        │                    ▲  │                              │
//!        │                    └──┘ rewrite (not yet set)        │ rewrite
//!        │                                                      ▼
//!        └──────────── constructed with a vector ────────▶ Terminal ──▶ KnnQuery
//! ```
//!
//! Only the `Unresolved` rewrite registers work with the [`RewriteContext`],
//! and it hands the resulting `Pending` node a fresh [`DeferredValue`]. Clones
//! of a pending node share that value, so the model is invoked once per
//! lineage no matter how many passes or copies the driver makes.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use neural_core::Result;
use serde_json::{Value, json};

use crate::context::RewriteContext;
use crate::deferred::DeferredValue;
use crate::knn::{KnnQuery, same_vector};
use crate::node::{QueryNode, Rewrite};
use crate::parse::{DEFAULT_K, as_object, k_field, required_string, validate_k};
use crate::wire::{StreamInput, StreamOutput};

/// Input field holding the text to embed.
pub const DOC_FIELD: &str = "doc";
/// Input field naming the inference model.
pub const MODEL_ID_FIELD: &str = "model_id";
/// Input field naming the target vector field.
pub const KNN_VECTOR_FIELD: &str = "knn_vector_field";
/// Input field holding the neighbor count.
pub const K_FIELD: &str = "k";

/// Where an embedding query is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteState {
    /// No vector and no inference registered.
    Unresolved,
    /// Inference registered, result not yet available.
    Pending,
    /// Inference finished, result not yet consumed.
    Settled,
    /// Vector known; the next rewrite yields a [`KnnQuery`].
    Terminal,
}

#[derive(Debug, Clone)]
enum Resolution {
    Unresolved,
    Pending(Arc<DeferredValue<Vec<f32>>>),
    Resolved(Vec<f32>),
}

impl PartialEq for Resolution {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unresolved, Self::Unresolved) => true,
            (Self::Pending(a), Self::Pending(b)) => Arc::ptr_eq(a, b),
            (Self::Resolved(a), Self::Resolved(b)) => same_vector(a, b),
            _ => false,
        }
    }
}

/// A text query resolved to a vector by a remote embedding model.
///
/// Equality covers the four input parameters plus the resolution: two
/// pending queries are equal only when they wait on the same deferred value.
/// Hashing covers the four parameters only.
#[derive(Debug, Clone)]
pub struct EmbeddingQuery {
    doc: String,
    model_id: String,
    knn_vector_field: String,
    k: u32,
    resolution: Resolution,
}

impl EmbeddingQuery {
    /// Query name in structured input and on the wire.
    pub const NAME: &'static str = "neural";

    /// Default neighbor count.
    pub const DEFAULT_K: u32 = DEFAULT_K;

    /// Create an unresolved query with the default neighbor count.
    pub fn new(
        doc: impl Into<String>,
        model_id: impl Into<String>,
        knn_vector_field: impl Into<String>,
    ) -> Self {
        Self {
            doc: doc.into(),
            model_id: model_id.into(),
            knn_vector_field: knn_vector_field.into(),
            k: DEFAULT_K,
            resolution: Resolution::Unresolved,
        }
    }

    /// Set the neighbor count. Fails unless `k > 0`.
    pub fn with_k(mut self, k: i64) -> Result<Self> {
        self.k = validate_k(Self::NAME, k)?;
        Ok(self)
    }

    /// Supply the vector up front, skipping inference entirely.
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.resolution = Resolution::Resolved(vector);
        self
    }

    /// Text to embed.
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Inference model identifier.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Target vector field of the resulting k-NN query.
    pub fn knn_vector_field(&self) -> &str {
        &self.knn_vector_field
    }

    /// Neighbor count.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RewriteState {
        match &self.resolution {
            Resolution::Unresolved => RewriteState::Unresolved,
            Resolution::Pending(slot) if slot.is_set() => RewriteState::Settled,
            Resolution::Pending(_) => RewriteState::Pending,
            Resolution::Resolved(_) => RewriteState::Terminal,
        }
    }

    /// The vector, once known.
    pub fn vector(&self) -> Option<&[f32]> {
        match &self.resolution {
            Resolution::Unresolved => None,
            Resolution::Pending(slot) => slot.try_get().map(Vec::as_slice),
            Resolution::Resolved(vector) => Some(vector),
        }
    }

    fn to_knn(&self, vector: &[f32]) -> QueryNode {
        QueryNode::Knn(KnnQuery::new(
            self.knn_vector_field.clone(),
            vector.to_vec(),
            self.k,
        ))
    }

    /// Parse the body of a `neural` query.
    ///
    /// Accepts either the inner object or one wrapped as `{"neural": {...}}`.
    /// Unknown fields are ignored; `null` counts as absent.
    pub fn from_json(value: &Value) -> Result<Self> {
        let mut obj = as_object(value, Self::NAME)?;
        if obj.len() == 1
            && let Some(inner @ Value::Object(_)) = obj.get(Self::NAME)
        {
            obj = as_object(inner, Self::NAME)?;
        }

        for key in obj.keys() {
            if ![DOC_FIELD, MODEL_ID_FIELD, KNN_VECTOR_FIELD, K_FIELD].contains(&key.as_str()) {
                log::debug!("[{}] ignoring unknown field '{key}'", Self::NAME);
            }
        }

        let doc = required_string(obj, Self::NAME, DOC_FIELD)?;
        let model_id = required_string(obj, Self::NAME, MODEL_ID_FIELD)?;
        let knn_vector_field = required_string(obj, Self::NAME, KNN_VECTOR_FIELD)?;
        let k = k_field(obj, Self::NAME)?;

        Ok(Self {
            doc,
            model_id,
            knn_vector_field,
            k,
            resolution: Resolution::Unresolved,
        })
    }

    /// Render the input parameters. Resolution state is not rendered.
    pub fn to_json(&self) -> Value {
        json!({
            Self::NAME: {
                DOC_FIELD: self.doc,
                MODEL_ID_FIELD: self.model_id,
                KNN_VECTOR_FIELD: self.knn_vector_field,
                K_FIELD: self.k,
            }
        })
    }

    /// Write the four input parameters.
    pub fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.doc)?;
        out.write_string(&self.model_id)?;
        out.write_string(&self.knn_vector_field)?;
        out.write_u32(self.k);
        Ok(())
    }

    /// Read a query written by [`EmbeddingQuery::write_to`]. The result is
    /// always unresolved.
    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let doc = input.read_string()?;
        let model_id = input.read_string()?;
        let knn_vector_field = input.read_string()?;
        let k = validate_k(Self::NAME, i64::from(input.read_u32()?))?;
        Ok(Self {
            doc,
            model_id,
            knn_vector_field,
            k,
            resolution: Resolution::Unresolved,
        })
    }
}

impl Rewrite for EmbeddingQuery {
    fn rewrite(&self, ctx: &mut RewriteContext) -> Result<QueryNode> {
        match &self.resolution {
            Resolution::Resolved(vector) => Ok(self.to_knn(vector)),
            Resolution::Pending(slot) => match slot.try_get() {
                Some(vector) => Ok(self.to_knn(vector)),
                None => Ok(QueryNode::Embedding(self.clone())),
            },
            Resolution::Unresolved => {
                let slot = Arc::new(DeferredValue::new());
                let target = Arc::clone(&slot);
                let model_id = self.model_id.clone();
                let doc = self.doc.clone();

                log::debug!(
                    "[{}] registering inference for model '{model_id}'",
                    Self::NAME
                );
                ctx.register_async_action(move |service| async move {
                    let vector = service.embed(&model_id, &doc).await?;
                    target.set(vector)
                });

                Ok(QueryNode::Embedding(Self {
                    resolution: Resolution::Pending(slot),
                    ..self.clone()
                }))
            }
        }
    }
}

impl PartialEq for EmbeddingQuery {
    fn eq(&self, other: &Self) -> bool {
        self.doc == other.doc
            && self.model_id == other.model_id
            && self.knn_vector_field == other.knn_vector_field
            && self.k == other.k
            && self.resolution == other.resolution
    }
}

impl Hash for EmbeddingQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.doc.hash(state);
        self.model_id.hash(state);
        self.knn_vector_field.hash(state);
        self.k.hash(state);
    }
}
