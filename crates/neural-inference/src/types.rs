//! Request and response types for model inference.
//!
//! The shapes mirror the ml-commons predict API: a request carries the input
//! documents plus a result filter, and the response is a list of per-input
//! tensor collections. Both serialize to the JSON bodies used on the wire.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

/// The inference function a model is invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum FunctionName {
    /// Dense text embedding.
    TextEmbedding,
}

impl FunctionName {
    /// Lower-case path segment used by the predict endpoint.
    pub fn as_path(&self) -> &'static str {
        match self {
            Self::TextEmbedding => "text_embedding",
        }
    }
}

/// Controls which model outputs the inference service returns.
///
/// Models may emit several outputs (e.g. `input_ids` next to
/// `sentence_embedding`); `target_response` narrows by name and
/// `target_response_positions` by index. `None` means "everything".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    /// Whether raw byte buffers are returned.
    #[serde(default)]
    pub return_bytes: bool,

    /// Whether numeric data arrays are returned.
    #[serde(default = "default_true")]
    pub return_number: bool,

    /// Output names to keep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_response: Option<Vec<String>>,

    /// Output positions to keep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_response_positions: Option<Vec<usize>>,
}

fn default_true() -> bool {
    true
}

impl Default for ResultFilter {
    fn default() -> Self {
        Self {
            return_bytes: false,
            return_number: true,
            target_response: None,
            target_response_positions: None,
        }
    }
}

impl ResultFilter {
    /// Keep only the outputs with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target_response: Some(vec![name.into()]),
            ..Default::default()
        }
    }
}

/// A predict call's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Function the model runs; encoded in the endpoint path, not the body.
    #[serde(skip, default = "default_function")]
    pub function: FunctionName,

    /// Input documents, one output entry is produced per document.
    pub text_docs: Vec<String>,

    /// Output filter.
    #[serde(flatten)]
    pub filter: ResultFilter,
}

fn default_function() -> FunctionName {
    FunctionName::TextEmbedding
}

impl PredictRequest {
    /// Build a text-embedding request for a single document.
    pub fn text_embedding(text: impl Into<String>, filter: ResultFilter) -> Self {
        Self {
            function: FunctionName::TextEmbedding,
            text_docs: vec![text.into()],
            filter,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A single named numeric output of a model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelTensor {
    /// Output name, absent for positional-only models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Element type reported by the model (e.g. `FLOAT32`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Tensor shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<i64>>,

    /// Flattened numeric payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<f64>>,
}

impl ModelTensor {
    /// Create a named float tensor.
    pub fn new(name: impl Into<String>, data: Vec<f64>) -> Self {
        let len = data.len() as i64;
        Self {
            name: Some(name.into()),
            data_type: Some("FLOAT32".to_string()),
            shape: Some(vec![len]),
            data: Some(data),
        }
    }

    /// Create an unnamed float tensor.
    pub fn unnamed(data: Vec<f64>) -> Self {
        Self {
            name: None,
            ..Self::new("", data)
        }
    }

    /// Convert the numeric payload to `f32`, element-wise.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        self.data
            .as_ref()
            .map(|data| data.iter().map(|v| *v as f32).collect())
    }
}

/// Outputs produced for one input document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelTensors {
    /// The tensors, in model output order.
    #[serde(rename = "output", default)]
    pub tensors: Vec<ModelTensor>,
}

impl ModelTensors {
    /// Create a tensor collection.
    pub fn new(tensors: Vec<ModelTensor>) -> Self {
        Self { tensors }
    }
}

/// A predict call's output: one entry per input document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelOutput {
    /// Per-document results.
    #[serde(rename = "inference_results", default)]
    pub results: Vec<ModelTensors>,
}

impl ModelOutput {
    /// Output for a single document.
    pub fn single(tensors: Vec<ModelTensor>) -> Self {
        Self {
            results: vec![ModelTensors::new(tensors)],
        }
    }

    /// The first document's tensors, if any.
    pub fn first(&self) -> Option<&ModelTensors> {
        self.results.first()
    }
}
