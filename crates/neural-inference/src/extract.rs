//! Embedding extraction strategies.
//!
//! A model response may carry several output tensors. A [`TensorExtractor`]
//! decides which one is the embedding, and also tells the service which
//! [`ResultFilter`] to send so the model returns only what is needed.
//!
//! # Strategies
//!
//! - [`NamedTensorExtractor`]: select by output name (default
//!   `sentence_embedding`)
//! - [`PositionalTensorExtractor`]: select by output index, for models whose
//!   outputs carry no names. Positions only mean something in an unfiltered
//!   response, so this strategy asks for every output.

use neural_core::{Error, Result};

use crate::types::{ModelOutput, ModelTensor, ResultFilter};

/// Output name produced by sentence-transformer models.
pub const SENTENCE_EMBEDDING: &str = "sentence_embedding";

/// Selects the embedding tensor from a model response.
pub trait TensorExtractor: Send + Sync {
    /// The filter to attach to the predict request.
    fn filter(&self) -> ResultFilter;

    /// Pull the embedding out of `output`.
    ///
    /// Fails with [`Error::NoVectorProduced`] rather than returning an empty
    /// vector when nothing matches.
    fn extract(&self, model_id: &str, output: &ModelOutput) -> Result<Vec<f32>>;
}

/// Convert a matched tensor, rejecting missing, empty or non-finite payloads.
fn tensor_to_vector(model_id: &str, tensor: &ModelTensor, selector: &str) -> Result<Vec<f32>> {
    let vector = match tensor.to_f32_vec() {
        Some(vector) if !vector.is_empty() => vector,
        _ => {
            return Err(Error::no_vector(
                model_id,
                format!("{selector} has no numeric data"),
            ));
        }
    };
    if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
        return Err(Error::no_vector(
            model_id,
            format!("{selector} has a non-finite value at index {index}"),
        ));
    }
    Ok(vector)
}

// ============================================================================
// Named
// ============================================================================

/// Selects the output tensor with a given name.
///
/// When a model emits the same name more than once the last occurrence wins.
#[derive(Debug, Clone)]
pub struct NamedTensorExtractor {
    name: String,
}

impl NamedTensorExtractor {
    /// Create an extractor for the given output name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The output name this extractor matches.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for NamedTensorExtractor {
    fn default() -> Self {
        Self::new(SENTENCE_EMBEDDING)
    }
}

impl TensorExtractor for NamedTensorExtractor {
    fn filter(&self) -> ResultFilter {
        ResultFilter::named(self.name.clone())
    }

    fn extract(&self, model_id: &str, output: &ModelOutput) -> Result<Vec<f32>> {
        let selector = format!("tensor '{}'", self.name);
        let tensor = output
            .first()
            .and_then(|tensors| {
                tensors
                    .tensors
                    .iter()
                    .rev()
                    .find(|t| t.name.as_deref() == Some(self.name.as_str()))
            })
            .ok_or_else(|| Error::no_vector(model_id, format!("no {selector} in response")))?;

        tensor_to_vector(model_id, tensor, &selector)
    }
}

// ============================================================================
// Positional
// ============================================================================

/// Selects the output tensor at a given position.
///
/// The predict request carries no position filter: a filtered response
/// would renumber its outputs, so the index is applied to the full list.
#[derive(Debug, Clone, Copy)]
pub struct PositionalTensorExtractor {
    position: usize,
}

impl PositionalTensorExtractor {
    /// Create an extractor for the given output position.
    pub fn new(position: usize) -> Self {
        Self { position }
    }
}

impl TensorExtractor for PositionalTensorExtractor {
    fn filter(&self) -> ResultFilter {
        ResultFilter::default()
    }

    fn extract(&self, model_id: &str, output: &ModelOutput) -> Result<Vec<f32>> {
        let selector = format!("tensor #{}", self.position);
        let tensors = output
            .first()
            .ok_or_else(|| Error::no_vector(model_id, "response has no outputs"))?;

        let tensor = tensors.tensors.get(self.position).ok_or_else(|| {
            Error::no_vector(
                model_id,
                format!(
                    "no {selector} in response with {} output(s)",
                    tensors.tensors.len()
                ),
            )
        })?;

        tensor_to_vector(model_id, tensor, &selector)
    }
}
