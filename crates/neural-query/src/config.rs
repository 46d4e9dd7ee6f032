//! Rewrite driver configuration.

use std::sync::Arc;

use neural_core::{Error, Result};
use neural_inference::{
    NamedTensorExtractor, PositionalTensorExtractor, SENTENCE_EMBEDDING, TensorExtractor,
};
use serde::{Deserialize, Serialize};

/// Rewrite driver configuration.
///
/// Bounds the driver loop and selects how embeddings are pulled out of model
/// responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Maximum number of async rounds (rewrite to fixed point, then run actions).
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Maximum rewrite passes within one round.
    #[serde(default = "default_max_passes")]
    pub max_passes_per_round: usize,

    /// Name of the model output holding the embedding.
    #[serde(default = "default_tensor_name")]
    pub tensor_name: String,

    /// Select the embedding by output position instead of by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensor_position: Option<usize>,
}

fn default_max_rounds() -> usize {
    16
}

fn default_max_passes() -> usize {
    32
}

fn default_tensor_name() -> String {
    SENTENCE_EMBEDDING.to_string()
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_passes_per_round: default_max_passes(),
            tensor_name: default_tensor_name(),
            tensor_position: None,
        }
    }
}

impl RewriteConfig {
    /// Check that the bounds allow at least one pass.
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(Error::config("rewrite.max_rounds must be at least 1"));
        }
        if self.max_passes_per_round == 0 {
            return Err(Error::config(
                "rewrite.max_passes_per_round must be at least 1",
            ));
        }
        if self.tensor_position.is_none() && self.tensor_name.trim().is_empty() {
            return Err(Error::config("rewrite.tensor_name must not be empty"));
        }
        Ok(())
    }

    /// The extraction strategy this configuration selects.
    pub fn extractor(&self) -> Arc<dyn TensorExtractor> {
        match self.tensor_position {
            Some(position) => Arc::new(PositionalTensorExtractor::new(position)),
            None => Arc::new(NamedTensorExtractor::new(self.tensor_name.clone())),
        }
    }
}
