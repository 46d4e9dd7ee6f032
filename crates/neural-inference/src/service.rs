//! Text embedding on top of an inference client.
//!
//! [`InferenceService`] pairs a transport ([`InferenceClient`]) with a
//! response strategy ([`TensorExtractor`]). Query rewriting depends only on
//! this pairing, so new backends plug in without touching the rewrite code.

use std::sync::Arc;

use neural_core::Result;

use crate::client::InferenceClient;
use crate::extract::{NamedTensorExtractor, TensorExtractor};
use crate::types::PredictRequest;

/// Embeds text by calling a model and extracting the embedding tensor.
#[derive(Clone)]
pub struct InferenceService {
    client: Arc<dyn InferenceClient>,
    extractor: Arc<dyn TensorExtractor>,
}

impl InferenceService {
    /// Create a service that extracts the `sentence_embedding` output.
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            extractor: Arc::new(NamedTensorExtractor::default()),
        }
    }

    /// Replace the extraction strategy.
    pub fn with_extractor(mut self, extractor: Arc<dyn TensorExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<dyn InferenceClient> {
        &self.client
    }

    /// Embed `text` with the model identified by `model_id`.
    ///
    /// Issues exactly one predict call. Failures are returned unchanged so
    /// the caller sees the originating message.
    pub async fn embed(&self, model_id: &str, text: &str) -> Result<Vec<f32>> {
        let request = PredictRequest::text_embedding(text, self.extractor.filter());

        let output = self
            .client
            .predict(model_id, request)
            .await
            .inspect_err(|e| {
                log::error!(
                    "Failed to call {} for model '{}': {}",
                    self.client.name(),
                    model_id,
                    e
                );
            })?;

        let vector = self.extractor.extract(model_id, &output)?;
        log::debug!(
            "Generated {}-dim vector for \"{}\" with model '{}'",
            vector.len(),
            text,
            model_id
        );
        Ok(vector)
    }
}

impl std::fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceService")
            .field("client", &self.client.name())
            .finish_non_exhaustive()
    }
}
