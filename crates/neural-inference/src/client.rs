//! Inference client abstraction.

use async_trait::async_trait;
use neural_core::Result;

use crate::types::{ModelOutput, PredictRequest};

/// Abstraction over model inference backends (ml-commons, mocks, etc.).
///
/// This trait allows swapping inference transports without touching the
/// query rewrite logic. Implementations report transport and model errors
/// as [`neural_core::Error::InferenceInvocation`] and never retry on their
/// own; wrap them in [`crate::RetryingClient`] for that.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Runs `request` against the model identified by `model_id`.
    async fn predict(&self, model_id: &str, request: PredictRequest) -> Result<ModelOutput>;

    /// The client name for diagnostics.
    fn name(&self) -> &str;
}
