//! Retry wrapper for inference clients.
//!
//! Query rewriting never retries a failed predict call. Deployments that
//! want retries wrap their client here, so the policy stays with the
//! collaborator that owns the transport.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;

use neural_core::{Error, Result};

use crate::client::InferenceClient;
use crate::types::{ModelOutput, PredictRequest};

/// Wraps an inference client with exponential-backoff retries.
pub struct RetryingClient {
    inner: Arc<dyn InferenceClient>,
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryingClient {
    /// Creates a new retry wrapper with default settings.
    ///
    /// Default settings:
    /// - Max attempts: 3
    /// - Initial delay: 200 milliseconds
    /// - Max delay: 5 seconds
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            inner: client,
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Sets the maximum number of retries after the first attempt.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the initial delay between retries.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Determines if an error should be retried.
    fn should_retry(error: &Error) -> bool {
        error.is_retryable()
    }
}

#[async_trait]
impl InferenceClient for RetryingClient {
    async fn predict(&self, model_id: &str, request: PredictRequest) -> Result<ModelOutput> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts as usize);

        let client = self.inner.clone();

        (|| async { client.predict(model_id, request.clone()).await })
            .retry(backoff)
            .when(Self::should_retry)
            .notify(|err: &Error, delay: Duration| {
                log::warn!(
                    "Retrying predict on model '{}' in {:?}: {}",
                    model_id,
                    delay,
                    err
                );
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
