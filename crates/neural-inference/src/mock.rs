//! Mock inference client for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use neural_core::{Error, Result};

use crate::client::InferenceClient;
use crate::extract::SENTENCE_EMBEDDING;
use crate::types::{ModelOutput, ModelTensor, PredictRequest};

/// A predict call observed by [`MockInferenceClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Model the call targeted.
    pub model_id: String,
    /// The request as received.
    pub request: PredictRequest,
}

/// What the mock answers for texts without a canned output.
#[derive(Debug, Clone)]
enum Fallback {
    Unknown,
    Deterministic(usize),
    Failure(String),
}

#[derive(Debug)]
struct MockState {
    calls: Mutex<Vec<RecordedCall>>,
    count: AtomicUsize,
    transient_failures: AtomicUsize,
}

/// Mock inference client that returns canned outputs.
///
/// Useful for testing without a deployed model. Clones share the call log,
/// so a test can hand one clone to the code under test and inspect another.
#[derive(Debug, Clone)]
pub struct MockInferenceClient {
    outputs: HashMap<String, ModelOutput>,
    fallback: Fallback,
    latency: Option<Duration>,
    state: Arc<MockState>,
}

impl MockInferenceClient {
    /// Creates a mock with no canned outputs.
    ///
    /// Unknown texts fail with a non-retryable inference error.
    ///
    /// # Examples
    ///
    /// ```
    /// use neural_inference::MockInferenceClient;
    ///
    /// let client = MockInferenceClient::new()
    ///     .with_embedding("red shoes", vec![0.1, 0.2, 0.3]);
    /// assert_eq!(client.call_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            fallback: Fallback::Unknown,
            latency: None,
            state: Arc::new(MockState {
                calls: Mutex::new(Vec::new()),
                count: AtomicUsize::new(0),
                transient_failures: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates a mock that embeds any text deterministically.
    pub fn deterministic(dimension: usize) -> Self {
        Self {
            fallback: Fallback::Deterministic(dimension),
            ..Self::new()
        }
    }

    /// Answer `text` with a `sentence_embedding` tensor holding `vector`.
    pub fn with_embedding(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        let data = vector.into_iter().map(f64::from).collect();
        self.with_output(
            text,
            ModelOutput::single(vec![ModelTensor::new(SENTENCE_EMBEDDING, data)]),
        )
    }

    /// Answer `text` with an arbitrary model output.
    pub fn with_output(mut self, text: impl Into<String>, output: ModelOutput) -> Self {
        self.outputs.insert(text.into(), output);
        self
    }

    /// Fail every call whose text has no canned output.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fallback = Fallback::Failure(message.into());
        self
    }

    /// Fail the next `count` calls with a retryable error.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.state.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of predict calls received so far.
    pub fn call_count(&self) -> usize {
        self.state.count.load(Ordering::SeqCst)
    }

    /// Snapshot of the predict calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, model_id: &str, request: &PredictRequest) {
        self.state.count.fetch_add(1, Ordering::SeqCst);
        self.state
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                model_id: model_id.to_string(),
                request: request.clone(),
            });
    }

    fn take_transient_failure(&self) -> bool {
        self.state
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockInferenceClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a deterministic unit vector from text.
///
/// Each component is derived from the text bytes, so the same input always
/// produces the same embedding.
pub fn deterministic_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut embedding = vec![0.0f32; dimension];
    let bytes = text.as_bytes();

    for (i, val) in embedding.iter_mut().enumerate() {
        let byte_val = if bytes.is_empty() {
            0u8
        } else {
            bytes[i % bytes.len()]
        };
        *val = ((byte_val as f32 + i as f32) % 256.0) / 256.0;
    }

    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in &mut embedding {
            *val /= norm;
        }
    }

    embedding
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn predict(&self, model_id: &str, request: PredictRequest) -> Result<ModelOutput> {
        self.record(model_id, &request);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.take_transient_failure() {
            return Err(Error::inference_transient("mock transient failure"));
        }

        let text = request.text_docs.first().map(String::as_str).unwrap_or("");
        if let Some(output) = self.outputs.get(text) {
            return Ok(output.clone());
        }

        match &self.fallback {
            Fallback::Deterministic(dimension) => {
                let data = deterministic_embedding(text, *dimension)
                    .into_iter()
                    .map(f64::from)
                    .collect();
                Ok(ModelOutput::single(vec![ModelTensor::new(
                    SENTENCE_EMBEDDING,
                    data,
                )]))
            }
            Fallback::Failure(message) => Err(Error::inference(message.clone())),
            Fallback::Unknown => Err(Error::inference(format!(
                "mock has no output for model '{model_id}' and text \"{text}\""
            ))),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
