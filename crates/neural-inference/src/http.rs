//! HTTP inference client for ml-commons compatible predict endpoints.

use async_trait::async_trait;
use std::time::Duration;

use neural_core::{Error, Result};

use crate::client::InferenceClient;
use crate::types::{ModelOutput, PredictRequest};

/// Inference client that posts to `/_plugins/_ml/_predict/{function}/{model_id}`.
pub struct HttpInferenceClient {
    endpoint: String,
    auth_header: Option<String>,
    client: reqwest::Client,
}

impl HttpInferenceClient {
    /// Creates a new HTTP client.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL of the cluster (e.g., "http://localhost:9200")
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            auth_header: None,
            client,
        })
    }

    /// Sets the `Authorization` header sent with every request.
    pub fn with_auth_header(mut self, value: impl Into<String>) -> Self {
        self.auth_header = Some(value.into());
        self
    }

    /// The predict URL for a model and request.
    pub fn predict_url(&self, model_id: &str, request: &PredictRequest) -> String {
        format!(
            "{}/_plugins/_ml/_predict/{}/{}",
            self.endpoint,
            request.function.as_path(),
            model_id
        )
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn predict(&self, model_id: &str, request: PredictRequest) -> Result<ModelOutput> {
        let url = self.predict_url(model_id, &request);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(auth) = &self.auth_header {
            builder = builder.header("authorization", auth);
        }

        let response = builder.send().await.map_err(|e| {
            let transient = e.is_timeout() || e.is_connect();
            Error::inference_with_source(format!("Failed to call {url}"), e, transient)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("Predict API error {status}: {error_text}");
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                Error::inference_transient(message)
            } else {
                Error::inference(message)
            });
        }

        response
            .json::<ModelOutput>()
            .await
            .map_err(|e| Error::inference_with_source("Failed to parse predict response", e, false))
    }

    fn name(&self) -> &str {
        "http"
    }
}
