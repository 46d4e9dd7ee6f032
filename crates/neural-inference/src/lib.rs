//! Model inference for neural queries.
//!
//! This crate defines the [`InferenceClient`] capability the query rewrite
//! depends on, the request/response shapes it speaks, and the strategies
//! used to pull an embedding vector out of a model response.
//!
//! # Features
//!
//! - `http` (default): enable [`HttpInferenceClient`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     neural-inference                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  InferenceClient trait                                      │
//! │  ├── MockInferenceClient (always available)                 │
//! │  ├── RetryingClient (backoff wrapper)                       │
//! │  └── HttpInferenceClient (feature: http)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TensorExtractor trait                                      │
//! │  ├── NamedTensorExtractor ("sentence_embedding")            │
//! │  └── PositionalTensorExtractor                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  InferenceService (client + extractor → Vec<f32>)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use neural_inference::{InferenceService, MockInferenceClient};
//! use std::sync::Arc;
//!
//! let client = Arc::new(MockInferenceClient::deterministic(384));
//! let service = InferenceService::new(client);
//!
//! let vector = service.embed("model-1", "red shoes").await?;
//! ```

pub mod client;
pub mod extract;
pub mod mock;
pub mod retry;
pub mod service;
pub mod types;

#[cfg(feature = "http")]
pub mod http;

// Re-exports — traits
pub use client::InferenceClient;
pub use extract::{
    NamedTensorExtractor, PositionalTensorExtractor, SENTENCE_EMBEDDING, TensorExtractor,
};

// Re-exports — types
pub use types::{FunctionName, ModelOutput, ModelTensor, ModelTensors, PredictRequest, ResultFilter};

// Re-exports — clients and service
pub use mock::{MockInferenceClient, RecordedCall, deterministic_embedding};
pub use retry::RetryingClient;
pub use service::InferenceService;

#[cfg(feature = "http")]
pub use http::HttpInferenceClient;
