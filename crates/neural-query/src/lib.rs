//! Asynchronous rewrite of text queries into k-NN vector queries.
//!
//! A `neural` query names some text, an embedding model and a vector field.
//! Rewriting it asks the model for an embedding without blocking the
//! rewrite pass: the query registers one inference action, hands back a
//! pending copy that shares a [`DeferredValue`], and becomes a [`KnnQuery`]
//! on the first pass after the value arrives.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       neural-query                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  QueryNode (Embedding | Knn | Bool)                         │
//! │  ├── EmbeddingQuery  Unresolved → Pending → Settled → Knn   │
//! │  ├── KnnQuery        terminal                               │
//! │  └── BoolQuery       rewrites every clause                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RewriteContext (async actions registered per round)        │
//! │  DeferredValue (single assignment, non-blocking reads)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RewriteDriver (passes to fixed point, then run actions)    │
//! │  Wire form (StreamOutput / StreamInput)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use neural_inference::{InferenceService, MockInferenceClient};
//! use neural_query::{QueryNode, RewriteDriver};
//! use std::sync::Arc;
//!
//! let query = QueryNode::from_json_str(
//!     r#"{"neural": {"doc": "red shoes", "model_id": "m1", "knn_vector_field": "embedding", "k": 5}}"#,
//! )?;
//!
//! let service = InferenceService::new(Arc::new(MockInferenceClient::deterministic(384)));
//! let knn = RewriteDriver::new(service).rewrite(query).await?;
//! println!("{}", knn.to_json());
//! ```

pub mod boolean;
pub mod config;
pub mod context;
pub mod deferred;
pub mod driver;
pub mod embedding;
pub mod knn;
pub mod node;
pub mod wire;

mod parse;

// Re-exports — query tree
pub use boolean::BoolQuery;
pub use embedding::{EmbeddingQuery, RewriteState};
pub use knn::KnnQuery;
pub use node::{QueryNode, Rewrite};
pub use parse::DEFAULT_K;

// Re-exports — rewrite machinery
pub use config::RewriteConfig;
pub use context::{ActionFuture, RewriteContext};
pub use deferred::DeferredValue;
pub use driver::RewriteDriver;
pub use wire::{StreamInput, StreamOutput};
