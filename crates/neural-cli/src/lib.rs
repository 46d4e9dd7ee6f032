//! Command-line interface for neural query rewriting.
//!
//! The `neural` binary parses a query document, resolves every `neural`
//! query through the configured inference service and prints the resulting
//! k-NN query. It also converts queries to and from their wire form and
//! manages its TOML configuration file.

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod query_handlers;

pub use app::{init_logging, run};
pub use cli::{CliArgs, Command, ConfigAction, ConfigCommand};
pub use config::{InferenceConfig, NeuralConfig, RetryConfig};
