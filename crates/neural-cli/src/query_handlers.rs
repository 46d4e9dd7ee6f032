//! Handlers for the query commands: `rewrite`, `encode` and `decode`.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use neural_core::{Error, Result};
use neural_inference::{InferenceClient, MockInferenceClient};
use neural_query::{QueryNode, RewriteConfig, RewriteDriver};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::NeuralConfig;

/// Options for the `rewrite` command.
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Query file, or `-` for stdin.
    pub file: String,
    /// Use the deterministic local model.
    pub offline: Option<usize>,
    /// Print compact JSON.
    pub compact: bool,
}

/// Read a query document from a file or stdin.
pub async fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        return read_document(tokio::io::stdin()).await;
    }
    tokio::fs::read_to_string(file)
        .await
        .map_err(|e| Error::io_with_path(e, file))
}

async fn read_document<R: AsyncRead + Unpin>(mut reader: R) -> Result<String> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf).await?;
    Ok(buf)
}

/// Parse `input` and drive it to its terminal form.
pub async fn rewrite_document(
    client: Arc<dyn InferenceClient>,
    config: RewriteConfig,
    input: &str,
) -> Result<QueryNode> {
    let query = QueryNode::from_json_str(input)?;
    let driver = RewriteDriver::from_config(client, config)?;
    driver.rewrite(query).await
}

/// Render a query as JSON.
pub fn render(node: &QueryNode, compact: bool) -> Result<String> {
    let value = node.to_json();
    let rendered = if compact {
        serde_json::to_string(&value)
    } else {
        serde_json::to_string_pretty(&value)
    };
    rendered.map_err(|e| Error::serialization(e.to_string()))
}

/// Encode a JSON query document as base64 wire bytes.
pub fn encode_document(input: &str) -> Result<String> {
    let query = QueryNode::from_json_str(input)?;
    Ok(STANDARD.encode(query.to_bytes()?))
}

/// Decode base64 wire bytes into a query.
pub fn decode_wire(input: &str) -> Result<QueryNode> {
    let bytes = STANDARD
        .decode(input.trim())
        .map_err(|e| Error::wire(format!("invalid base64: {e}")))?;
    QueryNode::from_bytes(&bytes)
}

/// Run the `rewrite` command.
pub async fn handle_rewrite(config: &NeuralConfig, options: RewriteOptions) -> Result<()> {
    let input = read_input(&options.file).await?;

    let client: Arc<dyn InferenceClient> = match options.offline {
        Some(dimension) => {
            log::info!("Using offline deterministic embeddings ({dimension} dims)");
            Arc::new(MockInferenceClient::deterministic(dimension))
        }
        None => config.inference_client()?,
    };

    let result = rewrite_document(client, config.rewrite.clone(), &input).await?;
    println!("{}", render(&result, options.compact)?);
    Ok(())
}

/// Run the `encode` command.
pub async fn handle_encode(file: &str) -> Result<()> {
    let input = read_input(file).await?;
    println!("{}", encode_document(&input)?);
    Ok(())
}

/// Run the `decode` command.
pub fn handle_decode(input: &str) -> Result<()> {
    let node = decode_wire(input)?;
    println!("{}", render(&node, false)?);
    Ok(())
}
