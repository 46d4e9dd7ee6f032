//! Rewrite driver: runs rewrite passes and async actions to a fixed point.

use std::sync::Arc;

use neural_core::{Error, Result};
use neural_inference::{InferenceClient, InferenceService};

use crate::config::RewriteConfig;
use crate::context::RewriteContext;
use crate::node::{QueryNode, Rewrite};

/// Drives a query tree from parsed input to its terminal form.
///
/// Each round rewrites the tree until a pass returns an equal tree, then
/// runs every action registered during the round. Rounds repeat until a
/// round registers nothing.
#[derive(Debug, Clone)]
pub struct RewriteDriver {
    service: InferenceService,
    config: RewriteConfig,
}

impl RewriteDriver {
    /// Create a driver with default bounds.
    pub fn new(service: InferenceService) -> Self {
        Self {
            service,
            config: RewriteConfig::default(),
        }
    }

    /// Create a driver from a client and configuration.
    pub fn from_config(client: Arc<dyn InferenceClient>, config: RewriteConfig) -> Result<Self> {
        config.validate()?;
        let service = InferenceService::new(client).with_extractor(config.extractor());
        Ok(Self { service, config })
    }

    /// Replace the loop bounds.
    pub fn with_config(mut self, config: RewriteConfig) -> Self {
        self.config = config;
        self
    }

    /// The inference service handed to registered actions.
    pub fn service(&self) -> &InferenceService {
        &self.service
    }

    /// Current configuration.
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite `query` until no further work remains.
    ///
    /// The first failing action aborts the rewrite with its error. The
    /// returned tree contains no embedding queries.
    pub async fn rewrite(&self, query: QueryNode) -> Result<QueryNode> {
        let mut current = query;

        for round in 1..=self.config.max_rounds {
            let mut ctx = RewriteContext::new();
            current = self.rewrite_round(current, &mut ctx)?;

            if !ctx.has_async_actions() {
                if !current.is_fully_resolved() {
                    return Err(Error::RewriteLimitExceeded(
                        "embedding query is pending with no inference registered".to_string(),
                    ));
                }
                log::debug!("Rewrite finished after {round} round(s)");
                return Ok(current);
            }

            let ran = ctx.execute_async_actions(&self.service).await?;
            log::debug!("Round {round}: completed {ran} async action(s)");
        }

        Err(Error::RewriteLimitExceeded(format!(
            "still registering async actions after {} rounds",
            self.config.max_rounds
        )))
    }

    fn rewrite_round(&self, query: QueryNode, ctx: &mut RewriteContext) -> Result<QueryNode> {
        let mut current = query;
        for _ in 0..self.config.max_passes_per_round {
            let next = current.rewrite(ctx)?;
            if next == current {
                return Ok(next);
            }
            current = next;
        }

        Err(Error::RewriteLimitExceeded(format!(
            "no fixed point after {} passes",
            self.config.max_passes_per_round
        )))
    }
}
