//! Rewrite context: where query nodes park asynchronous work.
//!
//! A rewrite pass is synchronous. A node that needs something slow (a model
//! call) registers an action here and returns a placeholder; the driver runs
//! every registered action to completion before presenting the next pass.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use neural_core::Result;
use neural_inference::InferenceService;

/// Boxed future produced by a registered action.
pub type ActionFuture = BoxFuture<'static, Result<()>>;

type AsyncAction = Box<dyn FnOnce(InferenceService) -> ActionFuture + Send>;

/// Collects one-shot asynchronous actions during a rewrite pass.
#[derive(Default)]
pub struct RewriteContext {
    actions: Vec<AsyncAction>,
}

impl RewriteContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action to run before the next rewrite pass.
    ///
    /// The action receives the driver's [`InferenceService`]. Its error, if
    /// any, aborts the overall rewrite.
    pub fn register_async_action<F, Fut>(&mut self, action: F)
    where
        F: FnOnce(InferenceService) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.actions
            .push(Box::new(move |service| action(service).boxed()));
    }

    /// Whether any actions are waiting to run.
    pub fn has_async_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Number of actions waiting to run.
    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    /// Run every registered action to completion and clear the queue.
    ///
    /// Actions run concurrently. All of them finish, success or failure,
    /// before this returns; the first error (in registration order) is
    /// reported. Returns the number of actions that ran.
    pub async fn execute_async_actions(&mut self, service: &InferenceService) -> Result<usize> {
        let actions = std::mem::take(&mut self.actions);
        let count = actions.len();

        let results = join_all(actions.into_iter().map(|action| action(service.clone()))).await;
        for result in results {
            result?;
        }

        Ok(count)
    }
}

impl fmt::Debug for RewriteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteContext")
            .field("pending_actions", &self.actions.len())
            .finish()
    }
}
