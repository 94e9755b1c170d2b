use std::{future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    arguments::{Arguments, CallArgs},
    config::EngineConfig,
    dependency_graph::DependencyGraph,
    errors::InjectError,
    signature::Signature,
    types::DynError,
};

type Body<T> = Arc<dyn Fn(Arguments) -> BoxFuture<'static, Result<T, DynError>> + Send + Sync>;

/// An async function whose provider parameters are filled on every call
///
/// Each [call](Operation::call) builds its own dependency graph, resolves it, runs the body and
/// releases every acquired resource, whether the body succeeded or not.
/// Concurrent calls share nothing but the factory handles.
pub struct Operation<T> {
    name: &'static str,
    signature: Signature,
    body: Body<T>,
    config: EngineConfig,
}

impl<T: Send + 'static> Operation<T> {
    pub fn new<F, Fut, E>(name: &'static str, signature: Signature, body: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<DynError>,
    {
        let body: Body<T> = Arc::new(move |args| {
            let call = body(args);
            async move { call.await.map_err(Into::into) }.boxed()
        });

        Operation {
            name,
            signature,
            body,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Calls the operation
    ///
    /// Fails with [InjectError::Bind] before any provider runs if the arguments do not fit.
    /// If a provider fails the body is skipped, everything acquired so far is still released.
    pub async fn call(&self, call: CallArgs) -> Result<T, InjectError> {
        let operation = self.name;
        let graph = DependencyGraph::build(&self.signature, call)
            .map_err(|error| InjectError::Bind { operation, error })?;

        tracing::debug!(operation, providers = graph.len(), "Calling operation");

        let outcome = match graph.resolve_top_level().await {
            Ok(args) => (self.body)(args).await.map_err(|error| {
                tracing::error!(operation, %error, "Operation failed");
                InjectError::Operation { operation, error }
            }),
            Err(error) => {
                tracing::error!(operation, %error, "Could not resolve providers");
                Err(error.into())
            }
        };

        let failures = graph.teardown_all().await;
        if !failures.is_empty() {
            tracing::warn!(
                operation,
                "{} of {} providers failed to release",
                failures.len(),
                graph.len()
            );
        }

        self.config.teardown_policy.settle(outcome, failures)
    }
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Operation {
            name: self.name,
            signature: self.signature.clone(),
            body: self.body.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("config", &self.config)
            .finish()
    }
}
