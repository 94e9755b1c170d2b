use std::{
    collections::BTreeMap,
    fmt::Display,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::join_all;

use crate::{
    arguments::{self, CallArgs},
    cache::Flight,
    dependency_graph::GraphInner,
    errors::{ResolveError, TeardownError},
    factories::{BoxedRelease, Factory, Produced},
    signature::Signature,
    types::Value,
};

/// Index of a node inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An argument slot - either a concrete value or the output of another node
#[derive(Clone, Debug)]
pub(crate) enum Slot {
    Value(Value),
    Node(NodeId),
}

/// Arguments of a call before the nested nodes are resolved
#[derive(Clone, Debug, Default)]
pub(crate) struct Slots {
    pub positional: Vec<Value>,
    pub keywords: BTreeMap<String, Slot>,
}

impl Slots {
    pub fn from_call(call: &CallArgs) -> Self {
        Slots {
            positional: call.positional().to_vec(),
            keywords: call
                .keywords()
                .iter()
                .map(|(name, value)| (name.clone(), Slot::Value(value.clone())))
                .collect(),
        }
    }

    /// Returns true if this binding has the same shape as `call` bound to a factory with `signature`
    ///
    /// Keywords the factory fills with providers are not part of the shape.
    pub fn same_shape(&self, call: &CallArgs, signature: &Signature) -> bool {
        let bound = self.keywords.iter().filter_map(|(name, slot)| match slot {
            Slot::Value(_) => Some(name),
            Slot::Node(_) => None,
        });
        let requested = call
            .keywords()
            .keys()
            .filter(|name| signature.get(name).and_then(|param| param.provider()).is_none());
        self.positional.len() == call.positional().len() && bound.eq(requested)
    }

    /// Resolves all nested nodes concurrently and replaces them by their values
    ///
    /// Every nested node runs to completion. On failure the error of the first failing slot
    /// in the declaration order of `signature` is returned.
    pub async fn resolve(
        &self,
        graph: &Arc<GraphInner>,
        signature: &Signature,
    ) -> Result<(Vec<Value>, BTreeMap<String, Value>), ResolveError> {
        let mut keywords = BTreeMap::new();
        let mut pending = Vec::new();
        for (name, slot) in &self.keywords {
            match slot {
                Slot::Value(value) => {
                    keywords.insert(name.clone(), value.clone());
                }
                Slot::Node(id) => pending.push((name.clone(), DependencyNode::resolve(graph, *id))),
            }
        }

        pending.sort_by_key(|(name, _)| {
            signature
                .parameters()
                .iter()
                .position(|param| param.name() == name.as_str())
                .unwrap_or(usize::MAX)
        });
        let (names, flights): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
        let results = join_all(flights).await;
        for (name, result) in names.into_iter().zip(results) {
            keywords.insert(name, result?);
        }

        Ok((self.positional.clone(), keywords))
    }
}

/// Public view on the lifecycle of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unresolved,
    Resolving,
    /// The factory produced its value
    Acquired,
    /// The factory or one of its nested providers failed
    Failed,
    Released,
}

enum Lifecycle {
    Unresolved,
    Resolving,
    Acquired(Option<BoxedRelease>),
    Failed,
    Released,
}

impl Lifecycle {
    fn state(&self) -> NodeState {
        match self {
            Lifecycle::Unresolved => NodeState::Unresolved,
            Lifecycle::Resolving => NodeState::Resolving,
            Lifecycle::Acquired(_) => NodeState::Acquired,
            Lifecycle::Failed => NodeState::Failed,
            Lifecycle::Released => NodeState::Released,
        }
    }
}

/// One provider invocation inside a call
pub struct DependencyNode {
    id: NodeId,
    factory: Factory,
    slots: Slots,
    lifecycle: Mutex<Lifecycle>,
}

impl DependencyNode {
    pub(crate) fn new(id: NodeId, factory: Factory, slots: Slots) -> Self {
        DependencyNode {
            id,
            factory,
            slots,
            lifecycle: Mutex::new(Lifecycle::Unresolved),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn state(&self) -> NodeState {
        self.lock().state()
    }

    pub(crate) fn slots(&self) -> &Slots {
        &self.slots
    }

    pub(crate) fn link(&mut self, name: String, child: NodeId) {
        self.slots.keywords.insert(name, Slot::Node(child));
    }

    /// Resolves the node with the given id
    ///
    /// The factory runs once per graph, every caller awaits the same flight.
    pub(crate) fn resolve(graph: &Arc<GraphInner>, id: NodeId) -> Flight<Result<Value, ResolveError>> {
        let inner = graph.clone();
        graph
            .cache
            .run(id, move || async move { inner.nodes[id.0].run(&inner).await })
    }

    async fn run(&self, graph: &Arc<GraphInner>) -> Result<Value, ResolveError> {
        let factory = self.factory.name();
        *self.lock() = Lifecycle::Resolving;
        tracing::debug!(factory, node = %self.id, "Resolving provider");

        let signature = self.factory.signature();
        let (positional, mut keywords) = match self.slots.resolve(graph, signature).await {
            Ok(resolved) => resolved,
            Err(error) => {
                tracing::debug!(factory, node = %self.id, "Nested provider failed");
                *self.lock() = Lifecycle::Failed;
                return Err(error);
            }
        };

        let injected = graph.context.inject(factory, signature, &mut keywords);
        if injected > 0 {
            tracing::trace!(factory, injected, "Applied injection context");
        }

        let args = arguments::bind(signature, positional, keywords).map_err(|error| {
            tracing::error!(factory, %error, "Could not bind provider arguments");
            *self.lock() = Lifecycle::Failed;
            ResolveError::Bind { factory, error }
        })?;

        match self.factory.produce(args).await {
            Ok(Produced { value, release }) => {
                tracing::debug!(factory, node = %self.id, "Provider resolved");
                *self.lock() = Lifecycle::Acquired(release);
                Ok(value)
            }
            Err(error) => {
                tracing::error!(factory, %error, "Provider failed");
                *self.lock() = Lifecycle::Failed;
                Err(ResolveError::FactoryFailed {
                    factory,
                    error: Arc::new(error),
                })
            }
        }
    }

    /// Releases the node if it acquired a resource
    ///
    /// Does nothing for nodes that never produced a value or were already released.
    pub(crate) async fn teardown(&self) -> Result<(), TeardownError> {
        let factory = self.factory.name();
        let release = {
            let mut lifecycle = self.lock();
            match mem::replace(&mut *lifecycle, Lifecycle::Released) {
                Lifecycle::Acquired(release) => release,
                other => {
                    *lifecycle = other;
                    return Ok(());
                }
            }
        };

        let Some(release) = release else {
            return Ok(());
        };

        tracing::debug!(factory, node = %self.id, "Releasing provider");
        release().await.map_err(|error| {
            tracing::error!(factory, %error, "Releasing provider failed");
            TeardownError::ReleaseFailed {
                factory,
                error: Arc::new(error),
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DependencyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyNode")
            .field("id", &self.id)
            .field("factory", &self.factory.name())
            .field("state", &self.state())
            .finish()
    }
}
