use std::{collections::HashMap, sync::Arc};

use futures::future::join_all;

use crate::{
    arguments::{self, Arguments, CallArgs},
    cache::SingleFlight,
    context::InjectionContext,
    errors::{BindError, ResolveError, TeardownError},
    factories::FactoryId,
    node::{DependencyNode, NodeId, Slot, Slots},
    signature::{Depends, Signature},
    types::Value,
};

pub(crate) struct GraphInner {
    pub nodes: Vec<DependencyNode>,
    pub context: InjectionContext,
    pub cache: SingleFlight<NodeId, Result<Value, ResolveError>>,
}

/// All providers needed by one call of an operation
///
/// Every factory handle appears as exactly one node, no matter how many parameters depend on it.
/// A graph is built per call and never shared between calls.
pub struct DependencyGraph {
    inner: Arc<GraphInner>,
    signature: Signature,
    top_level: Slots,
}

impl DependencyGraph {
    /// Builds the graph for a call of an operation with the given signature
    ///
    /// Fails if the call arguments do not fit the signature.
    pub fn build(signature: &Signature, call: CallArgs) -> Result<Self, BindError> {
        let context = InjectionContext::new(signature, &call);

        let mut builder = GraphBuilder::default();
        let mut top_level = Slots::from_call(&call);
        for (name, depends) in signature.providers() {
            let node = builder.node_for(depends);
            // The provider always fills its parameter
            top_level.keywords.insert(name.to_string(), Slot::Node(node));
        }

        arguments::check(
            signature,
            top_level.positional.len(),
            top_level.keywords.keys().map(String::as_str),
        )?;

        tracing::debug!(
            "Built dependency graph with {} nodes and {} context values",
            builder.nodes.len(),
            context.len()
        );

        Ok(DependencyGraph {
            inner: Arc::new(GraphInner {
                nodes: builder.nodes,
                context,
                cache: SingleFlight::new(),
            }),
            signature: signature.clone(),
            top_level,
        })
    }

    /// Resolves every provider of the operation and binds the operation's arguments
    ///
    /// Independent providers run concurrently, each node at most once.
    pub async fn resolve_top_level(&self) -> Result<Arguments, ResolveError> {
        let (positional, keywords) = self.top_level.resolve(&self.inner, &self.signature).await?;
        Ok(arguments::assemble(&self.signature, positional, keywords))
    }

    /// Releases every node holding a resource, concurrently
    ///
    /// All releases run, failures are returned in node order.
    /// Calling this again does nothing for nodes already released.
    pub async fn teardown_all(&self) -> Vec<TeardownError> {
        tracing::debug!("Tearing down {} nodes", self.inner.nodes.len());

        join_all(self.inner.nodes.iter().map(DependencyNode::teardown))
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }

    pub fn context(&self) -> &InjectionContext {
        &self.inner.context
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.inner.nodes.iter()
    }

    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> {
        self.inner.nodes.get(id.0)
    }

    /// Returns the node resolving the given factory handle
    pub fn node_of(&self, factory: FactoryId) -> Option<&DependencyNode> {
        self.nodes().find(|node| node.factory().id() == factory)
    }

    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }
}

impl Drop for DependencyGraph {
    fn drop(&mut self) {
        // Unfinished flights hold the graph alive
        self.inner.cache.clear();
    }
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("nodes", &self.inner.nodes)
            .field("context", &self.inner.context)
            .finish()
    }
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<DependencyNode>,
    index: HashMap<FactoryId, NodeId>,
}

impl GraphBuilder {
    /// Returns the node for the marker's factory, creating it and its providers on first sight
    fn node_for(&mut self, depends: &Depends) -> NodeId {
        let factory = depends.factory().clone();

        if let Some(&existing) = self.index.get(&factory.id()) {
            let node = &self.nodes[existing.0];
            if !node.slots().same_shape(depends.bound(), factory.signature()) {
                tracing::warn!(
                    factory = factory.name(),
                    node = %existing,
                    "Factory is bound with different arguments - using the first binding"
                );
            }
            return existing;
        }

        // Registered before recursing, nested markers of the same handle reuse this node
        let id = NodeId(self.nodes.len());
        self.index.insert(factory.id(), id);
        self.nodes.push(DependencyNode::new(
            id,
            factory.clone(),
            Slots::from_call(depends.bound()),
        ));
        tracing::trace!(factory = factory.name(), node = %id, "Added node");

        for (name, nested) in factory.signature().providers() {
            let child = self.node_for(nested);
            self.nodes[id.0].link(name.to_string(), child);
        }

        id
    }
}
