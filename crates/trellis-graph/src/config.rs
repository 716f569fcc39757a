//! Description schema for graphs arriving from an external persistence
//! layer.
//!
//! The schema carries node arrays with stable ids, ordered transition
//! lists, and condition trees whose leaves name predicates by string. A
//! [`PredicateRegistry`] resolves those names to implementations when the
//! description is turned into a sealed [`Graph`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::condition::{Condition, FnPredicate, Predicate};
use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, GraphBuilder};
use crate::node::{Node, NodeId, NodeKind};

/// Root description of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Metadata about the description.
    pub meta: ConfigMeta,
    /// Node declarations with stable ids.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Id of the root node. Must reference a regular node.
    pub root: u64,
}

/// Metadata about a graph description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMeta {
    /// Name of the graph.
    pub name: String,
    /// Version of the description schema.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Declaration of a single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Stable id, unique within the description.
    pub id: u64,
    /// Human readable name.
    pub name: String,
    /// Kind of the node.
    #[serde(default)]
    pub kind: NodeKind,
    /// Outgoing transitions, in priority order.
    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,
    /// Free-form authoring metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Declaration of a single transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Destination node id.
    pub to: u64,
    /// Optional guard.
    #[serde(default)]
    pub condition: Option<ConditionConfig>,
}

/// Declaration of a condition tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConditionConfig {
    /// Named leaf predicate, resolved through a [`PredicateRegistry`].
    Leaf {
        predicate: String,
        #[serde(default)]
        invert: bool,
    },
    /// Conjunction.
    All {
        #[serde(default)]
        children: Vec<ConditionConfig>,
        #[serde(default)]
        invert: bool,
    },
    /// Disjunction.
    Any {
        #[serde(default)]
        children: Vec<ConditionConfig>,
        #[serde(default)]
        invert: bool,
    },
}

/// Registry resolving predicate names to implementations.
pub struct PredicateRegistry<D> {
    predicates: HashMap<String, Arc<dyn Predicate<D>>>,
}

impl<D> Default for PredicateRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> PredicateRegistry<D> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            predicates: HashMap::new(),
        }
    }

    /// Register a predicate under a name.
    pub fn register(&mut self, name: impl Into<String>, predicate: impl Predicate<D> + 'static) {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    /// Register a predicate (builder pattern).
    pub fn with_predicate(
        mut self,
        name: impl Into<String>,
        predicate: impl Predicate<D> + 'static,
    ) -> Self {
        self.register(name, predicate);
        self
    }

    /// Register a plain function or closure (builder pattern).
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Node<D>, &D) -> bool + Send + Sync + 'static,
    {
        self.with_predicate(name, FnPredicate(f))
    }

    /// Get a predicate by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Predicate<D>>> {
        self.predicates.get(name)
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// List all registered names.
    pub fn names(&self) -> Vec<&str> {
        self.predicates.keys().map(|s| s.as_str()).collect()
    }
}

impl<D> fmt::Debug for PredicateRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("predicate_count", &self.predicates.len())
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GraphConfig {
    /// Parse a description from JSON.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build and seal a graph from this description.
    ///
    /// Fails on unresolved predicate names, any topology violation rejected
    /// by [`GraphBuilder::build`], or a hub reference cycle - loading is the
    /// boundary where cyclic hub graphs are turned away.
    pub fn into_graph<D>(self, registry: &PredicateRegistry<D>) -> GraphResult<Graph<D>> {
        let mut builder = GraphBuilder::new();

        for node in &self.nodes {
            let id = builder.add_node_with_id(NodeId(node.id), &node.name, node.kind);
            for (key, value) in &node.metadata {
                builder.set_metadata(id, key.clone(), value.clone());
            }
        }
        for node in &self.nodes {
            for transition in &node.transitions {
                let from = NodeId(node.id);
                let to = NodeId(transition.to);
                match &transition.condition {
                    None => builder.add_transition(from, to),
                    Some(config) => {
                        builder.add_transition_if(from, to, build_condition(config, registry)?)
                    }
                }
            }
        }
        builder.set_root(NodeId(self.root));

        let graph = builder.build()?;
        if let Some(node_id) = graph.hub_cycle() {
            return Err(GraphError::HubCycle { node_id });
        }

        info!(
            name = %self.meta.name,
            nodes = graph.node_count(),
            transitions = graph.transition_count(),
            "graph_loaded"
        );

        Ok(graph)
    }
}

fn build_condition<D>(
    config: &ConditionConfig,
    registry: &PredicateRegistry<D>,
) -> GraphResult<Condition<D>> {
    match config {
        ConditionConfig::Leaf { predicate, invert } => {
            let predicate = registry
                .get(predicate)
                .cloned()
                .ok_or_else(|| GraphError::UnknownPredicate {
                    name: predicate.clone(),
                })?;
            Ok(Condition::Leaf {
                predicate,
                invert: *invert,
            })
        }
        ConditionConfig::All { children, invert } => Ok(Condition::All {
            children: children
                .iter()
                .map(|c| build_condition(c, registry))
                .collect::<GraphResult<Vec<_>>>()?,
            invert: *invert,
        }),
        ConditionConfig::Any { children, invert } => Ok(Condition::Any {
            children: children
                .iter()
                .map(|c| build_condition(c, registry))
                .collect::<GraphResult<Vec<_>>>()?,
            invert: *invert,
        }),
    }
}
