//! Graph authoring and the sealed graph store.
//!
//! Graphs are built through [`GraphBuilder`] and sealed by [`GraphBuilder::build`],
//! which validates topology and freezes the node collection. A sealed
//! [`Graph`] is immutable: the id index and the regular-node cache can never
//! go stale, and traversal state lives entirely with the consumer.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use tracing::debug;

use crate::condition::Condition;
use crate::error::{GraphError, GraphResult};
use crate::node::{Node, NodeId, NodeKind, Transition};
use crate::walk::Transitions;

/// Builder for authoring a [`Graph`].
///
/// Ids are assigned monotonically and never reused. Transitions are
/// recorded in declaration order and attached to their source node when the
/// graph is sealed, so all topology validation happens in one place.
pub struct GraphBuilder<D> {
    nodes: Vec<Node<D>>,
    pending: Vec<(NodeId, Transition<D>)>,
    next_id: u64,
    root: Option<NodeId>,
}

impl<D> Default for GraphBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> GraphBuilder<D> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            pending: Vec::new(),
            next_id: 0,
            root: None,
        }
    }

    /// Add a regular (state) node.
    pub fn add_state(&mut self, name: &str) -> NodeId {
        self.add_node(name, NodeKind::Regular)
    }

    /// Add a hub node.
    pub fn add_hub(&mut self, name: &str) -> NodeId {
        self.add_node(name, NodeKind::Hub)
    }

    /// Add an exit node.
    pub fn add_exit(&mut self, name: &str) -> NodeId {
        self.add_node(name, NodeKind::Exit)
    }

    /// Add the common ("from any state") node.
    ///
    /// Declaring more than one common node is rejected when the graph is
    /// sealed.
    pub fn add_common(&mut self, name: &str) -> NodeId {
        self.add_node(name, NodeKind::Common)
    }

    /// Add a node of the given kind.
    pub fn add_node(&mut self, name: &str, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(Node::new(id, name, kind));
        id
    }

    /// Add a node with an explicit, externally assigned id.
    ///
    /// Used when loading already-deserialized node arrays with stable ids.
    /// Duplicate ids are rejected when the graph is sealed.
    pub fn add_node_with_id(&mut self, id: NodeId, name: &str, kind: NodeKind) -> NodeId {
        self.next_id = self.next_id.max(id.0 + 1);
        self.nodes.push(Node::new(id, name, kind));
        id
    }

    /// Attach a metadata entry to a previously added node.
    pub fn set_metadata(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.metadata.insert(key.into(), value.into());
        }
    }

    /// Append an unconditional transition to `from`'s transition list.
    pub fn add_transition(&mut self, from: NodeId, to: NodeId) {
        self.pending.push((from, Transition::new(to)));
    }

    /// Append a guarded transition to `from`'s transition list.
    pub fn add_transition_if(&mut self, from: NodeId, to: NodeId, condition: Condition<D>) {
        self.pending.push((from, Transition::when(to, condition)));
    }

    /// Designate the root node. Must be a regular node.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Seal the graph, validating its topology.
    ///
    /// Fails on duplicate ids, a missing or non-regular root, more than one
    /// common node, or any transition referencing a nonexistent node. Hub
    /// reference cycles are tolerated here; see [`Graph::hub_cycle`].
    pub fn build(mut self) -> GraphResult<Graph<D>> {
        let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(self.nodes.len());
        for (pos, node) in self.nodes.iter().enumerate() {
            if index.insert(node.id, pos).is_some() {
                return Err(GraphError::DuplicateNodeId { node_id: node.id });
            }
        }

        let mut common_id: Option<NodeId> = None;
        for node in &self.nodes {
            if node.kind == NodeKind::Common {
                if let Some(first) = common_id {
                    return Err(GraphError::CommonConflict {
                        first,
                        second: node.id,
                    });
                }
                common_id = Some(node.id);
            }
        }

        for (from, transition) in &self.pending {
            if !index.contains_key(from) {
                return Err(GraphError::NodeNotFound { node_id: *from });
            }
            if !index.contains_key(&transition.target) {
                return Err(GraphError::DanglingTransition {
                    from: *from,
                    to: transition.target,
                });
            }
        }
        for (from, transition) in self.pending.drain(..) {
            let pos = index[&from];
            self.nodes[pos].transitions.push(transition);
        }

        let root_id = self.root.ok_or(GraphError::RootMissing)?;
        let root = *index
            .get(&root_id)
            .ok_or(GraphError::NodeNotFound { node_id: root_id })?;
        if !self.nodes[root].is_regular() {
            return Err(GraphError::RootNotRegular { node_id: root_id });
        }

        let common = common_id.map(|id| index[&id]);

        debug!(
            nodes = self.nodes.len(),
            root = root_id.0,
            has_common = common.is_some(),
            "graph_sealed"
        );

        Ok(Graph {
            nodes: self.nodes,
            index,
            root,
            common,
            regular: OnceLock::new(),
        })
    }
}

impl<D> fmt::Debug for GraphBuilder<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("nodes", &self.nodes.len())
            .field("pending_transitions", &self.pending.len())
            .field("root", &self.root)
            .finish()
    }
}

/// A sealed, immutable transition graph.
///
/// Owns all nodes, their transitions and condition trees. Enumerators and
/// compilers only borrow from it.
pub struct Graph<D> {
    nodes: Vec<Node<D>>,
    index: HashMap<NodeId, usize>,
    root: usize,
    common: Option<usize>,
    /// Regular-node ids, populated on first use of [`Graph::regular_nodes`].
    regular: OnceLock<Vec<NodeId>>,
}

impl<D> Graph<D> {
    /// Look up a node by id.
    ///
    /// Returns `Some` only for `Regular` nodes; service nodes (`Hub`,
    /// `Exit`, `Common`) are invisible to public lookup. An absent or
    /// service id is a lookup miss, not an error.
    pub fn get_node(&self, id: NodeId) -> Option<&Node<D>> {
        self.node_raw(id).filter(|n| n.is_regular())
    }

    /// Look up any node regardless of kind.
    pub(crate) fn node_raw(&self, id: NodeId) -> Option<&Node<D>> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    /// The designated root node.
    pub fn root(&self) -> &Node<D> {
        &self.nodes[self.root]
    }

    /// The common node, if one was declared.
    pub fn common(&self) -> Option<&Node<D>> {
        self.common.map(|pos| &self.nodes[pos])
    }

    /// All regular nodes, in insertion order.
    pub fn regular_nodes(&self) -> impl Iterator<Item = &Node<D>> + '_ {
        let ids = self.regular.get_or_init(|| {
            self.nodes
                .iter()
                .filter(|n| n.is_regular())
                .map(|n| n.id)
                .collect()
        });
        ids.iter().filter_map(move |id| self.node_raw(*id))
    }

    /// Total number of nodes, service kinds included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of declared transitions across all nodes.
    pub fn transition_count(&self) -> usize {
        self.nodes.iter().map(|n| n.transitions.len()).sum()
    }

    /// Effective transitions of `node`, with hub indirection flattened.
    ///
    /// See [`Transitions`] for the flattening contract.
    pub fn transitions<'a>(&'a self, node: &'a Node<D>) -> Transitions<'a, D> {
        Transitions::from_node(self, node)
    }

    /// The "from any state" transitions held by the common node.
    ///
    /// Empty when no common node was declared.
    pub fn common_transitions(&self) -> Transitions<'_, D> {
        match self.common() {
            Some(common) => Transitions::from_node(self, common),
            None => Transitions::empty(self),
        }
    }

    /// Probe for a hub reference cycle.
    ///
    /// The model tolerates hubs whose transitions lead back into other hubs;
    /// enumeration stays finite because revisited hubs are skipped. Loaders
    /// that want to reject such graphs up front call this and fail on
    /// `Some`. Returns a hub participating in a cycle, if any.
    pub fn hub_cycle(&self) -> Option<NodeId> {
        let mut hubs: StableDiGraph<NodeId, ()> = StableDiGraph::new();
        let mut id_to_index: HashMap<NodeId, NodeIndex> = HashMap::new();

        for node in self.nodes.iter().filter(|n| n.kind == NodeKind::Hub) {
            id_to_index.insert(node.id, hubs.add_node(node.id));
        }
        for node in self.nodes.iter().filter(|n| n.kind == NodeKind::Hub) {
            for transition in &node.transitions {
                if let (Some(&from), Some(&to)) = (
                    id_to_index.get(&node.id),
                    id_to_index.get(&transition.target),
                ) {
                    hubs.add_edge(from, to, ());
                }
            }
        }

        match toposort(&hubs, None) {
            Ok(_) => None,
            Err(cycle) => Some(hubs[cycle.node_id()]),
        }
    }

    /// Convert to a petgraph `StableDiGraph` for external analysis.
    ///
    /// Node weights are ids, edge weights are the transition's position
    /// within its source node. Returns the graph and a NodeId to NodeIndex
    /// mapping.
    pub fn to_petgraph(&self) -> (StableDiGraph<NodeId, usize>, HashMap<NodeId, NodeIndex>) {
        let mut graph = StableDiGraph::new();
        let mut id_to_index = HashMap::new();

        for node in &self.nodes {
            let idx = graph.add_node(node.id);
            id_to_index.insert(node.id, idx);
        }
        for node in &self.nodes {
            for (pos, transition) in node.transitions.iter().enumerate() {
                if let (Some(&from), Some(&to)) = (
                    id_to_index.get(&node.id),
                    id_to_index.get(&transition.target),
                ) {
                    graph.add_edge(from, to, pos);
                }
            }
        }

        (graph, id_to_index)
    }
}

impl<D> fmt::Debug for Graph<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.node_count())
            .field("transition_count", &self.transition_count())
            .field("root", &self.root().id)
            .field("common", &self.common().map(|n| n.id))
            .finish()
    }
}
