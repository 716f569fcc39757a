//! Node and transition types making up the structural graph.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Identifier for nodes within a [`Graph`](crate::Graph).
///
/// Ids are assigned at authoring time, are unique within a graph, and are
/// never reused.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Enumerates the kinds of nodes that can populate a graph.
///
/// Only `Regular` nodes represent actual states. The other kinds are
/// authoring conveniences: a `Hub` bundles transitions for reuse and is
/// inlined wherever referenced, an `Exit` marks an explicit terminal
/// target, and the single `Common` node holds transitions that apply from
/// any state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// An actual state, visible through public lookup.
    #[default]
    Regular,
    /// A reusable bundle of transitions, inlined wherever referenced.
    Hub,
    /// A terminal marker; transitions pointing here end the traversal.
    Exit,
    /// Holder of "from any state" transitions.
    Common,
}

impl NodeKind {
    /// Check if this kind represents an actual state.
    pub fn is_regular(&self) -> bool {
        matches!(self, NodeKind::Regular)
    }

    /// Check if this is a service kind (`Hub`, `Exit` or `Common`).
    pub fn is_service(&self) -> bool {
        !self.is_regular()
    }
}

/// A directed edge: destination node plus an optional guarding condition.
///
/// Declaration order within a node is semantically significant - the first
/// available transition wins during traversal and is preserved during
/// compilation.
pub struct Transition<D> {
    /// Destination node identifier.
    pub target: NodeId,
    /// Guard evaluated against caller-supplied data; `None` means always
    /// available.
    pub condition: Option<Condition<D>>,
}

impl<D> Transition<D> {
    /// Create an unconditional transition.
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            condition: None,
        }
    }

    /// Create a guarded transition.
    pub fn when(target: NodeId, condition: Condition<D>) -> Self {
        Self {
            target,
            condition: Some(condition),
        }
    }

    /// Check if this transition carries a guard.
    pub fn is_guarded(&self) -> bool {
        self.condition.is_some()
    }
}

impl<D> fmt::Debug for Transition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("target", &self.target)
            .field("condition", &self.condition)
            .finish()
    }
}

/// A node in the transition graph.
///
/// `D` is the caller-supplied data type that leaf predicates read during
/// condition evaluation.
pub struct Node<D> {
    /// Unique identifier for this node.
    pub id: NodeId,
    /// Human readable name, diagnostic only.
    pub name: String,
    /// Category of the node, immutable for its lifetime.
    pub kind: NodeKind,
    /// Outgoing transitions, in declaration order.
    pub transitions: Vec<Transition<D>>,
    /// Arbitrary authoring metadata, e.g. behavior tags or editor hints.
    pub metadata: HashMap<String, String>,
}

impl<D> Node<D> {
    /// Create a node with no transitions.
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            transitions: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Check if this node represents an actual state.
    pub fn is_regular(&self) -> bool {
        self.kind.is_regular()
    }

    /// Get a metadata value.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }
}

impl<D> fmt::Debug for Node<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("transitions", &self.transitions.len())
            .finish()
    }
}
