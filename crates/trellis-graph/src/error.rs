//! Error types for graph authoring and loading.

use thiserror::Error;

use crate::node::NodeId;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while building or loading a graph.
///
/// Lookup misses are not errors - `get_node` returns `None` for absent or
/// service-kind ids. Everything here is a fail-fast authoring or loading
/// defect.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node referenced by ID does not exist in the graph.
    #[error("node not found: {node_id}")]
    NodeNotFound { node_id: NodeId },

    /// Two nodes were declared with the same ID.
    #[error("duplicate node id: {node_id}")]
    DuplicateNodeId { node_id: NodeId },

    /// A transition references a node that does not exist.
    #[error("transition from {from} references missing node {to}")]
    DanglingTransition { from: NodeId, to: NodeId },

    /// No root node was designated.
    #[error("no root node designated")]
    RootMissing,

    /// The designated root is not a regular node.
    #[error("root node {node_id} is not a regular node")]
    RootNotRegular { node_id: NodeId },

    /// More than one common node was declared.
    #[error("graph declares more than one common node ({first} and {second})")]
    CommonConflict { first: NodeId, second: NodeId },

    /// A hub's transitions lead back to itself through other hubs.
    #[error("hub {node_id} participates in a hub reference cycle")]
    HubCycle { node_id: NodeId },

    /// A condition description names a predicate that was never registered.
    #[error("unknown predicate: {name}")]
    UnknownPredicate { name: String },

    /// Description parse error.
    #[error("description parse error: {0}")]
    Description(#[from] serde_json::Error),
}
