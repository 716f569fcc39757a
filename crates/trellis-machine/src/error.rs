//! Error types for graph compilation.

use thiserror::Error;

use trellis_graph::{GraphError, NodeId};

/// Result type alias for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that abort a compilation.
///
/// Compilation never produces a partially built machine: the first error
/// wins and the sink's contents must be discarded.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The factory has no state implementation for a node.
    #[error("no state implementation for node {node_id} ({name})")]
    UnsupportedNode { node_id: NodeId, name: String },

    /// The factory failed to construct a state.
    #[error("state construction failed for node {node_id}: {message}")]
    StateConstruction { node_id: NodeId, message: String },

    /// The factory failed to construct a condition token.
    #[error("condition construction failed for node {node_id}: {message}")]
    ConditionConstruction { node_id: NodeId, message: String },

    /// The compiler reached an impossible internal state.
    #[error("compiler inconsistency: {message}")]
    Inconsistent { message: String },

    /// Underlying graph error.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
