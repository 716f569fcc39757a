//! Directed transition graph for driving per-entity behavior.
//!
//! A graph owns nodes with ordered, optionally guarded transitions. Only
//! `Regular` nodes are actual states; the remaining kinds exist for graph
//! authoring convenience:
//!
//! - **Hub** - a reusable bundle of transitions, transparently inlined
//!   wherever a transition points at it
//! - **Exit** - an explicit terminal marker
//! - **Common** - holder of "from any state" transitions
//!
//! Graphs are authored once through [`GraphBuilder`], sealed, and then only
//! borrowed: enumerated via [`Graph::transitions`], walked step-by-step
//! with [`Cursor`], or compiled into a state machine by the companion
//! `trellis-machine` crate.
//!
//! ## Example
//!
//! ```rust
//! use trellis_graph::{Condition, GraphBuilder, Node, Step, Cursor};
//!
//! let mut builder = GraphBuilder::new();
//! let wander = builder.add_state("wander");
//! let eat = builder.add_state("eat");
//! builder.add_transition_if(
//!     wander,
//!     eat,
//!     Condition::from_fn(|_: &Node<u32>, hunger: &u32| *hunger > 50),
//! );
//! builder.set_root(wander);
//! let graph = builder.build().unwrap();
//!
//! let mut cursor = Cursor::new(&graph);
//! assert_eq!(cursor.step(&graph, &80), Step::Moved(eat));
//! ```

pub mod config;
mod condition;
mod error;
mod graph;
mod node;
mod walk;

pub use condition::{Condition, Predicate};
pub use error::{GraphError, GraphResult};
pub use graph::{Graph, GraphBuilder};
pub use node::{Node, NodeId, NodeKind, Transition};
pub use walk::{Cursor, Step, TransitionInfo, Transitions};

// Description layer
pub use config::{
    ConditionConfig, ConfigMeta, GraphConfig, NodeConfig, PredicateRegistry, TransitionConfig,
};
