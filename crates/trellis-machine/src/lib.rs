//! One-time compiler from a `trellis-graph` transition graph into a
//! generic state machine.
//!
//! The compiler walks every `Regular` node of a sealed graph, asks a
//! caller-supplied [`StateFactory`] to manufacture an opaque state token
//! per node and an opaque condition token per effective transition, and
//! registers the resulting edges on a [`MachineSink`]. The bundled
//! [`StateMachine`] is the default sink; external runtimes plug in through
//! the same two-operation interface.
//!
//! ## Example
//!
//! ```rust
//! use trellis_graph::{GraphBuilder, Node, TransitionInfo};
//! use trellis_machine::{Compiler, CompileResult, StateFactory};
//!
//! struct NameFactory;
//!
//! impl StateFactory<()> for NameFactory {
//!     type State = String;
//!     type Condition = ();
//!
//!     fn create_state(&mut self, node: &Node<()>) -> CompileResult<String> {
//!         Ok(node.name.clone())
//!     }
//!
//!     fn create_condition(
//!         &mut self,
//!         _node: &Node<()>,
//!         _info: &TransitionInfo<'_, ()>,
//!     ) -> CompileResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! let mut builder = GraphBuilder::<()>::new();
//! let idle = builder.add_state("idle");
//! let walk = builder.add_state("walk");
//! builder.add_transition(idle, walk);
//! builder.set_root(idle);
//! let graph = builder.build().unwrap();
//!
//! let machine = Compiler::new(NameFactory).compile(&graph).unwrap();
//! assert_eq!(machine.state_count(), 2);
//! assert_eq!(machine.start_state().unwrap().as_str(), "idle");
//! ```

mod compile;
mod error;
mod machine;

pub use compile::{Compiler, StateFactory, TransitionPolicy};
pub use error::{CompileError, CompileResult};
pub use machine::{MachineEdge, MachineSink, StateMachine};
