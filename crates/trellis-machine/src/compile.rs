//! One-time compilation of a sealed graph into a state machine.
//!
//! Every `Regular` node becomes one opaque state, the root becomes the
//! start state, and every effective transition (own and common, hub
//! indirection already flattened by the enumerator) becomes one edge in
//! declaration order.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use trellis_graph::{Graph, Node, NodeId, TransitionInfo};

use crate::error::{CompileError, CompileResult};
use crate::machine::{MachineSink, StateMachine};

/// Strategy for manufacturing runtime tokens per node.
///
/// Replaces per-node-type virtual factories: implementations dispatch on
/// node name, kind or metadata and produce the caller's own state and
/// condition types. A factory that does not recognize a node returns
/// [`CompileError::UnsupportedNode`], which aborts the compilation.
pub trait StateFactory<D> {
    /// Opaque runtime state token.
    type State;
    /// Opaque runtime condition token.
    type Condition;

    /// Manufacture the state token for a regular node.
    fn create_state(&mut self, node: &Node<D>) -> CompileResult<Self::State>;

    /// Manufacture the condition token for one effective transition of
    /// `node`. The transition may originate from the common node.
    fn create_condition(
        &mut self,
        node: &Node<D>,
        info: &TransitionInfo<'_, D>,
    ) -> CompileResult<Self::Condition>;
}

/// Relative priority of a node's own transitions versus the common node's
/// any-state transitions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Own transitions first, then common ones.
    #[default]
    NodeFirst,
    /// Common transitions first, then own ones.
    CommonFirst,
}

/// Compiles a sealed graph into a state machine.
pub struct Compiler<F> {
    factory: F,
    policy: TransitionPolicy,
}

impl<F> Compiler<F> {
    /// Create a compiler with the default `NodeFirst` policy.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            policy: TransitionPolicy::default(),
        }
    }

    /// Select the node-vs-common transition priority.
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The selected policy.
    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Compile into the default [`StateMachine`].
    pub fn compile<D>(mut self, graph: &Graph<D>) -> CompileResult<StateMachine<F::State, F::Condition>>
    where
        F: StateFactory<D>,
    {
        let mut machine = StateMachine::new();
        self.compile_into(graph, &mut machine)?;
        Ok(machine)
    }

    /// Compile into an arbitrary sink, e.g. an external runtime.
    ///
    /// On error the sink may have received a partial prefix of the edges
    /// and must be discarded.
    pub fn compile_into<D, M>(&mut self, graph: &Graph<D>, sink: &mut M) -> CompileResult<()>
    where
        F: StateFactory<D>,
        M: MachineSink<F::State, F::Condition>,
    {
        info!(
            nodes = graph.node_count(),
            policy = ?self.policy,
            "machine_compile_start"
        );

        // One opaque state per regular node, keyed by id for the duration
        // of this compilation only.
        let mut states: HashMap<NodeId, Arc<F::State>> = HashMap::new();
        for node in graph.regular_nodes() {
            let state = Arc::new(self.factory.create_state(node)?);
            debug!(node = node.id.0, name = %node.name, "state_created");
            states.insert(node.id, state);
        }

        let root = graph.root();
        let start = lookup(&states, root.id)?;
        sink.set_start_state(start);

        let mut edge_count = 0usize;
        for node in graph.regular_nodes() {
            let state = lookup(&states, node.id)?;

            let infos = match self.policy {
                TransitionPolicy::NodeFirst => {
                    graph.transitions(node).chain(graph.common_transitions())
                }
                TransitionPolicy::CommonFirst => {
                    graph.common_transitions().chain(graph.transitions(node))
                }
            };

            for info in infos {
                // Unmapped destinations (exit nodes) compile to "no next
                // state".
                let target = states.get(&info.target.id).cloned();
                let condition = self.factory.create_condition(node, &info)?;
                sink.add_transition(state.clone(), condition, target);
                edge_count += 1;
            }
        }

        info!(
            states = states.len(),
            edges = edge_count,
            "machine_compile_complete"
        );

        Ok(())
    }
}

fn lookup<S>(states: &HashMap<NodeId, Arc<S>>, id: NodeId) -> CompileResult<Arc<S>> {
    states
        .get(&id)
        .cloned()
        .ok_or_else(|| CompileError::Inconsistent {
            message: format!("no state was created for regular node {id}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_graph::GraphBuilder;

    /// Factory producing name tokens for states and label tokens for
    /// conditions.
    struct LabelFactory;

    impl StateFactory<u32> for LabelFactory {
        type State = String;
        type Condition = String;

        fn create_state(&mut self, node: &Node<u32>) -> CompileResult<Self::State> {
            Ok(node.name.clone())
        }

        fn create_condition(
            &mut self,
            node: &Node<u32>,
            info: &TransitionInfo<'_, u32>,
        ) -> CompileResult<Self::Condition> {
            Ok(format!("{}:{}->{}", node.name, info.owner.name, info.target.name))
        }
    }

    #[test]
    fn test_one_state_per_regular_node() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        b.add_state("b");
        b.add_hub("hub");
        b.add_exit("exit");
        b.add_common("common");
        b.set_root(a);
        let graph = b.build().unwrap();

        let machine = Compiler::new(LabelFactory).compile(&graph).unwrap();
        assert_eq!(machine.state_count(), 2);
    }

    #[test]
    fn test_start_state_is_root() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        b.add_state("b");
        b.set_root(a);
        let graph = b.build().unwrap();

        let machine = Compiler::new(LabelFactory).compile(&graph).unwrap();
        assert_eq!(machine.start_state().unwrap().as_str(), "a");
    }

    #[test]
    fn test_exit_compiles_to_no_next_state() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let exit = b.add_exit("out");
        b.add_transition(a, exit);
        b.set_root(a);
        let graph = b.build().unwrap();

        let machine = Compiler::new(LabelFactory).compile(&graph).unwrap();
        let start = machine.start_state().unwrap().clone();
        let edges = machine.edges_from(&start);
        assert_eq!(edges.len(), 1);
        assert!(edges[0].is_terminal());
    }

    #[test]
    fn test_unsupported_node_aborts() {
        struct Picky;

        impl StateFactory<u32> for Picky {
            type State = String;
            type Condition = ();

            fn create_state(&mut self, node: &Node<u32>) -> CompileResult<Self::State> {
                if node.name == "mystery" {
                    return Err(CompileError::UnsupportedNode {
                        node_id: node.id,
                        name: node.name.clone(),
                    });
                }
                Ok(node.name.clone())
            }

            fn create_condition(
                &mut self,
                _node: &Node<u32>,
                _info: &TransitionInfo<'_, u32>,
            ) -> CompileResult<Self::Condition> {
                Ok(())
            }
        }

        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        b.add_state("mystery");
        b.set_root(a);
        let graph = b.build().unwrap();

        let err = Compiler::new(Picky).compile(&graph).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedNode { name, .. } if name == "mystery"));
    }
}
