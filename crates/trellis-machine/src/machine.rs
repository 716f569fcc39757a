//! The compiled state machine and the sink interface used to fill one.
//!
//! Compilation targets any [`MachineSink`] - typically an external generic
//! state-machine runtime. [`StateMachine`] is the default sink: a read-only
//! edge table usable directly by a per-tick driver.

use std::fmt;
use std::sync::Arc;

/// Receiving side of a compilation.
///
/// States are reference-counted handles: the sink owns them once
/// registered, the compiler keeps its node-to-state map only while
/// compiling.
pub trait MachineSink<S, C> {
    /// Designate the machine's start state.
    fn set_start_state(&mut self, state: Arc<S>);

    /// Register one edge. `to` is `None` for transitions into a terminal
    /// (no next state). Call order defines edge priority.
    fn add_transition(&mut self, from: Arc<S>, condition: C, to: Option<Arc<S>>);
}

/// One compiled edge: a condition token and an optional target state.
pub struct MachineEdge<S, C> {
    /// Condition token manufactured for the transition.
    pub condition: C,
    /// Target state; `None` means the machine terminates on this edge.
    pub target: Option<Arc<S>>,
}

impl<S, C> MachineEdge<S, C> {
    /// Whether this edge terminates the machine.
    pub fn is_terminal(&self) -> bool {
        self.target.is_none()
    }
}

impl<S, C> fmt::Debug for MachineEdge<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineEdge")
            .field("terminal", &self.is_terminal())
            .finish()
    }
}

/// Default compiled machine: start state plus per-state ordered edge lists.
///
/// Read-only after compilation, so independent consumers may share it
/// freely; per-consumer traversal state lives with the caller.
pub struct StateMachine<S, C> {
    start: Option<Arc<S>>,
    states: Vec<Arc<S>>,
    edges: Vec<Vec<MachineEdge<S, C>>>,
}

impl<S, C> Default for StateMachine<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> StateMachine<S, C> {
    /// Create an empty machine.
    pub fn new() -> Self {
        Self {
            start: None,
            states: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Register a state, deduplicated by handle identity. Returns its
    /// index.
    pub fn insert_state(&mut self, state: Arc<S>) -> usize {
        if let Some(pos) = self.index_of(&state) {
            return pos;
        }
        self.states.push(state);
        self.edges.push(Vec::new());
        self.states.len() - 1
    }

    fn index_of(&self, state: &Arc<S>) -> Option<usize> {
        self.states.iter().position(|s| Arc::ptr_eq(s, state))
    }

    /// The designated start state.
    pub fn start_state(&self) -> Option<&Arc<S>> {
        self.start.as_ref()
    }

    /// Number of registered states.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// All registered states, in registration order.
    pub fn states(&self) -> &[Arc<S>] {
        &self.states
    }

    /// Edges leaving `state`, in registration order. Empty for an unknown
    /// handle.
    pub fn edges_from(&self, state: &Arc<S>) -> &[MachineEdge<S, C>] {
        match self.index_of(state) {
            Some(pos) => &self.edges[pos],
            None => &[],
        }
    }
}

impl<S, C> MachineSink<S, C> for StateMachine<S, C> {
    fn set_start_state(&mut self, state: Arc<S>) {
        self.insert_state(state.clone());
        self.start = Some(state);
    }

    fn add_transition(&mut self, from: Arc<S>, condition: C, to: Option<Arc<S>>) {
        if let Some(target) = &to {
            self.insert_state(target.clone());
        }
        let pos = self.insert_state(from);
        self.edges[pos].push(MachineEdge {
            condition,
            target: to,
        });
    }
}

impl<S, C> fmt::Debug for StateMachine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("state_count", &self.state_count())
            .field(
                "edge_count",
                &self.edges.iter().map(|e| e.len()).sum::<usize>(),
            )
            .field("has_start", &self.start.is_some())
            .finish()
    }
}
