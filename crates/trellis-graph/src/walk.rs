//! Transition enumeration and step-by-step traversal.
//!
//! [`Transitions`] produces a node's *effective* transition sequence:
//! transitions that point at a hub are never yielded themselves - the hub's
//! own transitions are spliced in contiguously at that position, each
//! keeping its own condition. Nested hubs splice depth-first, and a hub
//! already on the active flattening stack is skipped so enumeration stays
//! finite even when hub references form a cycle.

use std::fmt;
use std::slice;

use tracing::{debug, warn};

use crate::condition::Condition;
use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind, Transition};

/// One effective transition, as seen by a consumer.
///
/// Derived during enumeration, never stored. `owner` is the node whose
/// transition list declares the underlying transition - for an inlined hub
/// transition that is the hub, not the enumeration origin - and is the node
/// handed to leaf predicates during [`TransitionInfo::available`].
pub struct TransitionInfo<'a, D> {
    /// Guard on the transition, if any.
    pub condition: Option<&'a Condition<D>>,
    /// Node declaring the transition.
    pub owner: &'a Node<D>,
    /// Resolved destination node. Never a hub.
    pub target: &'a Node<D>,
}

impl<'a, D> TransitionInfo<'a, D> {
    /// True when the transition has no guard or its guard checks true.
    pub fn available(&self, data: &D) -> bool {
        match self.condition {
            None => true,
            Some(condition) => condition.check(self.owner, data),
        }
    }
}

impl<'a, D> Clone for TransitionInfo<'a, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, D> Copy for TransitionInfo<'a, D> {}

impl<'a, D> fmt::Debug for TransitionInfo<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionInfo")
            .field("owner", &self.owner.id)
            .field("target", &self.target.id)
            .field("guarded", &self.condition.is_some())
            .finish()
    }
}

struct Frame<'a, D> {
    owner: &'a Node<D>,
    cursor: slice::Iter<'a, Transition<D>>,
}

/// Lazy iterator over a node's effective transitions.
///
/// Finite and restartable: requesting the enumeration again yields a fresh
/// pass over the same sealed data.
pub struct Transitions<'a, D> {
    graph: &'a Graph<D>,
    stack: Vec<Frame<'a, D>>,
}

impl<'a, D> Transitions<'a, D> {
    pub(crate) fn from_node(graph: &'a Graph<D>, node: &'a Node<D>) -> Self {
        Self {
            graph,
            stack: vec![Frame {
                owner: node,
                cursor: node.transitions.iter(),
            }],
        }
    }

    pub(crate) fn empty(graph: &'a Graph<D>) -> Self {
        Self {
            graph,
            stack: Vec::new(),
        }
    }
}

impl<'a, D> Iterator for Transitions<'a, D> {
    type Item = TransitionInfo<'a, D>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(transition) = frame.cursor.next() else {
                self.stack.pop();
                continue;
            };
            let owner = frame.owner;

            let Some(target) = self.graph.node_raw(transition.target) else {
                // Unreachable on sealed graphs; skip rather than lie.
                warn!(
                    source = owner.id.0,
                    target = transition.target.0,
                    "dangling_transition_skipped"
                );
                continue;
            };

            if target.kind == NodeKind::Hub {
                if self.stack.iter().any(|f| f.owner.id == target.id) {
                    warn!(hub = target.id.0, source = owner.id.0, "hub_revisit_skipped");
                    continue;
                }
                debug!(hub = target.id.0, source = owner.id.0, "hub_inlined");
                self.stack.push(Frame {
                    owner: target,
                    cursor: target.transitions.iter(),
                });
                continue;
            }

            return Some(TransitionInfo {
                condition: transition.condition.as_ref(),
                owner,
                target,
            });
        }
    }
}

impl<'a, D> fmt::Debug for Transitions<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transitions")
            .field("depth", &self.stack.len())
            .finish()
    }
}

/// Outcome of a single traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Took a transition into the given regular node.
    Moved(NodeId),
    /// No transition was available.
    Stayed,
    /// Took a transition into an exit node; the traversal is over.
    Finished,
}

/// Minimal per-consumer first-match traversal driver.
///
/// Holds only the current node id and a finished flag; the graph itself is
/// never mutated. A step evaluates the current node's effective transitions
/// and then the common any-state transitions, taking the first available
/// one.
#[derive(Debug, Clone)]
pub struct Cursor {
    current: NodeId,
    finished: bool,
}

impl Cursor {
    /// Start at the graph's root.
    pub fn new<D>(graph: &Graph<D>) -> Self {
        Self {
            current: graph.root().id,
            finished: false,
        }
    }

    /// Start at a specific regular node. `None` when the id is absent or
    /// not a regular node.
    pub fn at<D>(graph: &Graph<D>, id: NodeId) -> Option<Self> {
        graph.get_node(id).map(|node| Self {
            current: node.id,
            finished: false,
        })
    }

    /// The node the cursor currently sits on.
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Whether the traversal reached an exit.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Evaluate transitions against `data` and advance if one is available.
    pub fn step<D>(&mut self, graph: &Graph<D>, data: &D) -> Step {
        if self.finished {
            return Step::Finished;
        }
        let Some(node) = graph.get_node(self.current) else {
            return Step::Stayed;
        };

        let chosen = graph
            .transitions(node)
            .chain(graph.common_transitions())
            .find(|info| info.available(data));

        match chosen {
            Some(info) if info.target.kind == NodeKind::Exit => {
                debug!(source = self.current.0, exit = info.target.id.0, "walk_finished");
                self.finished = true;
                Step::Finished
            }
            Some(info) if info.target.kind == NodeKind::Regular => {
                debug!(source = self.current.0, target = info.target.id.0, "walk_moved");
                self.current = info.target.id;
                Step::Moved(info.target.id)
            }
            _ => Step::Stayed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::graph::GraphBuilder;

    fn always() -> Condition<u32> {
        Condition::from_fn(|_: &Node<u32>, _: &u32| true)
    }

    fn ids<'a, D>(iter: Transitions<'a, D>) -> Vec<NodeId> {
        iter.map(|info| info.target.id).collect()
    }

    #[test]
    fn test_plain_nodes_yield_declared_order() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let x = b.add_state("x");
        let y = b.add_state("y");
        let z = b.add_state("z");
        b.add_transition(a, x);
        b.add_transition(a, z);
        b.add_transition(a, y);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        assert_eq!(ids(graph.transitions(node)), vec![x, z, y]);
    }

    #[test]
    fn test_hub_splices_in_place() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let before = b.add_state("before");
        let after = b.add_state("after");
        let h1 = b.add_state("h1");
        let h2 = b.add_state("h2");
        let hub = b.add_hub("hub");
        b.add_transition(a, before);
        b.add_transition(a, hub);
        b.add_transition(a, after);
        b.add_transition(hub, h1);
        b.add_transition(hub, h2);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        assert_eq!(ids(graph.transitions(node)), vec![before, h1, h2, after]);
    }

    #[test]
    fn test_inlined_transitions_are_owned_by_the_hub() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let target = b.add_state("target");
        let hub = b.add_hub("hub");
        b.add_transition(a, hub);
        b.add_transition(hub, target);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        let infos: Vec<_> = graph.transitions(node).collect();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].owner.id, hub);
        assert_eq!(infos[0].target.id, target);
    }

    #[test]
    fn test_hub_reference_condition_is_dropped() {
        // A guard on the transition that points at the hub does not guard
        // the hub's inlined transitions.
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let target = b.add_state("target");
        let hub = b.add_hub("hub");
        b.add_transition_if(a, hub, always());
        b.add_transition(hub, target);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        let infos: Vec<_> = graph.transitions(node).collect();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].condition.is_none());
    }

    #[test]
    fn test_nested_hubs_splice_depth_first() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let first = b.add_state("first");
        let deep = b.add_state("deep");
        let last = b.add_state("last");
        let outer = b.add_hub("outer");
        let inner = b.add_hub("inner");
        b.add_transition(a, outer);
        b.add_transition(outer, first);
        b.add_transition(outer, inner);
        b.add_transition(outer, last);
        b.add_transition(inner, deep);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        assert_eq!(ids(graph.transitions(node)), vec![first, deep, last]);
    }

    #[test]
    fn test_cyclic_hubs_enumerate_finitely() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let from_a = b.add_state("from_a");
        let from_b = b.add_state("from_b");
        let hub_a = b.add_hub("hub_a");
        let hub_b = b.add_hub("hub_b");
        b.add_transition(a, hub_a);
        b.add_transition(hub_a, from_a);
        b.add_transition(hub_a, hub_b);
        b.add_transition(hub_b, hub_a); // back-reference, must be skipped
        b.add_transition(hub_b, from_b);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        assert_eq!(ids(graph.transitions(node)), vec![from_a, from_b]);
    }

    #[test]
    fn test_self_referencing_hub_enumerates_finitely() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let out = b.add_state("out");
        let hub = b.add_hub("hub");
        b.add_transition(a, hub);
        b.add_transition(hub, hub);
        b.add_transition(hub, out);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        assert_eq!(ids(graph.transitions(node)), vec![out]);
    }

    #[test]
    fn test_same_hub_referenced_twice_is_inlined_twice() {
        // Only hubs on the *active* stack are skipped; sibling references
        // to the same hub each get their own splice.
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let mid = b.add_state("mid");
        let t = b.add_state("t");
        let hub = b.add_hub("hub");
        b.add_transition(a, hub);
        b.add_transition(a, mid);
        b.add_transition(a, hub);
        b.add_transition(hub, t);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        assert_eq!(ids(graph.transitions(node)), vec![t, mid, t]);
    }

    #[test]
    fn test_enumeration_is_restartable() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let x = b.add_state("x");
        let hub = b.add_hub("hub");
        b.add_transition(a, hub);
        b.add_transition(hub, x);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        let first: Vec<NodeId> = ids(graph.transitions(node));
        let second: Vec<NodeId> = ids(graph.transitions(node));
        assert_eq!(first, second);
    }

    #[test]
    fn test_flattening_scenario() {
        // a: [-> hub (guarded), -> b]; hub: [-> b]. Effective sequence is
        // two transitions, both resolving to b: the hub's own unguarded one
        // first, then a's direct one.
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let target = b.add_state("b");
        let hub = b.add_hub("hub1");
        b.add_transition_if(a, hub, always());
        b.add_transition(a, target);
        b.add_transition(hub, target);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        let infos: Vec<_> = graph.transitions(node).collect();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].target.id, target);
        assert_eq!(infos[1].target.id, target);
        assert_eq!(infos[0].owner.id, hub);
        assert_eq!(infos[1].owner.id, a);
    }

    #[test]
    fn test_common_transitions() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let flee = b.add_state("flee");
        let common = b.add_common("common");
        b.add_transition(common, flee);
        b.set_root(a);
        let graph = b.build().unwrap();

        assert_eq!(ids(graph.common_transitions()), vec![flee]);
    }

    #[test]
    fn test_common_transitions_without_common_node() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        b.set_root(a);
        let graph = b.build().unwrap();

        assert_eq!(graph.common_transitions().count(), 0);
    }

    #[test]
    fn test_available_without_condition() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let x = b.add_state("x");
        b.add_transition(a, x);
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        let info = graph.transitions(node).next().unwrap();
        assert!(info.available(&0));
    }

    #[test]
    fn test_available_checks_condition() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let x = b.add_state("x");
        b.add_transition_if(a, x, Condition::from_fn(|_: &Node<u32>, d: &u32| *d > 5));
        b.set_root(a);
        let graph = b.build().unwrap();

        let node = graph.get_node(a).unwrap();
        let info = graph.transitions(node).next().unwrap();
        assert!(info.available(&6));
        assert!(!info.available(&5));
    }

    #[test]
    fn test_cursor_moves_on_first_available() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let skip = b.add_state("skip");
        let go = b.add_state("go");
        b.add_transition_if(a, skip, Condition::from_fn(|_: &Node<u32>, _: &u32| false));
        b.add_transition(a, go);
        b.set_root(a);
        let graph = b.build().unwrap();

        let mut cursor = Cursor::new(&graph);
        assert_eq!(cursor.step(&graph, &0), Step::Moved(go));
        assert_eq!(cursor.current(), go);
    }

    #[test]
    fn test_cursor_stays_when_nothing_available() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let x = b.add_state("x");
        b.add_transition_if(a, x, Condition::from_fn(|_: &Node<u32>, _: &u32| false));
        b.set_root(a);
        let graph = b.build().unwrap();

        let mut cursor = Cursor::new(&graph);
        assert_eq!(cursor.step(&graph, &0), Step::Stayed);
        assert_eq!(cursor.current(), a);
    }

    #[test]
    fn test_cursor_finishes_on_exit() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let exit = b.add_exit("done");
        b.add_transition(a, exit);
        b.set_root(a);
        let graph = b.build().unwrap();

        let mut cursor = Cursor::new(&graph);
        assert_eq!(cursor.step(&graph, &0), Step::Finished);
        assert!(cursor.is_finished());
        assert_eq!(cursor.step(&graph, &0), Step::Finished);
    }

    #[test]
    fn test_cursor_falls_back_to_common() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let flee = b.add_state("flee");
        let common = b.add_common("common");
        b.add_transition(common, flee);
        b.set_root(a);
        let graph = b.build().unwrap();

        let mut cursor = Cursor::new(&graph);
        assert_eq!(cursor.step(&graph, &0), Step::Moved(flee));
    }

    #[test]
    fn test_cursor_prefers_own_transitions_over_common() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let own = b.add_state("own");
        let any = b.add_state("any");
        let common = b.add_common("common");
        b.add_transition(a, own);
        b.add_transition(common, any);
        b.set_root(a);
        let graph = b.build().unwrap();

        let mut cursor = Cursor::new(&graph);
        assert_eq!(cursor.step(&graph, &0), Step::Moved(own));
    }

    #[test]
    fn test_cursor_at_rejects_service_nodes() {
        let mut b = GraphBuilder::<u32>::new();
        let a = b.add_state("a");
        let hub = b.add_hub("hub");
        b.set_root(a);
        let graph = b.build().unwrap();

        assert!(Cursor::at(&graph, a).is_some());
        assert!(Cursor::at(&graph, hub).is_none());
    }
}
