//! Boolean condition trees guarding transitions.
//!
//! Leaves are caller-defined predicates over external data; `All`/`Any`
//! combine children with short-circuit evaluation. Every tree node carries
//! an `invert` flag so that `check = invert XOR evaluate`.

use std::fmt;
use std::sync::Arc;

use crate::node::Node;

/// A leaf predicate over caller-supplied data.
///
/// Predicates receive the node that owns the transition being evaluated,
/// so context-sensitive guards can read node metadata, alongside the
/// external data object. Implementations must be pure: no side effects,
/// same inputs same answer.
pub trait Predicate<D>: Send + Sync {
    /// Evaluate the predicate.
    fn test(&self, node: &Node<D>, data: &D) -> bool;

    /// Diagnostic name, used in `Debug` output.
    fn name(&self) -> &str {
        ""
    }
}

/// Adapter turning a plain function or closure into a [`Predicate`].
pub(crate) struct FnPredicate<F>(pub(crate) F);

impl<D, F> Predicate<D> for FnPredicate<F>
where
    F: Fn(&Node<D>, &D) -> bool + Send + Sync,
{
    fn test(&self, node: &Node<D>, data: &D) -> bool {
        (self.0)(node, data)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// A node in the condition tree.
///
/// Composition is static - trees are built at authoring time and never
/// mutated during evaluation.
pub enum Condition<D> {
    /// Caller-defined predicate.
    Leaf {
        /// The predicate implementation.
        predicate: Arc<dyn Predicate<D>>,
        /// Negate the result.
        invert: bool,
    },
    /// True when every child checks true. Vacuously true with no children.
    All {
        /// Child conditions, evaluated left to right.
        children: Vec<Condition<D>>,
        /// Negate the result.
        invert: bool,
    },
    /// True when at least one child checks true. False with no children.
    Any {
        /// Child conditions, evaluated left to right.
        children: Vec<Condition<D>>,
        /// Negate the result.
        invert: bool,
    },
}

impl<D> Condition<D> {
    /// Wrap a predicate in an uninverted leaf.
    pub fn leaf(predicate: impl Predicate<D> + 'static) -> Self {
        Self::Leaf {
            predicate: Arc::new(predicate),
            invert: false,
        }
    }

    /// Wrap an already-shared predicate in an uninverted leaf.
    pub fn shared_leaf(predicate: Arc<dyn Predicate<D>>) -> Self {
        Self::Leaf {
            predicate,
            invert: false,
        }
    }

    /// Wrap a plain function or closure in an uninverted leaf.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Node<D>, &D) -> bool + Send + Sync + 'static,
    {
        Self::leaf(FnPredicate(f))
    }

    /// Conjunction of `children`.
    pub fn all(children: Vec<Condition<D>>) -> Self {
        Self::All {
            children,
            invert: false,
        }
    }

    /// Disjunction of `children`.
    pub fn any(children: Vec<Condition<D>>) -> Self {
        Self::Any {
            children,
            invert: false,
        }
    }

    /// Flip this tree node's invert flag.
    pub fn negate(mut self) -> Self {
        match &mut self {
            Self::Leaf { invert, .. } | Self::All { invert, .. } | Self::Any { invert, .. } => {
                *invert = !*invert;
            }
        }
        self
    }

    /// Whether this tree node negates its result.
    pub fn is_inverted(&self) -> bool {
        match self {
            Self::Leaf { invert, .. } | Self::All { invert, .. } | Self::Any { invert, .. } => {
                *invert
            }
        }
    }

    /// Evaluate the tree: `invert XOR evaluate`.
    ///
    /// `node` is the node owning the transition this condition guards.
    pub fn check(&self, node: &Node<D>, data: &D) -> bool {
        self.is_inverted() ^ self.evaluate(node, data)
    }

    /// Raw evaluation, before this tree node's own invert flag.
    ///
    /// `All` stops at the first child checking false; `Any` stops at the
    /// first child checking true.
    fn evaluate(&self, node: &Node<D>, data: &D) -> bool {
        match self {
            Self::Leaf { predicate, .. } => predicate.test(node, data),
            Self::All { children, .. } => children.iter().all(|c| c.check(node, data)),
            Self::Any { children, .. } => children.iter().any(|c| c.check(node, data)),
        }
    }
}

impl<D> fmt::Debug for Condition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { predicate, invert } => f
                .debug_struct("Leaf")
                .field("predicate", &predicate.name())
                .field("invert", invert)
                .finish(),
            Self::All { children, invert } => f
                .debug_struct("All")
                .field("children", &children.len())
                .field("invert", invert)
                .finish(),
            Self::Any { children, invert } => f
                .debug_struct("Any")
                .field("children", &children.len())
                .field("invert", invert)
                .finish(),
        }
    }
}
