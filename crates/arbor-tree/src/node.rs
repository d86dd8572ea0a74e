//! Arena node types shared by the builder and the classifier.

use std::fmt;
use std::hash::Hash;

/// A categorical value usable as a feature value or class label.
///
/// Values are only ever compared for equality; hashing is used to group
/// equal values. Blanket-implemented for every `Clone + Eq + Hash` type.
pub trait Category: Clone + Eq + Hash {}

impl<T: Clone + Eq + Hash> Category for T {}

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One outgoing edge of a split: rows whose split-column value equals
/// `value` continue at `child`.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch<V> {
    /// Attribute value observed among the training rows that reached the split.
    pub value: V,
    /// Arena index of the subtree for this value.
    pub child: NodeIndex,
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`]. Each child has exactly one parent split.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<V, L> {
    /// An interior split node.
    Split {
        /// Column the split routes on.
        feature: FeatureIndex,
        /// One branch per distinct value seen at this node, in first-seen order.
        branches: Vec<Branch<V>>,
        /// Entropy of the labels reaching this node minus the weighted
        /// entropy after the split, in bits.
        information_gain: f64,
        /// Number of training rows that reached this node.
        n_samples: usize,
    },
    /// A terminal leaf node.
    Leaf {
        /// Predicted class.
        class: L,
        /// Number of training rows that reached this node.
        n_samples: usize,
    },
}

impl<V: PartialEq, L> Node<V, L> {
    /// Return the number of training rows that reached this node.
    ///
    /// Zero for leaves created for a value that no row carried.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Look up the child for `value` at a split. `None` for leaves and for
    /// values that never reached this split during training.
    #[must_use]
    pub fn child_for(&self, value: &V) -> Option<NodeIndex> {
        match self {
            Node::Split { branches, .. } => branches
                .iter()
                .find(|b| b.value == *value)
                .map(|b| b.child),
            Node::Leaf { .. } => None,
        }
    }
}
