//! ID3 decision-tree induction over categorical data.
//!
//! Builds a multiway tree by repeatedly splitting on the column with the
//! lowest weighted post-split entropy, and wraps it in a classifier that
//! falls back to the training set's majority label for rows carrying
//! values the tree never saw. Fitted trees can be exported as an owned,
//! serializable node structure.

mod classifier;
mod confusion;
mod error;
mod export;
mod node;
pub mod stats;
mod tree;

pub use classifier::DecisionTreeClassifier;
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::TreeError;
pub use export::{ExportedBranch, ExportedNode, NamedTree};
pub use node::{Branch, Category, FeatureIndex, Node, NodeIndex};
pub use tree::{DecisionTree, build};
