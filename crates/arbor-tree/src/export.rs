//! Owned, serializable snapshot of a fitted tree's node structure.

use std::fmt;

/// A detached copy of one tree node and everything below it.
///
/// Serializes with a `"type"` tag:
///
/// ```json
/// {"type": "split", "column": 0, "children": [
///     {"value": "a", "node": {"type": "leaf", "class": "yes"}}
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportedNode<V, L> {
    /// A terminal node predicting `class`.
    Leaf {
        /// Predicted class.
        class: L,
    },
    /// An interior node routing on `column`.
    Split {
        /// Zero-based column index the node splits on.
        column: usize,
        /// One entry per value observed at this node during training.
        children: Vec<ExportedBranch<V, L>>,
    },
}

/// A value-to-subtree edge of an exported split.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExportedBranch<V, L> {
    /// Attribute value that routes to `node`.
    pub value: V,
    /// The subtree for `value`.
    pub node: ExportedNode<V, L>,
}

impl<V, L> ExportedNode<V, L> {
    /// Return the number of leaves below (and including) this node.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            ExportedNode::Leaf { .. } => 1,
            ExportedNode::Split { children, .. } => children.iter().map(|c| c.node.n_leaves()).sum(),
        }
    }

    /// Return the depth of the deepest leaf below this node. A leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            ExportedNode::Leaf { .. } => 0,
            ExportedNode::Split { children, .. } => {
                1 + children.iter().map(|c| c.node.depth()).max().unwrap_or(0)
            }
        }
    }

    fn write_rules(&self, f: &mut fmt::Formatter<'_>, indent: usize, names: Option<&[String]>) -> fmt::Result
    where
        V: fmt::Display,
        L: fmt::Display,
    {
        match self {
            ExportedNode::Leaf { class } => writeln!(f, "-> {class}"),
            ExportedNode::Split { column, children } => {
                for child in children {
                    write!(f, "{:width$}", "", width = indent * 2)?;
                    match names.and_then(|n| n.get(*column)) {
                        Some(name) => write!(f, "{name} = {}", child.value)?,
                        None => write!(f, "[{column}] = {}", child.value)?,
                    }
                    match &child.node {
                        ExportedNode::Leaf { class } => writeln!(f, " -> {class}")?,
                        split @ ExportedNode::Split { .. } => {
                            writeln!(f)?;
                            split.write_rules(f, indent + 1, names)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Render the tree using `feature_names` in place of column indices.
    #[must_use]
    pub fn display_with_names<'a>(&'a self, feature_names: &'a [String]) -> NamedTree<'a, V, L> {
        NamedTree {
            root: self,
            feature_names,
        }
    }
}

/// Renders as an indented rule list, one line per branch:
///
/// ```text
/// [0] = a
///   [1] = x -> yes
///   [1] = y -> no
/// [0] = b -> no
/// ```
impl<V: fmt::Display, L: fmt::Display> fmt::Display for ExportedNode<V, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_rules(f, 0, None)
    }
}

/// Display adapter returned by [`ExportedNode::display_with_names`].
pub struct NamedTree<'a, V, L> {
    root: &'a ExportedNode<V, L>,
    feature_names: &'a [String],
}

impl<V: fmt::Display, L: fmt::Display> fmt::Display for NamedTree<'_, V, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write_rules(f, 0, Some(self.feature_names))
    }
}
