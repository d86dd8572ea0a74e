//! Recursive ID3 induction into a node arena.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, instrument};

use crate::{
    TreeError,
    export::{ExportedBranch, ExportedNode},
    node::{Branch, Category, FeatureIndex, Node, NodeIndex},
    stats::{all_same, entropy, majority},
};

/// Induce an ID3 decision tree.
///
/// `parent_labels` supplies the class for the root when `rows` is empty; a
/// top-level call passes `labels` itself. `available_columns` lists the
/// columns the tree may split on and must not contain duplicates.
///
/// At every node the first matching rule wins:
///
/// 1. no rows reached the node: leaf with the majority of `parent_labels`
/// 2. every label is equal: leaf with that label
/// 3. no columns left: leaf with the majority of the node's labels
/// 4. otherwise split on the column with the lowest weighted post-split
///    entropy (lowest column index on ties) and recurse once per distinct
///    value of that column, with the column removed.
///
/// # Errors
///
/// | Variant                             | When                                                 |
/// |-------------------------------------|------------------------------------------------------|
/// | [`TreeError::RowLabelMismatch`]     | `rows.len() != labels.len()`                         |
/// | [`TreeError::InconsistentInput`]    | rows have differing widths                           |
/// | [`TreeError::ColumnOutOfRange`]     | a column in `available_columns` exceeds the row width |
/// | [`TreeError::EmptyInput`]           | `rows` and `parent_labels` are both empty            |
#[instrument(skip_all, fields(n_samples = rows.len(), n_columns = available_columns.len()))]
pub fn build<V, L, R>(
    parent_labels: &[L],
    rows: &[R],
    labels: &[L],
    available_columns: &[usize],
) -> Result<DecisionTree<V, L>, TreeError>
where
    V: Category,
    L: Category,
    R: AsRef<[V]>,
{
    if rows.len() != labels.len() {
        return Err(TreeError::RowLabelMismatch {
            n_rows: rows.len(),
            n_labels: labels.len(),
        });
    }

    // With no rows the width comes from the columns the caller offers.
    let n_features = match rows.first() {
        Some(r) => r.as_ref().len(),
        None => available_columns.iter().max().map_or(0, |&c| c + 1),
    };
    for (row_index, row) in rows.iter().enumerate() {
        if row.as_ref().len() != n_features {
            return Err(TreeError::InconsistentInput {
                expected: n_features,
                got: row.as_ref().len(),
                row_index,
            });
        }
    }
    if let Some(&column) = available_columns.iter().find(|&&c| c >= n_features) {
        return Err(TreeError::ColumnOutOfRange { column, n_features });
    }
    debug_assert!(
        {
            let mut sorted = available_columns.to_vec();
            sorted.sort_unstable();
            sorted.windows(2).all(|w| w[0] != w[1])
        },
        "available_columns must not contain duplicates"
    );

    let columns: Vec<FeatureIndex> = available_columns.iter().copied().map(FeatureIndex::new).collect();
    let parent: Vec<&L> = parent_labels.iter().collect();
    let samples: Vec<usize> = (0..rows.len()).collect();
    let mut arena: Vec<Node<V, L>> = Vec::new();

    let root = grow(rows, labels, &parent, &samples, &columns, &mut arena)?;

    debug!(
        root_index = root.index(),
        n_nodes = arena.len(),
        "decision tree built"
    );

    Ok(DecisionTree {
        nodes: arena,
        n_features,
    })
}

/// Recursively build the subtree for the rows in `samples`.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn grow<V, L, R>(
    rows: &[R],
    labels: &[L],
    parent_labels: &[&L],
    samples: &[usize],
    columns: &[FeatureIndex],
    arena: &mut Vec<Node<V, L>>,
) -> Result<NodeIndex, TreeError>
where
    V: Category,
    L: Category,
    R: AsRef<[V]>,
{
    let n_samples = samples.len();
    let sample_labels: Vec<&L> = samples.iter().map(|&i| &labels[i]).collect();

    let push_leaf = |arena: &mut Vec<Node<V, L>>, class: L| -> NodeIndex {
        let idx = arena.len();
        arena.push(Node::Leaf { class, n_samples });
        NodeIndex::new(idx)
    };

    if sample_labels.is_empty() {
        let class = (*majority(parent_labels)?).clone();
        return Ok(push_leaf(arena, class));
    }
    if all_same(&sample_labels) {
        return Ok(push_leaf(arena, sample_labels[0].clone()));
    }
    if columns.is_empty() {
        let class = (*majority(&sample_labels)?).clone();
        return Ok(push_leaf(arena, class));
    }

    let (best, weighted) = best_column(rows, labels, samples, columns);
    let information_gain = entropy(&sample_labels) - weighted;
    let groups = partition(rows, samples, best);

    // Arena pattern: reserve the slot, recurse, then overwrite with the split.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        class: sample_labels[0].clone(),
        n_samples,
    });

    let remaining: Vec<FeatureIndex> = columns.iter().copied().filter(|&c| c != best).collect();
    let mut branches = Vec::with_capacity(groups.len());
    for (value, subset) in groups {
        let child = grow(rows, labels, &sample_labels, &subset, &remaining, arena)?;
        branches.push(Branch {
            value: value.clone(),
            child,
        });
    }

    arena[node_idx] = Node::Split {
        feature: best,
        branches,
        information_gain,
        n_samples,
    };

    Ok(NodeIndex::new(node_idx))
}

/// Group `samples` by their value in `column`, keeping first-seen value order.
fn partition<'a, V, R>(rows: &'a [R], samples: &[usize], column: FeatureIndex) -> Vec<(&'a V, Vec<usize>)>
where
    V: Category,
    R: AsRef<[V]>,
{
    let mut slots: HashMap<&'a V, usize> = HashMap::new();
    let mut groups: Vec<(&'a V, Vec<usize>)> = Vec::new();
    for &si in samples {
        let value = &rows[si].as_ref()[column.index()];
        match slots.get(value) {
            Some(&slot) => groups[slot].1.push(si),
            None => {
                slots.insert(value, groups.len());
                groups.push((value, vec![si]));
            }
        }
    }
    groups
}

/// Weighted post-split entropy `Σ_v (|S_v| / |S|) · H(S_v)` of splitting
/// `samples` on `column`.
pub(crate) fn weighted_entropy<V, L, R>(
    rows: &[R],
    labels: &[L],
    samples: &[usize],
    column: FeatureIndex,
) -> f64
where
    V: Category,
    L: Category,
    R: AsRef<[V]>,
{
    if samples.is_empty() {
        return 0.0;
    }
    let total = samples.len() as f64;
    partition(rows, samples, column)
        .iter()
        .map(|(_, subset)| {
            let sub_labels: Vec<&L> = subset.iter().map(|&i| &labels[i]).collect();
            subset.len() as f64 / total * entropy(&sub_labels)
        })
        .sum()
}

/// Weighted entropies closer than this are treated as tied.
const TIE_TOLERANCE: f64 = 1e-12;

/// Pick the column with the strictly smallest weighted entropy, breaking
/// ties by the lowest column index. `columns` must be non-empty.
fn best_column<V, L, R>(
    rows: &[R],
    labels: &[L],
    samples: &[usize],
    columns: &[FeatureIndex],
) -> (FeatureIndex, f64)
where
    V: Category,
    L: Category,
    R: AsRef<[V]>,
{
    let mut best: Option<(FeatureIndex, f64)> = None;
    for &column in columns {
        let w = weighted_entropy(rows, labels, samples, column);
        let better = match best {
            None => true,
            Some((best_col, best_w)) => {
                w < best_w - TIE_TOLERANCE || ((w - best_w).abs() <= TIE_TOLERANCE && column < best_col)
            }
        };
        if better {
            best = Some((column, w));
        }
    }
    debug!(
        column = best.map(|b| b.0.index()),
        weighted_entropy = best.map(|b| b.1),
        n_candidates = columns.len(),
        "selected split column"
    );
    best.unwrap_or((columns[0], f64::INFINITY))
}

/// A fitted ID3 decision tree over categorical values.
///
/// Stored as an arena-based `Vec<Node>` with the root at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree<V, L> {
    pub(crate) nodes: Vec<Node<V, L>>,
    pub(crate) n_features: usize,
}

impl<V: Category, L: Category> DecisionTree<V, L> {
    /// Classify a single row.
    ///
    /// Returns `None` when the row carries a value that no training row
    /// carried at some split along its path; the caller decides the fallback.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InconsistentInput`] when `row.len() != n_features`.
    pub fn classify(&self, row: &[V]) -> Result<Option<&L>, TreeError> {
        if row.len() != self.n_features {
            return Err(TreeError::InconsistentInput {
                expected: self.n_features,
                got: row.len(),
                row_index: 0,
            });
        }
        Ok(self.traverse(row))
    }

    /// Walk from the root to a leaf. `None` on an unseen value.
    pub(crate) fn traverse(&self, row: &[V]) -> Option<&L> {
        let mut idx = NodeIndex::new(0);
        loop {
            let node = self.nodes.get(idx.index())?;
            match node {
                Node::Leaf { class, .. } => return Some(class),
                Node::Split { feature, .. } => {
                    idx = node.child_for(&row[feature.index()])?;
                }
            }
        }
    }

    /// Take an owned snapshot of the tree structure.
    ///
    /// The snapshot shares nothing with the arena, so it can be printed,
    /// serialized, or modified without touching the fitted tree.
    #[must_use]
    pub fn export(&self) -> ExportedNode<V, L> {
        self.export_node(NodeIndex::new(0))
    }

    fn export_node(&self, idx: NodeIndex) -> ExportedNode<V, L> {
        match &self.nodes[idx.index()] {
            Node::Leaf { class, .. } => ExportedNode::Leaf {
                class: class.clone(),
            },
            Node::Split {
                feature, branches, ..
            } => ExportedNode::Split {
                column: feature.index(),
                children: branches
                    .iter()
                    .map(|b| ExportedBranch {
                        value: b.value.clone(),
                        node: self.export_node(b.child),
                    })
                    .collect(),
            },
        }
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node<V, L> {
        &self.nodes[0]
    }

    /// Return the node at `idx`, if it exists.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> Option<&Node<V, L>> {
        self.nodes.get(idx.index())
    }

    /// Return all nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[Node<V, L>] {
        &self.nodes
    }

    /// Return the row width the tree was built for.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { branches, .. } => {
                    for b in branches {
                        queue.push_back((b.child.index(), d + 1));
                    }
                }
            }
        }

        max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| (*x).to_string()).collect()
    }

    fn worked_example() -> (Vec<Vec<&'static str>>, Vec<&'static str>) {
        let rows = vec![vec!["a", "x"], vec!["a", "y"], vec!["b", "x"], vec!["b", "x"]];
        let labels = vec!["yes", "no", "no", "no"];
        (rows, labels)
    }

    /// Collect the split columns on every root-to-leaf path.
    fn paths<V: Category, L: Category>(tree: &DecisionTree<V, L>) -> Vec<Vec<usize>> {
        fn walk<V: Category, L: Category>(
            tree: &DecisionTree<V, L>,
            idx: NodeIndex,
            prefix: &mut Vec<usize>,
            out: &mut Vec<Vec<usize>>,
        ) {
            match tree.node(idx).unwrap() {
                Node::Leaf { .. } => out.push(prefix.clone()),
                Node::Split {
                    feature, branches, ..
                } => {
                    prefix.push(feature.index());
                    for b in branches {
                        walk(tree, b.child, prefix, out);
                    }
                    prefix.pop();
                }
            }
        }
        let mut out = Vec::new();
        walk(tree, NodeIndex::new(0), &mut Vec::new(), &mut out);
        out
    }

    #[test]
    fn weighted_entropy_matches_worked_example() {
        let (rows, labels) = worked_example();
        let samples: Vec<usize> = (0..4).collect();
        let w0 = weighted_entropy(&rows, &labels, &samples, FeatureIndex::new(0));
        let w1 = weighted_entropy(&rows, &labels, &samples, FeatureIndex::new(1));
        assert!((w0 - 0.5).abs() < 1e-12, "w0 = {w0}");
        assert!((w1 - 0.75 * 0.918_295_834_054_489_6).abs() < 1e-9, "w1 = {w1}");
    }

    #[test]
    fn worked_example_splits_root_on_column_zero() {
        let (rows, labels) = worked_example();
        let tree = build(&labels, &rows, &labels, &[0, 1]).unwrap();
        match tree.root() {
            Node::Split {
                feature,
                branches,
                information_gain,
                n_samples,
            } => {
                assert_eq!(feature.index(), 0);
                assert_eq!(*n_samples, 4);
                let values: Vec<&str> = branches.iter().map(|b| b.value).collect();
                assert_eq!(values, vec!["a", "b"]);
                // H([yes,no,no,no]) - 0.5
                let h = entropy(&labels);
                assert!((information_gain - (h - 0.5)).abs() < 1e-12);
            }
            Node::Leaf { .. } => panic!("root should split"),
        }
        assert_eq!(tree.traverse(&["a", "x"]), Some(&"yes"));
        assert_eq!(tree.traverse(&["a", "y"]), Some(&"no"));
        assert_eq!(tree.traverse(&["b", "y"]), Some(&"no"));
        assert_eq!(tree.traverse(&["c", "x"]), None);
    }

    #[test]
    fn empty_rows_use_parent_majority() {
        let rows: Vec<Vec<&str>> = vec![];
        let labels: Vec<&str> = vec![];
        let parent = vec!["b", "a", "a"];
        let tree = build(&parent, &rows, &labels, &[0, 1]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(*tree.root(), Node::Leaf { class: "a", n_samples: 0 });
        assert_eq!(tree.n_features(), 2);
        assert_eq!(tree.classify(&["p", "q"]).unwrap(), Some(&"a"));
    }

    #[test]
    fn empty_rows_without_columns_have_zero_width() {
        let rows: Vec<Vec<&str>> = vec![];
        let labels: Vec<&str> = vec![];
        let tree = build(&["x"], &rows, &labels, &[]).unwrap();
        assert_eq!(tree.n_features(), 0);
        assert_eq!(tree.classify(&[]).unwrap(), Some(&"x"));
    }

    #[test]
    fn arena_children_stay_in_bounds() {
        let rows = vec![vec![0, 0, 1], vec![0, 1, 1], vec![1, 0, 0], vec![1, 1, 2], vec![2, 2, 0]];
        let labels = vec![0, 1, 1, 0, 1];
        let empty: Vec<Vec<i32>> = vec![];
        let trees = [
            build(&labels, &rows, &labels, &[0, 1, 2]).unwrap(),
            build(&labels, &rows, &labels, &[2]).unwrap(),
            build(&labels, &empty, &[], &[0, 1]).unwrap(),
        ];
        for tree in &trees {
            assert!(tree.n_nodes() > 0);
            for node in tree.nodes() {
                if let Node::Split { branches, .. } = node {
                    assert!(branches.iter().all(|b| b.child.index() < tree.n_nodes()));
                }
            }
            // every accessor walks the arena without going out of bounds
            let _ = tree.export();
            let _ = tree.depth();
            let _ = tree.root();
        }
    }

    #[test]
    fn empty_rows_and_parent_is_empty_input() {
        let rows: Vec<Vec<&str>> = vec![];
        let labels: Vec<&str> = vec![];
        let err = build(&labels, &rows, &labels, &[]).unwrap_err();
        assert!(matches!(err, TreeError::EmptyInput));
    }

    #[test]
    fn pure_labels_single_leaf() {
        let rows = vec![s(&["a", "x"]), s(&["b", "y"]), s(&["c", "z"])];
        let labels = s(&["ok", "ok", "ok"]);
        let tree = build(&labels, &rows, &labels, &[0, 1]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.traverse(&s(&["q", "q"])), Some(&"ok".to_string()));
    }

    #[test]
    fn no_columns_uses_local_majority() {
        let rows = vec![vec![1, 1], vec![1, 1], vec![1, 1]];
        let labels = vec!["n", "y", "y"];
        let tree = build(&labels, &rows, &labels, &[]).unwrap();
        assert_eq!(*tree.root(), Node::Leaf { class: "y", n_samples: 3 });
    }

    #[test]
    fn exhausted_columns_fall_back_to_majority_of_node() {
        // Identical rows, conflicting labels: splits until columns run out.
        let rows = vec![vec!["a"], vec!["a"], vec!["a"]];
        let labels = vec!["x", "y", "y"];
        let tree = build(&labels, &rows, &labels, &[0]).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.traverse(&["a"]), Some(&"y"));
    }

    #[test]
    fn best_column_not_last_partitions_by_selected_column() {
        // Column 1 fully determines the label; columns 0 and 2 are noise.
        // Column 1 is not the last candidate, so children must be
        // partitioned on column 1, not on the final loop candidate.
        let rows = vec![
            vec!["p", "a", "u"],
            vec!["q", "a", "v"],
            vec!["p", "b", "u"],
            vec!["q", "b", "u"],
            vec!["p", "a", "v"],
            vec!["q", "b", "v"],
        ];
        let labels = vec!["yes", "yes", "no", "no", "yes", "no"];
        let tree = build(&labels, &rows, &labels, &[0, 1, 2]).unwrap();

        match tree.root() {
            Node::Split { feature, branches, .. } => {
                assert_eq!(feature.index(), 1);
                for b in branches {
                    let child = tree.node(b.child).unwrap();
                    let expected = if b.value == "a" { "yes" } else { "no" };
                    assert_eq!(
                        *child,
                        Node::Leaf { class: expected, n_samples: 3 },
                        "branch {}",
                        b.value
                    );
                }
            }
            Node::Leaf { .. } => panic!("root should split"),
        }
        for (row, label) in rows.iter().zip(&labels) {
            assert_eq!(tree.traverse(row), Some(label));
        }
    }

    #[test]
    fn ties_break_on_lowest_column_index() {
        // Columns 0 and 2 are identical, so their weighted entropies tie.
        let rows = vec![vec!["a", "k", "a"], vec!["b", "k", "b"], vec!["a", "m", "a"], vec!["b", "m", "b"]];
        let labels = vec![1, 2, 1, 2];
        let tree = build(&labels, &rows, &labels, &[2, 1, 0]).unwrap();
        match tree.root() {
            Node::Split { feature, .. } => assert_eq!(feature.index(), 0),
            Node::Leaf { .. } => panic!("root should split"),
        }
    }

    #[test]
    fn xor_needs_depth_two_and_paths_never_repeat_columns() {
        let rows = vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]];
        let labels = vec![0, 1, 1, 0];
        let tree = build(&labels, &rows, &labels, &[0, 1]).unwrap();
        assert_eq!(tree.depth(), 2);
        for path in paths(&tree) {
            let mut dedup = path.clone();
            dedup.sort_unstable();
            dedup.dedup();
            assert_eq!(dedup.len(), path.len(), "column reused on path {path:?}");
        }
        for (row, label) in rows.iter().zip(&labels) {
            assert_eq!(tree.traverse(row), Some(label));
        }
    }

    #[test]
    fn split_branches_have_unique_values() {
        let rows = vec![vec!["r"], vec!["g"], vec!["r"], vec!["b"], vec!["g"]];
        let labels = vec![1, 2, 1, 3, 2];
        let tree = build(&labels, &rows, &labels, &[0]).unwrap();
        for node in tree.nodes() {
            if let Node::Split { branches, .. } = node {
                let mut values: Vec<&str> = branches.iter().map(|b| b.value).collect();
                let n = values.len();
                values.sort_unstable();
                values.dedup();
                assert_eq!(values.len(), n);
            }
        }
        assert_eq!(tree.n_leaves(), 3);
    }

    #[test]
    fn leaves_are_created_before_their_parent_is_filled() {
        let (rows, labels) = worked_example();
        let tree = build(&labels, &rows, &labels, &[0, 1]).unwrap();
        // Root reserved first, every child index is after its parent.
        for (i, node) in tree.nodes().iter().enumerate() {
            if let Node::Split { branches, .. } = node {
                assert!(branches.iter().all(|b| b.child.index() > i));
            }
        }
    }

    #[test]
    fn row_label_mismatch_error() {
        let rows = vec![vec!["a"], vec!["b"]];
        let labels = vec!["x"];
        let err = build(&labels, &rows, &labels, &[0]).unwrap_err();
        assert!(matches!(err, TreeError::RowLabelMismatch { n_rows: 2, n_labels: 1 }));
    }

    #[test]
    fn ragged_rows_error() {
        let rows = vec![vec!["a", "b"], vec!["c"]];
        let labels = vec!["x", "y"];
        let err = build(&labels, &rows, &labels, &[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            TreeError::InconsistentInput { expected: 2, got: 1, row_index: 1 }
        ));
    }

    #[test]
    fn column_out_of_range_error() {
        let rows = vec![vec!["a"], vec!["c"]];
        let labels = vec!["x", "y"];
        let err = build(&labels, &rows, &labels, &[0, 3]).unwrap_err();
        assert!(matches!(err, TreeError::ColumnOutOfRange { column: 3, n_features: 1 }));
    }

    #[test]
    fn classify_width_mismatch() {
        let (rows, labels) = worked_example();
        let tree = build(&labels, &rows, &labels, &[0, 1]).unwrap();
        let err = tree.classify(&["a"]).unwrap_err();
        assert!(matches!(err, TreeError::InconsistentInput { expected: 2, got: 1, .. }));
    }

    #[test]
    fn export_mirrors_arena() {
        let (rows, labels) = worked_example();
        let tree = build(&labels, &rows, &labels, &[0, 1]).unwrap();
        let exported = tree.export();
        match exported {
            ExportedNode::Split { column, children } => {
                assert_eq!(column, 0);
                assert_eq!(children.len(), 2);
                assert_eq!(children[1].value, "b");
                assert_eq!(children[1].node, ExportedNode::Leaf { class: "no" });
            }
            ExportedNode::Leaf { .. } => panic!("root should split"),
        }
    }
}
