//! Debug-time verification helpers for search trees.
//!
//! Used by tests and, in debug builds, after every expansion. They walk the
//! whole arena, so keep them out of release hot paths.

use crate::node::NodeId;
use crate::tree::SearchTree;

const EPS: f64 = 1e-9;

/// Every internal node's cost is the mean of its children's costs.
pub fn assert_mean_costs(tree: &SearchTree) {
    for (id, node) in tree.nodes() {
        if node.is_leaf() {
            continue;
        }
        let mean = tree
            .compute_cost_from_children(id)
            .unwrap_or_else(|e| panic!("internal node {id}: {e}"));
        let tol = EPS * mean.abs().max(1.0);
        assert!(
            (node.cost() - mean).abs() <= tol,
            "node {id} cost {} != children mean {mean}",
            node.cost()
        );
    }
}

/// Every node's visit count equals the number of leaves in its subtree.
pub fn assert_visit_counts(tree: &SearchTree) {
    for (id, node) in tree.nodes() {
        let leaves = count_leaves(tree, id);
        assert_eq!(
            node.visits(),
            leaves,
            "node {id} has {} visits but {leaves} leaves",
            node.visits()
        );
    }
}

/// Parent and child indices agree, depths increase by one, only the root
/// lacks an action.
pub fn assert_links(tree: &SearchTree) {
    for (id, node) in tree.nodes() {
        assert_eq!(node.is_leaf(), node.children().is_empty(), "node {id} leaf flag");
        match node.parent() {
            None => {
                assert_eq!(id, tree.root(), "orphan node {id}");
                assert!(node.action().is_none(), "root carries an action");
                assert_eq!(node.depth(), 0);
            }
            Some(p) => {
                let parent = tree
                    .get(p)
                    .unwrap_or_else(|| panic!("node {id} points at missing parent {p}"));
                assert!(parent.children().contains(&id), "{p} does not list child {id}");
                assert_eq!(node.depth(), parent.depth() + 1, "node {id} depth");
                assert!(node.action().is_some(), "non-root node {id} has no action");
            }
        }
    }
}

pub fn assert_consistent(tree: &SearchTree) {
    assert_links(tree);
    assert_visit_counts(tree);
    assert_mean_costs(tree);
}

fn count_leaves(tree: &SearchTree, id: NodeId) -> u64 {
    let mut stack = vec![id];
    let mut leaves = 0;
    while let Some(n) = stack.pop() {
        let Some(node) = tree.get(n) else { continue };
        if node.is_leaf() {
            leaves += 1;
        } else {
            stack.extend_from_slice(node.children());
        }
    }
    leaves
}
