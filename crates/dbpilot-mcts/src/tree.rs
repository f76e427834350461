//! Arena-backed search tree.
//!
//! Children are owned by the arena and listed by index on their parent; the
//! parent index is only used to walk upward when costs and visit counts
//! change. The whole arena is dropped with the tree at the end of a cycle.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use dbpilot_core::id::ActionId;

use crate::error::{Result, SearchError};
use crate::node::{NodeId, SearchNode};

#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    rng: StdRng,
    exploration_weight: f64,
}

impl SearchTree {
    /// Fresh tree holding only a root leaf evaluated at `root_cost`.
    pub fn new(root_cost: f64, seed: Option<u64>, exploration_weight: f64) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            nodes: vec![SearchNode::leaf(0, None, None, root_cost)],
            rng,
            exploration_weight,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&SearchNode> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&SearchNode> {
        self.get(id).ok_or(SearchError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SearchNode> {
        self.nodes.get_mut(id.0).ok_or(SearchError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SearchNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Mean of the children's current costs. Zero children is an error, not 0.
    pub fn compute_cost_from_children(&self, id: NodeId) -> Result<f64> {
        let node = self.node(id)?;
        if node.children.is_empty() {
            return Err(SearchError::EmptyChildSet(id));
        }
        let sum: f64 = node.children.iter().map(|c| self.nodes[c.0].cost).sum();
        Ok(sum / node.children.len() as f64)
    }

    /// Turn leaf `parent` into an internal node with one child per
    /// `(action, cost)` pair, then propagate the change to every ancestor.
    pub fn attach_children(
        &mut self,
        parent: NodeId,
        children: Vec<(ActionId, f64)>,
    ) -> Result<Vec<NodeId>> {
        if children.is_empty() {
            return Err(SearchError::EmptyChildSet(parent));
        }
        let node = self.node(parent)?;
        if !node.is_leaf {
            return Err(SearchError::NotALeaf(parent));
        }
        let depth = node.depth + 1;
        let old_leaf_cost = node.cost;

        let first = self.nodes.len();
        for (action, cost) in children {
            self.nodes
                .push(SearchNode::leaf(depth, Some(parent), Some(action), cost));
        }
        let ids: Vec<NodeId> = (first..self.nodes.len()).map(NodeId).collect();
        let num_children = ids.len();

        let p = &mut self.nodes[parent.0];
        p.children = ids.clone();
        p.is_leaf = false;
        p.visits = num_children as u64;
        let new_leaf_cost = self.compute_cost_from_children(parent)?;
        self.nodes[parent.0].cost = new_leaf_cost;

        self.update_cost_and_visits(parent, num_children, old_leaf_cost, new_leaf_cost)?;
        Ok(ids)
    }

    /// Propagate the expansion of `expanded` into `num_children` leaves: every
    /// ancestor gains `num_children - 1` visits and re-averages its children.
    pub fn update_cost_and_visits(
        &mut self,
        expanded: NodeId,
        num_children: usize,
        old_leaf_cost: f64,
        new_leaf_cost: f64,
    ) -> Result<()> {
        trace!(
            node = %expanded,
            num_children,
            old_leaf_cost,
            new_leaf_cost,
            "propagating expansion"
        );
        let extra = num_children.saturating_sub(1) as u64;
        let mut cursor = self.node(expanded)?.parent;
        while let Some(id) = cursor {
            let cost = self.compute_cost_from_children(id)?;
            let node = self.node_mut(id)?;
            node.visits += extra;
            node.cost = cost;
            cursor = node.parent;
        }
        Ok(())
    }

    /// Stochastic pick among the non-exhausted children of `id`.
    ///
    /// Weight is the child's normalized cost advantage (1 for the cheapest,
    /// 0 for the most expensive) plus `c * sqrt(2 ln N / n)` where `N` and `n`
    /// are the parent's and child's visit counts.
    pub fn sample_child(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let node = self.node(id)?;
        let candidates: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|c| !self.nodes[c.0].exhausted)
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        if candidates.len() == 1 {
            return Ok(Some(candidates[0]));
        }

        let parent_visits = node.visits.max(1) as f64;
        let costs: Vec<f64> = candidates.iter().map(|c| self.nodes[c.0].cost).collect();
        let max = costs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = costs.iter().copied().fold(f64::INFINITY, f64::min);
        let range = if max - min > 0.0 { max - min } else { 1.0 };

        let weights: Vec<f64> = candidates
            .iter()
            .zip(&costs)
            .map(|(c, cost)| {
                let visits = self.nodes[c.0].visits.max(1) as f64;
                let exploit = (max - cost) / range;
                let explore =
                    self.exploration_weight * (2.0 * parent_visits.ln() / visits).sqrt();
                exploit + explore
            })
            .collect();

        let pick = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            // all weights zero: fall back to uniform
            Err(_) => self.rng.gen_range(0..candidates.len()),
        };
        Ok(Some(candidates[pick]))
    }

    /// Cheapest child of `id`; ties go to the earliest attached.
    pub fn best_child(&self, id: NodeId) -> Result<Option<NodeId>> {
        let node = self.node(id)?;
        let mut best: Option<NodeId> = None;
        for &child in &node.children {
            let cost = self.nodes[child.0].cost;
            match best {
                Some(b) if self.nodes[b.0].cost <= cost => {}
                _ => best = Some(child),
            }
        }
        Ok(best)
    }

    /// Walk from the root to a leaf with `sample_child`. `None` once the
    /// whole tree is exhausted.
    pub fn select_leaf(&mut self) -> Result<Option<NodeId>> {
        let mut cursor = self.root();
        loop {
            let node = self.node(cursor)?;
            if node.exhausted {
                return Ok(None);
            }
            if node.is_leaf {
                return Ok(Some(cursor));
            }
            match self.sample_child(cursor)? {
                Some(child) => cursor = child,
                None => {
                    self.mark_exhausted(cursor)?;
                    return Ok(None);
                }
            }
        }
    }

    /// Actions from the root down to `id`, in application order.
    pub fn path_actions(&self, id: NodeId) -> Result<Vec<ActionId>> {
        let mut actions = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            if let Some(action) = node.action {
                actions.push(action);
            }
            cursor = node.parent;
        }
        actions.reverse();
        Ok(actions)
    }

    /// Mark `id` as unexpandable; ancestors whose children are now all
    /// exhausted are marked too.
    pub fn mark_exhausted(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.exhausted = true;
        let mut cursor = self.node(id)?.parent;
        while let Some(parent) = cursor {
            let node = self.node(parent)?;
            let all_done = node.children.iter().all(|c| self.nodes[c.0].exhausted);
            if !all_done {
                break;
            }
            let node = self.node_mut(parent)?;
            node.exhausted = true;
            cursor = node.parent;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify;

    fn a(id: u64) -> ActionId {
        ActionId::new(id)
    }

    #[test]
    fn root_is_a_leaf_without_action() {
        let tree = SearchTree::new(42.0, Some(1), 1.0);
        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.action(), None);
        assert_eq!(root.visits(), 1);
        assert_eq!(root.cost(), 42.0);
    }

    #[test]
    fn zero_children_rejected() {
        let mut tree = SearchTree::new(1.0, Some(1), 1.0);
        let root = tree.root();
        assert!(matches!(
            tree.compute_cost_from_children(root),
            Err(SearchError::EmptyChildSet(_))
        ));
        assert!(matches!(
            tree.attach_children(root, vec![]),
            Err(SearchError::EmptyChildSet(_))
        ));
        // unchanged
        assert!(tree.node(root).unwrap().is_leaf());
    }

    #[test]
    fn three_level_propagation() {
        let mut tree = SearchTree::new(100.0, Some(7), 1.0);
        let root = tree.root();

        let level1 = tree
            .attach_children(root, vec![(a(1), 10.0), (a(2), 20.0)])
            .unwrap();
        assert_eq!(tree.node(root).unwrap().visits(), 2);
        assert_eq!(tree.node(root).unwrap().cost(), 15.0);

        let level2 = tree
            .attach_children(level1[0], vec![(a(3), 4.0), (a(4), 8.0), (a(5), 6.0)])
            .unwrap();
        let mid = tree.node(level1[0]).unwrap();
        assert_eq!(mid.visits(), 3);
        assert_eq!(mid.cost(), 6.0);
        assert_eq!(tree.node(root).unwrap().visits(), 4);
        assert_eq!(tree.node(root).unwrap().cost(), 13.0);

        tree.attach_children(level2[2], vec![(a(2), 2.0), (a(1), 4.0)])
            .unwrap();
        // level2[2]: 3.0, level1[0]: (4 + 8 + 3) / 3 = 5.0, root: (5 + 20) / 2
        assert_eq!(tree.node(level2[2]).unwrap().cost(), 3.0);
        assert_eq!(tree.node(level1[0]).unwrap().cost(), 5.0);
        assert_eq!(tree.node(level1[0]).unwrap().visits(), 4);
        assert_eq!(tree.node(root).unwrap().visits(), 5);
        assert_eq!(tree.node(root).unwrap().cost(), 12.5);
        assert_eq!(tree.node(level2[2]).unwrap().depth(), 2);

        verify::assert_consistent(&tree);
    }

    #[test]
    fn expanding_an_internal_node_fails() {
        let mut tree = SearchTree::new(1.0, Some(1), 1.0);
        let root = tree.root();
        tree.attach_children(root, vec![(a(1), 1.0)]).unwrap();
        assert!(matches!(
            tree.attach_children(root, vec![(a(2), 1.0)]),
            Err(SearchError::NotALeaf(_))
        ));
    }

    #[test]
    fn best_child_is_argmin_with_insertion_order_ties() {
        let mut tree = SearchTree::new(0.0, Some(1), 1.0);
        let root = tree.root();
        let kids = tree
            .attach_children(root, vec![(a(1), 10.0), (a(2), 5.0), (a(3), 20.0), (a(4), 5.0)])
            .unwrap();
        assert_eq!(tree.best_child(root).unwrap(), Some(kids[1]));
        assert_eq!(tree.best_child(kids[0]).unwrap(), None);
    }

    #[test]
    fn sample_child_skips_exhausted_and_prefers_cheap() {
        let mut tree = SearchTree::new(0.0, Some(3), 0.0);
        let root = tree.root();
        let kids = tree
            .attach_children(root, vec![(a(1), 1.0), (a(2), 100.0), (a(3), 50.0)])
            .unwrap();
        tree.mark_exhausted(kids[2]).unwrap();

        // no exploration: the most expensive live child has weight 0
        for _ in 0..50 {
            assert_eq!(tree.sample_child(root).unwrap(), Some(kids[0]));
        }

        tree.mark_exhausted(kids[0]).unwrap();
        assert_eq!(tree.sample_child(root).unwrap(), Some(kids[1]));
        tree.mark_exhausted(kids[1]).unwrap();
        assert_eq!(tree.sample_child(root).unwrap(), None);
        assert!(tree.node(root).unwrap().is_exhausted());
        assert_eq!(tree.select_leaf().unwrap(), None);
    }

    #[test]
    fn exploration_favors_the_less_visited_child() {
        let pick_rate_of_unvisited = |exploration_weight: f64| {
            let mut tree = SearchTree::new(0.0, Some(11), exploration_weight);
            let root = tree.root();
            let kids = tree
                .attach_children(root, vec![(a(1), 10.0), (a(2), 10.0)])
                .unwrap();
            // equal costs; kids[0] ends with 3 visits, kids[1] with 1
            tree.attach_children(kids[0], vec![(a(3), 10.0), (a(4), 10.0), (a(5), 10.0)])
                .unwrap();
            assert_eq!(tree.node(kids[0]).unwrap().visits(), 3);
            assert_eq!(tree.node(kids[1]).unwrap().visits(), 1);
            assert_eq!(tree.node(root).unwrap().visits(), 4);

            let draws = 2000;
            let hits = (0..draws)
                .filter(|_| tree.sample_child(root).unwrap() == Some(kids[1]))
                .count();
            hits as f64 / draws as f64
        };

        // weights sqrt(2 ln 4 / 1) vs sqrt(2 ln 4 / 3): about 0.63 for the
        // single-visit child
        let explored = pick_rate_of_unvisited(1.0);
        assert!(explored > 0.57 && explored < 0.70, "rate {explored}");

        // without exploration the weights are all zero and picks are uniform
        let uniform = pick_rate_of_unvisited(0.0);
        assert!(uniform > 0.43 && uniform < 0.57, "rate {uniform}");
    }

    #[test]
    fn sampling_is_reproducible_with_a_seed() {
        let build = || {
            let mut tree = SearchTree::new(0.0, Some(99), 1.0);
            let root = tree.root();
            tree.attach_children(root, (1..=6).map(|i| (a(i), i as f64)).collect())
                .unwrap();
            (0..20)
                .map(|_| tree.sample_child(root).unwrap().unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn path_actions_in_application_order() {
        let mut tree = SearchTree::new(0.0, Some(1), 1.0);
        let root = tree.root();
        let l1 = tree.attach_children(root, vec![(a(7), 1.0)]).unwrap();
        let l2 = tree.attach_children(l1[0], vec![(a(3), 1.0)]).unwrap();
        assert_eq!(tree.path_actions(l2[0]).unwrap(), vec![a(7), a(3)]);
        assert!(tree.path_actions(root).unwrap().is_empty());
        assert_eq!(tree.select_leaf().unwrap(), Some(l2[0]));
    }
}
