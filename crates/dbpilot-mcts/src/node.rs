use std::fmt;

use serde::{Deserialize, Serialize};

use dbpilot_core::id::ActionId;

/// Index of a node inside its `SearchTree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One point in the space of action sequences.
///
/// `visits` counts the leaves in this node's subtree; a leaf counts itself.
/// `cost` is an oracle evaluation for a leaf and the mean of the children's
/// costs for an internal node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchNode {
    pub(crate) depth: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) action: Option<ActionId>,
    pub(crate) cost: f64,
    pub(crate) visits: u64,
    pub(crate) is_leaf: bool,
    pub(crate) exhausted: bool,
}

impl SearchNode {
    pub(crate) fn leaf(depth: usize, parent: Option<NodeId>, action: Option<ActionId>, cost: f64) -> Self {
        Self {
            depth,
            parent,
            children: Vec::new(),
            action,
            cost,
            visits: 1,
            is_leaf: true,
            exhausted: false,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Action that produced this node; `None` only for the root.
    pub fn action(&self) -> Option<ActionId> {
        self.action
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn visits(&self) -> u64 {
        self.visits
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
