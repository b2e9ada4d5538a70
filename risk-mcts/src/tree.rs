//! Search tree and node management
//!
//! Uses arena allocation: nodes live in one `Vec` and refer to each other
//! by index. Dropping the tree frees every node at once.
//!
//! ## Architecture
//! - Level 2: Tree operations (add_child, backpropagate)
//! - Level 3: Node accessors
//! - Level 4: Statistics, utilities

use risk_core::{Action, RiskGame};

// ============================================================================
// TYPES
// ============================================================================

/// Node identifier (index into arena)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// Statistics for a tree node
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeStats {
    /// Number of backpropagations through this node
    pub visits: u32,
    /// Sum (not mean) of every backpropagated value
    pub total: f64,
}

impl NodeStats {
    /// Mean value, for reporting only
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total / self.visits as f64
        }
    }
}

/// A node in the search tree
///
/// `state` is the position after `action` was applied to the parent's
/// state; the root holds the position being decided.
#[derive(Clone, Debug)]
pub struct SearchNode<G> {
    pub state: G,
    /// Move that led to this node (None for root)
    pub action: Option<Action>,
    /// Parent node (None for root), fixed at construction
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub stats: NodeStats,
    /// Set once children have been materialized (possibly none)
    pub expanded: bool,
}

impl<G> SearchNode<G> {
    fn new(state: G, action: Option<Action>, parent: Option<NodeId>) -> Self {
        Self {
            state,
            action,
            parent,
            children: Vec::new(),
            stats: NodeStats::default(),
            expanded: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_visited(&self) -> bool {
        self.stats.visits > 0
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ============================================================================
// SEARCH TREE (Level 2 - Tree Operations)
// ============================================================================

/// Search tree with arena allocation
#[derive(Debug)]
pub struct SearchTree<G> {
    nodes: Vec<SearchNode<G>>,
}

impl<G: RiskGame> SearchTree<G> {
    /// Create a new tree with a parentless, action-less root
    pub fn new(root_state: G) -> Self {
        Self {
            nodes: vec![SearchNode::new(root_state, None, None)],
        }
    }

    /// Get the root node id
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a reference to a node
    pub fn get(&self, id: NodeId) -> &SearchNode<G> {
        &self.nodes[id.0]
    }

    /// Get a mutable reference to a node
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode<G> {
        &mut self.nodes[id.0]
    }

    /// Get the number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a child holding `state`, reached from `parent` by `action`
    pub fn add_child(&mut self, parent: NodeId, action: Action, state: G) -> NodeId {
        let child_id = NodeId(self.nodes.len());
        self.nodes.push(SearchNode::new(state, Some(action), Some(parent)));
        self.get_mut(parent).children.push(child_id);
        child_id
    }

    /// Add `value` to the node and every ancestor up to the root
    pub fn backpropagate(&mut self, node_id: NodeId, value: f64) {
        let mut current = Some(node_id);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.stats.visits += 1;
            node.stats.total += value;
            current = node.parent;
        }
    }

    // ========================================================================
    // Level 4: Statistics
    // ========================================================================

    /// Number of edges between the node and the root
    pub fn depth(&self, node_id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(node_id).parent;
        while let Some(id) = current {
            depth += 1;
            current = self.get(id).parent;
        }
        depth
    }

    /// Completed simulations (root visits)
    pub fn total_simulations(&self) -> u32 {
        self.get(self.root()).stats.visits
    }

    /// `(action, stats)` of every root child, in expansion order
    pub fn root_statistics(&self) -> Vec<(Action, NodeStats)> {
        self.get(self.root())
            .children
            .iter()
            .filter_map(|&id| {
                let node = self.get(id);
                node.action.map(|action| (action, node.stats))
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
