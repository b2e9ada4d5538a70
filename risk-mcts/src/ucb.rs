//! UCB1 selection policy
//!
//! The exploitation term is the node's total value, not its mean. The
//! default exploration constant is tuned against that scale and the
//! rollout sentinels, so the two only change together.

use crate::tree::{NodeId, SearchTree};
use risk_core::RiskGame;

/// Score of a node that was never simulated; beats every visited score
pub const UNVISITED_SCORE: f64 = f64::INFINITY;

/// UCB1 score of a node relative to its parent
///
/// `total + c * sqrt(ln(parent_visits) / visits)`. Visited scores are
/// capped at `f64::MAX` so they always stay below [`UNVISITED_SCORE`].
pub fn score<G: RiskGame>(tree: &SearchTree<G>, node_id: NodeId, exploration: f64) -> f64 {
    let node = tree.get(node_id);
    let visits = node.stats.visits;
    if visits == 0 {
        return UNVISITED_SCORE;
    }

    let parent_visits = node
        .parent
        .map(|p| tree.get(p).stats.visits)
        .unwrap_or(visits)
        .max(1);
    let exploration_term = exploration * ((parent_visits as f64).ln() / visits as f64).sqrt();

    (node.stats.total + exploration_term).min(f64::MAX)
}

/// Best child of a node
///
/// Returns the first unvisited child without scanning further; otherwise
/// the child with the strictly greatest score, earlier children winning
/// ties. `None` when the node has no children.
pub fn select_best<G: RiskGame>(tree: &SearchTree<G>, node_id: NodeId, exploration: f64) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for &child in &tree.get(node_id).children {
        let value = score(tree, child, exploration);
        if value == UNVISITED_SCORE {
            return Some(child);
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((child, value)),
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_core::{Action, Board, RiskState};
    use std::sync::Arc;

    fn tree_with_children(n: usize) -> (SearchTree<RiskState>, Vec<NodeId>) {
        let state = RiskState::new(Arc::new(Board::classic_mini()), 2, 0).unwrap();
        let mut tree = SearchTree::new(state.clone());
        let children = (0..n)
            .map(|t| tree.add_child(NodeId::ROOT, Action::Place { territory: t }, state.clone()))
            .collect();
        (tree, children)
    }

    fn set_stats(tree: &mut SearchTree<RiskState>, id: NodeId, visits: u32, total: f64) {
        let stats = &mut tree.get_mut(id).stats;
        stats.visits = visits;
        stats.total = total;
    }

    #[test]
    fn test_single_unvisited_child_is_selected() {
        let (tree, children) = tree_with_children(1);
        assert_eq!(select_best(&tree, NodeId::ROOT, 8000.0), Some(children[0]));
    }

    #[test]
    fn test_no_children() {
        let (tree, _) = tree_with_children(0);
        assert_eq!(select_best(&tree, NodeId::ROOT, 1.0), None);
    }

    #[test]
    fn test_fewer_visits_score_higher() {
        let (mut tree, children) = tree_with_children(2);
        set_stats(&mut tree, NodeId::ROOT, 5, 10.0);
        set_stats(&mut tree, children[0], 1, 5.0);
        set_stats(&mut tree, children[1], 4, 5.0);

        let first = score(&tree, children[0], 2.0);
        let second = score(&tree, children[1], 2.0);
        let ln5 = 5f64.ln();
        assert!((first - (5.0 + 2.0 * ln5.sqrt())).abs() < 1e-9);
        assert!((second - (5.0 + 2.0 * (ln5 / 4.0).sqrt())).abs() < 1e-9);
        assert!(first > second);
        assert_eq!(select_best(&tree, NodeId::ROOT, 2.0), Some(children[0]));
    }

    #[test]
    fn test_uses_total_not_mean() {
        let (mut tree, children) = tree_with_children(2);
        set_stats(&mut tree, NodeId::ROOT, 11, 0.0);
        // Higher mean, lower total
        set_stats(&mut tree, children[0], 1, 10.0);
        set_stats(&mut tree, children[1], 10, 50.0);
        assert_eq!(select_best(&tree, NodeId::ROOT, 0.0), Some(children[1]));
    }

    #[test]
    fn test_unvisited_short_circuits() {
        let (mut tree, children) = tree_with_children(4);
        set_stats(&mut tree, NodeId::ROOT, 100, 0.0);
        set_stats(&mut tree, children[0], 50, 1e300);
        set_stats(&mut tree, children[1], 50, 0.0);
        // children[2] and children[3] unvisited
        assert_eq!(select_best(&tree, NodeId::ROOT, 8000.0), Some(children[2]));
    }

    #[test]
    fn test_ties_go_to_first_child() {
        let (mut tree, children) = tree_with_children(3);
        set_stats(&mut tree, NodeId::ROOT, 9, 9.0);
        for &child in &children {
            set_stats(&mut tree, child, 3, 3.0);
        }
        assert_eq!(select_best(&tree, NodeId::ROOT, 8000.0), Some(children[0]));
    }

    #[test]
    fn test_unvisited_beats_any_finite_score() {
        let (mut tree, children) = tree_with_children(2);
        set_stats(&mut tree, NodeId::ROOT, u32::MAX, 0.0);
        let unvisited = score(&tree, children[1], 8000.0);
        for (visits, total) in [(1, f64::MAX), (1, -f64::MAX), (7, 0.0), (u32::MAX, 1e308)] {
            set_stats(&mut tree, children[0], visits, total);
            assert!(unvisited > score(&tree, children[0], 8000.0));
        }
    }
}
