//! Search loop
//!
//! Implements the anytime MCTS iteration, repeated until the deadline:
//! 1. Descent - Use UCB1 to walk down to a leaf
//! 2. Expansion - Materialize one child per pruned action
//! 3. Simulation - Rollout from the chosen node
//! 4. Backpropagation - Update statistics up to the root
//!
//! ## Architecture
//! - Level 2: `run_search` (coordination and final choice)
//! - Level 3: Individual MCTS phases
//! - Level 4: Statistics collection

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::pruner::pruned_actions;
use crate::reward::ContinentInfo;
use crate::rollout::{RolloutEngine, RolloutResult};
use crate::tree::{NodeId, SearchTree};
use crate::ucb::{score, select_best};
use risk_core::{Action, PlayerId, RiskGame};
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

// ============================================================================
// SEARCH OUTCOME
// ============================================================================

/// Result of one decision
#[derive(Clone, Debug, Serialize)]
pub struct SearchOutcome {
    /// The recommended action
    pub action: Action,
    /// Completed simulations (root visits)
    pub iterations: u32,
    /// Nodes in the tree when the search stopped
    pub tree_size: usize,
    /// Statistics of every root child, in expansion order
    pub children: Vec<ChildStatistics>,
}

/// Statistics for a single root child
#[derive(Clone, Debug, Serialize)]
pub struct ChildStatistics {
    pub action: Action,
    pub visits: u32,
    pub total: f64,
    /// UCB score at the end of the search
    pub score: f64,
}

impl SearchOutcome {
    /// Statistics of the chosen action
    pub fn chosen(&self) -> Option<&ChildStatistics> {
        self.children.iter().find(|c| c.action == self.action)
    }
}

// ============================================================================
// SEARCH LOOP (Level 2 - Main Coordination)
// ============================================================================

/// Run a search from `root_state` until `deadline`
///
/// Expands the root before the first deadline check, so a recommendation
/// exists even when no simulation completes.
pub fn run_search<G: RiskGame, R: Rng>(
    root_state: &G,
    deadline: Instant,
    config: &SearchConfig,
    continents: &[ContinentInfo],
    opponents: &mut FxHashSet<PlayerId>,
    rng: &mut R,
) -> SearchResult<SearchOutcome> {
    if root_state.is_terminal() {
        return Err(SearchError::DecisionOnTerminalState);
    }

    let mut search = Search::new(root_state, deadline, config, continents, opponents, rng);
    let root = search.tree.root();
    search.expand(root)?;

    while Instant::now() < deadline {
        search.iterate()?;
    }

    let best = select_best(&search.tree, root, config.exploration).ok_or(SearchError::NoLegalActions)?;
    let outcome = search.outcome(best)?;
    log_outcome(&outcome);
    Ok(outcome)
}

/// Mutable state of one running search
struct Search<'a, 'r, G, R> {
    tree: SearchTree<G>,
    engine: RolloutEngine<'a>,
    exploration: f64,
    total_budget: u32,
    /// Steps allowed per rollout, set by the last expansion
    rollout_steps: u32,
    opponents: &'r mut FxHashSet<PlayerId>,
    rng: &'r mut R,
}

impl<'a, 'r, G: RiskGame, R: Rng> Search<'a, 'r, G, R> {
    fn new(
        root_state: &G,
        deadline: Instant,
        config: &'a SearchConfig,
        continents: &'a [ContinentInfo],
        opponents: &'r mut FxHashSet<PlayerId>,
        rng: &'r mut R,
    ) -> Self {
        Self {
            tree: SearchTree::new(root_state.clone()),
            engine: RolloutEngine::new(config, continents, deadline),
            exploration: config.exploration,
            total_budget: config.total_rollout_budget,
            rollout_steps: config.total_rollout_budget,
            opponents,
            rng,
        }
    }

    // ========================================================================
    // Level 3: MCTS phases
    // ========================================================================

    /// One descend / expand / simulate / backpropagate pass
    fn iterate(&mut self) -> SearchResult<()> {
        let leaf = self.descend();
        let target = if self.tree.get(leaf).is_visited() {
            self.expand(leaf)?;
            select_best(&self.tree, leaf, self.exploration).unwrap_or(leaf)
        } else {
            leaf
        };
        let result = self.simulate(target)?;
        self.tree.backpropagate(target, result.value);
        Ok(())
    }

    /// Follow UCB choices from the root down to a node without children
    fn descend(&self) -> NodeId {
        let mut current = self.tree.root();
        while let Some(child) = select_best(&self.tree, current, self.exploration) {
            current = child;
        }
        current
    }

    /// Add one child per pruned action of the node's state
    ///
    /// Terminal and already expanded nodes are left alone. A live node
    /// without legal actions is an error. Resets the per-rollout step
    /// budget to the total budget split across the new children.
    fn expand(&mut self, node_id: NodeId) -> SearchResult<()> {
        let node = self.tree.get(node_id);
        if node.expanded || node.state.is_terminal() {
            return Ok(());
        }

        let state = node.state.clone();
        let actions = pruned_actions(&state, state.current_player())?;
        if actions.is_empty() {
            return Err(SearchError::NoLegalActions);
        }
        for action in &actions {
            let child_state = state.apply(action)?;
            self.tree.add_child(node_id, *action, child_state);
        }
        self.tree.get_mut(node_id).expanded = true;

        self.rollout_steps = (self.total_budget / actions.len() as u32).max(1);
        debug!(
            node = node_id.0,
            children = actions.len(),
            rollout_steps = self.rollout_steps,
            "expanded"
        );
        Ok(())
    }

    /// Rollout from a node; the parent's state is the "before" position
    fn simulate(&mut self, node_id: NodeId) -> SearchResult<RolloutResult> {
        let node = self.tree.get(node_id);
        let previous = match (node.parent, node.action) {
            (Some(parent), Some(action)) => Some((&self.tree.get(parent).state, action)),
            _ => None,
        };
        self.engine.simulate(
            &node.state,
            previous,
            self.rollout_steps,
            &mut *self.opponents,
            &mut *self.rng,
        )
    }

    // ========================================================================
    // Level 4: Statistics
    // ========================================================================

    fn outcome(&self, best: NodeId) -> SearchResult<SearchOutcome> {
        let root = self.tree.root();
        let action = self.tree.get(best).action.ok_or(SearchError::NoLegalActions)?;
        let children = self
            .tree
            .get(root)
            .children
            .iter()
            .filter_map(|&id| {
                let node = self.tree.get(id);
                Some(ChildStatistics {
                    action: node.action?,
                    visits: node.stats.visits,
                    total: node.stats.total,
                    score: score(&self.tree, id, self.exploration),
                })
            })
            .collect();

        Ok(SearchOutcome {
            action,
            iterations: self.tree.total_simulations(),
            tree_size: self.tree.len(),
            children,
        })
    }
}

fn log_outcome(outcome: &SearchOutcome) {
    for child in &outcome.children {
        debug!(
            action = %child.action,
            visits = child.visits,
            total = child.total,
            score = child.score,
            "root child"
        );
    }
    match outcome.chosen() {
        Some(chosen) => info!(
            action = %outcome.action,
            score = chosen.score,
            total = chosen.total,
            visits = chosen.visits,
            out_of = outcome.children.len(),
            iterations = outcome.iterations,
            "best one taken"
        ),
        None => info!(action = %outcome.action, "best one taken"),
    }
}

// ============================================================================
// TESTS
// ============================================================================
