//! Action pruning and grouping
//!
//! Shrinks the legal-action set before it reaches the tree. Each rule
//! only runs in its own phase and only removes actions the heuristics
//! consider dominated or redundant.
//!
//! ## Architecture
//! - Level 2: `pruned_actions` (full pipeline)
//! - Level 3: grouping and the per-phase pruning rules

use crate::analysis::{enemy_distance_map, is_enemy_territory};
use crate::error::{SearchError, SearchResult};
use risk_core::{Action, ActionKey, Phase, PlayerId, RiskGame};
use rustc_hash::FxHashMap;

// ============================================================================
// PIPELINE (Level 2)
// ============================================================================

/// Legal actions of `state` after grouping and pruning
///
/// `perspective` is the player whose enemies the rules refer to. During
/// initial placement every legal action passes through unchanged.
pub fn pruned_actions<G: RiskGame>(state: &G, perspective: PlayerId) -> SearchResult<Vec<Action>> {
    let legal = state.legal_actions();
    if state.is_initial_placement() {
        return Ok(legal);
    }

    let actions = group_actions(&legal);
    let actions = prune_bad_attacks(state, actions);
    let actions = prune_bad_reinforcements(state, actions);
    let actions = prune_bad_endphase(state, perspective, actions);
    let actions = prune_bad_fortifies(state, perspective, actions);

    if actions.is_empty() && !legal.is_empty() {
        return Err(SearchError::EmptyPrunedActions(legal.len()));
    }
    Ok(actions)
}

// ============================================================================
// GROUPING (Level 3)
// ============================================================================

/// Collapse actions sharing an [`ActionKey`] to at most two
/// representatives: the largest troop count, and the one committing
/// exactly half of it (rounded down) if such an action exists
///
/// Actions without a key pass through. Input order is preserved.
pub fn group_actions(actions: &[Action]) -> Vec<Action> {
    let mut largest: FxHashMap<ActionKey, u32> = FxHashMap::default();
    for action in actions {
        if let (Some(key), Some(troops)) = (action.group_key(), action.troops()) {
            let entry = largest.entry(key).or_insert(troops);
            *entry = (*entry).max(troops);
        }
    }

    actions
        .iter()
        .filter(|action| match (action.group_key(), action.troops()) {
            (Some(key), Some(troops)) => {
                let max = largest[&key];
                troops == max || troops == max / 2
            }
            _ => true,
        })
        .copied()
        .collect()
}

// ============================================================================
// PHASE RULES (Level 3)
// ============================================================================

/// Attack phase: drop attacks that do not outnumber the defender
pub fn prune_bad_attacks<G: RiskGame>(state: &G, actions: Vec<Action>) -> Vec<Action> {
    if state.phase() != Phase::Attack {
        return actions;
    }
    actions
        .into_iter()
        .filter(|action| match *action {
            Action::Attack { target, troops, .. } => {
                let defenders = state.territory(target).map(|t| t.troops).unwrap_or(0);
                troops > defenders
            }
            _ => true,
        })
        .collect()
}

/// Reinforcement phase: drop reinforcements of territories without an
/// adjacent enemy, unless that would drop every reinforcement
pub fn prune_bad_reinforcements<G: RiskGame>(state: &G, actions: Vec<Action>) -> Vec<Action> {
    if state.phase() != Phase::Reinforcement {
        return actions;
    }
    let is_frontline = |action: &Action| match *action {
        Action::Reinforce { target, .. } => !state.neighboring_enemy_territories(target).is_empty(),
        _ => true,
    };
    let any_frontline = actions
        .iter()
        .any(|a| matches!(a, Action::Reinforce { .. }) && is_frontline(a));
    if !any_frontline {
        return actions;
    }
    actions.into_iter().filter(|a| is_frontline(a)).collect()
}

/// Drop the end-phase action while some action still targets an enemy
/// territory
pub fn prune_bad_endphase<G: RiskGame>(
    state: &G,
    perspective: PlayerId,
    actions: Vec<Action>,
) -> Vec<Action> {
    if state.phase() == Phase::Reinforcement {
        return actions;
    }
    let has_productive = actions.iter().any(|a| {
        a.target()
            .map(|t| is_enemy_territory(state, perspective, t))
            .unwrap_or(false)
    });
    if !has_productive {
        return actions;
    }
    actions.into_iter().filter(|a| !a.is_end_phase()).collect()
}

/// Fortify phase: keep only moves of all but one troop toward the
/// nearest enemy
///
/// When more than one action survives and something was removed, the
/// end-phase action goes as well.
pub fn prune_bad_fortifies<G: RiskGame>(
    state: &G,
    perspective: PlayerId,
    actions: Vec<Action>,
) -> Vec<Action> {
    if state.phase() != Phase::Fortify {
        return actions;
    }
    let distances = enemy_distance_map(state, perspective);
    let original = actions.len();

    let mut kept: Vec<Action> = actions
        .into_iter()
        .filter(|action| match *action {
            Action::Fortify { source, target, troops } => {
                let toward_enemy = distances[source] > distances[target];
                let all_but_one = state
                    .territory(source)
                    .map(|t| t.troops.saturating_sub(1) == troops)
                    .unwrap_or(false);
                toward_enemy && all_but_one
            }
            _ => true,
        })
        .collect();

    if kept.len() > 1 && kept.len() < original {
        kept.retain(|a| !a.is_end_phase());
    }
    kept
}

// ============================================================================
// TESTS
// ============================================================================
