//! Board queries shared by the pruner and the reward model
//!
//! Every query takes a `perspective`: the player whose friends and
//! enemies are meant.

use risk_core::{Board, PlayerId, RiskGame, TerritoryId};
use std::collections::VecDeque;

/// Distance marker for territories no enemy can reach
pub const UNREACHABLE: u32 = u32::MAX;

/// Territory held by someone other than `perspective`
///
/// Unowned territories are not enemies.
pub fn is_enemy_territory<G: RiskGame>(state: &G, perspective: PlayerId, id: TerritoryId) -> bool {
    matches!(state.territory(id).and_then(|t| t.owner), Some(owner) if owner != perspective)
}

/// Hop distance from every territory to the nearest territory not held
/// by `perspective` (0 for such territories)
///
/// Multi-source breadth-first search seeded with all foreign territories.
pub fn enemy_distance_map<G: RiskGame>(state: &G, perspective: PlayerId) -> Vec<u32> {
    let territories = state.territories();
    let mut distance = vec![UNREACHABLE; territories.len()];
    let mut queue = VecDeque::new();

    for (id, t) in territories.iter().enumerate() {
        if t.owner != Some(perspective) {
            distance[id] = 0;
            queue.push_back(id);
        }
    }

    while let Some(current) = queue.pop_front() {
        for &n in state.neighbors(current) {
            if distance[n] == UNREACHABLE {
                distance[n] = distance[current] + 1;
                queue.push_back(n);
            }
        }
    }
    distance
}

/// True when `new` lies strictly closer to the enemy than `initial`
pub fn is_closer_to_enemy(distances: &[u32], initial: TerritoryId, new: TerritoryId) -> bool {
    match (distances.get(initial), distances.get(new)) {
        (Some(&from), Some(&to)) => to < from,
        _ => false,
    }
}

/// Sum of troops on the given territories
pub fn total_troops<G: RiskGame>(state: &G, ids: &[TerritoryId]) -> u32 {
    ids.iter()
        .filter_map(|&id| state.territory(id))
        .map(|t| t.troops)
        .sum()
}

/// Enemy troops adjacent to a territory (enemy relative to its owner)
pub fn enemy_troops_around<G: RiskGame>(state: &G, id: TerritoryId) -> u32 {
    total_troops(state, &state.neighboring_enemy_territories(id))
}

/// True when the given territories do not all share one continent
pub fn spans_multiple_continents(board: &Board, ids: &[TerritoryId]) -> bool {
    let mut continents = ids.iter().filter_map(|&id| board.continent_of(id));
    match continents.next() {
        Some(first) => continents.any(|c| c != first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_core::{Phase, RiskState};
    use std::sync::Arc;

    /// A line 0-1-2-3-4; player 0 holds 0..=3, player 1 holds 4
    fn line_state() -> RiskState {
        let board = Board::from_links(
            "line",
            &[("West", 1), ("East", 1)],
            &[("a", 0), ("b", 0), ("c", 0), ("d", 1), ("e", 1)],
            &[(0, 1), (1, 2), (2, 3), (3, 4)],
        )
        .unwrap();
        let placements = [(Some(0), 4), (Some(0), 3), (Some(0), 2), (Some(0), 5), (Some(1), 6)];
        RiskState::from_position(Arc::new(board), 2, &placements, 0, Phase::Fortify, 0).unwrap()
    }

    #[test]
    fn test_enemy_distance_map() {
        let state = line_state();
        assert_eq!(enemy_distance_map(&state, 0), vec![4, 3, 2, 1, 0]);
        // From player 1's side everything of player 0 is foreign
        assert_eq!(enemy_distance_map(&state, 1), vec![0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_is_closer_to_enemy() {
        let distances = enemy_distance_map(&line_state(), 0);
        assert!(is_closer_to_enemy(&distances, 1, 2));
        assert!(!is_closer_to_enemy(&distances, 2, 1));
        assert!(!is_closer_to_enemy(&distances, 2, 2));
    }

    #[test]
    fn test_enemy_queries() {
        let state = line_state();
        assert!(is_enemy_territory(&state, 0, 4));
        assert!(!is_enemy_territory(&state, 0, 3));
        assert_eq!(enemy_troops_around(&state, 3), 6);
        assert_eq!(enemy_troops_around(&state, 4), 5);
        assert_eq!(enemy_troops_around(&state, 1), 0);
    }

    #[test]
    fn test_spans_multiple_continents() {
        let state = line_state();
        assert!(spans_multiple_continents(state.board(), &[2, 4]));
        assert!(!spans_multiple_continents(state.board(), &[0, 2]));
        assert!(!spans_multiple_continents(state.board(), &[]));
    }
}
