//! Reward model
//!
//! Turns board features into scalar rewards: a desirability score per
//! territory, and a shaped reward for the action that led from one state
//! to the next. Every weight comes from [`RewardTable`].
//!
//! ## Architecture
//! - Level 2: `RewardModel::distribute_territory_rewards`,
//!   `RewardModel::reward_for_previous_action`
//! - Level 3: per-category rewards (attack, reinforce, fortify, ...)
//! - Level 4: continent bookkeeping

use crate::analysis::{
    enemy_distance_map, enemy_troops_around, is_closer_to_enemy, is_enemy_territory,
    spans_multiple_continents,
};
use crate::config::RewardTable;
use crate::error::{SearchError, SearchResult};
use risk_core::{Action, Board, ContinentId, PlayerId, RiskGame, TerritoryId};
use rustc_hash::{FxHashMap, FxHashSet};

// ============================================================================
// CONTINENT INFO
// ============================================================================

/// Static continent data, computed once per game
#[derive(Clone, Debug, PartialEq)]
pub struct ContinentInfo {
    pub id: ContinentId,
    pub territories: Vec<TerritoryId>,
    /// Small continents are cheaper to complete and score higher
    pub base_reward: f64,
}

impl ContinentInfo {
    /// One entry per continent of `board`, indexed by continent id
    pub fn from_board(board: &Board, table: &RewardTable) -> Vec<ContinentInfo> {
        board
            .continents()
            .iter()
            .map(|def| {
                let territories = board.continent_members(def.id).to_vec();
                let base_reward = if territories.len() < table.small_continent_max_territories {
                    table.small_continent
                } else {
                    table.big_continent
                };
                ContinentInfo {
                    id: def.id,
                    territories,
                    base_reward,
                }
            })
            .collect()
    }
}

// ============================================================================
// TERRITORY REWARDS
// ============================================================================

/// Desirability score of every territory in one state
#[derive(Clone, Debug, Default)]
pub struct TerritoryRewards {
    rewards: FxHashMap<TerritoryId, f64>,
}

impl TerritoryRewards {
    /// Reward of a territory; a missing entry is an invariant violation
    pub fn get(&self, id: TerritoryId) -> SearchResult<f64> {
        self.rewards
            .get(&id)
            .copied()
            .ok_or(SearchError::MissingTerritoryReward(id))
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    fn add(&mut self, id: TerritoryId, amount: f64) {
        *self.rewards.entry(id).or_insert(0.0) += amount;
    }
}

// ============================================================================
// REWARD MODEL (Level 2)
// ============================================================================

/// Reward computations from the point of view of one player
///
/// Borrows everything it reads; building one per call is free.
pub struct RewardModel<'a> {
    table: &'a RewardTable,
    continents: &'a [ContinentInfo],
    player: PlayerId,
    opponents: &'a FxHashSet<PlayerId>,
}

impl<'a> RewardModel<'a> {
    pub fn new(
        table: &'a RewardTable,
        continents: &'a [ContinentInfo],
        player: PlayerId,
        opponents: &'a FxHashSet<PlayerId>,
    ) -> Self {
        Self {
            table,
            continents,
            player,
            opponents,
        }
    }

    /// Desirability of every territory of `state`
    ///
    /// Sums transition bonuses, continent occupation, enemy proximity, and
    /// the endgame bonuses around nearly complete continents.
    pub fn distribute_territory_rewards<G: RiskGame>(&self, state: &G) -> TerritoryRewards {
        let board = state.board();
        let t = self.table;
        let occupied = self.occupied_continents(state);
        let continent_rewards = self.continent_rewards(&occupied);
        let placing = state.is_initial_placement();
        let agent_to_move = state.current_player() == self.player;

        let mut rewards = TerritoryRewards::default();
        for id in board.territory_ids() {
            rewards.add(id, 0.0);
            let neighbors = state.neighbors(id);

            // Own neighbours on the same continent that outnumber the last enemy
            if !placing && self.is_last_enemy_on_continent(state, id) {
                let continent = board.continent_of(id);
                let troops = state.territory(id).map(|t| t.troops).unwrap_or(0);
                for &n in neighbors.iter().filter(|&&n| board.continent_of(n) == continent) {
                    let stronger = state.territory(n).map(|t| t.troops > troops).unwrap_or(false);
                    rewards.add(n, if stronger { t.more_troops_near_last_enemy } else { 0.0 });
                }
            }

            if spans_multiple_continents(board, neighbors) {
                rewards.add(id, t.transition);
                for &n in neighbors {
                    rewards.add(n, t.transition_neighbor);
                }
            }

            if let Some(continent) = board.continent_of(id) {
                if let Some(&value) = continent_rewards.get(&continent) {
                    rewards.add(id, t.continent * value);
                    let enemies = state.neighboring_enemy_territories(id).len();
                    if (1..3).contains(&enemies) {
                        rewards.add(id, t.near_enemy);
                    }
                }
            }

            if agent_to_move && self.is_last_available_of_enemy_continent(state, id) {
                rewards.add(id, t.last_on_enemy_continent);
            }
        }
        rewards
    }

    /// Shaped reward for `action`, which turned `before` into `after`
    pub fn reward_for_previous_action<G: RiskGame>(
        &self,
        after: &G,
        before: &G,
        action: &Action,
    ) -> SearchResult<f64> {
        let t = self.table;
        let reward = match *action {
            Action::Place { territory } => self.distribute_territory_rewards(after).get(territory)?,
            Action::Attack { source, target, .. } => {
                let mut reward = self.attack_reward(before, source, target);
                if is_enemy_territory(after, self.player, target) {
                    reward += self.distribute_territory_rewards(after).get(target)?;
                }
                reward
            }
            Action::Reinforce { target, .. } => self.reinforce_reward(before, after, target),
            Action::Fortify { source, target, .. } => self.fortify_reward(after, source, target),
            Action::Casualties { attacker, defender } => {
                if attacker < defender {
                    t.fewer_casualties
                } else {
                    t.more_casualties
                }
            }
            Action::Occupy { source, target, troops } => self.occupy_reward(after, source, target, troops),
            Action::TradeCards => t.card_played,
            Action::EndPhase => 0.0,
        };
        Ok(reward)
    }

    // ========================================================================
    // PER-CATEGORY REWARDS (Level 3)
    // ========================================================================

    /// Graded on the troop difference before the attack
    fn attack_reward<G: RiskGame>(&self, before: &G, source: TerritoryId, target: TerritoryId) -> f64 {
        let troops = |id| state_troops(before, id) as i64;
        let t = self.table;
        match troops(source) - troops(target) {
            d if d <= 0 => t.attack_without_advantage,
            1 => t.attack_one_more,
            2 => t.attack_two_more,
            _ => t.attack_three_or_more,
        }
    }

    fn reinforce_reward<G: RiskGame>(&self, before: &G, after: &G, target: TerritoryId) -> f64 {
        let t = self.table;
        let enemy = enemy_troops_around(after, target);
        if enemy == 0 {
            return t.reinforce_without_enemy_nearby;
        }
        let mut reward = 0.0;
        if enemy > state_troops(before, target) {
            reward += t.reinforce_outnumbered;
            if enemy <= state_troops(after, target) {
                reward += t.reinforce_no_longer_outnumbered;
            }
        }
        reward
    }

    fn fortify_reward<G: RiskGame>(&self, after: &G, source: TerritoryId, target: TerritoryId) -> f64 {
        let distances = enemy_distance_map(after, self.player);
        if is_closer_to_enemy(&distances, source, target) {
            self.table.fortify_toward_enemy
        } else {
            self.table.fortify_away_from_enemy
        }
    }

    /// Penalises occupations that leave the wrong side thin
    fn occupy_reward<G: RiskGame>(
        &self,
        after: &G,
        source: TerritoryId,
        target: TerritoryId,
        moved: u32,
    ) -> f64 {
        let t = self.table;
        let mut reward = 0.0;

        let distances = enemy_distance_map(after, self.player);
        if moved > 1 && is_closer_to_enemy(&distances, target, source) {
            reward += t.occupy_from_frontline;
        }

        // One troop must stay on the source, so it never counts as free
        let kept = state_troops(after, source).saturating_sub(1);
        let pool = kept + moved;
        let enemy_source = enemy_troops_around(after, source);
        let enemy_target = enemy_troops_around(after, target);

        // No split could cover either side
        if pool < enemy_source && pool < enemy_target {
            return reward;
        }
        if kept < enemy_source && moved < enemy_target {
            reward += t.occupy_both_short;
        }
        reward
    }

    // ========================================================================
    // CONTINENT BOOKKEEPING (Level 4)
    // ========================================================================

    /// Territories the player holds, per continent (held continents only)
    pub fn occupied_continents<G: RiskGame>(&self, state: &G) -> FxHashMap<ContinentId, usize> {
        let mut occupied = FxHashMap::default();
        for territory in state.territories() {
            if territory.owner == Some(self.player) {
                *occupied.entry(territory.continent).or_insert(0) += 1;
            }
        }
        occupied
    }

    /// Current value of every continent the player has a foothold in
    pub fn continent_rewards(&self, occupied: &FxHashMap<ContinentId, usize>) -> FxHashMap<ContinentId, f64> {
        let t = self.table;
        self.continents
            .iter()
            .filter_map(|c| {
                let held = *occupied.get(&c.id)?;
                let value = c.base_reward
                    + t.occupied_continent
                    + held as f64 * t.occupied_continent_per_territory * c.base_reward;
                Some((c.id, value))
            })
            .collect()
    }

    /// Territory is the only one of its continent the player does not hold
    fn is_last_enemy_on_continent<G: RiskGame>(&self, state: &G, id: TerritoryId) -> bool {
        let owned_by_player = |tid: TerritoryId| state.territory(tid).and_then(|t| t.owner) == Some(self.player);
        if owned_by_player(id) {
            return false;
        }
        let Some(continent) = self.continent_info(state, id) else {
            return false;
        };
        let held = continent.territories.iter().filter(|&&tid| owned_by_player(tid)).count();
        held + 1 == continent.territories.len()
    }

    /// Territory is the only one of its continent not held by a known opponent
    fn is_last_available_of_enemy_continent<G: RiskGame>(&self, state: &G, id: TerritoryId) -> bool {
        let held_by_opponent = |tid: TerritoryId| {
            state
                .territory(tid)
                .and_then(|t| t.owner)
                .map(|owner| self.opponents.contains(&owner))
                .unwrap_or(false)
        };
        if held_by_opponent(id) {
            return false;
        }
        let Some(continent) = self.continent_info(state, id) else {
            return false;
        };
        let held = continent.territories.iter().filter(|&&tid| held_by_opponent(tid)).count();
        held + 1 == continent.territories.len()
    }

    fn continent_info<G: RiskGame>(&self, state: &G, id: TerritoryId) -> Option<&ContinentInfo> {
        let continent = state.board().continent_of(id)?;
        self.continents.iter().find(|c| c.id == continent)
    }
}

fn state_troops<G: RiskGame>(state: &G, id: TerritoryId) -> u32 {
    state.territory(id).map(|t| t.troops).unwrap_or(0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use risk_core::{Phase, RiskState};
    use std::sync::Arc;

    /// Continent "Tri" = {0, 1, 2} (a triangle), continent "Tail" = {3, 4}
    /// with links 2-3 and 3-4
    fn tri_board() -> Arc<Board> {
        Arc::new(
            Board::from_links(
                "tri",
                &[("Tri", 2), ("Tail", 1)],
                &[("a", 0), ("b", 0), ("c", 0), ("d", 1), ("e", 1)],
                &[(0, 1), (1, 2), (0, 2), (2, 3), (3, 4)],
            )
            .unwrap(),
        )
    }

    fn position(placements: &[(Option<PlayerId>, u32)], phase: Phase) -> RiskState {
        RiskState::from_position(tri_board(), 2, placements, 0, phase, 0).unwrap()
    }

    struct Fixture {
        table: RewardTable,
        continents: Vec<ContinentInfo>,
        opponents: FxHashSet<PlayerId>,
    }

    impl Fixture {
        fn new(table: RewardTable) -> Self {
            let continents = ContinentInfo::from_board(&tri_board(), &table);
            Self {
                table,
                continents,
                opponents: FxHashSet::default(),
            }
        }

        fn model(&self) -> RewardModel<'_> {
            RewardModel::new(&self.table, &self.continents, 0, &self.opponents)
        }
    }

    #[test]
    fn test_continent_base_rewards() {
        let table = RewardTable::default();
        let continents = ContinentInfo::from_board(&Board::classic_mini(), &table);
        assert_eq!(continents.len(), 4);
        // Northreach has 4 territories, Southvale 5
        assert_eq!(continents[0].base_reward, table.small_continent);
        assert_eq!(continents[2].base_reward, table.big_continent);
        assert_eq!(continents[2].territories, vec![7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_continent_rewards_grow_with_occupation() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let mut occupied = FxHashMap::default();
        occupied.insert(0, 1);
        let one = model.continent_rewards(&occupied)[&0];
        occupied.insert(0, 2);
        let two = model.continent_rewards(&occupied)[&0];
        assert!(two > one);
        // base 2 + occupied 2 + 2 * 1.2 * 2
        assert!((two - 8.8).abs() < 1e-9);
        assert!(!model.continent_rewards(&occupied).contains_key(&1));
    }

    #[test]
    fn test_every_territory_has_a_reward() {
        let fx = Fixture::new(RewardTable::default());
        let state = position(
            &[(Some(0), 3), (Some(0), 1), (Some(1), 2), (Some(1), 2), (Some(1), 1)],
            Phase::Attack,
        );
        let rewards = fx.model().distribute_territory_rewards(&state);
        assert_eq!(rewards.len(), 5);
        for id in 0..5 {
            assert!(rewards.get(id).is_ok());
        }
        assert!(matches!(rewards.get(9), Err(SearchError::MissingTerritoryReward(9))));
    }

    #[test]
    fn test_last_enemy_on_continent_bonus() {
        // Agent holds 0 (5 troops) and 1 (1 troop); enemy holds 2 with 3
        let placements = [(Some(0), 5), (Some(0), 1), (Some(1), 3), (Some(1), 2), (Some(1), 1)];
        let state = position(&placements, Phase::Attack);

        let with_bonus = Fixture::new(RewardTable::default());
        let without_bonus = Fixture::new(RewardTable {
            more_troops_near_last_enemy: 0.0,
            ..Default::default()
        });
        let a = with_bonus.model().distribute_territory_rewards(&state);
        let b = without_bonus.model().distribute_territory_rewards(&state);

        let bonus = RewardTable::default().more_troops_near_last_enemy;
        assert!((a.get(0).unwrap() - b.get(0).unwrap() - bonus).abs() < 1e-9);
        // Territory 1 does not outnumber the enemy
        assert_eq!(a.get(1).unwrap(), b.get(1).unwrap());
        // The off-continent neighbour gets nothing
        assert_eq!(a.get(3).unwrap(), b.get(3).unwrap());
    }

    #[test]
    fn test_transition_bonus() {
        let fx = Fixture::new(RewardTable {
            transition: 4.0,
            transition_neighbor: 1.0,
            ..Default::default()
        });
        let base = Fixture::new(RewardTable::default());
        let state = position(
            &[(Some(1), 1), (Some(1), 1), (Some(1), 1), (Some(1), 1), (Some(0), 1)],
            Phase::Attack,
        );
        let a = fx.model().distribute_territory_rewards(&state);
        let b = base.model().distribute_territory_rewards(&state);
        let diff = |id| a.get(id).unwrap() - b.get(id).unwrap();
        // 2 neighbours 0, 1 (Tri) and 3 (Tail); 3 neighbours 2 (Tri) and 4 (Tail)
        assert!((diff(2) - 5.0).abs() < 1e-9);
        assert!((diff(3) - 5.0).abs() < 1e-9);
        assert!((diff(0) - 1.0).abs() < 1e-9);
        assert!((diff(4) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_near_enemy_bonus() {
        let fx = Fixture::new(RewardTable {
            near_enemy: 3.0,
            ..Default::default()
        });
        let base = Fixture::new(RewardTable::default());
        let state = position(
            &[(Some(0), 1), (Some(0), 1), (Some(0), 1), (Some(1), 1), (Some(1), 1)],
            Phase::Attack,
        );
        let a = fx.model().distribute_territory_rewards(&state);
        let b = base.model().distribute_territory_rewards(&state);
        let diff = |id| a.get(id).unwrap() - b.get(id).unwrap();
        // Only territory 2 touches an enemy, and only continents with a
        // foothold count
        assert!((diff(2) - 3.0).abs() < 1e-9);
        assert_eq!(diff(0), 0.0);
        assert_eq!(diff(3), 0.0);
    }

    #[test]
    fn test_last_available_of_enemy_continent() {
        let mut fx = Fixture::new(RewardTable {
            last_on_enemy_continent: 7.0,
            ..Default::default()
        });
        let state = position(
            &[(Some(1), 1), (Some(1), 1), (Some(0), 2), (Some(0), 1), (Some(0), 1)],
            Phase::Attack,
        );
        let before = fx.model().distribute_territory_rewards(&state).get(2).unwrap();
        fx.opponents.insert(1);
        let after = fx.model().distribute_territory_rewards(&state).get(2).unwrap();
        assert!((after - before - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_attack_reward_tiers() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let t = RewardTable::default();
        for (attackers, expected) in [
            (2, t.attack_without_advantage),
            (3, t.attack_one_more),
            (4, t.attack_two_more),
            (9, t.attack_three_or_more),
        ] {
            let before = position(
                &[(Some(0), 1), (Some(0), 1), (Some(0), attackers), (Some(1), 2), (Some(1), 1)],
                Phase::Attack,
            );
            assert_eq!(model.attack_reward(&before, 2, 3), expected);
        }
    }

    #[test]
    fn test_attack_adds_target_reward_while_enemy_held() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let before = position(
            &[(Some(0), 1), (Some(0), 1), (Some(0), 6), (Some(1), 2), (Some(1), 1)],
            Phase::Attack,
        );
        let action = Action::Attack { source: 2, target: 3, troops: 3 };
        let after = before.apply(&action).unwrap();
        let reward = model.reward_for_previous_action(&after, &before, &action).unwrap();
        let expected = RewardTable::default().attack_three_or_more
            + model.distribute_territory_rewards(&after).get(3).unwrap();
        assert!((reward - expected).abs() < 1e-9);
    }

    #[test]
    fn test_reinforce_rewards() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let t = RewardTable::default();

        // Rear territory
        let before = position(
            &[(Some(0), 1), (Some(0), 1), (Some(0), 1), (Some(1), 4), (Some(1), 1)],
            Phase::Reinforcement,
        );
        assert_eq!(model.reinforce_reward(&before, &before, 0), t.reinforce_without_enemy_nearby);

        // Outnumbered 1 vs 4, still outnumbered after +2
        let after = before.apply(&Action::Reinforce { target: 2, troops: 2 }).unwrap();
        assert_eq!(model.reinforce_reward(&before, &after, 2), t.reinforce_outnumbered);

        // Outnumbered 1 vs 4, even after +3
        let after = before.apply(&Action::Reinforce { target: 2, troops: 3 }).unwrap();
        assert_eq!(
            model.reinforce_reward(&before, &after, 2),
            t.reinforce_outnumbered + t.reinforce_no_longer_outnumbered
        );
    }

    #[test]
    fn test_fortify_rewards() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let t = RewardTable::default();
        let state = position(
            &[(Some(0), 5), (Some(0), 1), (Some(0), 1), (Some(1), 4), (Some(1), 1)],
            Phase::Fortify,
        );
        assert_eq!(model.fortify_reward(&state, 0, 2), t.fortify_toward_enemy);
        assert_eq!(model.fortify_reward(&state, 2, 0), t.fortify_away_from_enemy);
        assert_eq!(model.fortify_reward(&state, 0, 1), t.fortify_away_from_enemy);
    }

    #[test]
    fn test_casualty_and_card_rewards() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let t = RewardTable::default();
        let state = position(
            &[(Some(0), 5), (Some(0), 1), (Some(0), 1), (Some(1), 4), (Some(1), 1)],
            Phase::Attack,
        );
        let reward = |action: Action| model.reward_for_previous_action(&state, &state, &action).unwrap();
        assert_eq!(reward(Action::Casualties { attacker: 0, defender: 2 }), t.fewer_casualties);
        assert_eq!(reward(Action::Casualties { attacker: 1, defender: 1 }), t.more_casualties);
        assert_eq!(reward(Action::TradeCards), t.card_played);
        assert_eq!(reward(Action::EndPhase), 0.0);
    }

    #[test]
    fn test_occupy_both_short() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let t = RewardTable::default();
        // Agent just took 3 from 2
        let after = position(
            &[(Some(1), 1), (Some(1), 4), (Some(0), 3), (Some(0), 3), (Some(1), 5)],
            Phase::Attack,
        );
        // Source 2 borders enemies 0, 1 with 5 troops; target 3 borders 4 with 5
        assert_eq!(model.occupy_reward(&after, 2, 3, 3), t.occupy_both_short);

        // Nothing could have covered both sides
        let after = position(
            &[(Some(1), 9), (Some(1), 4), (Some(0), 1), (Some(0), 1), (Some(1), 5)],
            Phase::Attack,
        );
        assert_eq!(model.occupy_reward(&after, 2, 3, 1), 0.0);
    }

    #[test]
    fn test_occupy_source_keeps_one_troop_back() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let t = RewardTable::default();
        // Source 2 holds 3 but only 2 are free; both sides border 3 enemy troops
        let after = position(
            &[(Some(1), 2), (Some(1), 1), (Some(0), 3), (Some(0), 2), (Some(1), 3)],
            Phase::Attack,
        );
        assert_eq!(model.occupy_reward(&after, 2, 3, 2), t.occupy_both_short);

        // One more troop left behind covers the source
        let after = position(
            &[(Some(1), 2), (Some(1), 1), (Some(0), 4), (Some(0), 2), (Some(1), 3)],
            Phase::Attack,
        );
        assert_eq!(model.occupy_reward(&after, 2, 3, 2), 0.0);
    }

    #[test]
    fn test_occupy_from_frontline() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let t = RewardTable::default();
        // Source 2 borders enemy 1; target 3 is deep behind own lines
        let after = position(
            &[(Some(1), 1), (Some(1), 1), (Some(0), 4), (Some(0), 4), (Some(0), 1)],
            Phase::Attack,
        );
        assert_eq!(model.occupy_reward(&after, 2, 3, 3), t.occupy_from_frontline);
        assert_eq!(model.occupy_reward(&after, 2, 3, 1), 0.0);
    }

    #[test]
    fn test_place_uses_territory_reward() {
        let fx = Fixture::new(RewardTable::default());
        let model = fx.model();
        let before = RiskState::new(tri_board(), 2, 0).unwrap();
        let action = Action::Place { territory: 0 };
        let after = before.apply(&action).unwrap();
        let reward = model.reward_for_previous_action(&after, &before, &action).unwrap();
        assert_eq!(reward, model.distribute_territory_rewards(&after).get(0).unwrap());
        assert!(reward > 0.0);
    }
}
