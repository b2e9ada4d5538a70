//! Search configuration and reward weights

use crate::error::SearchError;
use risk_core::PlayerId;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// REWARD TABLE
// ============================================================================

/// Tuning weights for the reward model
///
/// Read-only at decision time. Every number the reward model uses lives
/// here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTable {
    // Territory desirability
    pub continent: f64,
    pub transition: f64,
    pub transition_neighbor: f64,
    pub near_enemy: f64,
    pub small_continent: f64,
    pub big_continent: f64,
    /// Continents with fewer territories than this count as small
    pub small_continent_max_territories: usize,
    pub occupied_continent: f64,
    pub occupied_continent_per_territory: f64,
    pub last_on_enemy_continent: f64,
    pub more_troops_near_last_enemy: f64,

    // Attacks, graded by the pre-attack troop difference
    pub attack_without_advantage: f64,
    pub attack_one_more: f64,
    pub attack_two_more: f64,
    pub attack_three_or_more: f64,

    // Battles
    pub fewer_casualties: f64,
    pub more_casualties: f64,

    // Reinforcements
    pub reinforce_without_enemy_nearby: f64,
    pub reinforce_outnumbered: f64,
    pub reinforce_no_longer_outnumbered: f64,

    // Fortification
    pub fortify_toward_enemy: f64,
    pub fortify_away_from_enemy: f64,

    // Occupation after a conquest
    pub occupy_from_frontline: f64,
    pub occupy_both_short: f64,

    pub card_played: f64,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            continent: 1.0,
            transition: 0.0,
            transition_neighbor: 0.0,
            near_enemy: 0.0,
            small_continent: 2.0,
            big_continent: 1.0,
            small_continent_max_territories: 5,
            occupied_continent: 2.0,
            occupied_continent_per_territory: 1.2,
            last_on_enemy_continent: 0.0,
            more_troops_near_last_enemy: 1.0,

            attack_without_advantage: -10.0,
            attack_one_more: 1.0,
            attack_two_more: 4.0,
            attack_three_or_more: 10.0,

            fewer_casualties: 5.0,
            more_casualties: -5.0,

            reinforce_without_enemy_nearby: -6.0,
            reinforce_outnumbered: 9.0,
            reinforce_no_longer_outnumbered: 2.0,

            fortify_toward_enemy: 20.0,
            fortify_away_from_enemy: -20.0,

            occupy_from_frontline: -3.0,
            occupy_both_short: -5.0,

            card_played: 0.0,
        }
    }
}

// ============================================================================
// SEARCH CONFIG
// ============================================================================

/// Configuration for one agent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Seat the agent plays
    pub player: PlayerId,
    /// UCB exploration constant (paired with the reward scale below)
    pub exploration: f64,
    /// Rollout steps shared across the width of each expansion
    pub total_rollout_budget: u32,
    /// Multiplier applied to each step-averaged rollout reward
    pub step_reward_scale: f64,
    /// Rollout value when the game ends with the agent alive
    pub victory_reward: f64,
    /// Rollout value when the game ends with the agent eliminated
    pub defeat_reward: f64,
    /// Truncated rollouts are clamped into `[-bound, bound]`
    pub shaped_reward_bound: f64,
    /// Random seed for reproducibility (None = entropy)
    pub seed: Option<u64>,
    pub rewards: RewardTable,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            player: 0,
            exploration: 8000.0,
            total_rollout_budget: 1400,
            step_reward_scale: 10.0,
            victory_reward: 5000.0,
            defeat_reward: -1000.0,
            shaped_reward_bound: 900.0,
            seed: None,
            rewards: RewardTable::default(),
        }
    }
}

impl SearchConfig {
    /// Config for the given seat
    pub fn for_player(player: PlayerId) -> Self {
        Self {
            player,
            ..Default::default()
        }
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set exploration constant
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    /// Set custom reward weights
    pub fn with_rewards(mut self, rewards: RewardTable) -> Self {
        self.rewards = rewards;
        self
    }

    /// Check that the three rollout outcome classes stay apart
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(self.exploration.is_finite() && self.exploration >= 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "exploration must be finite and non-negative, got {}",
                self.exploration
            )));
        }
        if self.total_rollout_budget == 0 {
            return Err(SearchError::InvalidConfig("total_rollout_budget must be positive".into()));
        }
        if !(self.victory_reward > 0.0 && self.defeat_reward < 0.0) {
            return Err(SearchError::InvalidConfig(
                "victory_reward must be positive and defeat_reward negative".into(),
            ));
        }
        let limit = self.victory_reward.min(-self.defeat_reward);
        if !(self.shaped_reward_bound >= 0.0 && self.shaped_reward_bound < limit) {
            return Err(SearchError::InvalidConfig(format!(
                "shaped_reward_bound must lie in [0, {}), got {}",
                limit, self.shaped_reward_bound
            )));
        }
        Ok(())
    }

    /// Load from JSON file (missing fields take their defaults)
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SearchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
