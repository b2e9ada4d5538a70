//! Rollout (simulation) from a freshly expanded node
//!
//! Plays uniformly random actions: pruned actions on the agent's turns,
//! every legal action on opponents' turns. Each time the agent has just
//! acted, the shaped reward of that action is added, damped by the step
//! count.
//!
//! ## Architecture
//! - Level 2: `RolloutEngine::simulate`
//! - Level 3: Outcome scoring
//! - Level 4: Random action selection

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::pruner::pruned_actions;
use crate::reward::{ContinentInfo, RewardModel};
use risk_core::{Action, PlayerId, RiskGame};
use rand::Rng;
use rustc_hash::FxHashSet;
use std::time::Instant;

// ============================================================================
// ROLLOUT RESULT
// ============================================================================

/// How a rollout ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RolloutOutcome {
    /// Game over with the agent alive
    Victory,
    /// The agent was eliminated
    Defeat,
    /// Step budget or deadline hit first
    Truncated,
}

/// Result of a rollout simulation
#[derive(Clone, Copy, Debug)]
pub struct RolloutResult {
    pub value: f64,
    pub outcome: RolloutOutcome,
    /// Actions played after the starting one
    pub steps: u32,
}

// ============================================================================
// ROLLOUT ENGINE (Level 2)
// ============================================================================

/// Everything one decision's rollouts share
pub struct RolloutEngine<'a> {
    config: &'a SearchConfig,
    continents: &'a [ContinentInfo],
    deadline: Instant,
}

impl<'a> RolloutEngine<'a> {
    pub fn new(config: &'a SearchConfig, continents: &'a [ContinentInfo], deadline: Instant) -> Self {
        Self {
            config,
            continents,
            deadline,
        }
    }

    /// Simulate onward from `start`
    ///
    /// `previous` is the state and action that produced `start` (None for
    /// a position reached without a move, such as the root). At most
    /// `max_steps` further actions are played. Opponents seen right after
    /// an agent action are added to `opponents`.
    pub fn simulate<G: RiskGame, R: Rng>(
        &self,
        start: &G,
        previous: Option<(&G, Action)>,
        max_steps: u32,
        opponents: &mut FxHashSet<PlayerId>,
        rng: &mut R,
    ) -> SearchResult<RolloutResult> {
        let agent = self.config.player;
        let mut previous: Option<(G, Action, PlayerId)> =
            previous.map(|(before, action)| (before.clone(), action, before.current_player()));
        let mut game = start.clone();

        let mut points = 0.0;
        let mut steps = 0;
        while !game.is_terminal()
            && game.is_alive(agent)
            && steps < max_steps
            && Instant::now() < self.deadline
        {
            steps += 1;

            if let Some((prior, last, actor)) = &previous {
                if *actor == agent {
                    let next = game.current_player();
                    if next != agent {
                        opponents.insert(next);
                    }
                    let model = RewardModel::new(&self.config.rewards, self.continents, agent, opponents);
                    let reward = model.reward_for_previous_action(&game, prior, last)?;
                    points += reward / steps as f64 * self.config.step_reward_scale;
                }
            }

            let actor = game.current_player();
            let actions = if actor == agent {
                pruned_actions(&game, agent)?
            } else {
                game.legal_actions()
            };
            let chosen = select_random_action(&actions, rng).ok_or(SearchError::NoLegalActions)?;

            let next = game.apply(&chosen)?;
            previous = Some((game, chosen, actor));
            game = next;
        }

        Ok(self.score(&game, points, steps))
    }

    // ========================================================================
    // Level 3: Outcome scoring
    // ========================================================================

    fn score<G: RiskGame>(&self, game: &G, points: f64, steps: u32) -> RolloutResult {
        let config = self.config;
        let (value, outcome) = if !game.is_alive(config.player) {
            (config.defeat_reward, RolloutOutcome::Defeat)
        } else if game.is_terminal() {
            (config.victory_reward, RolloutOutcome::Victory)
        } else {
            let bound = config.shaped_reward_bound;
            (points.clamp(-bound, bound), RolloutOutcome::Truncated)
        };
        RolloutResult { value, outcome, steps }
    }
}

/// Select a random action uniformly from the list
fn select_random_action<R: Rng>(actions: &[Action], rng: &mut R) -> Option<Action> {
    if actions.is_empty() {
        return None;
    }
    Some(actions[rng.gen_range(0..actions.len())])
}

// ============================================================================
// TESTS
// ============================================================================
