//! Risk MCTS - Decision engine for a Risk-playing agent
//!
//! This crate provides a time-bounded Monte Carlo Tree Search:
//! - Action pruning and grouping to keep the branching factor small
//! - A heuristic reward model for shaping rollouts
//! - UCB1 selection over an arena-allocated tree
//! - `MctsAgent`, the once-per-turn entry point
//!
//! ```no_run
//! use risk_core::{Board, RiskState};
//! use risk_mcts::{MctsAgent, SearchConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let state = RiskState::new(Arc::new(Board::classic_mini()), 3, 7).unwrap();
//! let mut agent = MctsAgent::new(SearchConfig::for_player(0).with_seed(1)).unwrap();
//! let action = agent.decide(&state, Duration::from_millis(500)).unwrap();
//! println!("{}", action);
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod pruner;
pub mod reward;
pub mod rollout;
pub mod search;
pub mod tree;
pub mod ucb;

pub use config::{RewardTable, SearchConfig};
pub use error::{SearchError, SearchResult};
pub use pruner::{group_actions, pruned_actions};
pub use reward::{ContinentInfo, RewardModel, TerritoryRewards};
pub use search::{run_search, ChildStatistics, SearchOutcome};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use risk_core::{Action, PlayerId, RiskGame};
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant};

/// Longest budget honoured; larger ones (e.g. `Duration::MAX`) are clamped
pub const MAX_BUDGET: Duration = Duration::from_secs(365 * 24 * 60 * 60);

// ============================================================================
// AGENT
// ============================================================================

/// MCTS agent for one seat of one game
///
/// Continent data is derived at the first decision and kept; opponents
/// met in rollouts are remembered for the rest of the game. Call
/// [`MctsAgent::reset`] before reusing the agent for a new game.
pub struct MctsAgent {
    config: SearchConfig,
    rng: ChaCha8Rng,
    continents: Option<Vec<ContinentInfo>>,
    opponents: FxHashSet<PlayerId>,
}

impl MctsAgent {
    /// Create an agent; fails if the config is inconsistent
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            config,
            rng,
            continents: None,
            opponents: FxHashSet::default(),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn player(&self) -> PlayerId {
        self.config.player
    }

    /// Opponents recorded so far in this game
    pub fn opponents(&self) -> &FxHashSet<PlayerId> {
        &self.opponents
    }

    /// Forget per-game data
    pub fn reset(&mut self) {
        self.continents = None;
        self.opponents.clear();
    }

    /// Best action for `state` within `budget`
    pub fn decide<G: RiskGame>(&mut self, state: &G, budget: Duration) -> SearchResult<Action> {
        Ok(self.decide_with_stats(state, budget)?.action)
    }

    /// Like [`MctsAgent::decide`], with the search statistics
    ///
    /// Budgets above [`MAX_BUDGET`] are clamped to it.
    pub fn decide_with_stats<G: RiskGame>(&mut self, state: &G, budget: Duration) -> SearchResult<SearchOutcome> {
        let deadline = deadline_after(budget);
        if state.is_terminal() {
            return Err(SearchError::DecisionOnTerminalState);
        }

        let rewards = &self.config.rewards;
        let continents = self
            .continents
            .get_or_insert_with(|| ContinentInfo::from_board(state.board(), rewards));

        run_search(
            state,
            deadline,
            &self.config,
            continents,
            &mut self.opponents,
            &mut self.rng,
        )
    }
}

/// Deadline `budget` from now, without overflowing `Instant`
fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget.min(MAX_BUDGET)).unwrap_or(now)
}

// ============================================================================
// TESTS
// ============================================================================
