//! The collaborator contract a rules engine offers to the search

use crate::action::Action;
use crate::board::{Board, ContinentId, TerritoryId};
use crate::error::RulesError;
use crate::game::Phase;
use serde::{Deserialize, Serialize};

/// Player seat index
pub type PlayerId = usize;

/// Runtime view of one territory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub owner: Option<PlayerId>,
    pub troops: u32,
    pub continent: ContinentId,
}

/// Everything the decision engine needs from a rules engine
///
/// `apply` must be a deterministic function of `(self, action)` and must
/// not mutate `self`.
pub trait RiskGame: Clone {
    /// Static topology
    fn board(&self) -> &Board;

    /// Every legal action for the player to move
    fn legal_actions(&self) -> Vec<Action>;

    /// Successor state after `action`
    fn apply(&self, action: &Action) -> Result<Self, RulesError>;

    fn is_terminal(&self) -> bool;

    fn is_alive(&self, player: PlayerId) -> bool;

    fn current_player(&self) -> PlayerId;

    fn phase(&self) -> Phase;

    /// Territories indexed by [`TerritoryId`]
    fn territories(&self) -> &[Territory];

    // ========================================================================
    // PROVIDED QUERIES
    // ========================================================================

    fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories().get(id)
    }

    fn neighbors(&self, id: TerritoryId) -> &[TerritoryId] {
        self.board().neighbors(id)
    }

    /// Neighbours held by someone other than the territory's owner
    fn neighboring_enemy_territories(&self, id: TerritoryId) -> Vec<TerritoryId> {
        let territories = self.territories();
        let Some(owner) = territories.get(id).map(|t| t.owner) else {
            return Vec::new();
        };
        self.neighbors(id)
            .iter()
            .copied()
            .filter(|&n| match territories[n].owner {
                Some(other) => Some(other) != owner,
                None => false,
            })
            .collect()
    }

    /// True while any territory is still unclaimed
    fn is_initial_placement(&self) -> bool {
        self.phase() == Phase::InitialPlacement
    }
}
