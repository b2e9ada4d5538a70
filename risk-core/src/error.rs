//! Error types for the rules engine

use crate::board::{ContinentId, TerritoryId};
use crate::game::Phase;

/// Errors raised while building boards or applying actions
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("unknown territory: {0}")]
    UnknownTerritory(TerritoryId),

    #[error("unknown continent {continent} referenced by territory {territory}")]
    UnknownContinent {
        territory: TerritoryId,
        continent: ContinentId,
    },

    #[error("territory ids must be dense and ordered: expected {expected}, found {found}")]
    NonDenseTerritoryIds { expected: TerritoryId, found: TerritoryId },

    #[error("territory {0} is adjacent to itself")]
    SelfAdjacent(TerritoryId),

    #[error("board has no territories")]
    EmptyBoard,

    #[error("continent {0} has no territories")]
    EmptyContinent(ContinentId),

    #[error("a game needs between 2 and {max} players, got {got}")]
    PlayerCount { got: usize, max: usize },

    #[error("position lists {got} territories but the board has {expected}")]
    PositionSize { got: usize, expected: usize },

    #[error("a position cannot start in the {0:?} phase")]
    UnsupportedStartPhase(Phase),

    #[error("illegal action {action} in the {phase:?} phase")]
    IllegalAction { action: String, phase: Phase },

    #[error("the game is already over")]
    GameOver,
}
