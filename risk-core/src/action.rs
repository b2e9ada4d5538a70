//! Tagged game actions

use crate::board::TerritoryId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A legal action
///
/// Every variant carries exactly the data its category needs, so
/// consumers dispatch on the tag instead of inspecting magic values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Claim an unowned territory during initial placement
    Place { territory: TerritoryId },
    /// Put reinforcement troops on an own territory
    Reinforce { target: TerritoryId, troops: u32 },
    /// Attack an adjacent enemy territory
    Attack { source: TerritoryId, target: TerritoryId, troops: u32 },
    /// Outcome of the pending battle (troops lost on each side)
    Casualties { attacker: u32, defender: u32 },
    /// Move troops into a freshly conquered territory
    Occupy { source: TerritoryId, target: TerritoryId, troops: u32 },
    /// Move troops between adjacent own territories
    Fortify { source: TerritoryId, target: TerritoryId, troops: u32 },
    /// Trade a set of cards for bonus reinforcements
    TradeCards,
    /// Finish the current phase
    EndPhase,
}

/// Grouping identity of a troop-carrying action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey {
    pub source: Option<TerritoryId>,
    pub target: TerritoryId,
}

impl Action {
    /// Territory the action takes troops from
    pub fn source(&self) -> Option<TerritoryId> {
        match *self {
            Action::Attack { source, .. }
            | Action::Occupy { source, .. }
            | Action::Fortify { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Territory the action is aimed at
    pub fn target(&self) -> Option<TerritoryId> {
        match *self {
            Action::Place { territory } => Some(territory),
            Action::Reinforce { target, .. }
            | Action::Attack { target, .. }
            | Action::Occupy { target, .. }
            | Action::Fortify { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Troops committed by the action
    pub fn troops(&self) -> Option<u32> {
        match *self {
            Action::Reinforce { troops, .. }
            | Action::Attack { troops, .. }
            | Action::Occupy { troops, .. }
            | Action::Fortify { troops, .. } => Some(troops),
            _ => None,
        }
    }

    /// Grouping key: present for every action with a variable troop count
    pub fn group_key(&self) -> Option<ActionKey> {
        match (self.troops(), self.target()) {
            (Some(_), Some(target)) => Some(ActionKey {
                source: self.source(),
                target,
            }),
            _ => None,
        }
    }

    pub fn is_end_phase(&self) -> bool {
        matches!(self, Action::EndPhase)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Action::Place { territory } => write!(f, "place {}", territory),
            Action::Reinforce { target, troops } => write!(f, "reinforce {} +{}", target, troops),
            Action::Attack { source, target, troops } => {
                write!(f, "attack {} -> {} with {}", source, target, troops)
            }
            Action::Casualties { attacker, defender } => {
                write!(f, "casualties {}:{}", attacker, defender)
            }
            Action::Occupy { source, target, troops } => {
                write!(f, "occupy {} -> {} with {}", source, target, troops)
            }
            Action::Fortify { source, target, troops } => {
                write!(f, "fortify {} -> {} with {}", source, target, troops)
            }
            Action::TradeCards => write!(f, "trade cards"),
            Action::EndPhase => write!(f, "end phase"),
        }
    }
}
