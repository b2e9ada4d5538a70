//! Error types for the decision engine

use risk_core::{RulesError, TerritoryId};

/// Errors a decision can fail with
///
/// `EmptyPrunedActions` and `MissingTerritoryReward` are invariant
/// violations: they never occur with a correct rules engine.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("decision requested on a terminal state")]
    DecisionOnTerminalState,

    #[error("state has no legal actions")]
    NoLegalActions,

    #[error("pruning emptied a non-empty action set ({0} legal actions)")]
    EmptyPrunedActions(usize),

    #[error("no reward entry for territory {0}")]
    MissingTerritoryReward(TerritoryId),

    #[error("invalid search config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Rules(#[from] RulesError),
}

pub type SearchResult<T> = Result<T, SearchError>;
