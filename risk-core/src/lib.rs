//! Risk Core - Rules engine boundary
//!
//! This crate provides everything the decision engine consumes:
//! - Board topology (territories, continents, adjacency)
//! - Tagged actions and the turn phases
//! - The `RiskGame` trait a rules engine implements
//! - `RiskState`, a reference rules engine with deterministic dice

pub mod action;
pub mod board;
pub mod error;
pub mod game;
pub mod rules;

// Re-exports for convenient access
pub use action::{Action, ActionKey};
pub use board::{Board, ContinentDef, ContinentId, TerritoryDef, TerritoryId};
pub use error::RulesError;
pub use game::{Phase, RiskState, MAX_PLAYERS};
pub use rules::{PlayerId, RiskGame, Territory};
