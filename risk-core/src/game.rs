//! Reference rules engine: game state, move generation and transitions

use crate::action::Action;
use crate::board::{Board, TerritoryId};
use crate::error::RulesError;
use crate::rules::{PlayerId, RiskGame, Territory};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Largest supported table
pub const MAX_PLAYERS: usize = 6;

/// Dice limits per battle
const MAX_ATTACK_DICE: u32 = 3;
const MAX_DEFENSE_DICE: u32 = 2;

/// Minimum reinforcements at the start of a turn
const MIN_REINFORCEMENTS: u32 = 3;

/// Territories per extra reinforcement troop
const TERRITORIES_PER_TROOP: u32 = 3;

/// Cards needed for one trade, and the trade bonus progression
const CARD_SET_SIZE: u32 = 3;
const CARD_TRADE_BASE: u32 = 4;
const CARD_TRADE_STEP: u32 = 2;

/// Mixes the battle counter into the dice seed
const DICE_STREAM_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Turn phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Players claim unowned territories one at a time
    InitialPlacement,
    /// Place this turn's reinforcements
    Reinforcement,
    /// Attack or end the phase
    Attack,
    /// A battle is pending; the only action is its casualties
    Battle,
    /// Move troops into a conquered territory
    Occupy,
    /// One troop movement (or end phase), then the turn passes
    Fortify,
}

/// Pending battle between attack and casualties
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingBattle {
    source: TerritoryId,
    target: TerritoryId,
    troops: u32,
}

/// Game state (clone to mutate)
#[derive(Clone, Debug)]
pub struct RiskState {
    board: Arc<Board>,
    territories: Vec<Territory>,
    num_players: usize,
    current_player: PlayerId,
    phase: Phase,

    /// Troops still to place this turn
    reinforcements: u32,

    battle: Option<PendingBattle>,
    conquest: Option<(TerritoryId, TerritoryId)>,
    conquered_this_turn: bool,

    /// Card counts per seat and the number of trades so far
    cards: Vec<u32>,
    trades: u32,

    /// Dice stream: seed plus battles resolved so far
    dice_seed: u64,
    battles: u64,

    /// Player turns completed since placement ended
    pub turn: u32,

    last_action: Option<(PlayerId, Action)>,
}

impl RiskState {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// New game: every territory unowned, seat 0 places first
    pub fn new(board: Arc<Board>, num_players: usize, dice_seed: u64) -> Result<Self, RulesError> {
        if !(2..=MAX_PLAYERS).contains(&num_players) || num_players > board.territory_count() {
            return Err(RulesError::PlayerCount {
                got: num_players,
                max: MAX_PLAYERS.min(board.territory_count()),
            });
        }
        let territories = board
            .territory_ids()
            .map(|id| Territory {
                owner: None,
                troops: 0,
                continent: board.continent_of(id).unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            board,
            territories,
            num_players,
            current_player: 0,
            phase: Phase::InitialPlacement,
            reinforcements: 0,
            battle: None,
            conquest: None,
            conquered_this_turn: false,
            cards: vec![0; num_players],
            trades: 0,
            dice_seed,
            battles: 0,
            turn: 0,
            last_action: None,
        })
    }

    /// Start from an arbitrary position
    ///
    /// `placements[id]` is `(owner, troops)` for each territory. The
    /// start phase may be `InitialPlacement` (with at least one unowned
    /// territory), `Reinforcement`, `Attack` or `Fortify`.
    pub fn from_position(
        board: Arc<Board>,
        num_players: usize,
        placements: &[(Option<PlayerId>, u32)],
        current_player: PlayerId,
        phase: Phase,
        dice_seed: u64,
    ) -> Result<Self, RulesError> {
        let mut state = Self::new(board, num_players, dice_seed)?;
        if placements.len() != state.territories.len() {
            return Err(RulesError::PositionSize {
                got: placements.len(),
                expected: state.territories.len(),
            });
        }
        if current_player >= num_players {
            return Err(RulesError::PlayerCount { got: current_player + 1, max: num_players });
        }
        for (territory, &(owner, troops)) in state.territories.iter_mut().zip(placements) {
            if let Some(p) = owner {
                if p >= num_players {
                    return Err(RulesError::PlayerCount { got: p + 1, max: num_players });
                }
            }
            territory.owner = owner;
            territory.troops = if owner.is_some() { troops.max(1) } else { 0 };
        }

        let any_unowned = state.territories.iter().any(|t| t.owner.is_none());
        match phase {
            Phase::InitialPlacement if any_unowned => {}
            Phase::Reinforcement | Phase::Attack | Phase::Fortify if !any_unowned => {}
            _ => return Err(RulesError::UnsupportedStartPhase(phase)),
        }

        state.current_player = current_player;
        state.phase = phase;
        if phase == Phase::Reinforcement {
            state.reinforcements = state.reinforcements_for(current_player);
        }
        Ok(state)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn num_players(&self) -> usize {
        self.num_players
    }

    /// Troops still to place in the reinforcement phase
    pub fn reinforcements_remaining(&self) -> u32 {
        self.reinforcements
    }

    pub fn cards(&self, player: PlayerId) -> u32 {
        self.cards.get(player).copied().unwrap_or(0)
    }

    /// Last action and the seat that played it
    pub fn last_action(&self) -> Option<(PlayerId, Action)> {
        self.last_action
    }

    /// Territories held by a player
    pub fn territory_count_of(&self, player: PlayerId) -> usize {
        self.territories.iter().filter(|t| t.owner == Some(player)).count()
    }

    /// The last player standing, once the game is over
    pub fn winner(&self) -> Option<PlayerId> {
        if !self.is_terminal() {
            return None;
        }
        self.territories.iter().find_map(|t| t.owner)
    }

    /// Reinforcements a player receives at the start of a turn
    pub fn reinforcements_for(&self, player: PlayerId) -> u32 {
        let owned = self.territory_count_of(player) as u32;
        let base = (owned / TERRITORIES_PER_TROOP).max(MIN_REINFORCEMENTS);
        let bonus: u32 = self
            .board
            .continents()
            .iter()
            .filter(|c| {
                self.board
                    .continent_members(c.id)
                    .iter()
                    .all(|&t| self.territories[t].owner == Some(player))
            })
            .map(|c| c.bonus)
            .sum();
        base + bonus
    }

    fn owns(&self, player: PlayerId, id: TerritoryId) -> bool {
        self.territories.get(id).map(|t| t.owner) == Some(Some(player))
    }

    fn is_enemy_of(&self, player: PlayerId, id: TerritoryId) -> bool {
        matches!(self.territories.get(id).and_then(|t| t.owner), Some(o) if o != player)
    }

    // ========================================================================
    // MOVE GENERATION
    // ========================================================================

    fn placement_actions(&self) -> Vec<Action> {
        self.territories
            .iter()
            .enumerate()
            .filter(|(_, t)| t.owner.is_none())
            .map(|(territory, _)| Action::Place { territory })
            .collect()
    }

    fn reinforcement_actions(&self) -> Vec<Action> {
        let player = self.current_player;
        let mut actions = Vec::new();
        if self.cards(player) >= CARD_SET_SIZE {
            actions.push(Action::TradeCards);
        }
        for target in self.board.territory_ids().filter(|&t| self.owns(player, t)) {
            for troops in 1..=self.reinforcements {
                actions.push(Action::Reinforce { target, troops });
            }
        }
        actions
    }

    fn attack_actions(&self) -> Vec<Action> {
        let player = self.current_player;
        let mut actions = Vec::new();
        for source in self.board.territory_ids().filter(|&t| self.owns(player, t)) {
            let available = self.territories[source].troops.saturating_sub(1);
            if available == 0 {
                continue;
            }
            for &target in self.board.neighbors(source) {
                if !self.is_enemy_of(player, target) {
                    continue;
                }
                for troops in 1..=available.min(MAX_ATTACK_DICE) {
                    actions.push(Action::Attack { source, target, troops });
                }
            }
        }
        actions.push(Action::EndPhase);
        actions
    }

    fn occupy_actions(&self) -> Vec<Action> {
        let Some((source, target)) = self.conquest else {
            return Vec::new();
        };
        let available = self.territories[source].troops.saturating_sub(1);
        (1..=available)
            .map(|troops| Action::Occupy { source, target, troops })
            .collect()
    }

    fn fortify_actions(&self) -> Vec<Action> {
        let player = self.current_player;
        let mut actions = Vec::new();
        for source in self.board.territory_ids().filter(|&t| self.owns(player, t)) {
            let available = self.territories[source].troops.saturating_sub(1);
            if available == 0 {
                continue;
            }
            for &target in self.board.neighbors(source) {
                if !self.owns(player, target) {
                    continue;
                }
                for troops in 1..=available {
                    actions.push(Action::Fortify { source, target, troops });
                }
            }
        }
        actions.push(Action::EndPhase);
        actions
    }

    /// Casualties of the pending battle, drawn from the dice stream
    fn battle_outcome(&self) -> Option<Action> {
        let battle = self.battle?;
        let attack_dice = battle.troops.min(MAX_ATTACK_DICE);
        let defense_dice = self.territories[battle.target].troops.min(MAX_DEFENSE_DICE);

        let seed = self.dice_seed ^ self.battles.wrapping_add(1).wrapping_mul(DICE_STREAM_MIX);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut attack: Vec<u32> = (0..attack_dice).map(|_| rng.gen_range(1..=6)).collect();
        let mut defense: Vec<u32> = (0..defense_dice).map(|_| rng.gen_range(1..=6)).collect();
        attack.sort_unstable_by(|a, b| b.cmp(a));
        defense.sort_unstable_by(|a, b| b.cmp(a));

        let (mut attacker, mut defender) = (0, 0);
        for (a, d) in attack.iter().zip(defense.iter()) {
            // Defender wins ties
            if a > d {
                defender += 1;
            } else {
                attacker += 1;
            }
        }
        Some(Action::Casualties { attacker, defender })
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    fn illegal(&self, action: &Action) -> RulesError {
        RulesError::IllegalAction {
            action: action.to_string(),
            phase: self.phase,
        }
    }

    fn transition(&self, action: &Action) -> Result<Self, RulesError> {
        let player = self.current_player;
        let mut next = self.clone();
        next.last_action = Some((player, *action));

        match (self.phase, *action) {
            (Phase::InitialPlacement, Action::Place { territory }) => {
                let t = self.territories.get(territory).ok_or(RulesError::UnknownTerritory(territory))?;
                if t.owner.is_some() {
                    return Err(self.illegal(action));
                }
                next.territories[territory].owner = Some(player);
                next.territories[territory].troops = 1;
                next.finish_placement_step();
            }
            (Phase::Reinforcement, Action::TradeCards) => {
                if self.cards(player) < CARD_SET_SIZE {
                    return Err(self.illegal(action));
                }
                next.cards[player] -= CARD_SET_SIZE;
                next.reinforcements += CARD_TRADE_BASE + CARD_TRADE_STEP * self.trades;
                next.trades += 1;
            }
            (Phase::Reinforcement, Action::Reinforce { target, troops }) => {
                if !self.owns(player, target) || troops == 0 || troops > self.reinforcements {
                    return Err(self.illegal(action));
                }
                next.territories[target].troops += troops;
                next.reinforcements -= troops;
                if next.reinforcements == 0 {
                    next.phase = Phase::Attack;
                }
            }
            (Phase::Attack, Action::Attack { source, target, troops }) => {
                let legal = self.owns(player, source)
                    && self.is_enemy_of(player, target)
                    && self.board.are_adjacent(source, target)
                    && troops >= 1
                    && troops <= MAX_ATTACK_DICE
                    && troops < self.territories[source].troops;
                if !legal {
                    return Err(self.illegal(action));
                }
                next.battle = Some(PendingBattle { source, target, troops });
                next.phase = Phase::Battle;
            }
            (Phase::Attack, Action::EndPhase) => {
                next.phase = Phase::Fortify;
            }
            (Phase::Battle, Action::Casualties { .. }) => {
                let battle = self.battle.ok_or_else(|| self.illegal(action))?;
                if self.battle_outcome() != Some(*action) {
                    return Err(self.illegal(action));
                }
                let Action::Casualties { attacker, defender } = *action else {
                    return Err(self.illegal(action));
                };
                next.battles += 1;
                next.battle = None;
                next.territories[battle.source].troops -= attacker;
                next.territories[battle.target].troops -= defender;
                if next.territories[battle.target].troops == 0 {
                    next.territories[battle.target].owner = Some(player);
                    next.conquest = Some((battle.source, battle.target));
                    next.phase = Phase::Occupy;
                } else {
                    next.phase = Phase::Attack;
                }
            }
            (Phase::Occupy, Action::Occupy { source, target, troops }) => {
                if self.conquest != Some((source, target))
                    || troops == 0
                    || troops >= self.territories[source].troops
                {
                    return Err(self.illegal(action));
                }
                next.territories[source].troops -= troops;
                next.territories[target].troops += troops;
                next.conquest = None;
                next.conquered_this_turn = true;
                next.phase = Phase::Attack;
            }
            (Phase::Fortify, Action::Fortify { source, target, troops }) => {
                let legal = self.owns(player, source)
                    && self.owns(player, target)
                    && self.board.are_adjacent(source, target)
                    && troops >= 1
                    && troops < self.territories[source].troops;
                if !legal {
                    return Err(self.illegal(action));
                }
                next.territories[source].troops -= troops;
                next.territories[target].troops += troops;
                next.end_turn();
            }
            (Phase::Fortify, Action::EndPhase) => {
                next.end_turn();
            }
            _ => return Err(self.illegal(action)),
        }

        Ok(next)
    }

    /// After a claim: next seat places, or the first turn begins
    fn finish_placement_step(&mut self) {
        if self.territories.iter().any(|t| t.owner.is_none()) {
            self.current_player = (self.current_player + 1) % self.num_players;
            return;
        }
        self.current_player = 0;
        self.begin_turn();
        // Seat 0 may have claimed nothing on tiny boards
        if !self.is_alive(0) {
            self.end_turn();
        }
    }

    fn begin_turn(&mut self) {
        self.phase = Phase::Reinforcement;
        self.reinforcements = self.reinforcements_for(self.current_player);
        self.conquered_this_turn = false;
    }

    fn end_turn(&mut self) {
        if self.conquered_this_turn {
            self.cards[self.current_player] += 1;
        }
        self.turn += 1;
        for offset in 1..=self.num_players {
            let seat = (self.current_player + offset) % self.num_players;
            if self.territory_count_of(seat) > 0 {
                self.current_player = seat;
                break;
            }
        }
        self.begin_turn();
    }
}

impl RiskGame for RiskState {
    fn board(&self) -> &Board {
        &self.board
    }

    fn legal_actions(&self) -> Vec<Action> {
        if self.is_terminal() {
            return Vec::new();
        }
        match self.phase {
            Phase::InitialPlacement => self.placement_actions(),
            Phase::Reinforcement => self.reinforcement_actions(),
            Phase::Attack => self.attack_actions(),
            Phase::Battle => self.battle_outcome().into_iter().collect(),
            Phase::Occupy => self.occupy_actions(),
            Phase::Fortify => self.fortify_actions(),
        }
    }

    fn apply(&self, action: &Action) -> Result<Self, RulesError> {
        if self.is_terminal() {
            return Err(RulesError::GameOver);
        }
        self.transition(action)
    }

    fn is_terminal(&self) -> bool {
        if self.phase == Phase::InitialPlacement {
            return false;
        }
        let mut owners = self.territories.iter().filter_map(|t| t.owner);
        match owners.next() {
            Some(first) => owners.all(|o| o == first),
            None => true,
        }
    }

    fn is_alive(&self, player: PlayerId) -> bool {
        self.phase == Phase::InitialPlacement || self.territory_count_of(player) > 0
    }

    fn current_player(&self) -> PlayerId {
        self.current_player
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn territories(&self) -> &[Territory] {
        &self.territories
    }
}

// ============================================================================
// TESTS
// ============================================================================
