//! Play command - self-play games with the MCTS agent in seat 0
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_board(), load_config(), play_games(), report_results()
//! - Level 3: play_single_game(), compute_statistics()
//! - Level 4: formatting utilities

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use risk_core::{Board, PlayerId, RiskGame, RiskState};
use risk_mcts::{MctsAgent, SearchConfig};

/// Seat the MCTS agent plays
const AGENT_SEAT: PlayerId = 0;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Board JSON file (built-in 14-territory board when omitted)
    #[arg(long, value_name = "FILE")]
    pub board: Option<PathBuf>,

    /// Number of seats; seat 0 is the agent, the rest play randomly
    #[arg(long, default_value = "3")]
    pub players: usize,

    /// Time budget per agent decision, in milliseconds
    #[arg(long, default_value = "200")]
    pub budget_ms: u64,

    /// Random seed (agent, random seats and dice)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop a game after this many completed turns
    #[arg(long, default_value = "60")]
    pub max_turns: u32,

    /// Number of games to play
    #[arg(long, default_value = "1")]
    pub games: usize,

    /// Search config JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug)]
struct GameRecord {
    game_number: usize,
    winner: Option<PlayerId>,
    turns: u32,
    agent_alive: bool,
    /// Simulations completed for each agent decision
    iterations: Vec<u32>,
}

impl GameRecord {
    fn avg_iterations(&self) -> f32 {
        if self.iterations.is_empty() {
            0.0
        } else {
            self.iterations.iter().sum::<u32>() as f32 / self.iterations.len() as f32
        }
    }
}

/// Aggregated results
#[derive(Clone, Debug)]
struct PlayResults {
    games: Vec<GameRecord>,
    agent_wins: usize,
    other_wins: usize,
    unfinished: usize,
    avg_turns: f32,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// This function reads like a table of contents:
/// 1. Load the board and the agent config
/// 2. Play the games
/// 3. Report results
pub fn run(args: PlayArgs) -> Result<()> {
    let board = load_board(&args)?;
    let config = load_config(&args)?;

    tracing::info!(
        "Starting self-play on {}: {} seats, {} games, {}ms per decision",
        board.name,
        args.players,
        args.games,
        args.budget_ms
    );

    let results = play_games(&board, &config, &args)?;

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_board(args: &PlayArgs) -> Result<Arc<Board>> {
    let board = match &args.board {
        Some(path) => {
            Board::load(path).with_context(|| format!("Failed to load board: {}", path.display()))?
        }
        None => Board::classic_mini(),
    };
    Ok(Arc::new(board))
}

/// Agent config from file or defaults, pinned to the agent seat
fn load_config(args: &PlayArgs) -> Result<SearchConfig> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::load(path)
            .with_context(|| format!("Failed to load search config: {}", path.display()))?,
        None => SearchConfig::default(),
    };
    config.player = AGENT_SEAT;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    Ok(config)
}

fn play_games(board: &Arc<Board>, config: &SearchConfig, args: &PlayArgs) -> Result<PlayResults> {
    let mut rng = create_rng(args.seed);
    let mut agent = MctsAgent::new(config.clone()).context("Invalid search config")?;
    let mut games = Vec::with_capacity(args.games);

    for game_num in 0..args.games {
        agent.reset();
        let record = play_single_game(board, &mut agent, game_num + 1, args, &mut rng)?;

        tracing::info!(
            "Game {}: winner {:?} after {} turns ({:.0} simulations per decision)",
            record.game_number,
            record.winner,
            record.turns,
            record.avg_iterations()
        );

        games.push(record);
    }

    Ok(compute_statistics(games))
}

fn report_results(results: &PlayResults, args: &PlayArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game to the end or to the turn limit
fn play_single_game(
    board: &Arc<Board>,
    agent: &mut MctsAgent,
    game_number: usize,
    args: &PlayArgs,
    rng: &mut ChaCha8Rng,
) -> Result<GameRecord> {
    let mut state = RiskState::new(Arc::clone(board), args.players, rng.gen())?;
    let budget = Duration::from_millis(args.budget_ms);
    let mut iterations = Vec::new();

    while !state.is_terminal() && state.turn < args.max_turns {
        let action = if state.current_player() == AGENT_SEAT {
            let outcome = agent
                .decide_with_stats(&state, budget)
                .with_context(|| format!("Agent failed on turn {}", state.turn))?;
            iterations.push(outcome.iterations);
            outcome.action
        } else {
            let actions = state.legal_actions();
            actions[rng.gen_range(0..actions.len())]
        };
        state = state.apply(&action)?;
    }

    Ok(GameRecord {
        game_number,
        winner: state.winner(),
        turns: state.turn,
        agent_alive: state.is_alive(AGENT_SEAT),
        iterations,
    })
}

fn compute_statistics(games: Vec<GameRecord>) -> PlayResults {
    let agent_wins = games.iter().filter(|g| g.winner == Some(AGENT_SEAT)).count();
    let unfinished = games.iter().filter(|g| g.winner.is_none()).count();
    let other_wins = games.len() - agent_wins - unfinished;

    let total_turns: u32 = games.iter().map(|g| g.turns).sum();
    let avg_turns = if games.is_empty() {
        0.0
    } else {
        total_turns as f32 / games.len() as f32
    };

    PlayResults {
        games,
        agent_wins,
        other_wins,
        unfinished,
        avg_turns,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn percent(part: usize, total: usize) -> f32 {
    if total > 0 {
        part as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

fn print_json_results(results: &PlayResults) {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: usize,
        winner: Option<PlayerId>,
        turns: u32,
        agent_alive: bool,
        iterations: Vec<u32>,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        total_games: usize,
        agent_wins: usize,
        other_wins: usize,
        unfinished: usize,
        avg_turns: f32,
        games: Vec<JsonGame>,
    }

    let output = JsonOutput {
        total_games: results.games.len(),
        agent_wins: results.agent_wins,
        other_wins: results.other_wins,
        unfinished: results.unfinished,
        avg_turns: results.avg_turns,
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                winner: g.winner,
                turns: g.turns,
                agent_alive: g.agent_alive,
                iterations: g.iterations.clone(),
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

fn print_text_results(results: &PlayResults) {
    let total = results.games.len();

    println!("\n=== Self-Play Results ===");
    println!("Total games: {}", total);
    println!("Agent wins:  {} ({:.1}%)", results.agent_wins, percent(results.agent_wins, total));
    println!("Other wins:  {} ({:.1}%)", results.other_wins, percent(results.other_wins, total));
    println!("Unfinished:  {} ({:.1}%)", results.unfinished, percent(results.unfinished, total));
    println!("Avg turns:   {:.1}", results.avg_turns);

    println!("\nGame details:");
    for game in &results.games {
        let winner = match game.winner {
            Some(p) => format!("seat {}", p),
            None => "none".to_string(),
        };
        println!(
            "  Game {}: winner {} in {} turns, agent {}, {} decisions ({:.0} simulations avg)",
            game.game_number,
            winner,
            game.turns,
            if game.agent_alive { "alive" } else { "eliminated" },
            game.iterations.len(),
            game.avg_iterations()
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(game_number: usize, winner: Option<PlayerId>, turns: u32) -> GameRecord {
        GameRecord {
            game_number,
            winner,
            turns,
            agent_alive: winner != Some(1),
            iterations: vec![10, 20],
        }
    }

    fn args() -> PlayArgs {
        PlayArgs {
            board: None,
            players: 2,
            budget_ms: 5,
            seed: Some(3),
            max_turns: 2,
            games: 1,
            config: None,
            json: false,
        }
    }

    #[test]
    fn test_compute_statistics_empty() {
        let results = compute_statistics(vec![]);
        assert_eq!(results.agent_wins, 0);
        assert_eq!(results.other_wins, 0);
        assert_eq!(results.unfinished, 0);
        assert_eq!(results.avg_turns, 0.0);
    }

    #[test]
    fn test_compute_statistics() {
        let results = compute_statistics(vec![
            record(1, Some(0), 10),
            record(2, Some(1), 20),
            record(3, None, 30),
        ]);
        assert_eq!(results.agent_wins, 1);
        assert_eq!(results.other_wins, 1);
        assert_eq!(results.unfinished, 1);
        assert_eq!(results.avg_turns, 20.0);
        assert_eq!(results.games[0].avg_iterations(), 15.0);
    }

    #[test]
    fn test_create_rng_deterministic() {
        let mut rng1 = create_rng(Some(42));
        let mut rng2 = create_rng(Some(42));
        assert_eq!(rng1.gen::<u64>(), rng2.gen::<u64>());
    }

    #[test]
    fn test_config_pinned_to_agent_seat() {
        let config = load_config(&args()).unwrap();
        assert_eq!(config.player, AGENT_SEAT);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_short_game_stops_at_turn_limit() {
        let args = args();
        let board = load_board(&args).unwrap();
        let config = load_config(&args).unwrap();
        let mut agent = MctsAgent::new(config).unwrap();
        let mut rng = create_rng(args.seed);

        let game = play_single_game(&board, &mut agent, 1, &args, &mut rng).unwrap();
        assert!(game.turns <= args.max_turns);
        assert!(!game.iterations.is_empty());
    }
}
