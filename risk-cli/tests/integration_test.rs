//! Integration tests for the riskbot harness
//!
//! Runs the built binary end to end and checks its JSON report.

use risk_core::Board;
use std::path::PathBuf;
use std::process::Command;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn riskbot() -> Command {
    Command::new(env!("CARGO_BIN_EXE_riskbot"))
}

fn run_json(extra: &[&str]) -> serde_json::Value {
    let output = riskbot()
        .args(["play", "--players", "2", "--budget-ms", "5", "--max-turns", "3", "--seed", "1", "--json"])
        .args(extra)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run riskbot");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("riskbot-{}-{}", std::process::id(), name))
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_play_reports_json() {
    let report = run_json(&["--games", "2"]);
    assert_eq!(report["total_games"], 2);
    let games = report["games"].as_array().unwrap();
    assert_eq!(games.len(), 2);
    for game in games {
        assert!(game["turns"].as_u64().unwrap() <= 3);
        assert!(!game["iterations"].as_array().unwrap().is_empty());
    }
}

#[test]
fn test_play_on_board_file() {
    let board = Board::from_links(
        "square",
        &[("North", 2), ("South", 2)],
        &[("nw", 0), ("ne", 0), ("sw", 1), ("se", 1)],
        &[(0, 1), (0, 2), (1, 3), (2, 3)],
    )
    .unwrap();
    let path = temp_file("square.json");
    board.save(&path).unwrap();

    let report = run_json(&["--board", path.to_str().unwrap()]);
    assert_eq!(report["total_games"], 1);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_play_with_config_file() {
    let path = temp_file("config.json");
    std::fs::write(&path, r#"{"exploration": 500.0, "rewards": {"fortify_toward_enemy": 30.0}}"#).unwrap();

    let report = run_json(&["--config", path.to_str().unwrap()]);
    assert_eq!(report["total_games"], 1);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_missing_board_file_fails() {
    let output = riskbot()
        .args(["play", "--board", "/nonexistent/board.json", "--budget-ms", "1"])
        .output()
        .expect("failed to run riskbot");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load board"));
}
