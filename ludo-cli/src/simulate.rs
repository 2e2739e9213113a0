//! Simulate command - play complete local games with seeded dice
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: play_games(), report_results()
//! - Level 3: play_single_game(), compute_statistics()
//! - Level 4: formatting utilities

use anyhow::Result;
use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use ludo_core::{
    Color, GameEvent, GameSettings, NoPeer, PlayerNames, RandomDice, Table, Timings, TurnPhase,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of games to play
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Give up on a game after this many rolls
    #[arg(long, default_value = "10000")]
    pub max_rolls: u32,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug)]
struct GameRecord {
    game_number: usize,
    winner: Option<Color>,
    rolls: u32,
    turns: u32,
    captures: u32,
}

/// Aggregated simulation results
#[derive(Clone, Debug)]
struct SimulationResults {
    games: Vec<GameRecord>,
    wins: Vec<(Color, usize)>,
    unfinished: usize,
    avg_rolls: f32,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run simulate command
///
/// This function reads like a table of contents:
/// 1. Play the games
/// 2. Report results
pub fn run(args: SimulateArgs, seed: Option<u64>) -> Result<()> {
    tracing::info!("Simulating {} games (max {} rolls each)", args.games, args.max_rolls);

    let results = play_games(&args, seed);

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Play all games, each with its own dice stream
fn play_games(args: &SimulateArgs, seed: Option<u64>) -> SimulationResults {
    let mut rng = create_rng(seed);
    let mut games = Vec::with_capacity(args.games);

    for game_num in 0..args.games {
        let record = play_single_game(game_num + 1, rng.gen(), args.max_rolls);

        tracing::info!(
            "Game {}: {} ({} rolls, {} captures)",
            record.game_number,
            record.winner.map(|c| c.label()).unwrap_or("unfinished"),
            record.rolls,
            record.captures
        );

        games.push(record);
    }

    compute_statistics(games)
}

/// Report simulation results
fn report_results(results: &SimulationResults, args: &SimulateArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one four-seat game, always moving the first offered piece
fn play_single_game(game_number: usize, dice_seed: u64, max_rolls: u32) -> GameRecord {
    let settings = GameSettings {
        player_names: PlayerNames::default(),
        timings: Timings::instant(),
    };
    let mut table = Table::new(
        settings,
        Box::new(RandomDice::seeded(dice_seed)),
        Box::new(NoPeer),
    );

    let mut rolls = 0;
    let mut turns = 0;
    let mut captures = 0;

    while table.state().winner.is_none() && rolls < max_rolls {
        let Some(pending) = table.roll_dice() else {
            break;
        };
        rolls += 1;
        table.run_chain(Some(pending));

        if table.state().status == TurnPhase::WaitingForMove {
            if let Some(&piece) = table.state().movable_pieces.first() {
                table.select_piece(piece);
            }
        }

        for event in table.take_events() {
            match event {
                GameEvent::TurnPassed { .. } => turns += 1,
                GameEvent::PieceCaptured { .. } => captures += 1,
                _ => {}
            }
        }
    }

    GameRecord {
        game_number,
        winner: table.state().winner,
        rolls,
        turns,
        captures,
    }
}

/// Compute aggregate statistics from game records
fn compute_statistics(games: Vec<GameRecord>) -> SimulationResults {
    let wins = Color::ALL
        .iter()
        .map(|&color| {
            let count = games.iter().filter(|g| g.winner == Some(color)).count();
            (color, count)
        })
        .collect();
    let unfinished = games.iter().filter(|g| g.winner.is_none()).count();

    let total_rolls: u32 = games.iter().map(|g| g.rolls).sum();
    let avg_rolls = if games.is_empty() {
        0.0
    } else {
        total_rolls as f32 / games.len() as f32
    };

    SimulationResults {
        games,
        wins,
        unfinished,
        avg_rolls,
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

fn percent(count: usize, total: usize) -> f32 {
    if total > 0 {
        count as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

/// Print results as JSON
fn print_json_results(results: &SimulationResults) {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: usize,
        winner: Option<Color>,
        rolls: u32,
        turns: u32,
        captures: u32,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        total_games: usize,
        wins: std::collections::BTreeMap<Color, usize>,
        unfinished: usize,
        avg_rolls: f32,
        games: Vec<JsonGame>,
    }

    let output = JsonOutput {
        total_games: results.games.len(),
        wins: results.wins.iter().copied().collect(),
        unfinished: results.unfinished,
        avg_rolls: results.avg_rolls,
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                winner: g.winner,
                rolls: g.rolls,
                turns: g.turns,
                captures: g.captures,
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &SimulationResults) {
    let total = results.games.len();

    println!("\n=== Simulation Results ===");
    println!("Total games: {}", total);
    for (color, count) in &results.wins {
        println!(
            "{:<7} wins: {} ({:.1}%)",
            color.label(),
            count,
            percent(*count, total)
        );
    }
    println!(
        "Unfinished:  {} ({:.1}%)",
        results.unfinished,
        percent(results.unfinished, total)
    );
    println!("Avg rolls:   {:.1}", results.avg_rolls);
}

// ============================================================================
// TESTS
// ============================================================================
