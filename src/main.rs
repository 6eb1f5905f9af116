//! # Delve Headless Runner
//!
//! Generates a run from a seed and lets the autopilot play it for a number of
//! ticks, logging what happens and printing the final statistics.

use clap::Parser;
use delve::{
    Autopilot, Biome, DelveError, DelveResult, DifficultyTable, GameEvent, GenerationConfig,
    TurnEngine,
};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Command line arguments for the headless runner.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Headless roguelike simulation driven by an autopilot")]
#[command(version)]
struct Args {
    /// Random seed for the run
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Maximum number of ticks to simulate
    #[arg(short, long, default_value_t = 500)]
    ticks: u64,

    /// Biome of the first level (cavern, forest, ice, lava, shadow); follows the tier if unset
    #[arg(long)]
    biome: Option<Biome>,

    /// Difficulty tier of the first level
    #[arg(long, default_value_t = 1)]
    tier: u32,

    /// Chance of each enemy slot being filled
    #[arg(long)]
    density: Option<f64>,

    /// JSON file overriding the difficulty table
    #[arg(long)]
    difficulty: Option<PathBuf>,

    /// Write final statistics as JSON to this file
    #[arg(long)]
    stats_out: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> DelveResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level)?;
    info!("Starting Delve v{}", delve::VERSION);

    let biome = args.biome.unwrap_or_else(|| Biome::for_tier(args.tier));
    let mut generation = GenerationConfig::new()
        .with_tier(args.tier)
        .with_biome(biome);
    if let Some(density) = args.density {
        generation = generation.with_enemy_density(density);
    }

    let difficulty = match &args.difficulty {
        Some(path) => {
            info!("Loading difficulty table from {}", path.display());
            DifficultyTable::from_path(path)?
        }
        None => DifficultyTable::default(),
    };

    #[cfg(feature = "dev-tools")]
    let _run_span = tracing::info_span!("run", seed = args.seed, tier = args.tier).entered();

    let mut engine = TurnEngine::new(args.seed, generation, difficulty)?;
    let mut autopilot = Autopilot::engaged();

    for _ in 0..args.ticks {
        let Some(intent) = autopilot.next_intent(&engine.snapshot())? else {
            break;
        };

        match engine.submit_player_intent(intent) {
            Ok(report) => {
                for event in &report.events {
                    log_event(event);
                }
                if !report.consumed_turn {
                    // A rejected step means the planned path went stale
                    autopilot.current_path.clear();
                }
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("Autopilot intent {} failed: {}", intent.label(), err);
                autopilot.current_path.clear();
            }
        }

        if engine.state().is_game_ended() {
            break;
        }
    }

    let snapshot = engine.snapshot();
    info!(
        "Run ended after {} turns at depth {} ({:?})",
        snapshot.turn, snapshot.depth, snapshot.completion
    );

    let summary = serde_json::to_string_pretty(snapshot.statistics)?;
    println!("{}", summary);

    if let Some(path) = &args.stats_out {
        std::fs::write(path, &summary)?;
        info!("Statistics written to {}", path.display());
    }

    Ok(())
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::Message { text, .. } => info!("{}", text),
        GameEvent::LevelTransition {
            to_depth,
            biome,
            difficulty_tier,
            ..
        } => info!(
            "Reached depth {} ({}, tier {})",
            to_depth,
            biome.name(),
            difficulty_tier
        ),
        GameEvent::PlayerDied { .. } | GameEvent::EntityDied { .. } => info!("{:?}", event),
        _ => debug!("{:?}", event),
    }
}

/// Initializes the logging backend for the requested level.
fn initialize_logging(log_level: &str) -> DelveResult<()> {
    let level: log::LevelFilter = log_level
        .parse()
        .map_err(|_| DelveError::InvalidConfig(format!("Unknown log level '{}'", log_level)))?;

    #[cfg(feature = "dev-tools")]
    {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .map_err(|err| DelveError::InvalidState(format!("Logging setup failed: {}", err)))?;
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()
            .map_err(|err| DelveError::InvalidState(format!("Logging setup failed: {}", err)))?;
    }

    Ok(())
}
