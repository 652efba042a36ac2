//! Borba headless runner
//!
//! Plays a session with the autopilot and prints a JSON summary.

use std::path::PathBuf;
use std::process::ExitCode;

use borba_sim::Tuning;
use borba_sim::headless::{HeadlessConfig, run_session};
use borba_sim::persistence::SaveGame;
use borba_sim::sim::{GameState, SpellKind};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "borba-sim")]
#[command(about = "Headless combat and progression simulator")]
#[command(version)]
struct Args {
    /// Seed for a new session
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Maximum ticks to simulate (60 per second)
    #[arg(long, default_value_t = 3600)]
    ticks: u64,

    /// Tuning file (JSON) for a new session
    #[arg(long, value_name = "TUNING_FILE")]
    config: Option<PathBuf>,

    /// Write the session here when the run ends
    #[arg(long, value_name = "SAVE_FILE")]
    save: Option<PathBuf>,

    /// Resume a saved session instead of starting a new one
    #[arg(long, value_name = "SAVE_FILE")]
    load: Option<PathBuf>,

    /// Spell to cast: lightning, fireball or arcane_bolt
    #[arg(long)]
    spell: Option<SpellKind>,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let state = match &args.load {
        Some(path) => {
            if args.config.is_some() {
                log::warn!("--config ignored: a loaded session keeps its own tuning");
            }
            SaveGame::load_from_path(path)?.state
        }
        None => {
            let tuning = match &args.config {
                Some(path) => Tuning::load(path)?,
                None => Tuning::default(),
            };
            GameState::with_tuning(args.seed, tuning)
        }
    };

    let config = HeadlessConfig {
        ticks: args.ticks,
        spell: args.spell.unwrap_or_default(),
        ..Default::default()
    };
    let (state, summary) = run_session(state, &config);

    if let Some(path) = &args.save {
        SaveGame::new(&state).save_to_path(path)?;
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
