//! # SORTIS Practice
//!
//! Plays a PvE battle against the offline engine, with the dice animated
//! through the outcome reconciler and skill notices printed as they fire.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug sortis_practice --config sortis.toml --seed 7 --skills 2,5
//! ```

use std::process::ExitCode;
use std::time::{Duration, Instant};

use sortis::core::{BattleStatus, SkillId};
use sortis::networking::{decode_roll, BattleApi};
use sortis::shared::{BattleType, StartBattleRequest};
use sortis::{ClientConfig, OfflineEngine, OutcomeReconciler, SkillEffectQueue, SortisResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct Options {
    config: Option<String>,
    seed: u64,
    skills: Vec<SkillId>,
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config: None,
        seed: 1,
        skills: Vec::new(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    options.config = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--seed" | "-s" => {
                if i + 1 < args.len() {
                    options.seed = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--skills" | "-k" => {
                if i + 1 < args.len() {
                    options.skills = args[i + 1]
                        .split(',')
                        .filter_map(|s| s.trim().parse().ok())
                        .collect();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: sortis_practice [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>     Client config (TOML)");
                println!("  -s, --seed <N>          RNG seed (default: 1)");
                println!("  -k, --skills <IDS>      Equipped skills, e.g. 2,5 (max 4)");
                println!("  -h, --help              Show this help");
                return None;
            }
            other => {
                eprintln!("Unknown argument: {other}");
            }
        }
        i += 1;
    }
    Some(options)
}

fn run(options: &Options) -> SortisResult<BattleStatus> {
    let config = match &options.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };

    let mut engine = OfflineEngine::new(config.battle_rules(), options.seed);
    let mut dice = OutcomeReconciler::new(config.reconciler.clone(), options.seed);
    let mut notices = SkillEffectQueue::new();

    let start = engine.start_battle(&StartBattleRequest {
        player_id: config.server.player_id,
        battle_type: BattleType::Pve,
        floor: None,
        equipped_skills: options.skills.clone(),
    })?;
    println!(
        "Battle {} - you {} hp vs enemy {} hp",
        start.battle_id, start.player_hp, start.enemy_hp
    );

    // Notices advance on a simulated clock so the run is not paced in real time.
    let mut clock = Instant::now();
    loop {
        let response = engine.roll(start.battle_id)?;
        let (rolled, hand) = decode_roll(&response)?;
        let shown = dice.resolve_toward(rolled);
        println!(
            "Turn: {shown} {} ({}) for {} -> enemy {} hp",
            hand.rank.name_en(),
            hand.rank.name_kr(),
            response.damage,
            response.enemy_hp
        );
        if let Some(enemy) = &response.enemy_turn {
            println!(
                "      enemy {:?} {} for {} -> you {} hp",
                enemy.dice, enemy.hand.rank, enemy.damage, response.player_hp
            );
        }

        notices.notify_all(&response.skill_activations, clock);
        while let Some(notice) = notices.tick(clock) {
            println!("  * {}: {}", notice.name, notice.description);
            clock += notice.duration;
        }
        clock += Duration::from_millis(500);

        if response.status.is_terminal() {
            info!(status = %response.status, "practice finished");
            return Ok(response.status);
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         SORTIS PRACTICE                                          ║");
    println!("║         OFFLINE DICE COMBAT                                      ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let Some(options) = parse_args() else {
        return ExitCode::SUCCESS;
    };
    match run(&options) {
        Ok(status) => {
            println!();
            println!("Result: {status}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "practice failed");
            ExitCode::FAILURE
        }
    }
}
