//! Water Bringers Headless Game Harness
//!
//! Plays complete games through the session layer with a scripted player
//! and checks engine invariants after every turn. Runs entirely in-process
//! with simulated time.
//!
//! Usage:
//!   cargo run -p waterbringers-simtest
//!   cargo run -p waterbringers-simtest -- --games 50 --seed 7 --verbose
//!   cargo run -p waterbringers-simtest -- --config game.toml --json

use clap::Parser;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use waterbringers_core::prelude::*;

/// Simulated seconds per frame fed to the session
const FRAME_SECS: f64 = 0.5;

/// Hard stop for a game that never ends
const MAX_FRAMES: u32 = 100_000;

#[derive(Parser, Debug)]
#[command(name = "waterbringers-simtest", about = "Play seeded games headlessly and validate the engine")]
struct Args {
    /// Base seed; game N uses seed + N
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of full games to play
    #[arg(long, default_value_t = 20)]
    games: u32,

    /// Print every check, not just failures
    #[arg(long)]
    verbose: bool,

    /// TOML game config (defaults are used when absent)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a JSON summary instead of the text report
    #[arg(long)]
    json: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize, Default)]
struct GameStats {
    seed: u64,
    status: Option<GameStatus>,
    turns: u32,
    actions: u32,
    rejected: u32,
    stipends: u32,
    events: u32,
    /// Recorded history per event name
    event_kinds: Vec<(String, usize)>,
    sustained: usize,
    enabled: usize,
    funding_left: u32,
    time_left: u32,
}

#[derive(Serialize)]
struct Summary<'a> {
    passed: usize,
    failed: usize,
    wins: usize,
    losses: usize,
    games: &'a [GameStats],
    results: &'a [TestResult],
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let base = match &args.config {
        Some(path) => match GameConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => GameConfig::default(),
    };

    if !args.json {
        println!("=== Water Bringers Game Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Config sanity
    results.extend(validate_config(&base, &args));

    // 2. Map generation sweep
    results.extend(validate_generation(&base, &args));

    // 3. Dispatch rules
    results.extend(validate_dispatch(&base, &args));

    // 4. Full games through the session
    let (game_results, games) = play_games(&base, &args);
    results.extend(game_results);

    // 5. Save/load
    results.extend(validate_persistence(&base, &args));

    // ── Summary ──
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let wins = games.iter().filter(|g| g.status == Some(GameStatus::Won)).count();
    let losses = games.iter().filter(|g| g.status == Some(GameStatus::Lost)).count();

    if args.json {
        let summary = Summary {
            passed,
            failed,
            wins,
            losses,
            games: &games,
            results: &results,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("failed to encode summary: {}", e),
        }
    } else {
        println!();
        for r in &results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || args.verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
        println!("\n  games: {} won, {} lost", wins, losses);
        println!(
            "\n=== RESULT: {}/{} passed, {} failed ===",
            passed,
            results.len(),
            failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn section(args: &Args, title: &str) {
    if !args.json {
        println!("--- {} ---", title);
    }
}

fn seeded(base: &GameConfig, seed: u64) -> GameConfig {
    GameConfig {
        seed: Some(seed),
        ..base.clone()
    }
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn validate_config(base: &GameConfig, args: &Args) -> Vec<TestResult> {
    section(args, "Config");
    let mut results = Vec::new();

    results.push(TestResult::new(
        "config_valid",
        base.validate().is_ok(),
        format!(
            "{}x{} map, {} interventions, ${} over {} turns",
            base.rows,
            base.cols,
            base.catalog.len(),
            base.start_funding,
            base.start_time
        ),
    ));

    let affordable = base
        .catalog
        .cheapest()
        .map(|i| i64::from(i.cost) <= base.start_funding)
        .unwrap_or(false);
    results.push(TestResult::new(
        "config_first_action_affordable",
        affordable,
        match base.catalog.cheapest() {
            Some(i) => format!("cheapest is {} at ${}", i.name, i.cost),
            None => "catalog is empty".into(),
        },
    ));

    let broken = GameConfig {
        cols: 0,
        ..base.clone()
    };
    results.push(TestResult::new(
        "config_rejects_empty_map",
        matches!(GameState::new(broken), Err(ConfigError::EmptyMap { .. })),
        "0-column map refused",
    ));

    results
}

// ── 2. Generation ───────────────────────────────────────────────────────

fn validate_generation(base: &GameConfig, args: &Args) -> Vec<TestResult> {
    section(args, "Map Generation");
    let mut results = Vec::new();

    let sweep = u64::from(args.games.max(1)) * 10;
    let mut bad_needs = Vec::new();
    let mut bad_disabled = Vec::new();
    let mut dirty = Vec::new();

    for offset in 0..sweep {
        let seed = args.seed.wrapping_add(offset);
        let game = match GameState::new(seeded(base, seed)) {
            Ok(game) => game,
            Err(e) => {
                results.push(TestResult::new("generation_new_game", false, format!("seed {}: {}", seed, e)));
                return results;
            }
        };

        let expected_disabled = base.disabled_min.min(game.region_count())..=base.disabled_max.min(game.region_count());
        if !expected_disabled.contains(&game.disabled_region_count()) {
            bad_disabled.push(seed);
        }
        for region in game.regions() {
            let distinct: HashSet<_> = region.needs.iter().collect();
            if !(base.needs_min..=base.needs_max).contains(&region.needs.len())
                || distinct.len() != region.needs.len()
                || region.needs.iter().any(|k| !base.catalog.contains(k))
            {
                bad_needs.push((seed, region.index));
            }
        }
        if !game.check_invariants().is_empty() {
            dirty.push(seed);
        }
    }

    results.push(TestResult::new(
        "generation_needs_in_range",
        bad_needs.is_empty(),
        if bad_needs.is_empty() {
            format!("{} maps, every region needs {}..={} distinct keys", sweep, base.needs_min, base.needs_max)
        } else {
            format!("{} bad regions, first {:?}", bad_needs.len(), bad_needs[0])
        },
    ));
    results.push(TestResult::new(
        "generation_disabled_in_range",
        bad_disabled.is_empty(),
        if bad_disabled.is_empty() {
            format!("{}..={} disabled on every map", base.disabled_min, base.disabled_max)
        } else {
            format!("seeds {:?}", bad_disabled)
        },
    ));
    results.push(TestResult::new(
        "generation_invariants",
        dirty.is_empty(),
        format!("{} fresh maps with violations", dirty.len()),
    ));

    let a = GameState::new(seeded(base, args.seed)).map(|g| g.regions());
    let b = GameState::new(seeded(base, args.seed)).map(|g| g.regions());
    results.push(TestResult::new(
        "generation_deterministic",
        matches!((&a, &b), (Ok(a), Ok(b)) if a == b),
        format!("seed {} builds the same map twice", args.seed),
    ));

    results
}

// ── 3. Dispatch ─────────────────────────────────────────────────────────

fn validate_dispatch(base: &GameConfig, args: &Args) -> Vec<TestResult> {
    section(args, "Dispatch");
    let mut results = Vec::new();

    let quiet = GameConfig {
        events: EventConfig {
            chance: 0.0,
            ..base.events.clone()
        },
        ..seeded(base, args.seed)
    };
    let mut game = match GameState::new(quiet) {
        Ok(game) => game,
        Err(e) => {
            results.push(TestResult::new("dispatch_new_game", false, e.to_string()));
            return results;
        }
    };

    let open: Vec<RegionView> = game.regions().into_iter().filter(|r| !r.disabled).collect();
    let Some(first) = open.first().cloned() else {
        results.push(TestResult::new("dispatch_has_regions", false, "no enabled regions"));
        return results;
    };

    let before = game.funding();
    let rejected = game.request_action(first.index, None);
    results.push(TestResult::new(
        "dispatch_requires_selection",
        rejected == Err(DispatchError::NoActionSelected) && game.funding() == before,
        format!("{:?}", rejected),
    ));

    let key = first.needs[0].clone();
    let cost = game.catalog().get(&key).map(|i| i.cost).unwrap_or(0);
    let started = game.request_action(first.index, Some(&key));
    results.push(TestResult::new(
        "dispatch_deducts_cost",
        started.is_ok() && game.funding() + cost == before,
        format!("{} cost ${}, funding {} -> {}", key, cost, before, game.funding()),
    ));

    let again = game.request_action(first.index, Some(&key));
    results.push(TestResult::new(
        "dispatch_one_action_per_region",
        again == Err(DispatchError::AlreadyInProgress),
        format!("{:?}", again),
    ));

    let limit = game.config().max_concurrent_actions;
    for region in open.iter().skip(1).take(limit.saturating_sub(1)) {
        let _ = game.request_action(region.index, Some(&region.needs[0]));
    }
    if let Some(extra) = open.get(limit) {
        let funding = game.funding();
        let over = game.request_action(extra.index, Some(&extra.needs[0]));
        results.push(TestResult::new(
            "dispatch_concurrency_limit",
            over == Err(DispatchError::TooManyConcurrentActions { limit }) && game.funding() == funding,
            format!("{} in progress, next request {:?}", game.in_progress_count(), over),
        ));
    }

    let duration = game.catalog().get(&key).map(|i| i.duration).unwrap_or(0);
    for _ in 0..duration {
        game.advance_turn();
    }
    let landed = game
        .region(first.index)
        .map(|r| r.completed.contains(&key) && !r.needs.contains(&key))
        .unwrap_or(false);
    results.push(TestResult::new(
        "dispatch_work_completes",
        landed,
        format!("{} done after {} turns", key, duration),
    ));

    results
}

// ── 4. Full games ───────────────────────────────────────────────────────

/// Pick the cheapest affordable need on an idle region.
fn choose_action(game: &GameState) -> Option<(usize, InterventionKey)> {
    if game.in_progress_count() >= game.config().max_concurrent_actions {
        return None;
    }
    game.regions()
        .into_iter()
        .filter(|r| !r.disabled && !r.sustained && r.in_progress.is_none())
        .flat_map(|r| {
            let index = r.index;
            r.needs.into_iter().map(move |key| (index, key))
        })
        .filter_map(|(index, key)| {
            let cost = game.catalog().get(&key)?.cost;
            (cost <= game.funding()).then_some((cost, index, key))
        })
        .min_by_key(|(cost, index, _)| (*cost, *index))
        .map(|(_, index, key)| (index, key))
}

fn play_game(session: &mut Session, stats: &mut GameStats) -> Result<(), String> {
    session.start();

    for frame in 0..MAX_FRAMES {
        while let Some((region, key)) = choose_action(session.game()) {
            session.select(key.clone());
            match session.act_on_region(region) {
                Ok(_) => stats.actions += 1,
                Err(e) => {
                    stats.rejected += 1;
                    debug!(region, intervention = %key, error = %e, "scripted action refused");
                    break;
                }
            }
        }

        for event in session.update(FRAME_SECS) {
            match event {
                SessionEvent::Stipend { .. } => stats.stipends += 1,
                SessionEvent::Turn(outcome) => {
                    stats.turns += 1;
                    let violations = session.game().check_invariants();
                    if !violations.is_empty() {
                        return Err(format!("turn {}: {}", outcome.turn, violations.join("; ")));
                    }
                }
                SessionEvent::EventRaised(_) => {
                    stats.events += 1;
                    session.acknowledge_event();
                }
                SessionEvent::GameOver(status) => {
                    stats.status = Some(status);
                }
            }
        }

        if session.game().status().is_over() {
            debug!(frame, "game finished");
            return Ok(());
        }
    }

    Err(format!("still running after {} frames", MAX_FRAMES))
}

fn play_games(base: &GameConfig, args: &Args) -> (Vec<TestResult>, Vec<GameStats>) {
    section(args, "Full Games");
    let mut results = Vec::new();
    let mut all_stats = Vec::new();

    for n in 0..args.games {
        let seed = args.seed.wrapping_add(u64::from(n));
        let mut stats = GameStats {
            seed,
            ..Default::default()
        };

        let mut session = match Session::new(seeded(base, seed)) {
            Ok(session) => session,
            Err(e) => {
                results.push(TestResult::new(format!("game_{}_start", seed), false, e.to_string()));
                continue;
            }
        };

        let played = play_game(&mut session, &mut stats);
        let game = session.game();
        stats.turns = game.turn();
        stats.sustained = game.sustained_count();
        stats.enabled = game.enabled_region_count();
        stats.funding_left = game.funding();
        stats.time_left = game.time_left();
        stats.event_kinds = WorldEventKind::ALL
            .iter()
            .map(|kind| (kind.name().to_string(), game.events.count(*kind)))
            .collect();

        let detail = match &played {
            Ok(()) => format!(
                "{:?} on turn {}: {}/{} sustained, {} actions, {} events",
                game.status(),
                game.turn(),
                stats.sustained,
                stats.enabled,
                stats.actions,
                stats.events
            ),
            Err(e) => e.clone(),
        };
        if let Err(e) = &played {
            warn!(seed, error = %e, "game failed validation");
        }
        results.push(TestResult::new(format!("game_{}", seed), played.is_ok(), detail));

        let consistent = match stats.status {
            Some(GameStatus::Won) => game.progress_percent() == 100,
            Some(GameStatus::Lost) => game.time_left() == 0 && game.progress_percent() < 100,
            _ => false,
        };
        results.push(TestResult::new(
            format!("game_{}_outcome", seed),
            consistent && !session.turn_ticker().is_running() && !session.funding_ticker().is_running(),
            format!("{:?} at {}%, tickers stopped", stats.status, game.progress_percent()),
        ));

        // An event on the winning turn is recorded but never raised
        let recorded: usize = stats.event_kinds.iter().map(|(_, n)| n).sum();
        let unraised = game
            .events
            .history
            .last()
            .is_some_and(|r| r.turn == game.turn() && game.status() == GameStatus::Won);
        let expected = stats.events as usize + usize::from(unraised);
        results.push(TestResult::new(
            format!("game_{}_event_history", seed),
            recorded == expected,
            format!("{} recorded, {} raised", recorded, stats.events),
        ));

        all_stats.push(stats);
    }

    (results, all_stats)
}

// ── 5. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(base: &GameConfig, args: &Args) -> Vec<TestResult> {
    section(args, "Save/Load");
    let mut results = Vec::new();

    let mut game = match GameState::new(seeded(base, args.seed)) {
        Ok(game) => game,
        Err(e) => {
            results.push(TestResult::new("persistence_new_game", false, e.to_string()));
            return results;
        }
    };
    for _ in 0..10 {
        if let Some((region, key)) = choose_action(&game) {
            let _ = game.request_action(region, Some(&key));
        }
        game.advance_turn();
    }

    let mut buffer = Vec::new();
    if let Err(e) = game.save(&mut buffer) {
        results.push(TestResult::new("persistence_save", false, e.to_string()));
        return results;
    }

    match waterbringers_core::persistence::load_game(&buffer[..]) {
        Ok(loaded) => results.push(TestResult::new(
            "persistence_round_trip",
            loaded.regions() == game.regions() && loaded.aggregate() == game.aggregate(),
            format!("{} bytes at turn {}", buffer.len(), game.turn()),
        )),
        Err(e) => results.push(TestResult::new("persistence_round_trip", false, e.to_string())),
    }

    results
}
