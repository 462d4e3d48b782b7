//! Integration tests for whole games.
//!
//! Exercises: GameConfig → map generation → dispatch → turns → events
//! → session tickers → save/load
//!
//! All tests are seeded; none depend on wall-clock time.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use waterbringers_core::prelude::*;
use waterbringers_core::systems::{apply_event, EventEffect};

// ── Helpers ────────────────────────────────────────────────────────────

fn quiet_config(seed: u64) -> GameConfig {
    GameConfig {
        seed: Some(seed),
        events: EventConfig {
            chance: 0.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn quiet_game(seed: u64) -> GameState {
    GameState::new(quiet_config(seed)).unwrap()
}

fn enabled_regions(game: &GameState) -> Vec<RegionView> {
    game.regions().into_iter().filter(|r| !r.disabled).collect()
}

// ── Map generation ─────────────────────────────────────────────────────

#[test]
fn generated_maps_respect_bounds() {
    let catalog = Catalog::default();
    for seed in 0..200 {
        let game = quiet_game(seed);
        assert_eq!(game.region_count(), 20);

        let disabled = game.disabled_region_count();
        assert!((9..=14).contains(&disabled), "seed {seed}: {disabled} disabled");

        for region in game.regions() {
            assert!(
                (2..=3).contains(&region.needs.len()),
                "seed {seed}: region {} needs {:?}",
                region.index,
                region.needs
            );
            let distinct: HashSet<_> = region.needs.iter().collect();
            assert_eq!(distinct.len(), region.needs.len());
            assert!(region.needs.iter().all(|k| catalog.contains(k)));
            assert!(region.completed.is_empty());
            assert!(region.in_progress.is_none());
            assert!(!region.sustained);
        }
    }
}

#[test]
fn region_indices_are_row_major() {
    let game = quiet_game(5);
    for (i, region) in game.regions().iter().enumerate() {
        assert_eq!(region.index, i);
        assert_eq!(region.row, i as u32 / 5);
        assert_eq!(region.col, i as u32 % 5);
    }
}

#[test]
fn unseeded_games_still_start() {
    let game = GameState::new(GameConfig::default()).unwrap();
    assert!(game.check_invariants().is_empty());
    assert_eq!(game.status(), GameStatus::Ongoing);
}

// ── Dispatch ───────────────────────────────────────────────────────────

#[test]
fn well_scenario() {
    let (mut game, region) = (0..100)
        .find_map(|seed| {
            let game = quiet_game(seed);
            let region = enabled_regions(&game)
                .into_iter()
                .find(|r| r.needs.contains(&"well".into()))?;
            Some((game, region.index))
        })
        .expect("some seed puts a well need on an enabled region");

    let dispatched = game.request_action(region, Some(&"well".into())).unwrap();
    assert_eq!(dispatched.cost, 120);
    assert_eq!(dispatched.duration, 3);
    assert_eq!(game.funding(), 880);

    for turn in 1..=2 {
        let outcome = game.advance_turn();
        assert!(outcome.completions.is_empty(), "turn {turn}");
        let work = game.region(region).unwrap().in_progress.unwrap();
        assert_eq!(work.turns_remaining, 3 - turn);
    }

    let outcome = game.advance_turn();
    assert_eq!(outcome.completions.len(), 1);
    assert_eq!(outcome.completions[0].region, region);
    let view = game.region(region).unwrap();
    assert!(view.completed.contains(&"well".into()));
    assert!(!view.needs.contains(&"well".into()));
    assert_eq!(game.in_progress_count(), 0);
}

#[test]
fn fourth_concurrent_action_is_refused() {
    let mut game = quiet_game(11);
    let regions = enabled_regions(&game);
    assert!(regions.len() >= 6);

    for region in &regions[..3] {
        game.request_action(region.index, Some(&region.needs[0])).unwrap();
    }
    let funding = game.funding();

    let fourth = &regions[3];
    assert_eq!(
        game.request_action(fourth.index, Some(&fourth.needs[0])),
        Err(DispatchError::TooManyConcurrentActions { limit: 3 })
    );
    assert_eq!(game.funding(), funding);
    assert_eq!(game.in_progress_count(), 3);
    assert!(game.region(fourth.index).unwrap().in_progress.is_none());
}

#[test]
fn rejections_leave_state_untouched() {
    let mut game = quiet_game(12);
    let enabled = enabled_regions(&game);
    let disabled = game.regions().into_iter().find(|r| r.disabled).unwrap();
    let target = &enabled[0];
    let not_needed = game
        .catalog()
        .keys()
        .find(|k| !target.needs.contains(k))
        .cloned()
        .unwrap();

    let before = game.aggregate();
    assert_eq!(
        game.request_action(target.index, None),
        Err(DispatchError::NoActionSelected)
    );
    assert_eq!(
        game.request_action(target.index, Some(&not_needed)),
        Err(DispatchError::NotNeeded)
    );
    assert_eq!(
        game.request_action(disabled.index, Some(&disabled.needs[0])),
        Err(DispatchError::RegionDisabled(disabled.index))
    );
    assert_eq!(
        game.request_action(99, Some(&"well".into())),
        Err(DispatchError::UnknownRegion(99))
    );
    assert_eq!(game.aggregate(), before);
    assert_eq!(game.region(target.index).unwrap(), *target);
}

#[test]
fn insufficient_funding_reports_amounts() {
    let mut game = GameState::new(GameConfig {
        start_funding: 10,
        ..quiet_config(13)
    })
    .unwrap();
    let region = enabled_regions(&game).remove(0);
    let key = region.needs[0].clone();
    let cost = game.catalog().get(&key).unwrap().cost;

    assert_eq!(
        game.request_action(region.index, Some(&key)),
        Err(DispatchError::InsufficientFunding {
            cost,
            available: 10
        })
    );
    assert_eq!(game.funding(), 10);
    assert_eq!(game.actions_taken(), 0);
}

// ── Turns and events ───────────────────────────────────────────────────

#[test]
fn last_turn_loses_without_resolving() {
    let mut game = GameState::new(GameConfig {
        start_time: 1,
        ..quiet_config(14)
    })
    .unwrap();
    let region = enabled_regions(&game).remove(0);
    game.request_action(region.index, Some(&region.needs[0])).unwrap();

    let outcome = game.advance_turn();
    assert_eq!(outcome.status, GameStatus::Lost);
    assert!(outcome.completions.is_empty());
    assert!(outcome.event.is_none());
    assert_eq!(game.time_left(), 0);
    assert!(game.region(region.index).unwrap().in_progress.is_some());
}

#[test]
fn heavy_rains_to_zero_loses_on_next_turn() {
    let (mut game, outcome) = (0..200)
        .find_map(|seed| {
            let mut game = GameState::new(GameConfig {
                seed: Some(seed),
                start_time: 6,
                events: EventConfig {
                    chance: 1.0,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
            game.advance_turn();
            game.advance_turn();
            // Third turn is the first eligible one and always fires
            let outcome = game.advance_turn();
            let rained = outcome.event.as_ref()?.kind == WorldEventKind::HeavyRains;
            rained.then_some((game, outcome))
        })
        .expect("some seed rolls Heavy Rains first");

    // Three days left before the rains, all of them washed out
    assert_eq!(outcome.event.unwrap().effect, EventEffect::TimeLost(3));
    assert_eq!(outcome.status, GameStatus::Ongoing);
    assert_eq!(game.time_left(), 0);
    assert_eq!(game.status(), GameStatus::Ongoing);

    let next = game.advance_turn();
    assert_eq!(next.turn, 4);
    assert_eq!(next.status, GameStatus::Lost);
    assert!(next.completions.is_empty());
    assert!(next.event.is_none());
    assert_eq!(game.time_left(), 0);
}

#[test]
fn contamination_without_completed_work_changes_nothing() {
    let mut game = quiet_game(15);
    let before = game.regions();
    let mut funding = game.funding();
    let mut time_left = game.time_left();
    let config = game.config().events.clone();
    let mut rng = StdRng::seed_from_u64(0);

    let fired = apply_event(
        WorldEventKind::WellContamination,
        &mut game.world,
        &mut funding,
        &mut time_left,
        &config,
        &mut rng,
    );

    assert_eq!(fired.name, "Well Contamination");
    assert_eq!(fired.effect, EventEffect::NoEffect);
    assert_eq!(game.regions(), before);
    assert_eq!(funding, game.funding());
    assert_eq!(time_left, game.time_left());
}

#[test]
fn events_never_drive_counters_below_zero() {
    let mut game = quiet_game(16);
    let config = game.config().events.clone();
    let mut rng = StdRng::seed_from_u64(0);
    let mut funding = 40;
    let mut time_left = 2;

    let rains = apply_event(
        WorldEventKind::HeavyRains,
        &mut game.world,
        &mut funding,
        &mut time_left,
        &config,
        &mut rng,
    );
    let costs = apply_event(
        WorldEventKind::EquipmentCosts,
        &mut game.world,
        &mut funding,
        &mut time_left,
        &config,
        &mut rng,
    );

    assert_eq!(rains.effect, EventEffect::TimeLost(2));
    assert_eq!(costs.effect, EventEffect::FundingLost(40));
    assert_eq!((funding, time_left), (0, 0));
}

#[test]
fn events_respect_quiet_period() {
    let mut game = GameState::new(GameConfig {
        seed: Some(17),
        events: EventConfig {
            chance: 1.0,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();

    let mut fired_on = Vec::new();
    for _ in 0..12 {
        let outcome = game.advance_turn();
        if outcome.event.is_some() {
            fired_on.push(outcome.turn);
        }
    }

    assert_eq!(fired_on, vec![3, 6, 9, 12]);
    assert_eq!(game.events.history.len(), 4);
    let by_kind: usize = WorldEventKind::ALL.iter().map(|k| game.events.count(*k)).sum();
    assert_eq!(by_kind, 4);
    let turns: Vec<u32> = game.events.history.iter().map(|r| r.turn).collect();
    assert_eq!(turns, fired_on);
}

#[test]
fn random_play_keeps_invariants() {
    for seed in 0..40 {
        let mut game = GameState::new(GameConfig {
            events: EventConfig {
                chance: 0.5,
                ..Default::default()
            },
            ..GameConfig::seeded(seed)
        })
        .unwrap();
        let keys: Vec<InterventionKey> = game.catalog().keys().cloned().collect();
        let mut rng = StdRng::seed_from_u64(seed ^ 0xabcd);

        while !game.status().is_over() {
            for _ in 0..rng.gen_range(0..4) {
                let region = rng.gen_range(0..game.region_count() + 2);
                let key = keys.choose(&mut rng);
                let funding = game.funding();
                if game.request_action(region, key).is_err() {
                    assert_eq!(game.funding(), funding);
                }
            }
            let outcome = game.advance_turn();
            let violations = game.check_invariants();
            assert!(
                violations.is_empty(),
                "seed {seed} turn {}: {violations:?}",
                outcome.turn
            );
            assert!(game.in_progress_count() <= 3);
            assert!(game.progress_percent() <= 100);
            assert!(game.turn() <= 150);
        }
    }
}

// ── Session ────────────────────────────────────────────────────────────

#[test]
fn session_plays_to_completion() {
    let mut session = Session::new(GameConfig::seeded(18)).unwrap();
    session.start();

    let mut turns = 0;
    let mut stipends = 0;
    let mut finished = None;
    while finished.is_none() {
        for event in session.update(0.5) {
            match event {
                SessionEvent::Turn(_) => turns += 1,
                SessionEvent::Stipend { amount, .. } => {
                    assert_eq!(amount, 100);
                    stipends += 1;
                }
                SessionEvent::EventRaised(_) => {
                    assert!(!session.turn_ticker().is_running());
                    assert!(!session.funding_ticker().is_running());
                    assert!(session.acknowledge_event());
                }
                SessionEvent::GameOver(status) => finished = Some(status),
            }
        }
    }

    // Nobody played, so the clock runs out
    assert_eq!(finished, Some(GameStatus::Lost));
    assert_eq!(turns, session.game().turn());
    assert!(turns <= 150);
    assert_eq!(session.game().time_left(), 0);
    assert!(stipends > 0);
    assert!(!session.turn_ticker().is_running());
    assert!(!session.funding_ticker().is_running());
    assert!(session.update(60.0).is_empty());
}

#[test]
fn session_commands_drive_the_game() {
    let mut session = Session::new(quiet_config(19)).unwrap();
    let region = enabled_regions(session.game()).remove(0);
    let key = region.needs[0].clone();
    let cost = session.game().catalog().get(&key).unwrap().cost;

    let result = session.apply(Command::RequestAction {
        region: region.index,
        intervention: Some(key.clone()),
    });
    assert!(matches!(result, CommandResult::Action(Ok(_))));
    assert_eq!(session.game().funding(), 1000 - cost);

    match session.apply(Command::AdvanceTurn) {
        CommandResult::Turn(outcome) => assert_eq!(outcome.turn, 1),
        other => panic!("unexpected {other:?}"),
    }
    match session.apply(Command::GrantStipend { amount: 100 }) {
        CommandResult::Stipend { funding } => assert_eq!(funding, 1100 - cost),
        other => panic!("unexpected {other:?}"),
    }
}

// ── Persistence and config ─────────────────────────────────────────────

#[test]
fn loaded_games_continue_identically() {
    let mut game = GameState::new(GameConfig::seeded(20)).unwrap();
    for region in enabled_regions(&game).iter().take(2) {
        game.request_action(region.index, Some(&region.needs[0])).unwrap();
    }
    for _ in 0..4 {
        game.advance_turn();
    }

    let mut buffer = Vec::new();
    game.save(&mut buffer).unwrap();

    let mut a = waterbringers_core::persistence::load_game(&buffer[..]).unwrap();
    let mut b = quiet_game(0);
    b.load(&buffer[..]).unwrap();
    assert_eq!(a.regions(), game.regions());

    for _ in 0..30 {
        assert_eq!(a.advance_turn(), b.advance_turn());
    }
    assert_eq!(a.regions(), b.regions());
    assert_eq!(a.aggregate(), b.aggregate());
}

#[test]
fn toml_config_starts_a_game() {
    let config = GameConfig::from_toml_str(
        r#"
        rows = 2
        cols = 3
        start_funding = 300
        disabled_min = 0
        disabled_max = 1
        seed = 21
        "#,
    )
    .unwrap();

    let game = GameState::new(config).unwrap();
    assert_eq!(game.region_count(), 6);
    assert!(game.disabled_region_count() <= 1);
    assert_eq!(game.funding(), 300);
    assert_eq!(game.time_left(), 150);
}
