//! Game engine - owns the world and runs dispatch, turns, events and stipends

use hecs::World;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{Catalog, InterventionKey};
use crate::components::{ActiveWork, Disabled, GridCell, Requirements, Sustained};
use crate::config::GameConfig;
use crate::error::{ConfigError, DispatchError, SaveError};
use crate::generation::{disable_random_regions, generate_regions, RegionLayout};
use crate::systems::*;
use crate::view::{AggregateView, RegionView};

/// Whether the game is still being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Ongoing,
    /// Every enabled region is sustained
    Won,
    /// Time ran out
    Lost,
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        *self != GameStatus::Ongoing
    }
}

/// What happened during one call to [`GameState::advance_turn`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub turn: u32,
    pub status: GameStatus,
    pub completions: Vec<CompletedWork>,
    pub event: Option<FiredEvent>,
}

/// A single game: the region world plus funding, time and progress
pub struct GameState {
    /// ECS world holding one entity per region
    pub world: World,
    /// Region index to entity mapping
    pub layout: RegionLayout,
    /// Random events gate and history
    pub events: EventManager,

    config: GameConfig,
    funding: u32,
    time_left: u32,
    sustained_count: usize,
    turn: u32,
    actions_taken: u32,
    status: GameStatus,
    seed: u64,
    rng: StdRng,
}

impl GameState {
    /// Start a fresh game. Fails fast on a malformed config.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = World::new();

        let layout = generate_regions(&mut world, &config, &mut rng);
        let disabled = disable_random_regions(
            &mut world,
            &layout,
            config.disabled_min,
            config.disabled_max,
            &mut rng,
        );

        let mut game = Self {
            world,
            layout,
            events: EventManager::new(),
            funding: clamp_to_u32(config.start_funding),
            time_left: clamp_to_u32(config.start_time),
            config,
            sustained_count: 0,
            turn: 0,
            actions_taken: 0,
            status: GameStatus::Ongoing,
            seed,
            rng,
        };
        game.refresh();

        info!(
            seed,
            regions = game.layout.len(),
            disabled,
            funding = game.funding,
            time_left = game.time_left,
            "new game"
        );
        Ok(game)
    }

    /// Rebuild a game from saved parts. The RNG is re-seeded from `(seed, turn)`.
    pub(crate) fn restore(parts: RestoredParts) -> Self {
        let rng = StdRng::seed_from_u64(parts.seed ^ u64::from(parts.turn).rotate_left(32));
        let mut game = Self {
            world: parts.world,
            layout: parts.layout,
            events: parts.events,
            config: parts.config,
            funding: parts.funding,
            time_left: parts.time_left,
            sustained_count: 0,
            turn: parts.turn,
            actions_taken: parts.actions_taken,
            status: parts.status,
            seed: parts.seed,
            rng,
        };
        game.sustained_count = sustained_region_count(&game.world);
        game
    }

    /// Try to start `intervention` in a region.
    ///
    /// On failure nothing changes. On success funding is reduced by the
    /// intervention's cost and the region's work starts counting down.
    pub fn request_action(
        &mut self,
        region: usize,
        intervention: Option<&InterventionKey>,
    ) -> Result<Dispatched, DispatchError> {
        if self.status.is_over() {
            return Err(DispatchError::GameOver);
        }

        let dispatched = dispatch_action(
            &mut self.world,
            &self.layout,
            &self.config.catalog,
            &mut self.funding,
            self.config.max_concurrent_actions,
            region,
            intervention,
        )?;
        self.actions_taken += 1;

        info!(
            region,
            intervention = %dispatched.intervention,
            turns = dispatched.duration,
            funding = self.funding,
            "action started"
        );
        Ok(dispatched)
    }

    /// Run one turn.
    ///
    /// Time is spent first. A turn that runs out the clock ends the game
    /// before any work resolves or any event is rolled. Otherwise work
    /// counts down, an event may fire, and progress is recomputed.
    pub fn advance_turn(&mut self) -> TurnOutcome {
        if self.status.is_over() {
            return self.outcome(Vec::new(), None);
        }

        self.turn += 1;
        self.time_left = self.time_left.saturating_sub(1);
        self.refresh();
        if self.status.is_over() {
            return self.outcome(Vec::new(), None);
        }
        if self.time_left == 0 {
            self.status = GameStatus::Lost;
            info!(turn = self.turn, sustained = self.sustained_count, "time is up, game lost");
            return self.outcome(Vec::new(), None);
        }

        let completions = progress_work(&mut self.world);

        let mut event = None;
        if let Some(kind) = self.events.roll(&self.config.events, &mut self.rng) {
            let fired = apply_event(
                kind,
                &mut self.world,
                &mut self.funding,
                &mut self.time_left,
                &self.config.events,
                &mut self.rng,
            );
            self.events.record(self.turn, &fired);
            event = Some(fired);
        }

        self.refresh();
        self.outcome(completions, event)
    }

    /// Add the periodic stipend to funding.
    pub fn grant_funding_stipend(&mut self, amount: u32) {
        self.funding = self.funding.saturating_add(amount);
        debug!(amount, funding = self.funding, "stipend granted");
    }

    /// Save game state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), SaveError> {
        crate::persistence::save_game(writer, self)
    }

    /// Load game state from a reader, replacing this game
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), SaveError> {
        *self = crate::persistence::load_game(reader)?;
        Ok(())
    }

    /// Recompute the sustained count and check for a win.
    fn refresh(&mut self) {
        self.sustained_count = sustained_region_count(&self.world);
        if self.status == GameStatus::Ongoing && self.progress_percent() == 100 {
            self.status = GameStatus::Won;
            info!(
                turn = self.turn,
                time_left = self.time_left,
                actions = self.actions_taken,
                "every region sustained, game won"
            );
        }
    }

    fn outcome(&self, completions: Vec<CompletedWork>, event: Option<FiredEvent>) -> TurnOutcome {
        TurnOutcome {
            turn: self.turn,
            status: self.status,
            completions,
            event,
        }
    }

    pub fn funding(&self) -> u32 {
        self.funding
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn actions_taken(&self) -> u32 {
        self.actions_taken
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.config.catalog
    }

    /// Enabled regions that are sustained
    pub fn sustained_count(&self) -> usize {
        self.sustained_count
    }

    pub fn enabled_region_count(&self) -> usize {
        enabled_region_count(&self.world)
    }

    pub fn disabled_region_count(&self) -> usize {
        self.layout.len() - self.enabled_region_count()
    }

    pub fn in_progress_count(&self) -> usize {
        in_progress_count(&self.world)
    }

    pub fn region_count(&self) -> usize {
        self.layout.len()
    }

    pub fn progress_percent(&self) -> u8 {
        progress_percent(self.sustained_count, self.enabled_region_count())
    }

    pub fn region(&self, index: usize) -> Option<RegionView> {
        let entity = self.layout.entity(index)?;
        RegionView::build(&self.world, entity, &self.config.catalog)
    }

    /// Every region in index order, disabled ones included
    pub fn regions(&self) -> Vec<RegionView> {
        self.layout
            .cells
            .iter()
            .filter_map(|&entity| RegionView::build(&self.world, entity, &self.config.catalog))
            .collect()
    }

    pub fn aggregate(&self) -> AggregateView {
        AggregateView {
            funding: self.funding,
            time_left: self.time_left,
            progress_percent: self.progress_percent(),
            sustained: self.sustained_count,
            enabled: self.enabled_region_count(),
            in_progress: self.in_progress_count(),
            actions_taken: self.actions_taken,
            turn: self.turn,
            status: self.status,
        }
    }

    /// Describe every broken invariant; empty when the state is consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (_, (cell, req, work, sustained, disabled)) in self
            .world
            .query::<(
                &GridCell,
                &Requirements,
                Option<&ActiveWork>,
                Option<&Sustained>,
                Option<&Disabled>,
            )>()
            .iter()
        {
            let region = cell.index;
            if req.overlaps() {
                violations.push(format!("region {region}: key in both needs and completed"));
            }
            if sustained.is_some() != req.is_satisfied() {
                violations.push(format!(
                    "region {region}: sustained={} but {} needs remain",
                    sustained.is_some(),
                    req.needs.len()
                ));
            }
            if let Some(work) = work {
                if !req.requires(&work.intervention) {
                    violations.push(format!(
                        "region {region}: working on `{}` which is not needed",
                        work.intervention
                    ));
                }
                if disabled.is_some() {
                    violations.push(format!("region {region}: disabled region has work underway"));
                }
            }
        }

        let in_progress = self.in_progress_count();
        if in_progress > self.config.max_concurrent_actions {
            violations.push(format!(
                "{in_progress} regions in progress, limit is {}",
                self.config.max_concurrent_actions
            ));
        }
        let sustained = sustained_region_count(&self.world);
        if sustained != self.sustained_count {
            violations.push(format!(
                "sustained count {} does not match {sustained} sustained regions",
                self.sustained_count
            ));
        }
        if self.progress_percent() > 100 {
            violations.push(format!("progress {}% out of range", self.progress_percent()));
        }

        violations
    }
}

/// Owned pieces of a saved game, handed back to [`GameState::restore`]
pub(crate) struct RestoredParts {
    pub world: World,
    pub layout: RegionLayout,
    pub events: EventManager,
    pub config: GameConfig,
    pub funding: u32,
    pub time_left: u32,
    pub turn: u32,
    pub actions_taken: u32,
    pub status: GameStatus,
    pub seed: u64,
}

fn clamp_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
