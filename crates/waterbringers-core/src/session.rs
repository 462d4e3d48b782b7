//! Session controller - drives a game on two wall-clock cadences
//!
//! A session owns one [`GameState`] plus two periodic tasks: the turn ticker
//! and the funding ticker. The caller feeds elapsed real time into
//! [`Session::update`] (like a frame loop would) and the session fires
//! turns and stipends as their intervals come due.
//!
//! When a world event fires both tickers pause until the player
//! acknowledges it. When the game is won or lost both stop. Starting a task
//! always re-arms it from zero, so there is never more than one instance of
//! either cadence.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::InterventionKey;
use crate::config::GameConfig;
use crate::engine::{GameState, GameStatus, TurnOutcome};
use crate::error::{ConfigError, DispatchError};
use crate::systems::{Dispatched, FiredEvent};

/// Slack for float drift when a task is stepped exactly up to its due time
const DUE_EPSILON: f64 = 1e-9;

/// Lifecycle of a periodic task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Stopped,
    Running,
    /// Waiting for an event to be acknowledged
    Paused,
}

/// A repeating timer driven by elapsed time
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicTask {
    interval: f64,
    elapsed: f64,
    state: TaskState,
}

impl PeriodicTask {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            state: TaskState::Stopped,
        }
    }

    /// Arm the task from zero, replacing any previous run.
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.state = TaskState::Running;
    }

    pub fn stop(&mut self) {
        self.elapsed = 0.0;
        self.state = TaskState::Stopped;
    }

    pub fn pause(&mut self) {
        if self.state == TaskState::Running {
            self.state = TaskState::Paused;
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// Seconds until the next firing, or `None` when not running.
    pub fn until_due(&self) -> Option<f64> {
        self.is_running().then(|| (self.interval - self.elapsed).max(0.0))
    }

    /// Accumulate time; only a running task counts it.
    pub fn advance(&mut self, delta_secs: f64) {
        if self.is_running() && delta_secs > 0.0 {
            self.elapsed += delta_secs;
        }
    }

    /// Consume one due firing, if any.
    pub fn take_fire(&mut self) -> bool {
        if self.is_running() && self.elapsed + DUE_EPSILON >= self.interval {
            self.elapsed = (self.elapsed - self.interval).max(0.0);
            true
        } else {
            false
        }
    }
}

/// Explicit player/presentation commands consumed by [`Session::apply`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    RequestAction {
        region: usize,
        intervention: Option<InterventionKey>,
    },
    AdvanceTurn,
    GrantStipend { amount: u32 },
}

/// Result of applying a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Action(Result<Dispatched, DispatchError>),
    Turn(TurnOutcome),
    Stipend { funding: u32 },
}

/// Things the presentation layer should show after an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    Stipend { amount: u32, funding: u32 },
    Turn(TurnOutcome),
    /// Tickers are paused until [`Session::acknowledge_event`]
    EventRaised(FiredEvent),
    GameOver(GameStatus),
}

/// Transient UI selection; not part of the game rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub intervention: Option<InterventionKey>,
    pub region: Option<usize>,
}

/// One player's session: the current game and its two cadences
pub struct Session {
    game: GameState,
    config: GameConfig,
    games_started: u64,
    turn_ticker: PeriodicTask,
    funding_ticker: PeriodicTask,
    selection: Selection,
    pending_event: Option<FiredEvent>,
}

impl Session {
    /// Build the first game. Tickers stay stopped until [`Session::start`].
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        let game = GameState::new(config.clone())?;
        Ok(Self {
            game,
            turn_ticker: PeriodicTask::new(config.turn_interval_secs),
            funding_ticker: PeriodicTask::new(config.stipend_interval_secs),
            config,
            games_started: 1,
            selection: Selection::default(),
            pending_event: None,
        })
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn pending_event(&self) -> Option<&FiredEvent> {
        self.pending_event.as_ref()
    }

    pub fn turn_ticker(&self) -> &PeriodicTask {
        &self.turn_ticker
    }

    pub fn funding_ticker(&self) -> &PeriodicTask {
        &self.funding_ticker
    }

    /// Arm both tickers (re-arming cancels any previous run).
    pub fn start(&mut self) {
        self.pending_event = None;
        self.turn_ticker.start();
        self.funding_ticker.start();
        debug!("tickers started");
    }

    pub fn stop(&mut self) {
        self.turn_ticker.stop();
        self.funding_ticker.stop();
        debug!("tickers stopped");
    }

    fn pause(&mut self) {
        self.turn_ticker.pause();
        self.funding_ticker.pause();
        debug!("tickers paused for event");
    }

    /// Throw the current game away and start a new one.
    ///
    /// Seeded sessions advance the seed per game so each map differs but the
    /// sequence stays reproducible.
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.seed = self.config.seed.map(|seed| seed.wrapping_add(self.games_started));

        self.stop();
        self.game = GameState::new(config)?;
        self.games_started += 1;
        self.selection = Selection::default();
        info!(game = self.games_started, "session reset");
        self.start();
        Ok(())
    }

    /// Let `delta_secs` of real time pass.
    ///
    /// Firings are processed in time order; a stipend and a turn due at the
    /// same moment grant the stipend first. Processing stops at the first
    /// event that needs acknowledging or when the game ends, and the rest of
    /// the step is dropped.
    pub fn update(&mut self, delta_secs: f64) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        let mut remaining = delta_secs.max(0.0);

        loop {
            let funding_due = self.funding_ticker.until_due();
            let turn_due = self.turn_ticker.until_due();
            let (step, stipend_first) = match (funding_due, turn_due) {
                (Some(f), Some(t)) => (f.min(t), f <= t),
                (Some(f), None) => (f, true),
                (None, Some(t)) => (t, false),
                (None, None) => break,
            };
            if step > remaining {
                self.funding_ticker.advance(remaining);
                self.turn_ticker.advance(remaining);
                break;
            }
            self.funding_ticker.advance(step);
            self.turn_ticker.advance(step);
            remaining -= step;

            if stipend_first {
                if self.funding_ticker.take_fire() {
                    let amount = self.config.stipend;
                    self.game.grant_funding_stipend(amount);
                    out.push(SessionEvent::Stipend {
                        amount,
                        funding: self.game.funding(),
                    });
                }
                continue;
            }

            if self.turn_ticker.take_fire() {
                let outcome = self.game.advance_turn();
                let halt = self.after_turn(&outcome);
                out.push(SessionEvent::Turn(outcome));
                if let Some(halt) = halt {
                    out.push(halt);
                    break;
                }
            }
        }

        out
    }

    /// Stop or pause the tickers as a turn outcome requires. Returns the
    /// notification that halted ticking, if any.
    fn after_turn(&mut self, outcome: &TurnOutcome) -> Option<SessionEvent> {
        if outcome.status.is_over() {
            self.stop();
            self.pending_event = None;
            return Some(SessionEvent::GameOver(outcome.status));
        }
        let event = outcome.event.as_ref()?;
        self.pause();
        self.pending_event = Some(event.clone());
        Some(SessionEvent::EventRaised(event.clone()))
    }

    /// Dismiss the pending event and resume both tickers from zero.
    pub fn acknowledge_event(&mut self) -> bool {
        if self.pending_event.take().is_none() {
            return false;
        }
        if !self.game.status().is_over() {
            self.start();
        }
        true
    }

    /// Toggle the pending intervention. Returns whether one is now selected.
    pub fn select(&mut self, intervention: InterventionKey) -> bool {
        if self.selection.intervention.as_ref() == Some(&intervention) {
            self.selection.intervention = None;
        } else {
            self.selection.intervention = Some(intervention);
        }
        self.selection.intervention.is_some()
    }

    /// Apply the pending selection to a region (a tile click).
    ///
    /// The selection is cleared after the attempt, except when nothing was
    /// selected so the player can still pick an action.
    pub fn act_on_region(&mut self, region: usize) -> Result<Dispatched, DispatchError> {
        self.selection.region = Some(region);
        let intervention = self.selection.intervention.clone();
        let result = self.game.request_action(region, intervention.as_ref());
        if result != Err(DispatchError::NoActionSelected) {
            self.selection.intervention = None;
        }
        result
    }

    pub fn apply(&mut self, command: Command) -> CommandResult {
        match command {
            Command::RequestAction {
                region,
                intervention,
            } => CommandResult::Action(self.game.request_action(region, intervention.as_ref())),
            Command::AdvanceTurn => {
                let outcome = self.game.advance_turn();
                let _ = self.after_turn(&outcome);
                CommandResult::Turn(outcome)
            }
            Command::GrantStipend { amount } => {
                self.game.grant_funding_stipend(amount);
                CommandResult::Stipend {
                    funding: self.game.funding(),
                }
            }
        }
    }
}
