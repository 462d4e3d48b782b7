//! Events system - random world events that set the player back
//!
//! After a quiet spell of a few turns, each turn has a small chance of one
//! event from a fixed registry. Every event has a deterministic effect on
//! funding, time or a single region; only the choice of event (and of the
//! region it hits) is random.

use hecs::World;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::InterventionKey;
use crate::components::{Disabled, GridCell, Requirements, Sustained};
use crate::config::EventConfig;

/// Named events that can strike during a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorldEventKind {
    /// Roads flood and days are lost
    HeavyRains,
    /// Equipment breaks and funding is lost
    EquipmentCosts,
    /// A completed intervention must be redone
    WellContamination,
}

impl WorldEventKind {
    /// Registry the random draw picks from
    pub const ALL: [WorldEventKind; 3] = [
        WorldEventKind::HeavyRains,
        WorldEventKind::EquipmentCosts,
        WorldEventKind::WellContamination,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WorldEventKind::HeavyRains => "Heavy Rains Delay",
            WorldEventKind::EquipmentCosts => "Unexpected Equipment Costs",
            WorldEventKind::WellContamination => "Well Contamination",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorldEventKind::HeavyRains => {
                "Unusually heavy rains have made roads impassable. Construction is delayed and you lose 5 days."
            }
            WorldEventKind::EquipmentCosts => {
                "A key piece of equipment broke down and needed urgent replacement. You lose $100 in funding."
            }
            WorldEventKind::WellContamination => {
                "A completed well was found to be contaminated and must be redone in one region."
            }
        }
    }
}

/// What an event actually changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventEffect {
    TimeLost(u32),
    FundingLost(u32),
    Contaminated {
        region: usize,
        intervention: InterventionKey,
        /// The region had been sustained before the event
        was_sustained: bool,
    },
    /// Nothing was eligible to be hit
    NoEffect,
}

/// An event reported to the player for acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredEvent {
    pub kind: WorldEventKind,
    pub name: String,
    pub description: String,
    pub effect: EventEffect,
}

impl FiredEvent {
    pub fn new(kind: WorldEventKind, effect: EventEffect) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            description: kind.description().to_string(),
            effect,
        }
    }
}

/// History entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub turn: u32,
    pub kind: WorldEventKind,
    pub effect: EventEffect,
}

/// Tracks the quiet-period gate and what has fired so far
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventManager {
    /// Turns since the last event fired
    pub turns_since_last: u32,
    pub history: Vec<EventRecord>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count this turn and decide whether an event fires.
    ///
    /// The counter only resets when an event fires; an eligible turn that
    /// rolls no event leaves it incremented.
    pub fn roll(&mut self, config: &EventConfig, rng: &mut impl Rng) -> Option<WorldEventKind> {
        self.turns_since_last += 1;
        if self.turns_since_last < config.min_turns_between {
            return None;
        }
        if !rng.gen_bool(config.chance) {
            return None;
        }
        self.turns_since_last = 0;
        WorldEventKind::ALL.choose(rng).copied()
    }

    pub fn record(&mut self, turn: u32, event: &FiredEvent) {
        self.history.push(EventRecord {
            turn,
            kind: event.kind,
            effect: event.effect.clone(),
        });
    }

    pub fn count(&self, kind: WorldEventKind) -> usize {
        self.history.iter().filter(|r| r.kind == kind).count()
    }
}

/// Apply an event's effect to the game.
pub fn apply_event(
    kind: WorldEventKind,
    world: &mut World,
    funding: &mut u32,
    time_left: &mut u32,
    config: &EventConfig,
    rng: &mut impl Rng,
) -> FiredEvent {
    let effect = match kind {
        WorldEventKind::HeavyRains => {
            let lost = config.rain_delay.min(*time_left);
            *time_left -= lost;
            EventEffect::TimeLost(lost)
        }
        WorldEventKind::EquipmentCosts => {
            let lost = config.equipment_cost.min(*funding);
            *funding -= lost;
            EventEffect::FundingLost(lost)
        }
        WorldEventKind::WellContamination => contaminate_region(world, rng),
    };

    info!(event = kind.name(), ?effect, "world event");
    FiredEvent::new(kind, effect)
}

/// Revert one random completed intervention in one random enabled region.
fn contaminate_region(world: &mut World, rng: &mut impl Rng) -> EventEffect {
    let mut eligible: Vec<(hecs::Entity, usize)> = world
        .query::<(&GridCell, &Requirements, Option<&Disabled>)>()
        .iter()
        .filter(|(_, (_, req, disabled))| disabled.is_none() && !req.completed.is_empty())
        .map(|(entity, (cell, _, _))| (entity, cell.index))
        .collect();
    eligible.sort_by_key(|(_, index)| *index);

    let Some(&(entity, region)) = eligible.choose(rng) else {
        return EventEffect::NoEffect;
    };

    let reverted = match world.get::<&mut Requirements>(entity) {
        Ok(mut req) => {
            let idx = rng.gen_range(0..req.completed.len());
            req.revert(idx)
        }
        Err(_) => None,
    };
    let Some(intervention) = reverted else {
        return EventEffect::NoEffect;
    };

    let was_sustained = world.remove_one::<Sustained>(entity).is_ok();
    EventEffect::Contaminated {
        region,
        intervention,
        was_sustained,
    }
}
