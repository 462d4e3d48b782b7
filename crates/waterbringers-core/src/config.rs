//! Game configuration - grid size, starting resources, cadences and event tuning.
//!
//! Every field has a default matching the reference game, so a config file
//! only needs to name what it changes:
//!
//! ```toml
//! rows = 3
//! cols = 3
//! start_funding = 600
//! disabled_min = 0
//! disabled_max = 2
//!
//! [events]
//! chance = 0.25
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::ConfigError;

/// Tuning for the random world events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Turns that must pass after an event before another may fire
    pub min_turns_between: u32,
    /// Probability of an event on an eligible turn
    pub chance: f64,
    /// Days lost to Heavy Rains Delay
    pub rain_delay: u32,
    /// Funding lost to Unexpected Equipment Costs
    pub equipment_cost: u32,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            min_turns_between: 3,
            chance: 0.10,
            rain_delay: 5,
            equipment_cost: 100,
        }
    }
}

/// Configuration for a new game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rows: u32,
    pub cols: u32,
    /// Signed so that a negative value in a config file is reported, not wrapped
    pub start_funding: i64,
    /// Turns available before the game is lost
    pub start_time: i64,
    pub catalog: Catalog,
    /// Inclusive bounds on how many interventions each region needs
    pub needs_min: usize,
    pub needs_max: usize,
    /// Inclusive bounds on how many regions are disabled at game start
    pub disabled_min: usize,
    pub disabled_max: usize,
    /// Global cap on regions with work in progress
    pub max_concurrent_actions: usize,
    /// Funding granted on every stipend tick
    pub stipend: u32,
    pub turn_interval_secs: f64,
    pub stipend_interval_secs: f64,
    pub events: EventConfig,
    /// Fixed seed for reproducible games; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: 4,
            cols: 5,
            start_funding: 1000,
            start_time: 150,
            catalog: Catalog::default(),
            needs_min: 2,
            needs_max: 3,
            disabled_min: 9,
            disabled_max: 14,
            max_concurrent_actions: 3,
            stipend: 100,
            turn_interval_secs: 2.0,
            stipend_interval_secs: 10.0,
            events: EventConfig::default(),
            seed: None,
        }
    }
}

impl GameConfig {
    /// Default config with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn region_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::EmptyMap {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.rows.checked_mul(self.cols).is_none() {
            return Err(ConfigError::MapTooLarge {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.start_funding < 0 {
            return Err(ConfigError::NegativeFunding(self.start_funding));
        }
        if self.start_time <= 0 {
            return Err(ConfigError::NonPositiveTime(self.start_time));
        }

        self.catalog.validate()?;

        if self.needs_min == 0 || self.needs_min > self.needs_max || self.needs_max > self.catalog.len() {
            return Err(ConfigError::InvalidNeedsRange {
                min: self.needs_min,
                max: self.needs_max,
                catalog: self.catalog.len(),
            });
        }
        if self.disabled_min > self.disabled_max {
            return Err(ConfigError::InvalidDisabledRange {
                min: self.disabled_min,
                max: self.disabled_max,
            });
        }

        for (name, value) in [
            ("turn_interval_secs", self.turn_interval_secs),
            ("stipend_interval_secs", self.stipend_interval_secs),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::InvalidInterval { name, value });
            }
        }
        if !(0.0..=1.0).contains(&self.events.chance) {
            return Err(ConfigError::InvalidEventChance(self.events.chance));
        }

        Ok(())
    }
}
