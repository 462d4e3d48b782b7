//! Intervention catalog - the fixed menu of purchasable water/sanitation work.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Unique identifier of an intervention (e.g. `"well"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterventionKey(pub String);

impl InterventionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InterventionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for InterventionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A purchasable improvement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub key: InterventionKey,
    /// Name shown to the player
    pub name: String,
    /// Funding units deducted when work starts
    pub cost: u32,
    /// Turns until the work completes
    pub duration: u32,
}

impl Intervention {
    pub fn new(key: &str, name: &str, cost: u32, duration: u32) -> Self {
        Self {
            key: InterventionKey::from(key),
            name: name.to_string(),
            cost,
            duration,
        }
    }
}

/// Ordered set of interventions available in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<Intervention>,
}

impl Catalog {
    pub fn new(entries: Vec<Intervention>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &InterventionKey) -> Option<&Intervention> {
        self.entries.iter().find(|i| &i.key == key)
    }

    pub fn contains(&self, key: &InterventionKey) -> bool {
        self.get(key).is_some()
    }

    /// Display name for a key, falling back to the raw key when unknown.
    pub fn display_name(&self, key: &InterventionKey) -> String {
        self.get(key)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn keys(&self) -> impl Iterator<Item = &InterventionKey> {
        self.entries.iter().map(|i| &i.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cheapest entry, used by scripted players.
    pub fn cheapest(&self) -> Option<&Intervention> {
        self.entries.iter().min_by_key(|i| i.cost)
    }

    /// Reject catalogs that would break region generation or dispatch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(&entry.key) {
                return Err(ConfigError::DuplicateIntervention(entry.key.to_string()));
            }
            if entry.cost == 0 || entry.duration == 0 {
                return Err(ConfigError::InvalidIntervention(entry.key.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            Intervention::new("well", "Build Well", 120, 3),
            Intervention::new("rainwater", "Install Rainwater Catchments", 90, 2),
            Intervention::new("gravity", "Implement Gravity Fed Systems", 150, 4),
            Intervention::new("piped", "Build Piped Systems", 200, 5),
            Intervention::new("purification", "Install Water Purification Systems", 80, 2),
            Intervention::new("biosand", "Provide BioSand Filters", 60, 1),
            Intervention::new("spring", "Construct Spring Protections", 100, 3),
            Intervention::new("latrines", "Build Latrines", 70, 2),
        ])
    }
}
