//! Region components: grid placement, requirements, in-flight work and status markers.

use serde::{Deserialize, Serialize};

use crate::catalog::InterventionKey;

/// Where a region sits on the map. `index` is its row-major position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub index: usize,
    pub row: u32,
    pub col: u32,
}

impl GridCell {
    pub fn new(row: u32, col: u32, cols: u32) -> Self {
        Self {
            index: row as usize * cols as usize + col as usize,
            row,
            col,
        }
    }
}

/// Interventions a region still needs and those already finished.
///
/// A key lives in exactly one of the two lists. `needs` keeps its
/// original order; keys reverted by contamination go to the back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub needs: Vec<InterventionKey>,
    pub completed: Vec<InterventionKey>,
}

impl Requirements {
    pub fn new(needs: Vec<InterventionKey>) -> Self {
        Self {
            needs,
            completed: Vec::new(),
        }
    }

    pub fn requires(&self, key: &InterventionKey) -> bool {
        self.needs.contains(key)
    }

    /// Move a key from needs to completed. Returns false if it wasn't needed.
    pub fn complete(&mut self, key: &InterventionKey) -> bool {
        match self.needs.iter().position(|k| k == key) {
            Some(idx) => {
                let key = self.needs.remove(idx);
                self.completed.push(key);
                true
            }
            None => false,
        }
    }

    /// Move `completed[idx]` back to needs.
    pub fn revert(&mut self, idx: usize) -> Option<InterventionKey> {
        if idx >= self.completed.len() {
            return None;
        }
        let key = self.completed.remove(idx);
        self.needs.push(key.clone());
        Some(key)
    }

    pub fn is_satisfied(&self) -> bool {
        self.needs.is_empty()
    }

    /// Fraction of this region's requirements that are done (1.0 when there were none)
    pub fn completion_ratio(&self) -> f32 {
        let total = self.needs.len() + self.completed.len();
        if total == 0 {
            1.0
        } else {
            self.completed.len() as f32 / total as f32
        }
    }

    /// True when some key sits in both lists
    pub fn overlaps(&self) -> bool {
        self.needs.iter().any(|k| self.completed.contains(k))
    }
}

/// Work currently underway in a region. At most one per region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWork {
    pub intervention: InterventionKey,
    pub turns_remaining: u32,
}

impl ActiveWork {
    pub fn new(intervention: InterventionKey, duration: u32) -> Self {
        Self {
            intervention,
            turns_remaining: duration,
        }
    }

    /// Count down one turn; true once the work is finished.
    pub fn tick(&mut self) -> bool {
        self.turns_remaining = self.turns_remaining.saturating_sub(1);
        self.turns_remaining == 0
    }
}

/// Marker: every requirement of this region has been completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sustained;

/// Marker: region was removed from play at game start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disabled;
