//! Region generation - builds the map grid and removes a random subset from play

use hecs::{Entity, World};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{Catalog, InterventionKey};
use crate::components::{Disabled, GridCell, Requirements};
use crate::config::GameConfig;

/// Region entities in row-major order. The position in `cells` is the region index.
#[derive(Debug, Clone, Default)]
pub struct RegionLayout {
    pub rows: u32,
    pub cols: u32,
    pub cells: Vec<Entity>,
}

impl RegionLayout {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            cells: Vec::with_capacity(rows as usize * cols as usize),
        }
    }

    pub fn entity(&self, index: usize) -> Option<Entity> {
        self.cells.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Pick a random sample of `min..=max` distinct catalog keys.
pub fn random_needs(
    catalog: &Catalog,
    min: usize,
    max: usize,
    rng: &mut impl Rng,
) -> Vec<InterventionKey> {
    let mut keys: Vec<InterventionKey> = catalog.keys().cloned().collect();
    keys.shuffle(rng);
    let count = rng.gen_range(min..=max).min(keys.len());
    keys.truncate(count);
    keys
}

/// Spawn one region entity per grid cell.
pub fn generate_regions(world: &mut World, config: &GameConfig, rng: &mut impl Rng) -> RegionLayout {
    let mut layout = RegionLayout::new(config.rows, config.cols);

    for row in 0..config.rows {
        for col in 0..config.cols {
            let cell = GridCell::new(row, col, config.cols);
            let needs = random_needs(&config.catalog, config.needs_min, config.needs_max, rng);
            let entity = world.spawn((cell, Requirements::new(needs)));
            layout.cells.push(entity);
        }
    }

    layout
}

/// Re-enable every region, then disable a random subset of size `min..=max`
/// (clamped to the region count). Returns how many were disabled.
pub fn disable_random_regions(
    world: &mut World,
    layout: &RegionLayout,
    min: usize,
    max: usize,
    rng: &mut impl Rng,
) -> usize {
    for &entity in &layout.cells {
        let _ = world.remove_one::<Disabled>(entity);
    }

    let mut order: Vec<usize> = (0..layout.len()).collect();
    order.shuffle(rng);

    let count = rng.gen_range(min..=max).min(layout.len());
    for &idx in &order[..count] {
        let _ = world.insert_one(layout.cells[idx], Disabled);
    }

    count
}
