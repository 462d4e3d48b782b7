//! Save/Load functionality for persisting a game in progress
//!
//! Uses bincode for compact binary serialization. Region components are
//! extracted into plain records and respawned into a fresh world on load.

use hecs::World;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::info;

use crate::components::*;
use crate::config::GameConfig;
use crate::engine::{GameState, GameStatus, RestoredParts};
use crate::error::SaveError;
use crate::generation::RegionLayout;
use crate::systems::EventManager;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of a game
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub config: GameConfig,
    pub seed: u64,
    pub funding: u32,
    pub time_left: u32,
    pub turn: u32,
    pub actions_taken: u32,
    pub status: GameStatus,
    pub events: EventManager,
    pub rows: u32,
    pub cols: u32,
    /// Regions in index order
    pub regions: Vec<RegionRecord>,
}

/// One region with all of its components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRecord {
    pub cell: GridCell,
    pub requirements: Requirements,
    pub work: Option<ActiveWork>,
    pub sustained: bool,
    pub disabled: bool,
}

fn serialize_regions(world: &World, layout: &RegionLayout) -> Result<Vec<RegionRecord>, SaveError> {
    let mut records = Vec::with_capacity(layout.len());

    for (idx, &entity) in layout.cells.iter().enumerate() {
        let region = world
            .entity(entity)
            .map_err(|_| SaveError::Corrupt(format!("region {idx} has no entity")))?;
        let (Some(cell), Some(requirements)) =
            (region.get::<&GridCell>(), region.get::<&Requirements>())
        else {
            return Err(SaveError::Corrupt(format!("region {idx} is missing components")));
        };

        records.push(RegionRecord {
            cell: *cell,
            requirements: (*requirements).clone(),
            work: region.get::<&ActiveWork>().map(|w| (*w).clone()),
            sustained: region.get::<&Sustained>().is_some(),
            disabled: region.get::<&Disabled>().is_some(),
        });
    }

    Ok(records)
}

fn deserialize_regions(world: &mut World, rows: u32, cols: u32, records: Vec<RegionRecord>) -> RegionLayout {
    let mut layout = RegionLayout::new(rows, cols);

    for record in records {
        let entity = world.spawn((record.cell, record.requirements));
        if let Some(work) = record.work {
            let _ = world.insert_one(entity, work);
        }
        if record.sustained {
            let _ = world.insert_one(entity, Sustained);
        }
        if record.disabled {
            let _ = world.insert_one(entity, Disabled);
        }
        layout.cells.push(entity);
    }

    layout
}

/// Save a game to a writer
pub fn save_game<W: Write>(writer: W, game: &GameState) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        config: game.config().clone(),
        seed: game.seed(),
        funding: game.funding(),
        time_left: game.time_left(),
        turn: game.turn(),
        actions_taken: game.actions_taken(),
        status: game.status(),
        events: game.events.clone(),
        rows: game.layout.rows,
        cols: game.layout.cols,
        regions: serialize_regions(&game.world, &game.layout)?,
    };

    bincode::serialize_into(writer, &save_data)?;
    info!(turn = game.turn(), "game saved");
    Ok(())
}

/// Load a game from a reader
pub fn load_game<R: Read>(reader: R) -> Result<GameState, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }
    save_data.config.validate()?;

    let expected = save_data.rows as usize * save_data.cols as usize;
    if save_data.regions.len() != expected {
        return Err(SaveError::Corrupt(format!(
            "expected {expected} regions, found {}",
            save_data.regions.len()
        )));
    }
    if let Some((idx, _)) = save_data
        .regions
        .iter()
        .enumerate()
        .find(|(idx, record)| record.cell.index != *idx)
    {
        return Err(SaveError::Corrupt(format!("region {idx} is out of order")));
    }

    let mut world = World::new();
    let layout = deserialize_regions(&mut world, save_data.rows, save_data.cols, save_data.regions);

    let game = GameState::restore(RestoredParts {
        world,
        layout,
        events: save_data.events,
        config: save_data.config,
        funding: save_data.funding,
        time_left: save_data.time_left,
        turn: save_data.turn,
        actions_taken: save_data.actions_taken,
        status: save_data.status,
        seed: save_data.seed,
    });

    let violations = game.check_invariants();
    if !violations.is_empty() {
        return Err(SaveError::Corrupt(violations.join("; ")));
    }

    info!(turn = game.turn(), "game loaded");
    Ok(game)
}
