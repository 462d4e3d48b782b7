//! Read-only snapshots handed to the presentation layer

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, InterventionKey};
use crate::components::{ActiveWork, Disabled, GridCell, Requirements, Sustained};
use crate::engine::GameStatus;

/// Work underway in a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkView {
    pub intervention: InterventionKey,
    pub name: String,
    pub turns_remaining: u32,
}

/// Everything needed to draw one map tile and its detail popup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionView {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub needs: Vec<InterventionKey>,
    pub needs_names: Vec<String>,
    pub completed: Vec<InterventionKey>,
    pub completed_names: Vec<String>,
    pub in_progress: Option<WorkView>,
    pub sustained: bool,
    pub disabled: bool,
    /// Share of requirements completed, for tile coloring
    pub completion_ratio: f32,
}

impl RegionView {
    pub(crate) fn build(world: &World, entity: Entity, catalog: &Catalog) -> Option<Self> {
        let region = world.entity(entity).ok()?;
        let cell = *region.get::<&GridCell>()?;
        let req = region.get::<&Requirements>()?;

        let names = |keys: &[InterventionKey]| -> Vec<String> {
            keys.iter().map(|k| catalog.display_name(k)).collect()
        };
        let in_progress = region.get::<&ActiveWork>().map(|work| WorkView {
            intervention: work.intervention.clone(),
            name: catalog.display_name(&work.intervention),
            turns_remaining: work.turns_remaining,
        });

        Some(Self {
            index: cell.index,
            row: cell.row,
            col: cell.col,
            needs: req.needs.clone(),
            needs_names: names(&req.needs),
            completed: req.completed.clone(),
            completed_names: names(&req.completed),
            in_progress,
            sustained: region.get::<&Sustained>().is_some(),
            disabled: region.get::<&Disabled>().is_some(),
            completion_ratio: req.completion_ratio(),
        })
    }
}

/// Header bar values: funding, time and overall progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateView {
    pub funding: u32,
    pub time_left: u32,
    pub progress_percent: u8,
    pub sustained: usize,
    pub enabled: usize,
    pub in_progress: usize,
    pub actions_taken: u32,
    pub turn: u32,
    pub status: GameStatus,
}

#[cfg(test)]
mod tests {
    use crate::config::GameConfig;
    use crate::engine::GameState;

    #[test]
    fn test_views_serialize_for_presentation() {
        let game = GameState::new(GameConfig::seeded(6)).unwrap();

        let aggregate = serde_json::to_value(game.aggregate()).unwrap();
        assert_eq!(aggregate["funding"], 1000);
        assert_eq!(aggregate["time_left"], 150);
        assert_eq!(aggregate["status"], "Ongoing");

        let region = game.regions().into_iter().find(|r| !r.disabled).unwrap();
        let json = serde_json::to_value(&region).unwrap();
        assert_eq!(json["needs"].as_array().unwrap().len(), region.needs.len());
        assert_eq!(json["needs_names"][0], game.catalog().display_name(&region.needs[0]));
        assert!(json["in_progress"].is_null());
    }
}
