//! Progress system - counts down in-flight work and settles finished interventions

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::InterventionKey;
use crate::components::{ActiveWork, Disabled, GridCell, Requirements, Sustained};

/// An intervention that finished this turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedWork {
    pub region: usize,
    pub intervention: InterventionKey,
    /// The region became sustained with this completion
    pub sustained: bool,
}

/// Advance every active work item by one turn.
///
/// Finished work moves its key from needs to completed and is detached from
/// the region. A region whose needs run out gets the [`Sustained`] marker.
/// Completions are returned in region order.
pub fn progress_work(world: &mut World) -> Vec<CompletedWork> {
    let mut finished: Vec<(Entity, CompletedWork)> = Vec::new();

    for (entity, (cell, work, req)) in world
        .query::<(&GridCell, &mut ActiveWork, &mut Requirements)>()
        .iter()
    {
        if !work.tick() {
            continue;
        }
        req.complete(&work.intervention);
        finished.push((
            entity,
            CompletedWork {
                region: cell.index,
                intervention: work.intervention.clone(),
                sustained: req.is_satisfied(),
            },
        ));
    }

    finished.sort_by_key(|(_, done)| done.region);

    let mut completions = Vec::with_capacity(finished.len());
    for (entity, done) in finished {
        let _ = world.remove_one::<ActiveWork>(entity);
        if done.sustained {
            let _ = world.insert_one(entity, Sustained);
            info!(region = done.region, "region sustained");
        }
        info!(region = done.region, intervention = %done.intervention, "action complete");
        completions.push(done);
    }

    completions
}

/// Regions still in play
pub fn enabled_region_count(world: &World) -> usize {
    world
        .query::<(&GridCell, Option<&Disabled>)>()
        .iter()
        .filter(|(_, (_, disabled))| disabled.is_none())
        .count()
}

/// Sustained regions that are still in play
pub fn sustained_region_count(world: &World) -> usize {
    world
        .query::<(&Sustained, Option<&Disabled>)>()
        .iter()
        .filter(|(_, (_, disabled))| disabled.is_none())
        .count()
}

/// `round(100 * sustained / enabled)`, or 0 when nothing is enabled.
///
/// Only a fully sustained map reports 100; very large maps that would
/// round up to it stay at 99.
pub fn progress_percent(sustained: usize, enabled: usize) -> u8 {
    if enabled == 0 {
        return 0;
    }
    let percent = (100.0 * sustained as f64 / enabled as f64).round();
    let ceiling = if sustained < enabled { 99.0 } else { 100.0 };
    percent.clamp(0.0, ceiling) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_region(world: &mut World, index: usize, needs: &[&str]) -> Entity {
        let req = Requirements::new(needs.iter().map(|k| InterventionKey::from(*k)).collect());
        world.spawn((GridCell::new(0, index as u32, 10), req))
    }

    #[test]
    fn test_work_completes_after_duration() {
        let mut world = World::new();
        let region = spawn_region(&mut world, 0, &["well", "spring"]);
        world.insert_one(region, ActiveWork::new("well".into(), 3)).unwrap();

        assert!(progress_work(&mut world).is_empty());
        assert!(progress_work(&mut world).is_empty());
        let done = progress_work(&mut world);

        assert_eq!(done.len(), 1);
        assert_eq!(done[0].intervention.as_str(), "well");
        assert!(!done[0].sustained);

        let req = world.get::<&Requirements>(region).unwrap();
        assert_eq!(req.needs, vec![InterventionKey::from("spring")]);
        assert_eq!(req.completed, vec![InterventionKey::from("well")]);
        assert!(world.get::<&ActiveWork>(region).is_err());
        assert!(world.get::<&Sustained>(region).is_err());
    }

    #[test]
    fn test_last_need_sustains_region() {
        let mut world = World::new();
        let region = spawn_region(&mut world, 4, &["biosand"]);
        world.insert_one(region, ActiveWork::new("biosand".into(), 1)).unwrap();

        let done = progress_work(&mut world);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].region, 4);
        assert!(done[0].sustained);
        assert!(world.get::<&Sustained>(region).is_ok());
        assert_eq!(sustained_region_count(&world), 1);
    }

    #[test]
    fn test_completions_in_region_order() {
        let mut world = World::new();
        let late = spawn_region(&mut world, 7, &["biosand"]);
        let early = spawn_region(&mut world, 2, &["latrines", "well"]);
        world.insert_one(late, ActiveWork::new("biosand".into(), 1)).unwrap();
        world.insert_one(early, ActiveWork::new("latrines".into(), 1)).unwrap();

        let done = progress_work(&mut world);
        let regions: Vec<usize> = done.iter().map(|d| d.region).collect();
        assert_eq!(regions, vec![2, 7]);
    }

    #[test]
    fn test_counts_skip_disabled() {
        let mut world = World::new();
        let a = spawn_region(&mut world, 0, &[]);
        let b = spawn_region(&mut world, 1, &[]);
        spawn_region(&mut world, 2, &["well"]);
        world.insert_one(a, Sustained).unwrap();
        world.insert_one(b, Sustained).unwrap();
        world.insert_one(b, Disabled).unwrap();

        assert_eq!(enabled_region_count(&world), 2);
        assert_eq!(sustained_region_count(&world), 1);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(0, 8), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(7, 7), 100);
        assert_eq!(progress_percent(999, 1000), 99);
    }
}
