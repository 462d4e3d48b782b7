//! Dispatch system - validates and commits a request to start work on a region

use hecs::World;
use tracing::debug;

use crate::catalog::{Catalog, InterventionKey};
use crate::components::{ActiveWork, Disabled, Requirements, Sustained};
use crate::error::DispatchError;
use crate::generation::RegionLayout;

/// Work that was successfully started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub region: usize,
    pub intervention: InterventionKey,
    pub cost: u32,
    pub duration: u32,
}

/// Number of regions with work underway, across the whole map
pub fn in_progress_count(world: &World) -> usize {
    world.query::<&ActiveWork>().iter().count()
}

/// Validate a request and, if every check passes, start the work.
///
/// Checks run in a fixed order and stop at the first failure, leaving the
/// world and `funding` untouched. On success the cost is deducted and an
/// [`ActiveWork`] is attached to the region.
pub fn dispatch_action(
    world: &mut World,
    layout: &RegionLayout,
    catalog: &Catalog,
    funding: &mut u32,
    max_concurrent: usize,
    region: usize,
    intervention: Option<&InterventionKey>,
) -> Result<Dispatched, DispatchError> {
    let entity = layout
        .entity(region)
        .ok_or(DispatchError::UnknownRegion(region))?;

    let rejected = |reason: DispatchError| {
        debug!(region, %reason, "action rejected");
        reason
    };

    if world.get::<&Disabled>(entity).is_ok() {
        return Err(rejected(DispatchError::RegionDisabled(region)));
    }
    if world.get::<&ActiveWork>(entity).is_ok() {
        return Err(rejected(DispatchError::AlreadyInProgress));
    }
    if in_progress_count(world) >= max_concurrent {
        return Err(rejected(DispatchError::TooManyConcurrentActions {
            limit: max_concurrent,
        }));
    }
    if world.get::<&Sustained>(entity).is_ok() {
        return Err(rejected(DispatchError::AlreadySustained));
    }
    let key = intervention.ok_or_else(|| rejected(DispatchError::NoActionSelected))?;

    let needed = world
        .get::<&Requirements>(entity)
        .map(|req| req.requires(key))
        .unwrap_or(false);
    let entry = match catalog.get(key) {
        Some(entry) if needed => entry,
        _ => return Err(rejected(DispatchError::NotNeeded)),
    };

    if *funding < entry.cost {
        return Err(rejected(DispatchError::InsufficientFunding {
            cost: entry.cost,
            available: *funding,
        }));
    }

    *funding -= entry.cost;
    world
        .insert_one(entity, ActiveWork::new(key.clone(), entry.duration))
        .map_err(|_| DispatchError::UnknownRegion(region))?;

    Ok(Dispatched {
        region,
        intervention: key.clone(),
        cost: entry.cost,
        duration: entry.duration,
    })
}
