//! Component definitions for the region ECS.
//!
//! Components are pure data structs attached to region entities.
//! They have no behavior - that lives in systems.

mod region;

pub use region::*;
