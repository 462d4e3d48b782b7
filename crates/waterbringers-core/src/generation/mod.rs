//! Generation - procedural creation of the region map.

mod regions;

pub use regions::*;
