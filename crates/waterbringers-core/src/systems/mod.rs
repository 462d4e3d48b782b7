//! Systems - logic that operates on region components

mod dispatch;
mod events;
mod progress;

pub use dispatch::*;
pub use events::*;
pub use progress::*;
