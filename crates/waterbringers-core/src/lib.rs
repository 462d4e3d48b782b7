//! Water Bringers Core - Turn-Based Water Access Strategy Engine
//!
//! A grid of regions each needs a handful of water and sanitation
//! interventions. The player spends limited funding to start work, work
//! finishes after a number of turns, and random events knock things back.
//! The game is won when every enabled region is sustained and lost when
//! time runs out.
//!
//! # Architecture
//!
//! Regions live in a `hecs` world:
//! - **Entities**: One per map cell, addressed by row-major index
//! - **Components**: Requirements, in-flight work, sustained and disabled markers
//! - **Systems**: Dispatch, work progress and world events as free functions
//!
//! [`GameState`](engine::GameState) owns the world and is advanced one turn at a
//! time. [`Session`](session::Session) layers the two periodic tickers (turns
//! and funding stipends) on top and turns frame deltas into game calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use waterbringers_core::prelude::*;
//!
//! let mut session = Session::new(GameConfig::seeded(7)).unwrap();
//! session.start();
//!
//! session.select("well".into());
//! let _ = session.act_on_region(0);
//!
//! loop {
//!     for event in session.update(1.0 / 60.0) {
//!         if let SessionEvent::EventRaised(_) = event {
//!             session.acknowledge_event();
//!         }
//!     }
//!     if session.game().status().is_over() {
//!         break;
//!     }
//! }
//! ```

pub mod catalog;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod session;
pub mod systems;
pub mod view;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::catalog::{Catalog, Intervention, InterventionKey};
    pub use crate::config::{EventConfig, GameConfig};
    pub use crate::engine::{GameState, GameStatus, TurnOutcome};
    pub use crate::error::{ConfigError, DispatchError, SaveError};
    pub use crate::session::{Command, CommandResult, Session, SessionEvent};
    pub use crate::systems::{Dispatched, FiredEvent, WorldEventKind};
    pub use crate::view::{AggregateView, RegionView};
}
