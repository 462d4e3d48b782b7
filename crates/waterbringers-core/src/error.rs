//! Error types for dispatching, configuration and save/load.

use thiserror::Error;

/// Why a request to start an intervention was refused.
///
/// Every variant is a recoverable, player-facing condition; game state is
/// left untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("there is no region {0}")]
    UnknownRegion(usize),
    #[error("region {0} is not part of this map")]
    RegionDisabled(usize),
    #[error("the game is over")]
    GameOver,
    #[error("you cannot start a new action here until the current one is finished")]
    AlreadyInProgress,
    #[error("you can only have actions happening on {limit} regions at a time")]
    TooManyConcurrentActions { limit: usize },
    #[error("this region is already sustained")]
    AlreadySustained,
    #[error("select an action from the sidebar first")]
    NoActionSelected,
    #[error("this action is not needed for this region")]
    NotNeeded,
    #[error("not enough funding: need {cost}, have {available}")]
    InsufficientFunding { cost: u32, available: u32 },
}

/// Problems found while building or loading a [`GameConfig`](crate::config::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("map must have at least one row and one column (got {rows}x{cols})")]
    EmptyMap { rows: u32, cols: u32 },
    #[error("map of {rows}x{cols} regions is too large")]
    MapTooLarge { rows: u32, cols: u32 },
    #[error("starting funding cannot be negative (got {0})")]
    NegativeFunding(i64),
    #[error("starting time must be positive (got {0})")]
    NonPositiveTime(i64),
    #[error("catalog is empty")]
    EmptyCatalog,
    #[error("catalog contains duplicate key `{0}`")]
    DuplicateIntervention(String),
    #[error("intervention `{0}` must have a positive cost and duration")]
    InvalidIntervention(String),
    #[error("needs per region must satisfy 1 <= min <= max <= catalog size (got {min}..={max} with {catalog} entries)")]
    InvalidNeedsRange { min: usize, max: usize, catalog: usize },
    #[error("disabled region range is inverted ({min}..={max})")]
    InvalidDisabledRange { min: usize, max: usize },
    #[error("{name} must be a positive number of seconds (got {value})")]
    InvalidInterval { name: &'static str, value: f64 },
    #[error("event chance must be within [0, 1] (got {0})")]
    InvalidEventChance(f64),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors that can occur during save/load.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("save data is corrupt: {0}")]
    Corrupt(String),
    #[error("saved config is invalid: {0}")]
    Config(#[from] ConfigError),
}
