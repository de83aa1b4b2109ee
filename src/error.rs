//! Error types shared by the grid, model, simulation and output layers.

use {std::io, thiserror::Error};

/// Invalid configuration, detected while assembling a grid, model, simulation
/// or output writer and always before the first time step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("resolution along {axis} must be positive, got {size}")]
    NonPositiveResolution { axis: char, size: usize },

    #[error("extent along {axis} is degenerate: ({start}, {end})")]
    DegenerateExtent { axis: char, start: f64, end: f64 },

    #[error("vertical faces must be {expected} strictly increasing values, got {found}")]
    InvalidVerticalFaces { expected: usize, found: usize },

    #[error("latitude {0} lies outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("radius must be positive, got {0}")]
    NonPositiveRadius(f64),

    #[error("array for {name} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("{0}")]
    Incompatible(String),

    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    #[error("field \"{0}\" is defined more than once")]
    DuplicateField(String),

    #[error("{name} must be {requirement}, got {value}")]
    OutOfRange {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("no stop criterion set; the simulation would never terminate")]
    NoStopCriterion,

    #[error("index range {start}..{end} along {axis} exceeds size {size}")]
    IndexOutOfRange {
        axis: char,
        start: usize,
        end: usize,
        size: usize,
    },
}

/// Any failure raised by the driver.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode or decode snapshot: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("snapshot file {path} is invalid: {reason}")]
    InvalidSnapshot { path: String, reason: String },

    #[error("field \"{field}\" diverged at iteration {iteration} (t = {time})")]
    Diverged {
        field: String,
        iteration: u64,
        time: f64,
    },

    #[error("snapshot record {index} requested but the file holds {count}")]
    NoSuchRecord { index: usize, count: usize },

    #[error("time step failed: {0}")]
    Step(String),
}

pub type Result<T> = std::result::Result<T, Error>;
