//! Error types
//!
//! Only configuration and malformed tick input are errors. Collisions,
//! boundary clamps and goal arrival are reported as status values.

use thiserror::Error;

use crate::scenario::Tunable;

/// Rejected scenario or parameter change
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f32 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },

    #[error("{name} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("world bounds are empty: min {min:?} is not below max {max:?}")]
    EmptyBounds { min: [f32; 2], max: [f32; 2] },

    #[error("obstacle {index} has inverted extents")]
    InvertedObstacle { index: usize },

    #[error("vehicle needs at least one sensor mount angle")]
    NoSensors,

    #[error("sensor mount angles must be sorted left to right (most negative first)")]
    UnsortedSensors,

    #[error("{what} lies outside the world bounds")]
    OutsideBounds { what: &'static str },

    #[error("{tunable:?} = {value} is outside its valid range [{min}, {max}] {unit}")]
    TunableOutOfRange {
        tunable: Tunable,
        value: f32,
        min: f32,
        max: f32,
        unit: &'static str,
    },
}

/// Rejected tick; the simulation state is left unchanged
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("frame delta must be finite, got {0}")]
    NonFiniteDelta(f64),

    #[error("frame delta must not be negative, got {0}")]
    NegativeDelta(f64),

    #[error("frame timestamp must be finite, got {0}")]
    NonFiniteTimestamp(f64),

    #[error("timestamp {now} precedes previous frame at {previous}")]
    TimestampWentBackwards { previous: f64, now: f64 },

    #[error("vehicle pose became non-finite")]
    NonFinitePose,
}

/// Failure loading a scenario description
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid scenario: {0}")]
    Invalid(#[from] ConfigError),
}
