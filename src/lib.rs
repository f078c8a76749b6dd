//! Drive Sim - a sensor-driven vehicle playground core
//!
//! Core modules:
//! - `sim`: Vehicle simulation (raycast sensors, controllers, kinematics, collisions, step driver)
//! - `geom`: Planar boxes, vehicle footprint and the 2D/3D plane mapping
//! - `scenario`: Serializable scenario description, presets and tunables
//! - `error`: Configuration and step errors
//!
//! The core performs no rendering or I/O. A presentation layer calls
//! [`sim::Simulation::step`] (or `advance`) once per frame and draws the
//! returned [`sim::StepReport`].

pub mod error;
pub mod geom;
pub mod scenario;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use error::{ConfigError, ScenarioError, StepError};
pub use scenario::{Scenario, Tunable};
pub use sim::{DriveMode, Simulation, SimulationStatus, StepReport};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Longest slice of time integrated in one sub-step (seconds)
    pub const MAX_SUBSTEP_DT: f32 = 1.0 / 60.0;
    /// Maximum sub-steps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Upper bound on march samples per sensor ray (`sensor_range / ray_step`)
    pub const MAX_RAY_SAMPLES: u32 = 4096;

    /// Reverse speed cap as a fraction of forward max speed
    pub const REVERSE_FACTOR: f32 = 0.4;
    /// Speed multiplier applied on collision (small bounce-back)
    pub const COLLISION_RESTITUTION: f32 = -0.3;

    /// Margin added around traffic boxes when sensing them
    pub const TRAFFIC_SENSOR_MARGIN: f32 = 1.0;
    /// Distance within which traffic yields to other traffic
    pub const TRAFFIC_YIELD_RADIUS: f32 = 6.0;
    /// Extra yield distance kept from the ego vehicle
    pub const TRAFFIC_EGO_EXTRA_RADIUS: f32 = 2.0;
    /// Minimum forward alignment for something to count as "ahead"
    pub const TRAFFIC_AHEAD_DOT: f32 = 0.7;
    /// Speed blend rate while blocked (1/s)
    pub const TRAFFIC_BRAKE_RATE: f32 = 5.0;
    /// Speed blend rate while cruising (1/s)
    pub const TRAFFIC_RECOVER_RATE: f32 = 2.0;
}

/// Normalize angle to (-π, π]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Unit vector for a heading (0 = +X, positive turns toward +Y)
#[inline]
pub fn heading_vector(heading: f32) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}

/// Signed shortest angle from `heading` to the direction `from -> to`
#[inline]
pub fn bearing_error(from: Vec2, heading: f32, to: Vec2) -> f32 {
    let delta = to - from;
    normalize_angle(delta.y.atan2(delta.x) - heading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(PI) - PI).abs() < 1e-6);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-6);
        assert!((normalize_angle(2.5 * PI) - FRAC_PI_2).abs() < 1e-4);
        assert!((normalize_angle(-2.5 * PI) + FRAC_PI_2).abs() < 1e-4);
        assert!(normalize_angle(0.0).abs() < 1e-6);

        for i in -50..50 {
            let a = normalize_angle(i as f32 * 0.77);
            assert!(a > -PI && a <= PI, "{a} out of range");
        }
    }

    #[test]
    fn test_bearing_error_sign() {
        // Goal due +X, heading +Y: must turn negative
        let err = bearing_error(Vec2::ZERO, FRAC_PI_2, Vec2::new(10.0, 0.0));
        assert!((err + FRAC_PI_2).abs() < 1e-5);
    }
}
