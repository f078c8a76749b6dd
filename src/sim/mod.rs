//! Deterministic simulation module
//!
//! All driving logic lives here. This module must be pure and deterministic:
//! - Time only enters through the frame delta handed to `step`/`advance`
//! - Stable iteration order (sensor mounts, obstacles and traffic by index)
//! - No rendering or platform dependencies

pub mod controller;
pub mod evaluate;
pub mod raycast;
pub mod sensors;
pub mod state;
pub mod tick;
pub mod traffic;
pub mod vehicle;

pub use controller::{ControlCommand, Controller, ControllerGains, DriveMode, KeyState};
pub use evaluate::{Evaluation, EvaluationRules, evaluate};
pub use raycast::{RayHit, cast};
pub use sensors::{SensorArray, SensorReading};
pub use state::{Metrics, Simulation, SimulationStatus, StepReport, TrafficPose, VehiclePose};
pub use tick::{plan_substeps, tick};
pub use traffic::{LaneAxis, TrafficCar, TrafficSpec};
pub use vehicle::{Vehicle, VehicleParams};
