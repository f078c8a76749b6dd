//! Simulation state and lifecycle
//!
//! `Simulation` owns the vehicle, traffic and run counters for one scenario.
//! Lifecycle calls (`start`, `pause`, `reset`, `configure`) live here; the
//! per-frame pipeline lives in `tick`.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::controller::{ControlCommand, Controller, DriveMode, KeyState};
use super::sensors::{SensorArray, SensorReading};
use super::traffic::{TrafficCar, sensor_boxes};
use super::vehicle::Vehicle;
use crate::error::ConfigError;
use crate::scenario::{Scenario, Tunable};

/// Run status reported to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    /// Freshly reset, waiting for start
    Idle,
    /// Ticks integrate
    Running,
    /// Frozen; counters and pose kept
    Paused,
    /// A collision happened this tick; the run is still going
    Collided,
    /// Arrived at the goal; terminal until reset
    GoalReached,
}

impl SimulationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationStatus::Idle => "Ready",
            SimulationStatus::Running => "Running",
            SimulationStatus::Paused => "Paused",
            SimulationStatus::Collided => "Collision!",
            SimulationStatus::GoalReached => "Target reached!",
        }
    }
}

/// Run metrics shown alongside the view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Wall-clock time spent running (seconds)
    pub elapsed_secs: f64,
    pub collisions: u32,
    pub distance_to_goal: f32,
}

/// Vehicle pose in plane and world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehiclePose {
    pub pos: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub world_pos: Vec3,
    pub world_yaw: f32,
    /// Unit facing direction in world space (camera follow)
    pub world_forward: Vec3,
}

/// Traffic car pose for drawing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficPose {
    pub id: u32,
    pub pos: Vec2,
    pub heading: f32,
    pub world_pos: Vec3,
    pub yielding: bool,
}

/// Everything a frame needs to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub pose: VehiclePose,
    pub readings: Vec<SensorReading>,
    pub status: SimulationStatus,
    pub metrics: Metrics,
    /// Command applied on the last integrated slice
    pub command: ControlCommand,
    pub traffic: Vec<TrafficPose>,
}

/// One vehicle driving one scenario
#[derive(Debug, Clone)]
pub struct Simulation {
    pub(crate) scenario: Scenario,
    pub(crate) vehicle: Vehicle,
    pub(crate) traffic: Vec<TrafficCar>,
    /// Stored status: never `Collided`, which is only reported per tick
    pub(crate) status: SimulationStatus,
    pub(crate) mode: DriveMode,
    pub(crate) controller: Controller,
    pub(crate) keys: KeyState,
    pub(crate) collisions: u32,
    pub(crate) elapsed_secs: f64,
    /// Previous frame timestamp; `None` right after start/reset
    pub(crate) last_timestamp: Option<f64>,
    pub(crate) last_command: ControlCommand,
}

impl Simulation {
    /// Validate `scenario` and build a world from it, in autonomous mode
    pub fn new(scenario: Scenario) -> Result<Self, ConfigError> {
        scenario.validate()?;
        let mode = DriveMode::default();
        let controller = Controller::for_mode(mode, &scenario.gains);
        Ok(Self {
            vehicle: spawn_vehicle(&scenario),
            traffic: spawn_traffic(&scenario),
            scenario,
            status: SimulationStatus::Idle,
            mode,
            controller,
            keys: KeyState::default(),
            collisions: 0,
            elapsed_secs: 0.0,
            last_timestamp: None,
            last_command: ControlCommand::default(),
        })
    }

    /// Replace the scenario and reset; the old world is kept on error
    pub fn configure(&mut self, scenario: Scenario) -> Result<(), ConfigError> {
        scenario.validate()?;
        log::info!(
            "Configured scenario '{}' ({} obstacles, {} traffic)",
            scenario.name,
            scenario.obstacles.len(),
            scenario.traffic.len()
        );
        self.scenario = scenario;
        self.controller = Controller::for_mode(self.mode, &self.scenario.gains);
        self.reset();
        Ok(())
    }

    /// Rebuild the world from the scenario and zero the run counters
    pub fn reset(&mut self) {
        self.vehicle = spawn_vehicle(&self.scenario);
        self.traffic = spawn_traffic(&self.scenario);
        self.status = SimulationStatus::Idle;
        self.collisions = 0;
        self.elapsed_secs = 0.0;
        self.last_timestamp = None;
        self.last_command = ControlCommand::default();
        log::info!("Simulation reset ('{}')", self.scenario.name);
    }

    /// Begin or resume running; refused after the goal until reset
    pub fn start(&mut self) {
        match self.status {
            SimulationStatus::Idle | SimulationStatus::Paused => {
                self.status = SimulationStatus::Running;
                // First frame after (re)start integrates no stale time
                self.last_timestamp = None;
                log::info!("Simulation running ({} mode)", self.mode.as_str());
            }
            SimulationStatus::GoalReached => {
                log::info!("Goal already reached; reset before starting again");
            }
            SimulationStatus::Running | SimulationStatus::Collided => {}
        }
    }

    /// Freeze the run without clearing anything
    pub fn pause(&mut self) {
        if self.status == SimulationStatus::Running {
            self.status = SimulationStatus::Paused;
            log::info!(
                "Simulation paused at {:.1}s ({} collisions)",
                self.elapsed_secs,
                self.collisions
            );
        }
    }

    /// Swap the active policy; the vehicle state is untouched
    pub fn set_mode(&mut self, mode: DriveMode) {
        if mode != self.mode {
            log::info!("Drive mode: {}", mode.as_str());
        }
        self.mode = mode;
        self.controller = Controller::for_mode(mode, &self.scenario.gains);
    }

    /// Set held keys from browser key codes
    pub fn set_key_state<I, S>(&mut self, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keys = KeyState::from_codes(codes);
    }

    pub fn set_keys(&mut self, keys: KeyState) {
        self.keys = keys;
    }

    /// Change a slider parameter; applies to the live vehicle immediately
    pub fn set_tunable(&mut self, tunable: Tunable, value: f32) -> Result<(), ConfigError> {
        self.scenario.set_tunable(tunable, value)?;
        tunable.apply(&mut self.vehicle.params, value);
        log::debug!("{} = {value} {}", tunable.as_str(), tunable.unit());
        Ok(())
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn keys(&self) -> KeyState {
        self.keys
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn traffic(&self) -> &[TrafficCar] {
        &self.traffic
    }

    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn is_running(&self) -> bool {
        self.status == SimulationStatus::Running
    }

    pub fn distance_to_goal(&self) -> f32 {
        self.vehicle.pos.distance(self.scenario.goal.pos)
    }

    /// Current sensor readings (obstacles, bounds and traffic)
    pub fn sensor_readings(&self) -> Vec<SensorReading> {
        let traffic = sensor_boxes(&self.traffic);
        SensorArray::new(&self.scenario.obstacles, &self.scenario.bounds, self.scenario.ray_step)
            .with_traffic(&traffic)
            .read_all(&self.vehicle)
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            elapsed_secs: self.elapsed_secs,
            collisions: self.collisions,
            distance_to_goal: self.distance_to_goal(),
        }
    }

    /// Snapshot for the presentation layer
    pub fn report(&self, status: SimulationStatus) -> StepReport {
        let plane = self.scenario.plane;
        let v = &self.vehicle;
        StepReport {
            pose: VehiclePose {
                pos: v.pos,
                heading: v.heading,
                speed: v.speed,
                world_pos: plane.to_world(v.pos),
                world_yaw: plane.world_yaw(v.heading),
                world_forward: plane.world_forward(v.heading),
            },
            readings: self.sensor_readings(),
            status,
            metrics: self.metrics(),
            command: self.last_command,
            traffic: self
                .traffic
                .iter()
                .map(|t| TrafficPose {
                    id: t.id,
                    pos: t.pos,
                    heading: t.heading(),
                    world_pos: plane.to_world(t.pos),
                    yielding: t.yielding,
                })
                .collect(),
        }
    }
}

fn spawn_vehicle(scenario: &Scenario) -> Vehicle {
    Vehicle::new(scenario.start.pos, scenario.start.heading, scenario.vehicle.clone())
}

fn spawn_traffic(scenario: &Scenario) -> Vec<TrafficCar> {
    scenario
        .traffic
        .iter()
        .zip(1..)
        .map(|(spec, id)| TrafficCar::from_spec(id, spec))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Aabb;

    #[test]
    fn test_new_starts_idle_at_start_pose() {
        let sim = Simulation::new(Scenario::canvas_2d()).expect("valid");
        assert_eq!(sim.status(), SimulationStatus::Idle);
        assert_eq!(sim.vehicle().pos, Vec2::new(100.0, 250.0));
        assert_eq!(sim.collisions(), 0);
        assert_eq!(sim.mode(), DriveMode::Autonomous);
    }

    #[test]
    fn test_new_rejects_invalid_scenario() {
        let mut s = Scenario::canvas_2d();
        s.vehicle.max_speed = 0.0;
        assert!(Simulation::new(s).is_err());
    }

    #[test]
    fn test_configure_keeps_old_world_on_error() {
        let mut sim = Simulation::new(Scenario::canvas_2d()).expect("valid");
        let mut bad = Scenario::plaza_3d();
        bad.obstacles.push(Aabb::new(Vec2::splat(5.0), Vec2::splat(1.0)));
        assert!(sim.configure(bad).is_err());
        assert_eq!(sim.scenario().name, "canvas");

        sim.configure(Scenario::plaza_3d()).expect("valid");
        assert_eq!(sim.vehicle().pos, Vec2::new(-35.0, 0.0));
        assert_eq!(sim.traffic().len(), 3);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut sim = Simulation::new(Scenario::canvas_2d()).expect("valid");
        sim.pause();
        assert_eq!(sim.status(), SimulationStatus::Idle);
        sim.start();
        assert_eq!(sim.status(), SimulationStatus::Running);
        sim.pause();
        assert_eq!(sim.status(), SimulationStatus::Paused);
        sim.start();
        assert_eq!(sim.status(), SimulationStatus::Running);
        sim.reset();
        assert_eq!(sim.status(), SimulationStatus::Idle);
    }

    #[test]
    fn test_start_refused_after_goal() {
        let mut sim = Simulation::new(Scenario::canvas_2d()).expect("valid");
        sim.status = SimulationStatus::GoalReached;
        sim.start();
        assert_eq!(sim.status(), SimulationStatus::GoalReached);
        sim.reset();
        sim.start();
        assert!(sim.is_running());
    }

    #[test]
    fn test_set_mode_keeps_vehicle_state() {
        let mut sim = Simulation::new(Scenario::canvas_2d()).expect("valid");
        sim.vehicle.speed = 42.0;
        sim.vehicle.heading = 0.3;
        sim.set_mode(DriveMode::Manual);
        assert_eq!(sim.controller, Controller::Manual);
        assert_eq!(sim.vehicle().speed, 42.0);
        assert_eq!(sim.vehicle().heading, 0.3);
    }

    #[test]
    fn test_set_tunable_applies_to_live_vehicle() {
        let mut sim = Simulation::new(Scenario::canvas_2d()).expect("valid");
        sim.set_tunable(Tunable::SensorRange, 250.0).expect("in range");
        assert_eq!(sim.vehicle().params.sensor_range, 250.0);
        assert!(sim.set_tunable(Tunable::MaxSpeed, 5000.0).is_err());
        assert_eq!(sim.vehicle().params.max_speed, 150.0);

        // Survives reset
        sim.reset();
        assert_eq!(sim.vehicle().params.sensor_range, 250.0);
    }

    #[test]
    fn test_report_maps_to_world() {
        let sim = Simulation::new(Scenario::plaza_3d()).expect("valid");
        let report = sim.report(sim.status());
        assert_eq!(report.pose.world_pos, Vec3::new(-35.0, 0.9, 0.0));
        assert_eq!(report.pose.world_forward, Vec3::X);
        assert_eq!(report.readings.len(), 5);
        assert_eq!(report.traffic.len(), 3);
        assert!((report.metrics.distance_to_goal - 75.0).abs() < 1e-4);
    }
}
