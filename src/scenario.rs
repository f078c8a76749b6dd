//! Scenario description and built-in presets
//!
//! A scenario is everything `reset` rebuilds the world from: bounds,
//! obstacles, goal, start pose, vehicle parameters, controller gains and
//! traffic. Scenarios are plain serde data, loadable from JSON, and are
//! validated before a simulation accepts them.

use std::path::Path;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::MAX_RAY_SAMPLES;
use crate::error::{ConfigError, ScenarioError};
use crate::geom::{Aabb, Plane};
use crate::sim::controller::ControllerGains;
use crate::sim::traffic::{LaneAxis, TrafficSpec};
use crate::sim::vehicle::{VehicleParams, finite, non_negative, positive};

/// Obstacles placed by the `scatter` presets
const SCATTER_COUNT: usize = 8;

/// Position and heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub pos: Vec2,
    pub heading: f32,
}

/// Target point and arrival radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub pos: Vec2,
    pub radius: f32,
}

/// Parameters a presentation layer exposes as sliders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tunable {
    MaxSpeed,
    BrakeStrength,
    SensorRange,
}

impl Tunable {
    pub const ALL: [Tunable; 3] = [Tunable::MaxSpeed, Tunable::BrakeStrength, Tunable::SensorRange];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tunable::MaxSpeed => "max_speed",
            Tunable::BrakeStrength => "brake_strength",
            Tunable::SensorRange => "sensor_range",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "max_speed" | "maxSpeed" => Some(Tunable::MaxSpeed),
            "brake_strength" | "brakeStrength" => Some(Tunable::BrakeStrength),
            "sensor_range" | "sensorRange" => Some(Tunable::SensorRange),
            _ => None,
        }
    }

    /// Unit label, in world units
    pub fn unit(&self) -> &'static str {
        match self {
            Tunable::MaxSpeed => "units/s",
            Tunable::BrakeStrength => "units/s²",
            Tunable::SensorRange => "units",
        }
    }

    pub fn get(&self, params: &VehicleParams) -> f32 {
        match self {
            Tunable::MaxSpeed => params.max_speed,
            Tunable::BrakeStrength => params.brake,
            Tunable::SensorRange => params.sensor_range,
        }
    }

    pub(crate) fn apply(&self, params: &mut VehicleParams, value: f32) {
        match self {
            Tunable::MaxSpeed => params.max_speed = value,
            Tunable::BrakeStrength => params.brake = value,
            Tunable::SensorRange => params.sensor_range = value,
        }
    }
}

/// Inclusive valid range of each tunable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunableLimits {
    pub max_speed: [f32; 2],
    pub brake_strength: [f32; 2],
    pub sensor_range: [f32; 2],
}

impl Default for TunableLimits {
    fn default() -> Self {
        Self {
            max_speed: [50.0, 300.0],
            brake_strength: [100.0, 600.0],
            sensor_range: [60.0, 300.0],
        }
    }
}

impl TunableLimits {
    pub fn range(&self, tunable: Tunable) -> [f32; 2] {
        match tunable {
            Tunable::MaxSpeed => self.max_speed,
            Tunable::BrakeStrength => self.brake_strength,
            Tunable::SensorRange => self.sensor_range,
        }
    }

    /// Accept `value` only if it lies inside the tunable's range
    pub fn check(&self, tunable: Tunable, value: f32) -> Result<(), ConfigError> {
        let [min, max] = self.range(tunable);
        if value.is_finite() && value >= min && value <= max {
            Ok(())
        } else {
            Err(ConfigError::TunableOutOfRange {
                tunable,
                value,
                min,
                max,
                unit: tunable.unit(),
            })
        }
    }
}

/// Complete world description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub plane: Plane,
    /// Drivable area; its edges are opaque to sensors
    pub bounds: Aabb,
    /// Vehicle center is kept this far inside the bounds
    pub edge_margin: f32,
    /// March step of the obstacle sensors
    pub ray_step: f32,
    pub obstacles: Vec<Aabb>,
    /// Obstacle height for 3D presentation only
    pub obstacle_height: f32,
    pub goal: Goal,
    /// Slack added to the goal radius when checking arrival
    pub arrival_margin: f32,
    /// Push-back distance applied on collision
    pub bounce_back: f32,
    pub start: Pose,
    pub vehicle: VehicleParams,
    pub gains: ControllerGains,
    pub traffic: Vec<TrafficSpec>,
    pub limits: TunableLimits,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::canvas_2d()
    }
}

impl Scenario {
    /// 900×500 canvas with a wall and a two-part barrier to weave through
    pub fn canvas_2d() -> Self {
        Self {
            name: "canvas".to_string(),
            plane: Plane::Xy,
            bounds: Aabb::from_rect(0.0, 0.0, 900.0, 500.0),
            edge_margin: 10.0,
            ray_step: 4.0,
            obstacles: vec![
                Aabb::from_rect(260.0, 70.0, 60.0, 360.0),
                Aabb::from_rect(480.0, 0.0, 60.0, 250.0),
                Aabb::from_rect(480.0, 280.0, 60.0, 220.0),
            ],
            obstacle_height: 0.0,
            goal: Goal {
                pos: Vec2::new(820.0, 250.0),
                radius: 16.0,
            },
            arrival_margin: 8.0,
            bounce_back: 10.0,
            start: Pose {
                pos: Vec2::new(100.0, 250.0),
                heading: 0.0,
            },
            vehicle: VehicleParams::default(),
            gains: ControllerGains::default(),
            traffic: Vec::new(),
            limits: TunableLimits::default(),
        }
    }

    /// 200×200 ground plane with pillars and cross traffic (Y-up world)
    pub fn plaza_3d() -> Self {
        let pillar = |x: f32, z: f32, w: f32, d: f32| Aabb::from_center_size(Vec2::new(x, z), Vec2::new(w, d));
        let lane = |x: f32, z: f32, axis: LaneAxis, speed: f32| TrafficSpec {
            start: Vec2::new(x, z),
            axis,
            speed,
            lane_min: -45.0,
            lane_max: 45.0,
            half_length: 2.25,
            half_width: 1.2,
        };

        Self {
            name: "plaza".to_string(),
            plane: Plane::Xz { ride_height: 0.9 },
            bounds: Aabb::from_center_size(Vec2::ZERO, Vec2::splat(200.0)),
            edge_margin: 2.0,
            ray_step: 0.4,
            obstacles: vec![
                pillar(-5.0, 0.0, 4.0, 40.0),
                pillar(10.0, -12.0, 4.0, 22.0),
                pillar(10.0, 12.0, 4.0, 22.0),
                pillar(25.0, 0.0, 4.0, 40.0),
            ],
            obstacle_height: 4.0,
            goal: Goal {
                pos: Vec2::new(40.0, 0.0),
                radius: 3.0,
            },
            arrival_margin: 1.2,
            bounce_back: 2.0,
            start: Pose {
                pos: Vec2::new(-35.0, 0.0),
                heading: 0.0,
            },
            vehicle: VehicleParams::ground_car(),
            gains: ControllerGains::ground_car(),
            traffic: vec![
                lane(-20.0, -25.0, LaneAxis::X, 8.0),
                lane(20.0, 25.0, LaneAxis::X, -6.0),
                lane(45.0, 0.0, LaneAxis::Y, 5.0),
            ],
            limits: TunableLimits {
                max_speed: [5.0, 30.0],
                brake_strength: [10.0, 60.0],
                sensor_range: [16.0, 40.0],
            },
        }
    }

    /// Canvas with `count` seeded random blocks, kept clear of start and goal
    pub fn scatter(seed: u64, count: usize) -> Self {
        let mut scenario = Self::canvas_2d();
        scenario.name = format!("scatter-{seed}");
        scenario.obstacles.clear();

        let mut rng = Pcg32::seed_from_u64(seed);
        let clearance = scenario.vehicle.half_length * 2.0;
        let keep_clear = [
            Aabb::from_center_size(scenario.start.pos, Vec2::splat(clearance * 2.0)),
            Aabb::from_center_size(scenario.goal.pos, Vec2::splat(scenario.goal.radius * 2.0 + clearance * 2.0)),
        ];
        let area = scenario.bounds;

        // Bounded attempts so a crowded field cannot spin forever
        let max_attempts = count * 20;
        let mut attempts = 0;
        while scenario.obstacles.len() < count && attempts < max_attempts {
            attempts += 1;
            let size = Vec2::new(rng.random_range(20.0..80.0), rng.random_range(20.0..160.0));
            let min = Vec2::new(
                rng.random_range(area.min.x..area.max.x - size.x),
                rng.random_range(area.min.y..area.max.y - size.y),
            );
            let block = Aabb::new(min, min + size);
            if keep_clear.iter().any(|zone| zone.overlaps(&block)) {
                continue;
            }
            scenario.obstacles.push(block);
        }

        if scenario.obstacles.len() < count {
            log::debug!(
                "scatter({seed}) placed {} of {count} obstacles",
                scenario.obstacles.len()
            );
        }
        scenario
    }

    /// Look up a built-in preset by name
    ///
    /// `scatter` uses seed 1; `scatter-<seed>` picks the seed.
    pub fn preset(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        match name.as_str() {
            "canvas" | "2d" => Some(Self::canvas_2d()),
            "plaza" | "3d" => Some(Self::plaza_3d()),
            "scatter" => Some(Self::scatter(1, SCATTER_COUNT)),
            _ => {
                let seed = name.strip_prefix("scatter-")?.parse().ok()?;
                Some(Self::scatter(seed, SCATTER_COUNT))
            }
        }
    }

    /// Reject anything the simulation could not run meaningfully
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bounds.is_finite() || !self.bounds.is_proper() {
            return Err(ConfigError::EmptyBounds {
                min: self.bounds.min.to_array(),
                max: self.bounds.max.to_array(),
            });
        }
        non_negative("edge_margin", self.edge_margin)?;
        non_negative("obstacle_height", self.obstacle_height)?;
        non_negative("arrival_margin", self.arrival_margin)?;
        non_negative("bounce_back", self.bounce_back)?;

        for (index, ob) in self.obstacles.iter().enumerate() {
            if !ob.is_finite() {
                return Err(ConfigError::NotFinite {
                    name: "obstacle",
                    value: f32::NAN,
                });
            }
            if ob.min.x > ob.max.x || ob.min.y > ob.max.y {
                return Err(ConfigError::InvertedObstacle { index });
            }
        }

        finite("goal.x", self.goal.pos.x)?;
        finite("goal.y", self.goal.pos.y)?;
        non_negative("goal.radius", self.goal.radius)?;
        if !self.bounds.contains(self.goal.pos) {
            return Err(ConfigError::OutsideBounds { what: "goal" });
        }

        finite("start.x", self.start.pos.x)?;
        finite("start.y", self.start.pos.y)?;
        finite("start.heading", self.start.heading)?;
        if !self.bounds.contains(self.start.pos) {
            return Err(ConfigError::OutsideBounds { what: "start pose" });
        }

        if let Plane::Xz { ride_height } = self.plane {
            finite("ride_height", ride_height)?;
        }

        self.vehicle.validate()?;
        check_ray_step(self.ray_step, self.vehicle.sensor_range)?;
        self.gains.validate()?;

        for t in &self.traffic {
            finite("traffic.x", t.start.x)?;
            finite("traffic.y", t.start.y)?;
            finite("traffic.speed", t.speed)?;
            positive("traffic.half_length", t.half_length)?;
            positive("traffic.half_width", t.half_width)?;
            finite("traffic.lane_min", t.lane_min)?;
            finite("traffic.lane_max", t.lane_max)?;
            if t.lane_min >= t.lane_max {
                return Err(ConfigError::OutOfRange {
                    name: "traffic.lane_min",
                    value: t.lane_min,
                    min: f32::NEG_INFINITY,
                    max: t.lane_max,
                });
            }
        }

        for tunable in Tunable::ALL {
            let [min, max] = self.limits.range(tunable);
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(ConfigError::OutOfRange {
                    name: tunable.as_str(),
                    value: min,
                    min: f32::NEG_INFINITY,
                    max,
                });
            }
            self.limits.check(tunable, tunable.get(&self.vehicle))?;
        }

        Ok(())
    }

    /// Change a slider-exposed parameter, rejecting out-of-range values
    pub fn set_tunable(&mut self, tunable: Tunable, value: f32) -> Result<(), ConfigError> {
        self.limits.check(tunable, value)?;
        if tunable == Tunable::SensorRange {
            check_ray_step(self.ray_step, value)?;
        }
        tunable.apply(&mut self.vehicle, value);
        Ok(())
    }

    /// Parse and validate a JSON scenario; missing fields take canvas defaults
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a scenario file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let scenario = Self::from_json(&json)?;
        log::info!(
            "Loaded scenario '{}' from {} ({} obstacles)",
            scenario.name,
            path.as_ref().display(),
            scenario.obstacles.len()
        );
        Ok(scenario)
    }
}

/// The march step must resolve the sensor range in at most `MAX_RAY_SAMPLES` samples
fn check_ray_step(ray_step: f32, sensor_range: f32) -> Result<(), ConfigError> {
    positive("ray_step", ray_step)?;
    let min = sensor_range / MAX_RAY_SAMPLES as f32;
    if ray_step < min || ray_step > sensor_range {
        return Err(ConfigError::OutOfRange {
            name: "ray_step",
            value: ray_step,
            min,
            max: sensor_range,
        });
    }
    Ok(())
}
